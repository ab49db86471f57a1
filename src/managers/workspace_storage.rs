//! Workspace Storage for Tabspace.
//!
//! An in-memory collection of workspaces with two owned indices: the primary
//! map keyed by workspace UUID and a secondary map from browser window id to
//! UUID. Every window-index entry points at a UUID present in the primary map.
//!
//! Iteration (`keys`, `values`, `entries`, `iter`) only walks the primary
//! map, so each workspace is yielded exactly once. The window bindings are
//! exposed separately through [`WorkspaceStorage::window_ids`].

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::managers::workspace::{Workspace, WorkspaceRecord};
use crate::types::errors::WorkspaceError;

/// Either kind of key a workspace can be addressed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WorkspaceKey {
    Uuid(String),
    Window(i64),
}

impl From<&str> for WorkspaceKey {
    fn from(uuid: &str) -> Self {
        WorkspaceKey::Uuid(uuid.to_string())
    }
}

impl From<String> for WorkspaceKey {
    fn from(uuid: String) -> Self {
        WorkspaceKey::Uuid(uuid)
    }
}

impl From<&String> for WorkspaceKey {
    fn from(uuid: &String) -> Self {
        WorkspaceKey::Uuid(uuid.clone())
    }
}

impl From<i64> for WorkspaceKey {
    fn from(window_id: i64) -> Self {
        WorkspaceKey::Window(window_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspaceStorage {
    workspaces: HashMap<String, Workspace>,
    window_index: HashMap<i64, String>,
}

impl WorkspaceStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn resolve(&self, key: &WorkspaceKey) -> Option<String> {
        match key {
            WorkspaceKey::Uuid(uuid) => self
                .workspaces
                .contains_key(uuid)
                .then(|| uuid.clone()),
            WorkspaceKey::Window(window_id) => self.window_index.get(window_id).cloned(),
        }
    }

    /// Stores a workspace under its own UUID.
    ///
    /// With a window key the workspace is also rebound to that window. A UUID
    /// key that disagrees with `workspace.uuid()` is ignored in favour of the
    /// workspace's own identity.
    pub fn set(&mut self, key: impl Into<WorkspaceKey>, mut workspace: Workspace) {
        match key.into() {
            WorkspaceKey::Window(window_id) => {
                if workspace.window_id() != window_id {
                    workspace.set_window_id(window_id);
                }
            }
            WorkspaceKey::Uuid(uuid) => {
                if uuid != workspace.uuid() {
                    debug!(
                        key = %uuid,
                        uuid = %workspace.uuid(),
                        "Storing workspace under its own uuid instead of the given key"
                    );
                }
            }
        }
        self.insert(workspace);
    }

    /// Stores a workspace keyed by its own UUID and window id.
    pub fn insert(&mut self, workspace: Workspace) {
        let uuid = workspace.uuid().to_string();
        let window_id = workspace.window_id();

        if let Some(previous) = self.workspaces.get(&uuid) {
            let old_window = previous.window_id();
            if old_window != window_id
                && self.window_index.get(&old_window).map(String::as_str) == Some(uuid.as_str())
            {
                self.window_index.remove(&old_window);
            }
        }

        self.window_index.insert(window_id, uuid.clone());
        self.workspaces.insert(uuid, workspace);
    }

    pub fn get(&self, key: impl Into<WorkspaceKey>) -> Option<&Workspace> {
        let uuid = self.resolve(&key.into())?;
        self.workspaces.get(&uuid)
    }

    /// Mutable access. Window rebinding must go through [`Self::rebind_window`].
    pub fn get_mut(&mut self, key: impl Into<WorkspaceKey>) -> Option<&mut Workspace> {
        let uuid = self.resolve(&key.into())?;
        self.workspaces.get_mut(&uuid)
    }

    pub fn has(&self, key: impl Into<WorkspaceKey>) -> bool {
        self.resolve(&key.into()).is_some()
    }

    /// Binds a workspace to a new window id, updating the window index.
    pub fn rebind_window(&mut self, key: impl Into<WorkspaceKey>, window_id: i64) -> bool {
        let Some(uuid) = self.resolve(&key.into()) else {
            return false;
        };
        let Some(mut workspace) = self.workspaces.remove(&uuid) else {
            return false;
        };
        let old_window = workspace.window_id();
        if self.window_index.get(&old_window) == Some(&uuid) {
            self.window_index.remove(&old_window);
        }
        workspace.set_window_id(window_id);
        self.insert(workspace);
        true
    }

    /// Removes a workspace and its window binding.
    pub fn remove(&mut self, key: impl Into<WorkspaceKey>) -> Option<Workspace> {
        let uuid = self.resolve(&key.into())?;
        let workspace = self.workspaces.remove(&uuid)?;
        self.window_index.retain(|_, bound| *bound != uuid);
        Some(workspace)
    }

    /// Returns whether a workspace was removed.
    pub fn delete(&mut self, key: impl Into<WorkspaceKey>) -> bool {
        self.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.workspaces.clear();
        self.window_index.clear();
    }

    pub fn len(&self) -> usize {
        self.workspaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workspaces.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.workspaces.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Workspace> {
        self.workspaces.values()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Workspace)> {
        self.workspaces.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Workspace> {
        self.values()
    }

    /// Current window bindings as `(window_id, uuid)` pairs.
    pub fn window_ids(&self) -> impl Iterator<Item = (i64, &str)> {
        self.window_index.iter().map(|(w, u)| (*w, u.as_str()))
    }

    // --- serialization ---

    /// Records keyed by UUID, in UUID order.
    pub fn to_records(&self) -> BTreeMap<String, WorkspaceRecord> {
        self.workspaces
            .iter()
            .map(|(uuid, ws)| (uuid.clone(), ws.to_record()))
            .collect()
    }

    pub fn from_records(
        records: impl IntoIterator<Item = WorkspaceRecord>,
    ) -> Result<Self, WorkspaceError> {
        let mut storage = Self::new();
        for record in records {
            storage.insert(Workspace::from_record(record)?);
        }
        Ok(storage)
    }

    pub fn to_json(&self) -> Result<serde_json::Value, WorkspaceError> {
        serde_json::to_value(self.to_records())
            .map_err(|e| WorkspaceError::SerializationError(e.to_string()))
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self, WorkspaceError> {
        let records: BTreeMap<String, WorkspaceRecord> =
            serde_json::from_value(value.clone()).map_err(|e| {
                WorkspaceError::InvalidArgument(format!("malformed workspace storage: {}", e))
            })?;
        Self::from_records(records.into_values())
    }

    /// Serializes the whole collection as a JSON object mapping UUID to workspace.
    pub fn serialize(&self) -> Result<String, WorkspaceError> {
        serde_json::to_string(&self.to_records())
            .map_err(|e| WorkspaceError::SerializationError(e.to_string()))
    }

    pub fn deserialize(data: &str) -> Result<Self, WorkspaceError> {
        let records: BTreeMap<String, WorkspaceRecord> =
            serde_json::from_str(data).map_err(|e| {
                WorkspaceError::InvalidArgument(format!("malformed workspace storage: {}", e))
            })?;
        Self::from_records(records.into_values())
    }
}

impl<'a> IntoIterator for &'a WorkspaceStorage {
    type Item = &'a Workspace;
    type IntoIter = std::collections::hash_map::Values<'a, String, Workspace>;

    fn into_iter(self) -> Self::IntoIter {
        self.workspaces.values()
    }
}

impl FromIterator<Workspace> for WorkspaceStorage {
    fn from_iter<I: IntoIterator<Item = Workspace>>(iter: I) -> Self {
        let mut storage = Self::new();
        for workspace in iter {
            storage.insert(workspace);
        }
        storage
    }
}
