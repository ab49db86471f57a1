//! Workspace aggregate: a named snapshot of one browser window.
//!
//! A workspace owns its tab and tab-group stubs keyed by browser id. The
//! canonical read path is [`Workspace::get_tabs`], which always yields tabs in
//! ascending `index` order; serialization goes through it and renumbers the
//! indexes to `0..n` so gaps left by untracked tabs never reach storage.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::types::errors::WorkspaceError;
use crate::types::tab::{BrowserTab, BrowserTabGroup, TabGroupStub, TabStub};

/// Milliseconds since the Unix epoch, used for `last_updated` and tombstones.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Transportable form of a workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceRecord {
    /// Window the workspace was last bound to.
    pub id: i64,
    pub name: String,
    pub uuid: String,
    #[serde(default)]
    pub tabs: Vec<TabStub>,
    #[serde(default)]
    pub tab_groups: Vec<TabGroupStub>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<i64>,
}

/// Construction options for [`Workspace::new`].
///
/// When both `tabs` and `tab_stubs` are given, the live `tabs` win.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceInit {
    pub uuid: Option<String>,
    pub window_id: i64,
    pub name: String,
    pub tabs: Option<Vec<BrowserTab>>,
    pub tab_stubs: Option<Vec<TabStub>>,
    pub tab_groups: Option<Vec<TabGroupStub>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Workspace {
    uuid: String,
    window_id: i64,
    name: String,
    tabs: HashMap<i64, TabStub>,
    tab_groups: HashMap<i64, TabGroupStub>,
    last_updated: Option<i64>,
}

impl Workspace {
    /// Creates a workspace, generating a UUID unless one is supplied.
    pub fn new(init: WorkspaceInit) -> Self {
        let uuid = init
            .uuid
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut workspace = Self {
            uuid,
            window_id: init.window_id,
            name: init.name,
            tabs: HashMap::new(),
            tab_groups: HashMap::new(),
            last_updated: None,
        };

        let stubs = match (init.tabs, init.tab_stubs) {
            (Some(tabs), _) => tabs.iter().map(TabStub::from_tab).collect(),
            (None, Some(stubs)) => stubs,
            (None, None) => Vec::new(),
        };
        workspace.set_tabs(stubs);

        if let Some(groups) = init.tab_groups {
            workspace.set_tab_groups(groups);
        }

        workspace.touch();
        workspace
    }

    /// Builds a workspace from a live window snapshot.
    pub fn from_window(
        window_id: i64,
        name: &str,
        tabs: &[BrowserTab],
        groups: &[BrowserTabGroup],
    ) -> Self {
        Self::new(WorkspaceInit {
            window_id,
            name: name.to_string(),
            tabs: Some(tabs.to_vec()),
            tab_groups: Some(groups.iter().map(TabGroupStub::from_tab_group).collect()),
            ..Default::default()
        })
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn window_id(&self) -> i64 {
        self.window_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn last_updated(&self) -> Option<i64> {
        self.last_updated
    }

    /// Overrides the modification timestamp, e.g. when adopting a record from sync.
    pub fn set_last_updated(&mut self, last_updated: Option<i64>) {
        self.last_updated = last_updated;
    }

    /// Rebinding goes through `WorkspaceStorage` so its window index stays valid.
    pub(crate) fn set_window_id(&mut self, window_id: i64) {
        self.window_id = window_id;
        for tab in self.tabs.values_mut() {
            tab.window_id = window_id;
        }
        for group in self.tab_groups.values_mut() {
            group.window_id = window_id;
        }
    }

    pub fn update_name(&mut self, name: &str) {
        self.name = name.to_string();
        self.touch();
    }

    fn touch(&mut self) {
        self.last_updated = Some(now_millis());
    }

    // --- tabs ---

    /// Adds or overwrites a tab. Exactly one of `stub` and `tab` must be given.
    ///
    /// Returns `Ok(false)` when the tab has no URL and was skipped.
    pub fn add_tab(
        &mut self,
        stub: Option<TabStub>,
        tab: Option<&BrowserTab>,
    ) -> Result<bool, WorkspaceError> {
        let stub = match (stub, tab) {
            (Some(stub), None) => stub,
            (None, Some(tab)) => TabStub::from_tab(tab),
            (None, None) => {
                return Err(WorkspaceError::InvalidArgument(
                    "add_tab requires a tab stub or a browser tab".to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(WorkspaceError::InvalidArgument(
                    "add_tab accepts either a tab stub or a browser tab, not both".to_string(),
                ))
            }
        };

        if !self.insert_tab(stub) {
            return Ok(false);
        }
        self.touch();
        Ok(true)
    }

    fn insert_tab(&mut self, stub: TabStub) -> bool {
        if !stub.has_url() {
            warn!(
                workspace = %self.uuid,
                tab_id = stub.id,
                "Skipping tab without a URL"
            );
            return false;
        }
        self.tabs.insert(stub.id, stub);
        true
    }

    pub fn remove_tab(&mut self, tab_id: i64) -> Option<TabStub> {
        let removed = self.tabs.remove(&tab_id);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    pub fn clear_tabs(&mut self) {
        self.tabs.clear();
        self.touch();
    }

    pub fn get_tab(&self, tab_id: i64) -> Option<&TabStub> {
        self.tabs.get(&tab_id)
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    /// Tabs in ascending `index` order (ties broken by tab id).
    pub fn get_tabs(&self) -> Vec<&TabStub> {
        let mut tabs: Vec<&TabStub> = self.tabs.values().collect();
        tabs.sort_by_key(|t| (t.index, t.id));
        tabs
    }

    /// Replaces all tabs, then renumbers indexes to `0..n` in current order.
    pub fn set_tabs(&mut self, tabs: Vec<TabStub>) {
        self.tabs.clear();
        for stub in tabs {
            self.insert_tab(stub);
        }
        self.normalize_indexes();
        self.touch();
    }

    /// Replaces all tabs from a live window snapshot.
    pub fn set_browser_tabs(&mut self, tabs: &[BrowserTab]) {
        self.set_tabs(tabs.iter().map(TabStub::from_tab).collect());
    }

    fn normalize_indexes(&mut self) {
        let order: Vec<i64> = self.get_tabs().iter().map(|t| t.id).collect();
        for (position, id) in order.into_iter().enumerate() {
            if let Some(tab) = self.tabs.get_mut(&id) {
                tab.index = position as i64;
            }
        }
    }

    // --- tab groups ---

    pub fn add_tab_group(&mut self, group: TabGroupStub) {
        self.tab_groups.insert(group.id, group);
        self.touch();
    }

    pub fn remove_tab_group(&mut self, group_id: i64) -> Option<TabGroupStub> {
        let removed = self.tab_groups.remove(&group_id);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    pub fn set_tab_groups(&mut self, groups: Vec<TabGroupStub>) {
        self.tab_groups = groups.into_iter().map(|g| (g.id, g)).collect();
        self.touch();
    }

    pub fn get_tab_group(&self, group_id: i64) -> Option<&TabGroupStub> {
        self.tab_groups.get(&group_id)
    }

    /// Tab groups sorted by id so serialized output is stable.
    pub fn get_tab_groups(&self) -> Vec<&TabGroupStub> {
        let mut groups: Vec<&TabGroupStub> = self.tab_groups.values().collect();
        groups.sort_by_key(|g| g.id);
        groups
    }

    // --- serialization ---

    /// Tabs in canonical order with indexes renumbered to `0..n`.
    pub fn normalized_tabs(&self) -> Vec<TabStub> {
        self.get_tabs()
            .into_iter()
            .enumerate()
            .map(|(position, tab)| TabStub {
                index: position as i64,
                ..tab.clone()
            })
            .collect()
    }

    pub fn to_record(&self) -> WorkspaceRecord {
        WorkspaceRecord {
            id: self.window_id,
            name: self.name.clone(),
            uuid: self.uuid.clone(),
            tabs: self.normalized_tabs(),
            tab_groups: self.get_tab_groups().into_iter().cloned().collect(),
            last_updated: self.last_updated,
        }
    }

    /// Rebuilds a workspace from its record, keeping the stored timestamp.
    pub fn from_record(record: WorkspaceRecord) -> Result<Self, WorkspaceError> {
        if record.uuid.trim().is_empty() {
            return Err(WorkspaceError::InvalidArgument(
                "workspace record has an empty uuid".to_string(),
            ));
        }

        let mut workspace = Self {
            uuid: record.uuid,
            window_id: record.id,
            name: record.name,
            tabs: HashMap::new(),
            tab_groups: HashMap::new(),
            last_updated: None,
        };
        for stub in record.tabs {
            workspace.insert_tab(stub);
        }
        for group in record.tab_groups {
            workspace.tab_groups.insert(group.id, group);
        }
        workspace.last_updated = record.last_updated;
        Ok(workspace)
    }

    pub fn to_json(&self) -> Result<serde_json::Value, WorkspaceError> {
        serde_json::to_value(self.to_record())
            .map_err(|e| WorkspaceError::SerializationError(e.to_string()))
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self, WorkspaceError> {
        let record = WorkspaceRecord::deserialize(value).map_err(|e| {
            WorkspaceError::InvalidArgument(format!("malformed workspace: {}", e))
        })?;
        Self::from_record(record)
    }

    pub fn serialize(&self) -> Result<String, WorkspaceError> {
        serde_json::to_string(&self.to_record())
            .map_err(|e| WorkspaceError::SerializationError(e.to_string()))
    }

    pub fn deserialize(data: &str) -> Result<Self, WorkspaceError> {
        let record: WorkspaceRecord = serde_json::from_str(data).map_err(|e| {
            WorkspaceError::InvalidArgument(format!("malformed workspace: {}", e))
        })?;
        Self::from_record(record)
    }
}
