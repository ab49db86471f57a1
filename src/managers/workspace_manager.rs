//! Workspace Manager for Tabspace.
//!
//! Entry point for the message layer. Keeps the local workspace collection
//! in memory, mirrors every change into the local storage area, pushes
//! changes to sync storage (immediately on create, debounced on edits), and
//! reconciles both sides on demand.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::database::storage_area::StorageArea;
use crate::managers::workspace::{now_millis, Workspace};
use crate::managers::workspace_storage::{WorkspaceKey, WorkspaceStorage};
use crate::services::sync_workspace_storage::{debounce_id, SyncWorkspaceStorage};
use crate::services::tombstones::TombstoneStore;
use crate::services::workspace_utils::sync_workspaces;
use crate::types::errors::SyncError;
use crate::types::settings::SyncSettings;
use crate::types::tab::{BrowserTab, BrowserTabGroup, TabGroupStub};

/// Local storage key holding the serialized workspace collection.
pub const LOCAL_WORKSPACES_KEY: &str = "workspaces";

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Supplies live tab and tab-group snapshots for a browser window.
pub trait WindowSource {
    fn get_tabs_from_window(&self, window_id: i64) -> Vec<BrowserTab>;
    fn get_tab_groups_from_window(&self, window_id: i64) -> Vec<BrowserTabGroup>;
}

/// Trait defining the workspace operations exposed to the message layer.
pub trait WorkspaceManagerTrait {
    fn load(&mut self) -> Result<usize, SyncError>;
    fn sync(&mut self) -> Result<usize, SyncError>;
    fn create_workspace(
        &mut self,
        window_id: i64,
        name: &str,
        source: &dyn WindowSource,
    ) -> Result<String, SyncError>;
    fn open_workspace(&mut self, uuid: &str, window_id: i64) -> Result<bool, SyncError>;
    fn update_workspace_from_window(
        &mut self,
        window_id: i64,
        source: &dyn WindowSource,
    ) -> Result<bool, SyncError>;
    fn rename_workspace(&mut self, uuid: &str, name: &str) -> Result<bool, SyncError>;
    fn delete_workspace(&mut self, uuid: &str) -> Result<bool, SyncError>;
    fn clear_workspace_data(&mut self) -> Result<(), SyncError>;
    fn get_workspace(&self, key: WorkspaceKey) -> Option<&Workspace>;
    fn list_workspaces(&self) -> Vec<&Workspace>;
}

pub struct WorkspaceManager {
    local: Arc<dyn StorageArea>,
    sync_storage: SyncWorkspaceStorage,
    tombstones: TombstoneStore,
    workspaces: WorkspaceStorage,
}

impl WorkspaceManager {
    pub fn new(
        local: Arc<dyn StorageArea>,
        sync: Arc<dyn StorageArea>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            local,
            tombstones: TombstoneStore::new(sync.clone(), settings.clone()),
            sync_storage: SyncWorkspaceStorage::new(sync, settings),
            workspaces: WorkspaceStorage::new(),
        }
    }

    pub fn workspaces(&self) -> &WorkspaceStorage {
        &self.workspaces
    }

    pub fn sync_storage(&self) -> &SyncWorkspaceStorage {
        &self.sync_storage
    }

    pub fn tombstones(&self) -> &TombstoneStore {
        &self.tombstones
    }

    /// Reads the collection from local storage. Accepts the serialized
    /// string form as well as a plain JSON object.
    fn read_local(&self) -> Result<WorkspaceStorage, SyncError> {
        let key = LOCAL_WORKSPACES_KEY.to_string();
        let stored = self.local.get(&[key.clone()])?;
        let storage = match stored.get(&key) {
            Some(Value::String(data)) => WorkspaceStorage::deserialize(data)?,
            Some(value) => WorkspaceStorage::from_json(value)?,
            None => WorkspaceStorage::new(),
        };
        Ok(storage)
    }

    fn persist_local(&self) -> Result<(), SyncError> {
        let data = self.workspaces.serialize()?;
        self.local.set(HashMap::from([(
            LOCAL_WORKSPACES_KEY.to_string(),
            Value::String(data),
        )]))?;
        Ok(())
    }

    /// Replaces any pending debounced save so it can no longer write the workspace back.
    fn supersede_pending_save(&self, uuid: &str) {
        let id = debounce_id(uuid);
        if self.sync_storage.debouncer().is_pending(&id) {
            self.sync_storage.debouncer().schedule(&id, || {});
        }
    }
}

impl WorkspaceManagerTrait for WorkspaceManager {
    fn load(&mut self) -> Result<usize, SyncError> {
        self.workspaces = self.read_local()?;
        Ok(self.workspaces.len())
    }

    /// Reconciles local and sync storage and writes the merged state to both.
    fn sync(&mut self) -> Result<usize, SyncError> {
        let local = self.read_local()?;
        let remote = self.sync_storage.load_all_from_sync()?;
        let tombstones = self.tombstones.load()?;

        let (merged_local, merged_sync) = sync_workspaces(&local, &remote, &tombstones);

        for uuid in local.keys().chain(remote.keys()) {
            if !merged_sync.has(uuid) {
                self.supersede_pending_save(uuid);
            }
        }

        self.workspaces = merged_local;
        self.persist_local()?;

        for workspace in merged_sync.values() {
            let unchanged = remote
                .get(workspace.uuid())
                .is_some_and(|r| r.to_record() == workspace.to_record());
            if !unchanged {
                self.sync_storage.save_workspace_to_sync(workspace)?;
            }
        }
        for uuid in remote.keys() {
            if !merged_sync.has(uuid) {
                self.sync_storage.delete_workspace_from_sync(uuid)?;
            }
        }

        let resurrected: Vec<String> = tombstones
            .keys()
            .filter(|uuid| merged_sync.has(uuid.as_str()))
            .cloned()
            .collect();
        if !resurrected.is_empty() {
            self.tombstones.remove(&resurrected)?;
        }

        let retention = self.sync_storage.settings().tombstone_retention_days as i64;
        self.tombstones
            .prune(now_millis() - retention * MILLIS_PER_DAY)?;

        info!(count = merged_sync.len(), "Workspaces synchronized");
        Ok(merged_sync.len())
    }

    fn create_workspace(
        &mut self,
        window_id: i64,
        name: &str,
        source: &dyn WindowSource,
    ) -> Result<String, SyncError> {
        let tabs = source.get_tabs_from_window(window_id);
        let groups = source.get_tab_groups_from_window(window_id);
        let workspace = Workspace::from_window(window_id, name, &tabs, &groups);
        let uuid = workspace.uuid().to_string();

        self.workspaces.set(window_id, workspace);
        self.persist_local()?;
        if let Some(workspace) = self.workspaces.get(uuid.as_str()) {
            self.sync_storage.save_workspace_to_sync(workspace)?;
        }

        info!(uuid = %uuid, window_id, tabs = tabs.len(), "Created workspace");
        Ok(uuid)
    }

    fn open_workspace(&mut self, uuid: &str, window_id: i64) -> Result<bool, SyncError> {
        if !self.workspaces.rebind_window(uuid, window_id) {
            return Ok(false);
        }
        self.persist_local()?;
        debug!(uuid, window_id, "Workspace bound to window");
        Ok(true)
    }

    fn update_workspace_from_window(
        &mut self,
        window_id: i64,
        source: &dyn WindowSource,
    ) -> Result<bool, SyncError> {
        let Some(workspace) = self.workspaces.get_mut(window_id) else {
            return Ok(false);
        };
        workspace.set_browser_tabs(&source.get_tabs_from_window(window_id));
        workspace.set_tab_groups(
            source
                .get_tab_groups_from_window(window_id)
                .iter()
                .map(TabGroupStub::from_tab_group)
                .collect(),
        );
        let snapshot = workspace.clone();

        self.persist_local()?;
        self.sync_storage.debounce_save_workspace_to_sync(&snapshot);
        Ok(true)
    }

    fn rename_workspace(&mut self, uuid: &str, name: &str) -> Result<bool, SyncError> {
        let Some(workspace) = self.workspaces.get_mut(uuid) else {
            return Ok(false);
        };
        workspace.update_name(name);
        let snapshot = workspace.clone();

        self.persist_local()?;
        self.sync_storage.debounce_save_workspace_to_sync(&snapshot);
        Ok(true)
    }

    /// Deletes locally and from sync, leaving a tombstone for other devices.
    /// The tombstone is written first; if that fails nothing is removed.
    fn delete_workspace(&mut self, uuid: &str) -> Result<bool, SyncError> {
        if !self.workspaces.has(uuid) {
            return Ok(false);
        }
        self.tombstones.add(uuid, now_millis())?;

        self.workspaces.delete(uuid);
        self.supersede_pending_save(uuid);
        self.persist_local()?;
        self.sync_storage.delete_workspace_from_sync(uuid)?;
        info!(uuid, "Deleted workspace");
        Ok(true)
    }

    /// Drops all workspace data on both sides without leaving tombstones.
    fn clear_workspace_data(&mut self) -> Result<(), SyncError> {
        let uuids: Vec<String> = self.workspaces.keys().map(str::to_string).collect();
        for uuid in &uuids {
            self.supersede_pending_save(uuid);
        }
        self.workspaces.clear();
        self.persist_local()?;
        self.sync_storage.clear_sync_workspaces()?;
        info!(count = uuids.len(), "Cleared workspace data");
        Ok(())
    }

    fn get_workspace(&self, key: WorkspaceKey) -> Option<&Workspace> {
        self.workspaces.get(key)
    }

    /// Workspaces sorted by name, then uuid.
    fn list_workspaces(&self) -> Vec<&Workspace> {
        let mut list: Vec<&Workspace> = self.workspaces.values().collect();
        list.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.uuid().cmp(b.uuid())));
        list
    }
}
