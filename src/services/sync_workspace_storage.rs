//! Sync Workspace Storage for Tabspace.
//!
//! Persists workspaces to the quota-constrained sync backend. Each workspace
//! is spread over several keys so no single item exceeds the backend's
//! per-item byte quota:
//!
//! - `workspace_metadata_<uuid>`: uuid, name, window id, timestamp, chunk count
//! - `workspace_tabs_<uuid>_<n>`: the n-th chunk of serialized tabs
//! - `workspace_tab_groups_<uuid>`: all serialized tab groups
//!
//! A save writes the tab chunks and tab groups first and the metadata last.
//! The metadata's chunk count therefore never claims chunks that were not
//! written. There is no transaction, so a reader racing a save can still see
//! new chunks under old metadata.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::database::storage_area::StorageArea;
use crate::managers::workspace::{Workspace, WorkspaceRecord};
use crate::managers::workspace_storage::WorkspaceStorage;
use crate::services::chunk_util::{chunk_array, unchunk_array};
use crate::services::debouncer::Debouncer;
use crate::types::errors::SyncError;
use crate::types::settings::SyncSettings;
use crate::types::sync::{SyncData, SyncMetadata};
use crate::types::tab::{TabGroupStub, TabStub};

pub const METADATA_PREFIX: &str = "workspace_metadata_";
pub const TABS_PREFIX: &str = "workspace_tabs_";
pub const TAB_GROUPS_PREFIX: &str = "workspace_tab_groups_";

pub fn metadata_key(uuid: &str) -> String {
    format!("{}{}", METADATA_PREFIX, uuid)
}

pub fn tabs_key(uuid: &str, chunk: usize) -> String {
    format!("{}{}_{}", TABS_PREFIX, uuid, chunk)
}

pub fn tab_groups_key(uuid: &str) -> String {
    format!("{}{}", TAB_GROUPS_PREFIX, uuid)
}

/// Debounce id shared by all saves of one workspace.
pub fn debounce_id(uuid: &str) -> String {
    format!("save_workspace_to_sync_{}", uuid)
}

fn is_workspace_key(key: &str) -> bool {
    key.starts_with(METADATA_PREFIX)
        || key.starts_with(TABS_PREFIX)
        || key.starts_with(TAB_GROUPS_PREFIX)
}

fn decode<T: DeserializeOwned>(key: &str, value: &Value) -> Result<T, SyncError> {
    serde_json::from_value(value.clone())
        .map_err(|e| SyncError::InvalidArgument(format!("malformed record {}: {}", key, e)))
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value, SyncError> {
    serde_json::to_value(value).map_err(|e| SyncError::SerializationError(e.to_string()))
}

#[derive(Clone)]
pub struct SyncWorkspaceStorage {
    backend: Arc<dyn StorageArea>,
    settings: SyncSettings,
    debouncer: Debouncer,
    /// Chunk count of the last save or load per uuid, used to prune leftovers.
    chunk_counts: Arc<Mutex<HashMap<String, usize>>>,
}

impl SyncWorkspaceStorage {
    pub fn new(backend: Arc<dyn StorageArea>, settings: SyncSettings) -> Self {
        let debouncer = Debouncer::new(Duration::from_secs(settings.debounce_secs));
        Self {
            backend,
            settings,
            debouncer,
            chunk_counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn backend(&self) -> &Arc<dyn StorageArea> {
        &self.backend
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    // --- conversion ---

    pub fn convert_workspace_to_sync_data(workspace: &Workspace) -> SyncData {
        SyncData {
            metadata: SyncMetadata {
                uuid: workspace.uuid().to_string(),
                name: workspace.name().to_string(),
                window_id: workspace.window_id(),
                last_updated: workspace.last_updated(),
                tab_chunks: None,
            },
            tabs: workspace.normalized_tabs(),
            tab_groups: workspace.get_tab_groups().into_iter().cloned().collect(),
        }
    }

    pub fn convert_sync_data_to_workspace(data: SyncData) -> Result<Workspace, SyncError> {
        let record = WorkspaceRecord {
            id: data.metadata.window_id,
            name: data.metadata.name,
            uuid: data.metadata.uuid,
            tabs: data.tabs,
            tab_groups: data.tab_groups,
            last_updated: data.metadata.last_updated,
        };
        Ok(Workspace::from_record(record)?)
    }

    // --- chunk bookkeeping ---

    fn remembered_chunks(&self, uuid: &str) -> Option<usize> {
        self.chunk_counts
            .lock()
            .ok()
            .and_then(|counts| counts.get(uuid).copied())
    }

    fn remember_chunks(&self, uuid: &str, count: usize) {
        if let Ok(mut counts) = self.chunk_counts.lock() {
            counts.insert(uuid.to_string(), count);
        }
    }

    fn forget_chunks(&self, uuid: &str) {
        if let Ok(mut counts) = self.chunk_counts.lock() {
            counts.remove(uuid);
        }
    }

    /// Chunk count of the previous save, from memory or the stored metadata.
    fn previous_chunk_count(&self, uuid: &str) -> Result<usize, SyncError> {
        if let Some(count) = self.remembered_chunks(uuid) {
            return Ok(count);
        }
        let key = metadata_key(uuid);
        let stored = self.backend.get(&[key.clone()])?;
        let metadata = match stored.get(&key) {
            Some(value) => decode::<SyncMetadata>(&key, value)?,
            None => return Ok(0),
        };
        match metadata.tab_chunks {
            Some(count) => Ok(count),
            None => Ok(self.scan_chunk_keys(uuid)?.len()),
        }
    }

    /// Every `workspace_tabs_<uuid>_<n>` key currently in the backend.
    fn scan_chunk_keys(&self, uuid: &str) -> Result<Vec<String>, SyncError> {
        let prefix = format!("{}{}_", TABS_PREFIX, uuid);
        Ok(self
            .backend
            .get_all()?
            .into_keys()
            .filter(|k| k.starts_with(&prefix))
            .collect())
    }

    // --- writes ---

    /// Writes tab chunks, tab groups and then metadata, and prunes chunks left
    /// over from a previous, larger save. Returns the number of tab chunks.
    pub fn save_workspace_to_sync(&self, workspace: &Workspace) -> Result<usize, SyncError> {
        let mut data = Self::convert_workspace_to_sync_data(workspace);
        let uuid = data.metadata.uuid.clone();

        let budget = self
            .settings
            .chunk_budget(&tabs_key(&uuid, data.tabs.len()));
        let chunks = chunk_array(&data.tabs, budget)?;
        let previous = self.previous_chunk_count(&uuid)?;
        data.metadata.tab_chunks = Some(chunks.len());
        // Until the metadata lands, every chunk key written so far may be live.
        self.remember_chunks(&uuid, previous.max(chunks.len()));

        if !chunks.is_empty() {
            let mut tab_items = HashMap::new();
            for (n, chunk) in chunks.iter().enumerate() {
                tab_items.insert(tabs_key(&uuid, n), encode(chunk)?);
            }
            self.backend.set(tab_items)?;
        }

        let mut group_items = HashMap::new();
        group_items.insert(tab_groups_key(&uuid), encode(&data.tab_groups)?);
        self.backend.set(group_items)?;

        let mut metadata = HashMap::new();
        metadata.insert(metadata_key(&uuid), encode(&data.metadata)?);
        self.backend.set(metadata)?;

        if previous > chunks.len() {
            let stale: Vec<String> = (chunks.len()..previous)
                .map(|n| tabs_key(&uuid, n))
                .collect();
            debug!(uuid = %uuid, count = stale.len(), "Pruning stale tab chunks");
            self.backend.remove(&stale)?;
        }

        self.remember_chunks(&uuid, chunks.len());
        info!(
            uuid = %uuid,
            tabs = data.tabs.len(),
            chunks = chunks.len(),
            "Saved workspace to sync"
        );
        Ok(chunks.len())
    }

    /// Schedules a save after the quiet period; later calls for the same
    /// workspace supersede earlier ones. Requires a tokio runtime.
    pub fn debounce_save_workspace_to_sync(&self, workspace: &Workspace) {
        let id = debounce_id(workspace.uuid());
        let storage = self.clone();
        let snapshot = workspace.clone();
        self.debouncer.schedule(&id, move || {
            if let Err(e) = storage.save_workspace_to_sync(&snapshot) {
                warn!(uuid = %snapshot.uuid(), error = %e, "Debounced sync save failed");
            }
        });
    }

    /// Removes every sync record of a workspace.
    pub fn delete_workspace_from_sync(&self, uuid: &str) -> Result<(), SyncError> {
        let mut keys = self.scan_chunk_keys(uuid)?;
        keys.push(metadata_key(uuid));
        keys.push(tab_groups_key(uuid));
        self.backend.remove(&keys)?;
        self.forget_chunks(uuid);
        debug!(uuid, "Deleted workspace from sync");
        Ok(())
    }

    /// Removes all workspace records, leaving unrelated keys (e.g. tombstones) alone.
    pub fn clear_sync_workspaces(&self) -> Result<(), SyncError> {
        let keys: Vec<String> = self
            .backend
            .get_all()?
            .into_keys()
            .filter(|k| is_workspace_key(k))
            .collect();
        if !keys.is_empty() {
            self.backend.remove(&keys)?;
        }
        if let Ok(mut counts) = self.chunk_counts.lock() {
            counts.clear();
        }
        Ok(())
    }

    // --- reads ---

    /// Assembles one workspace's sync data from already-fetched items.
    fn assemble(
        metadata: SyncMetadata,
        items: &HashMap<String, Value>,
    ) -> Result<SyncData, SyncError> {
        let uuid = metadata.uuid.clone();
        let mut chunks: Vec<Vec<TabStub>> = Vec::new();
        let mut n = 0;
        loop {
            if let Some(expected) = metadata.tab_chunks {
                if n >= expected {
                    break;
                }
            }
            let key = tabs_key(&uuid, n);
            match items.get(&key) {
                Some(value) => chunks.push(decode(&key, value)?),
                None => {
                    if metadata.tab_chunks.is_some() {
                        warn!(uuid = %uuid, chunk = n, "Missing tab chunk in sync storage");
                    }
                    break;
                }
            }
            n += 1;
        }

        let groups_key = tab_groups_key(&uuid);
        let tab_groups: Vec<TabGroupStub> = match items.get(&groups_key) {
            Some(value) => decode(&groups_key, value)?,
            None => Vec::new(),
        };

        Ok(SyncData {
            metadata,
            tabs: unchunk_array(chunks),
            tab_groups,
        })
    }

    /// Reads one workspace back from sync storage.
    pub fn load_workspace_from_sync(&self, uuid: &str) -> Result<Option<Workspace>, SyncError> {
        let key = metadata_key(uuid);
        let stored = self.backend.get(&[key.clone()])?;
        let metadata: SyncMetadata = match stored.get(&key) {
            Some(value) => decode(&key, value)?,
            None => return Ok(None),
        };

        let items = match metadata.tab_chunks {
            Some(count) => {
                let mut keys: Vec<String> = (0..count).map(|n| tabs_key(uuid, n)).collect();
                keys.push(tab_groups_key(uuid));
                self.backend.get(&keys)?
            }
            None => self.backend.get_all()?,
        };

        let data = Self::assemble(metadata, &items)?;
        if let Some(count) = data.metadata.tab_chunks {
            self.remember_chunks(uuid, count);
        }
        Ok(Some(Self::convert_sync_data_to_workspace(data)?))
    }

    /// Reads every workspace in sync storage. Records that fail to decode are
    /// skipped with a warning so one corrupt entry does not hide the rest.
    pub fn load_all_from_sync(&self) -> Result<WorkspaceStorage, SyncError> {
        let items = self.backend.get_all()?;
        let mut storage = WorkspaceStorage::new();

        for (key, value) in &items {
            if !key.starts_with(METADATA_PREFIX) {
                continue;
            }
            let loaded = decode::<SyncMetadata>(key, value)
                .and_then(|metadata| Self::assemble(metadata, &items))
                .and_then(|data| {
                    let chunks = data.metadata.tab_chunks;
                    Self::convert_sync_data_to_workspace(data).map(|ws| (ws, chunks))
                });
            match loaded {
                Ok((workspace, chunks)) => {
                    if let Some(count) = chunks {
                        self.remember_chunks(workspace.uuid(), count);
                    }
                    storage.insert(workspace);
                }
                Err(e) => warn!(key = %key, error = %e, "Skipping unreadable sync record"),
            }
        }

        debug!(count = storage.len(), "Loaded workspaces from sync");
        Ok(storage)
    }
}
