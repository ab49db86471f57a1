//! Deletion tombstones kept alongside the synced workspaces.
//!
//! Tombstones are chunked the same way tab lists are, one array of
//! `{uuid, timestamp}` records per `workspace_tombstones_<n>` item, so the
//! set can grow past the per-item quota. A single `{uuid: timestamp}` object
//! under [`TOMBSTONES_KEY`] is still read and is folded into the chunks on
//! the next write. Both live outside the workspace record keyspace.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::database::storage_area::StorageArea;
use crate::services::chunk_util::{chunk_array, unchunk_array};
use crate::types::errors::SyncError;
use crate::types::settings::SyncSettings;
use crate::types::sync::Tombstone;

pub const TOMBSTONES_KEY: &str = "workspace_tombstones";
pub const TOMBSTONE_CHUNK_PREFIX: &str = "workspace_tombstones_";

pub fn tombstone_chunk_key(chunk: usize) -> String {
    format!("{}{}", TOMBSTONE_CHUNK_PREFIX, chunk)
}

fn is_tombstone_key(key: &str) -> bool {
    key == TOMBSTONES_KEY || key.starts_with(TOMBSTONE_CHUNK_PREFIX)
}

fn malformed(key: &str, e: serde_json::Error) -> SyncError {
    SyncError::InvalidArgument(format!("malformed tombstones {}: {}", key, e))
}

/// Keeps the later timestamp when the same uuid shows up twice.
fn merge(into: &mut HashMap<String, Tombstone>, tombstone: Tombstone) {
    let entry = into
        .entry(tombstone.uuid.clone())
        .or_insert_with(|| tombstone.clone());
    entry.timestamp = entry.timestamp.max(tombstone.timestamp);
}

pub struct TombstoneStore {
    backend: Arc<dyn StorageArea>,
    settings: SyncSettings,
}

impl TombstoneStore {
    pub fn new(backend: Arc<dyn StorageArea>, settings: SyncSettings) -> Self {
        Self { backend, settings }
    }

    pub fn load(&self) -> Result<HashMap<String, Tombstone>, SyncError> {
        Ok(self.load_with_keys()?.0)
    }

    /// Tombstones plus every backend key they were read from.
    fn load_with_keys(&self) -> Result<(HashMap<String, Tombstone>, Vec<String>), SyncError> {
        let mut tombstones = HashMap::new();
        let mut keys = Vec::new();

        for (key, value) in self.backend.get_all()? {
            if !is_tombstone_key(&key) {
                continue;
            }
            if key == TOMBSTONES_KEY {
                let raw: HashMap<String, i64> =
                    serde_json::from_value(value).map_err(|e| malformed(&key, e))?;
                for (uuid, timestamp) in raw {
                    merge(&mut tombstones, Tombstone { uuid, timestamp });
                }
            } else {
                let chunk: Vec<Tombstone> =
                    serde_json::from_value(value).map_err(|e| malformed(&key, e))?;
                for tombstone in chunk {
                    merge(&mut tombstones, tombstone);
                }
            }
            keys.push(key);
        }

        Ok((tombstones, keys))
    }

    /// Rewrites the chunks, then drops keys the new layout no longer uses.
    fn store(
        &self,
        tombstones: &HashMap<String, Tombstone>,
        existing: &[String],
    ) -> Result<(), SyncError> {
        let mut sorted: Vec<Tombstone> = tombstones.values().cloned().collect();
        sorted.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.uuid.cmp(&b.uuid)));

        let budget = self
            .settings
            .chunk_budget(&tombstone_chunk_key(sorted.len()));
        let chunks = chunk_array(&sorted, budget)?;

        if !chunks.is_empty() {
            let mut items = HashMap::new();
            for (n, chunk) in chunks.iter().enumerate() {
                let value: Value = serde_json::to_value(chunk)
                    .map_err(|e| SyncError::SerializationError(e.to_string()))?;
                items.insert(tombstone_chunk_key(n), value);
            }
            self.backend.set(items)?;
        }

        let live: Vec<String> = (0..chunks.len()).map(tombstone_chunk_key).collect();
        let stale: Vec<String> = existing
            .iter()
            .filter(|key| !live.contains(key))
            .cloned()
            .collect();
        if !stale.is_empty() {
            self.backend.remove(&stale)?;
        }

        debug!(count = sorted.len(), chunks = chunks.len(), "Stored tombstones");
        Ok(())
    }

    /// Records a deletion. An existing, later tombstone for the same uuid is kept.
    pub fn add(&self, uuid: &str, timestamp: i64) -> Result<(), SyncError> {
        let (mut tombstones, keys) = self.load_with_keys()?;
        merge(
            &mut tombstones,
            Tombstone {
                uuid: uuid.to_string(),
                timestamp,
            },
        );
        self.store(&tombstones, &keys)
    }

    /// Drops tombstones for the given uuids. Returns how many were removed.
    pub fn remove(&self, uuids: &[String]) -> Result<usize, SyncError> {
        let (mut tombstones, keys) = self.load_with_keys()?;
        let before = tombstones.len();
        for uuid in uuids {
            tombstones.remove(uuid);
        }
        let removed = before - tombstones.len();
        if removed > 0 {
            self.store(&tombstones, &keys)?;
        }
        Ok(removed)
    }

    /// Drops tombstones older than `cutoff` (ms since epoch).
    pub fn prune(&self, cutoff: i64) -> Result<usize, SyncError> {
        let (mut tombstones, keys) = self.load_with_keys()?;
        let before = tombstones.len();
        tombstones.retain(|_, t| t.timestamp >= cutoff);
        let removed = before - tombstones.len();
        if removed > 0 {
            debug!(removed, "Pruned expired tombstones");
            self.store(&tombstones, &keys)?;
        }
        Ok(removed)
    }
}
