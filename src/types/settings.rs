use serde::{Deserialize, Serialize};

/// Top-level settings for workspace synchronization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncSettings {
    /// Quiet period before a debounced sync save fires.
    pub debounce_secs: u64,
    pub quota: SyncQuota,
    /// Bytes kept free in every tab chunk for the storage key and JSON array framing.
    pub chunk_headroom_bytes: usize,
    /// Tombstones older than this are dropped after a sync.
    pub tombstone_retention_days: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            debounce_secs: 60,
            quota: SyncQuota::default(),
            chunk_headroom_bytes: 256,
            tombstone_retention_days: 30,
        }
    }
}

impl SyncSettings {
    /// Largest serialized payload a single tab chunk may carry for the given key.
    pub fn chunk_budget(&self, key: &str) -> usize {
        self.quota
            .quota_bytes_per_item
            .saturating_sub(key.len() + self.chunk_headroom_bytes)
    }
}

/// Limits advertised by the sync storage backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncQuota {
    pub quota_bytes_per_item: usize,
    pub max_write_operations_per_minute: u32,
    pub max_write_operations_per_hour: u32,
}

impl Default for SyncQuota {
    fn default() -> Self {
        Self {
            quota_bytes_per_item: 8192,
            max_write_operations_per_minute: 120,
            max_write_operations_per_hour: 1800,
        }
    }
}
