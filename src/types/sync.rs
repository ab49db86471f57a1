use serde::{Deserialize, Serialize};

use super::tab::{TabGroupStub, TabStub};

/// Small per-workspace record stored under `workspace_metadata_<uuid>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    pub uuid: String,
    pub name: String,
    pub window_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<i64>,
    /// Number of `workspace_tabs_<uuid>_<n>` chunks written by the last save.
    /// Absent in records written before chunk counts were tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_chunks: Option<usize>,
}

/// One workspace as laid out in the sync backend, before chunking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncData {
    pub metadata: SyncMetadata,
    pub tabs: Vec<TabStub>,
    pub tab_groups: Vec<TabGroupStub>,
}

/// Marks workspace `uuid` as deleted as of `timestamp` (ms since epoch).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tombstone {
    pub uuid: String,
    pub timestamp: i64,
}
