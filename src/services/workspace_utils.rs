//! Reconciliation of the local and sync workspace stores.
//!
//! Last-write-wins on `last_updated`, with deletion tombstones. Both returned
//! stores hold the same merged set of workspaces; they are separate values
//! because callers persist them to different backends.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info};

use crate::managers::workspace::Workspace;
use crate::managers::workspace_storage::WorkspaceStorage;
use crate::types::sync::Tombstone;

/// How a single uuid was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Tombstone applies: dropped from both stores.
    Deleted,
    /// Local copy edited after the tombstone: kept.
    Resurrected,
    /// Only the local store had it.
    LocalOnly,
    /// Only the sync store had it.
    SyncOnly,
    /// Both had it; the local copy was newer or tied.
    LocalWins,
    /// Both had it; the sync copy was strictly newer.
    SyncWins,
}

/// Classifies one uuid. Returns the resolution and the surviving copy, if any.
pub fn resolve<'a>(
    local: Option<&'a Workspace>,
    sync: Option<&'a Workspace>,
    tombstone: Option<&Tombstone>,
) -> (Resolution, Option<&'a Workspace>) {
    if let Some(tombstone) = tombstone {
        return match local.and_then(|ws| ws.last_updated()) {
            Some(updated) if updated > tombstone.timestamp => (Resolution::Resurrected, local),
            _ => (Resolution::Deleted, None),
        };
    }

    match (local, sync) {
        (Some(l), None) => (Resolution::LocalOnly, Some(l)),
        (None, Some(s)) => (Resolution::SyncOnly, Some(s)),
        (Some(l), Some(s)) => {
            // Missing timestamps compare as oldest; ties keep the local copy.
            if s.last_updated() > l.last_updated() {
                (Resolution::SyncWins, Some(s))
            } else {
                (Resolution::LocalWins, Some(l))
            }
        }
        (None, None) => (Resolution::Deleted, None),
    }
}

/// Merges the local and sync stores under the given tombstones.
pub fn sync_workspaces(
    local: &WorkspaceStorage,
    sync: &WorkspaceStorage,
    tombstones: &HashMap<String, Tombstone>,
) -> (WorkspaceStorage, WorkspaceStorage) {
    let uuids: BTreeSet<&str> = local
        .keys()
        .chain(sync.keys())
        .chain(tombstones.keys().map(String::as_str))
        .collect();

    let mut merged = WorkspaceStorage::new();
    for uuid in uuids {
        let (resolution, survivor) =
            resolve(local.get(uuid), sync.get(uuid), tombstones.get(uuid));
        match resolution {
            Resolution::Deleted => debug!(uuid, "Workspace deleted by tombstone"),
            Resolution::Resurrected => {
                info!(uuid, "Workspace edited after deletion; keeping local copy")
            }
            other => debug!(uuid, resolution = ?other, "Workspace reconciled"),
        }
        if let Some(workspace) = survivor {
            merged.insert(workspace.clone());
        }
    }

    (merged.clone(), merged)
}
