//! Size-bounded chunking for quota-constrained storage.
//!
//! Sync storage rejects any single item above its per-item byte quota, so
//! long ordered sequences are split into chunks that are stored under
//! separate keys and concatenated again on read.

use serde::Serialize;

use crate::types::errors::SyncError;

/// Byte length of an item's serialized JSON form.
pub fn serialized_size<T: Serialize>(item: &T) -> Result<usize, SyncError> {
    serde_json::to_string(item)
        .map(|s| s.len())
        .map_err(|e| SyncError::SerializationError(e.to_string()))
}

/// Greedily packs `items` into chunks whose serialized sizes stay under `max_bytes`.
///
/// Before an item is appended, the current chunk is closed if
/// `current_size + item_size >= max_bytes`. Items are never split, so an item
/// that alone reaches `max_bytes` ends up in a chunk of its own. Order is
/// preserved and empty input produces no chunks.
pub fn chunk_array<T: Serialize + Clone>(
    items: &[T],
    max_bytes: usize,
) -> Result<Vec<Vec<T>>, SyncError> {
    let mut chunks = Vec::new();
    let mut current: Vec<T> = Vec::new();
    let mut current_size = 0usize;

    for item in items {
        let size = serialized_size(item)?;
        if !current.is_empty() && current_size + size >= max_bytes {
            chunks.push(std::mem::take(&mut current));
            current_size = 0;
        }
        current.push(item.clone());
        current_size += size;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    Ok(chunks)
}

/// Concatenates chunks back into one ordered sequence.
pub fn unchunk_array<T>(chunks: Vec<Vec<T>>) -> Vec<T> {
    chunks.into_iter().flatten().collect()
}
