// Tabspace services
// Services provide the sync machinery: chunking, debounced saves, sync storage, tombstones, reconciliation and settings.

pub mod chunk_util;
pub mod debouncer;
pub mod settings_engine;
pub mod sync_workspace_storage;
pub mod tombstones;
pub mod workspace_utils;
