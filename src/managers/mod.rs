// Tabspace state managers
// Managers hold stateful workspace data: single workspaces, the dual-indexed collection and the coordinator.

pub mod workspace;
pub mod workspace_manager;
pub mod workspace_storage;
