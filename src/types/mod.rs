// Tabspace shared type definitions
// Each submodule defines plain data shared by the managers and services.

pub mod errors;
pub mod settings;
pub mod sync;
pub mod tab;
