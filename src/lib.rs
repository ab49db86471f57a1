//! Tabspace: named browser workspaces kept in sync across devices.
//!
//! This library crate exposes all modules for use by the binary and integration tests.

pub mod database;
pub mod managers;
pub mod platform;
pub mod services;
pub mod types;
