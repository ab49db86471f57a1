//! Tabspace storage layer.
//!
//! Provides SQLite connection management, schema migrations and the
//! key-value storage areas the workspace core reads and writes.
//!
//! # Usage
//!
//! ```no_run
//! use tabspace::database::{SqliteStorageArea, StorageArea};
//!
//! let local = SqliteStorageArea::open("tabspace.db").expect("failed to open database");
//! let all = local.get_all().expect("failed to read storage");
//! ```

pub mod connection;
pub mod migrations;
pub mod storage_area;

pub use connection::Database;
pub use storage_area::{MemoryStorageArea, SqliteStorageArea, StorageArea};
