//! Key-value storage areas.
//!
//! The workspace core talks to its two backends (the per-device local store
//! and the account-wide sync store) through [`StorageArea`], a flat
//! string-keyed map of JSON values. Missing keys are simply absent from the
//! map returned by `get`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use rusqlite::{params, OptionalExtension};
use serde_json::Value;
use tracing::debug;

use super::connection::Database;
use crate::types::errors::StorageError;
use crate::types::settings::SyncQuota;

/// A flat key-value backend.
pub trait StorageArea: Send + Sync {
    fn get(&self, keys: &[String]) -> Result<HashMap<String, Value>, StorageError>;
    fn get_all(&self) -> Result<HashMap<String, Value>, StorageError>;
    fn set(&self, items: HashMap<String, Value>) -> Result<(), StorageError>;
    fn remove(&self, keys: &[String]) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// Size the sync backend charges for one item: key plus serialized value.
pub fn item_size(key: &str, value: &Value) -> Result<usize, StorageError> {
    let encoded = serde_json::to_string(value)
        .map_err(|e| StorageError::SerializationError(e.to_string()))?;
    Ok(key.len() + encoded.len())
}

// === SqliteStorageArea ===

/// Local per-device storage persisted in SQLite.
pub struct SqliteStorageArea {
    db: Mutex<Database>,
}

impl SqliteStorageArea {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = Database::open(path).map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        Ok(Self::new(db))
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let db = Database::open_in_memory()
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        Ok(Self::new(db))
    }

    fn decode(key: &str, raw: &str) -> Result<Value, StorageError> {
        serde_json::from_str(raw).map_err(|e| {
            StorageError::SerializationError(format!("Corrupt value for {}: {}", key, e))
        })
    }
}

impl StorageArea for SqliteStorageArea {
    fn get(&self, keys: &[String]) -> Result<HashMap<String, Value>, StorageError> {
        let db = self.db.lock().map_err(|_| StorageError::LockPoisoned)?;
        let conn = db.connection();
        let mut stmt = conn
            .prepare("SELECT value FROM kv_store WHERE key = ?1")
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        let mut result = HashMap::new();
        for key in keys {
            let raw: Option<String> = stmt
                .query_row(params![key], |row| row.get(0))
                .optional()
                .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
            if let Some(raw) = raw {
                result.insert(key.clone(), Self::decode(key, &raw)?);
            }
        }
        Ok(result)
    }

    fn get_all(&self) -> Result<HashMap<String, Value>, StorageError> {
        let db = self.db.lock().map_err(|_| StorageError::LockPoisoned)?;
        let conn = db.connection();
        let mut stmt = conn
            .prepare("SELECT key, value FROM kv_store")
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        let mut result = HashMap::new();
        for row in rows {
            let (key, raw) = row.map_err(|e| StorageError::DatabaseError(e.to_string()))?;
            let value = Self::decode(&key, &raw)?;
            result.insert(key, value);
        }
        Ok(result)
    }

    /// Writes all items in a single transaction.
    fn set(&self, items: HashMap<String, Value>) -> Result<(), StorageError> {
        let mut db = self.db.lock().map_err(|_| StorageError::LockPoisoned)?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;

        let tx = db
            .connection_mut()
            .transaction()
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        for (key, value) in &items {
            let encoded = serde_json::to_string(value)
                .map_err(|e| StorageError::SerializationError(e.to_string()))?;
            tx.execute(
                "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)",
                params![key, encoded, now],
            )
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        }
        tx.commit()
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    fn remove(&self, keys: &[String]) -> Result<(), StorageError> {
        let db = self.db.lock().map_err(|_| StorageError::LockPoisoned)?;
        for key in keys {
            db.connection()
                .execute("DELETE FROM kv_store WHERE key = ?1", params![key])
                .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let db = self.db.lock().map_err(|_| StorageError::LockPoisoned)?;
        db.connection()
            .execute("DELETE FROM kv_store", [])
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        Ok(())
    }
}

// === MemoryStorageArea ===

/// Fixed-window write counter.
struct WriteWindow {
    window_start: Instant,
    length: Duration,
    count: u32,
    max: u32,
}

impl WriteWindow {
    fn new(length: Duration, max: u32) -> Self {
        Self {
            window_start: Instant::now(),
            length,
            count: 0,
            max,
        }
    }

    fn roll(&mut self) {
        if self.window_start.elapsed() >= self.length {
            self.window_start = Instant::now();
            self.count = 0;
        }
    }

    fn has_room(&mut self) -> bool {
        self.roll();
        self.count < self.max
    }
}

struct MemoryState {
    items: HashMap<String, Value>,
    per_minute: Option<WriteWindow>,
    per_hour: Option<WriteWindow>,
    write_operations: u64,
}

/// In-memory storage. With a quota it behaves like the browser's sync area:
/// oversized items and writes beyond the per-minute/per-hour budgets are rejected.
pub struct MemoryStorageArea {
    state: Mutex<MemoryState>,
    quota: Option<SyncQuota>,
}

impl MemoryStorageArea {
    /// Unlimited store, suitable as a stand-in for local storage.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                items: HashMap::new(),
                per_minute: None,
                per_hour: None,
                write_operations: 0,
            }),
            quota: None,
        }
    }

    /// Quota-enforcing store, suitable as a stand-in for sync storage.
    pub fn with_quota(quota: SyncQuota) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                items: HashMap::new(),
                per_minute: Some(WriteWindow::new(
                    Duration::from_secs(60),
                    quota.max_write_operations_per_minute,
                )),
                per_hour: Some(WriteWindow::new(
                    Duration::from_secs(3600),
                    quota.max_write_operations_per_hour,
                )),
                write_operations: 0,
            }),
            quota: Some(quota),
        }
    }

    /// Number of accepted `set`/`remove`/`clear` calls so far.
    pub fn write_operations(&self) -> u64 {
        self.state.lock().map(|s| s.write_operations).unwrap_or(0)
    }

    fn begin_write(state: &mut MemoryState) -> Result<(), StorageError> {
        if let Some(window) = state.per_minute.as_mut() {
            if !window.has_room() {
                return Err(StorageError::RateLimited(format!(
                    "more than {} writes per minute",
                    window.max
                )));
            }
        }
        if let Some(window) = state.per_hour.as_mut() {
            if !window.has_room() {
                return Err(StorageError::RateLimited(format!(
                    "more than {} writes per hour",
                    window.max
                )));
            }
        }
        for window in [state.per_minute.as_mut(), state.per_hour.as_mut()]
            .into_iter()
            .flatten()
        {
            window.count += 1;
        }
        state.write_operations += 1;
        Ok(())
    }
}

impl Default for MemoryStorageArea {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageArea for MemoryStorageArea {
    fn get(&self, keys: &[String]) -> Result<HashMap<String, Value>, StorageError> {
        let state = self.state.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(keys
            .iter()
            .filter_map(|k| state.items.get(k).map(|v| (k.clone(), v.clone())))
            .collect())
    }

    fn get_all(&self) -> Result<HashMap<String, Value>, StorageError> {
        let state = self.state.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(state.items.clone())
    }

    /// Rejects the whole call if any item exceeds the per-item quota.
    fn set(&self, items: HashMap<String, Value>) -> Result<(), StorageError> {
        if let Some(quota) = self.quota {
            for (key, value) in &items {
                let bytes = item_size(key, value)?;
                if bytes > quota.quota_bytes_per_item {
                    return Err(StorageError::QuotaExceeded {
                        key: key.clone(),
                        bytes,
                        quota: quota.quota_bytes_per_item,
                    });
                }
            }
        }

        let mut state = self.state.lock().map_err(|_| StorageError::LockPoisoned)?;
        Self::begin_write(&mut state)?;
        debug!(count = items.len(), "Writing items to memory storage");
        state.items.extend(items);
        Ok(())
    }

    fn remove(&self, keys: &[String]) -> Result<(), StorageError> {
        let mut state = self.state.lock().map_err(|_| StorageError::LockPoisoned)?;
        Self::begin_write(&mut state)?;
        for key in keys {
            state.items.remove(key);
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut state = self.state.lock().map_err(|_| StorageError::LockPoisoned)?;
        Self::begin_write(&mut state)?;
        state.items.clear();
        Ok(())
    }
}
