use std::fmt;

// === WorkspaceError ===

/// Errors raised by workspace and workspace-collection operations.
#[derive(Debug)]
pub enum WorkspaceError {
    /// The caller supplied an invalid combination of arguments or a malformed document.
    InvalidArgument(String),
    /// Failed to serialize or deserialize workspace data.
    SerializationError(String),
}

impl fmt::Display for WorkspaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkspaceError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            WorkspaceError::SerializationError(msg) => {
                write!(f, "Workspace serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for WorkspaceError {}

// === StorageError ===

/// Errors reported by a key-value storage backend.
#[derive(Debug)]
pub enum StorageError {
    /// A single item is larger than the backend's per-item quota.
    QuotaExceeded {
        key: String,
        bytes: usize,
        quota: usize,
    },
    /// The backend's write budget for the current window is spent.
    RateLimited(String),
    /// Database operation failed.
    DatabaseError(String),
    /// A stored value could not be encoded or decoded.
    SerializationError(String),
    /// The backend's internal lock was poisoned by a panicking writer.
    LockPoisoned,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::QuotaExceeded { key, bytes, quota } => write!(
                f,
                "Quota exceeded for {}: {} bytes (limit {})",
                key, bytes, quota
            ),
            StorageError::RateLimited(msg) => write!(f, "Storage rate limited: {}", msg),
            StorageError::DatabaseError(msg) => write!(f, "Storage database error: {}", msg),
            StorageError::SerializationError(msg) => {
                write!(f, "Storage serialization error: {}", msg)
            }
            StorageError::LockPoisoned => write!(f, "Storage lock poisoned"),
        }
    }
}

impl std::error::Error for StorageError {}

// === SyncError ===

/// Errors related to moving workspaces between the local and sync backends.
#[derive(Debug)]
pub enum SyncError {
    /// A sync record or argument was malformed.
    InvalidArgument(String),
    /// The underlying storage backend rejected the operation.
    Storage(StorageError),
    /// Failed to serialize or deserialize sync data.
    SerializationError(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::InvalidArgument(msg) => write!(f, "Invalid sync data: {}", msg),
            SyncError::Storage(err) => write!(f, "Sync storage error: {}", err),
            SyncError::SerializationError(msg) => {
                write!(f, "Sync serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for SyncError {
    fn from(err: StorageError) -> Self {
        SyncError::Storage(err)
    }
}

impl From<WorkspaceError> for SyncError {
    fn from(err: WorkspaceError) -> Self {
        match err {
            WorkspaceError::InvalidArgument(msg) => SyncError::InvalidArgument(msg),
            WorkspaceError::SerializationError(msg) => SyncError::SerializationError(msg),
        }
    }
}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    IoError(String),
    /// Failed to serialize or deserialize settings.
    SerializationError(String),
    /// The provided settings key is invalid.
    InvalidKey(String),
    /// The provided settings value is invalid.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::IoError(msg) => write!(f, "Settings I/O error: {}", msg),
            SettingsError::SerializationError(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::InvalidKey(key) => write!(f, "Invalid settings key: {}", key),
            SettingsError::InvalidValue(msg) => {
                write!(f, "Invalid settings value: {}", msg)
            }
        }
    }
}

impl std::error::Error for SettingsError {}
