use std::error::Error;

use tabspace::types::errors::*;

// === WorkspaceError Tests ===

#[test]
fn workspace_error_display_variants() {
    assert_eq!(
        WorkspaceError::InvalidArgument("no tab given".to_string()).to_string(),
        "Invalid argument: no tab given"
    );
    assert_eq!(
        WorkspaceError::SerializationError("bad utf-8".to_string()).to_string(),
        "Workspace serialization error: bad utf-8"
    );
}

#[test]
fn workspace_error_implements_error_trait() {
    let err: Box<dyn Error> = Box::new(WorkspaceError::InvalidArgument("x".to_string()));
    assert!(err.source().is_none());
}

// === StorageError Tests ===

#[test]
fn storage_error_display_variants() {
    assert_eq!(
        StorageError::QuotaExceeded {
            key: "workspace_tabs_a_0".to_string(),
            bytes: 9000,
            quota: 8192,
        }
        .to_string(),
        "Quota exceeded for workspace_tabs_a_0: 9000 bytes (limit 8192)"
    );
    assert_eq!(
        StorageError::RateLimited("more than 120 writes per minute".to_string()).to_string(),
        "Storage rate limited: more than 120 writes per minute"
    );
    assert_eq!(
        StorageError::DatabaseError("disk I/O error".to_string()).to_string(),
        "Storage database error: disk I/O error"
    );
    assert_eq!(
        StorageError::SerializationError("expected value".to_string()).to_string(),
        "Storage serialization error: expected value"
    );
    assert_eq!(StorageError::LockPoisoned.to_string(), "Storage lock poisoned");
}

// === SyncError Tests ===

#[test]
fn sync_error_display_variants() {
    assert_eq!(
        SyncError::InvalidArgument("malformed record".to_string()).to_string(),
        "Invalid sync data: malformed record"
    );
    assert_eq!(
        SyncError::SerializationError("recursion limit".to_string()).to_string(),
        "Sync serialization error: recursion limit"
    );
    assert_eq!(
        SyncError::Storage(StorageError::LockPoisoned).to_string(),
        "Sync storage error: Storage lock poisoned"
    );
}

#[test]
fn sync_error_exposes_storage_source() {
    let err = SyncError::from(StorageError::RateLimited("busy".to_string()));
    let source = err.source().expect("storage errors carry a source");
    assert_eq!(source.to_string(), "Storage rate limited: busy");

    let err = SyncError::InvalidArgument("x".to_string());
    assert!(err.source().is_none());
}

#[test]
fn sync_error_from_workspace_error_keeps_kind() {
    let err: SyncError = WorkspaceError::InvalidArgument("empty uuid".to_string()).into();
    assert!(matches!(err, SyncError::InvalidArgument(ref m) if m == "empty uuid"));

    let err: SyncError = WorkspaceError::SerializationError("nan".to_string()).into();
    assert!(matches!(err, SyncError::SerializationError(_)));
}

// === SettingsError Tests ===

#[test]
fn settings_error_display_variants() {
    assert_eq!(
        SettingsError::IoError("permission denied".to_string()).to_string(),
        "Settings I/O error: permission denied"
    );
    assert_eq!(
        SettingsError::SerializationError("trailing comma".to_string()).to_string(),
        "Settings serialization error: trailing comma"
    );
    assert_eq!(
        SettingsError::InvalidKey("quota.nope".to_string()).to_string(),
        "Invalid settings key: quota.nope"
    );
    assert_eq!(
        SettingsError::InvalidValue("expected u64".to_string()).to_string(),
        "Invalid settings value: expected u64"
    );
}
