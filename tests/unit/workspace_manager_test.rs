//! Unit tests for the WorkspaceManager coordinator.
//!
//! Two managers sharing one sync backend stand in for two devices signed in
//! to the same account.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tabspace::database::{MemoryStorageArea, StorageArea};
use tabspace::managers::workspace_manager::{
    WindowSource, WorkspaceManager, WorkspaceManagerTrait, LOCAL_WORKSPACES_KEY,
};
use tabspace::managers::workspace::now_millis;
use tabspace::services::sync_workspace_storage::metadata_key;
use tabspace::types::errors::{StorageError, SyncError};
use tabspace::types::settings::{SyncQuota, SyncSettings};
use tabspace::types::tab::{BrowserTab, BrowserTabGroup};

#[derive(Default)]
struct FakeWindows {
    tabs: HashMap<i64, Vec<BrowserTab>>,
    groups: HashMap<i64, Vec<BrowserTabGroup>>,
}

impl FakeWindows {
    fn with_window(mut self, window_id: i64, urls: &[&str]) -> Self {
        let tabs = urls
            .iter()
            .enumerate()
            .map(|(i, url)| BrowserTab {
                id: window_id * 100 + i as i64,
                index: i as i64,
                window_id,
                url: Some(url.to_string()),
                ..Default::default()
            })
            .collect();
        self.tabs.insert(window_id, tabs);
        self.groups.insert(
            window_id,
            vec![BrowserTabGroup {
                id: window_id,
                window_id,
                color: "grey".to_string(),
                ..Default::default()
            }],
        );
        self
    }
}

impl WindowSource for FakeWindows {
    fn get_tabs_from_window(&self, window_id: i64) -> Vec<BrowserTab> {
        self.tabs.get(&window_id).cloned().unwrap_or_default()
    }

    fn get_tab_groups_from_window(&self, window_id: i64) -> Vec<BrowserTabGroup> {
        self.groups.get(&window_id).cloned().unwrap_or_default()
    }
}

struct Device {
    local: Arc<MemoryStorageArea>,
    manager: WorkspaceManager,
}

fn device(sync: &Arc<MemoryStorageArea>) -> Device {
    let local = Arc::new(MemoryStorageArea::new());
    let manager = WorkspaceManager::new(local.clone(), sync.clone(), SyncSettings::default());
    Device { local, manager }
}

fn sync_backend() -> Arc<MemoryStorageArea> {
    Arc::new(MemoryStorageArea::with_quota(SyncSettings::default().quota))
}

#[test]
fn test_create_persists_locally_and_to_sync() {
    let sync = sync_backend();
    let mut a = device(&sync);
    let windows =
        FakeWindows::default().with_window(1, &["https://a.example", "https://b.example"]);

    let uuid = a.manager.create_workspace(1, "Work", &windows).unwrap();

    let local = a.local.get(&[LOCAL_WORKSPACES_KEY.to_string()]).unwrap();
    let Some(Value::String(doc)) = local.get(LOCAL_WORKSPACES_KEY) else {
        panic!("local store should hold the serialized collection");
    };
    assert!(doc.contains(&uuid));
    assert!(sync.get_all().unwrap().contains_key(&metadata_key(&uuid)));

    let ws = a.manager.get_workspace(1.into()).unwrap();
    assert_eq!(ws.uuid(), uuid);
    assert_eq!(ws.tab_count(), 2);
    assert_eq!(ws.get_tab_groups().len(), 1);
}

#[test]
fn test_load_restores_from_local_storage() {
    let sync = sync_backend();
    let local = Arc::new(MemoryStorageArea::new());
    let windows = FakeWindows::default().with_window(3, &["https://a.example"]);

    let uuid = {
        let mut first = WorkspaceManager::new(local.clone(), sync.clone(), SyncSettings::default());
        first.create_workspace(3, "Saved", &windows).unwrap()
    };

    let mut second = WorkspaceManager::new(local, sync, SyncSettings::default());
    assert_eq!(second.load().unwrap(), 1);
    assert_eq!(second.get_workspace(uuid.as_str().into()).unwrap().name(), "Saved");
    assert!(second.get_workspace(3.into()).is_some());
}

#[test]
fn test_load_without_local_data_is_empty() {
    let sync = sync_backend();
    let mut a = device(&sync);
    assert_eq!(a.manager.load().unwrap(), 0);
    assert!(a.manager.list_workspaces().is_empty());
}

#[test]
fn test_list_workspaces_sorted_by_name() {
    let sync = sync_backend();
    let mut a = device(&sync);
    let windows = FakeWindows::default()
        .with_window(1, &["https://1.example"])
        .with_window(2, &["https://2.example"])
        .with_window(3, &["https://3.example"]);

    a.manager.create_workspace(1, "Zeta", &windows).unwrap();
    a.manager.create_workspace(2, "Alpha", &windows).unwrap();
    a.manager.create_workspace(3, "Mid", &windows).unwrap();

    let names: Vec<&str> = a.manager.list_workspaces().iter().map(|w| w.name()).collect();
    assert_eq!(names, vec!["Alpha", "Mid", "Zeta"]);
}

#[test]
fn test_open_workspace_rebinds_window() {
    let sync = sync_backend();
    let mut a = device(&sync);
    let windows = FakeWindows::default().with_window(1, &["https://a.example"]);
    let uuid = a.manager.create_workspace(1, "Work", &windows).unwrap();

    assert!(a.manager.open_workspace(&uuid, 9).unwrap());
    assert!(a.manager.get_workspace(1.into()).is_none());
    assert_eq!(a.manager.get_workspace(9.into()).unwrap().uuid(), uuid);
    assert!(!a.manager.open_workspace("missing", 10).unwrap());
}

#[test]
fn test_second_device_picks_up_workspace_on_sync() {
    let sync = sync_backend();
    let mut a = device(&sync);
    let mut b = device(&sync);
    let windows = FakeWindows::default().with_window(1, &["https://a.example"]);
    let uuid = a.manager.create_workspace(1, "Shared", &windows).unwrap();

    assert_eq!(b.manager.sync().unwrap(), 1);

    let ws = b.manager.get_workspace(uuid.as_str().into()).unwrap();
    assert_eq!(ws.name(), "Shared");
    assert_eq!(ws.tab_count(), 1);
    let local = b.local.get(&[LOCAL_WORKSPACES_KEY.to_string()]).unwrap();
    assert!(local.contains_key(LOCAL_WORKSPACES_KEY));
}

#[test]
fn test_deletion_propagates_through_tombstone() {
    let sync = sync_backend();
    let mut a = device(&sync);
    let mut b = device(&sync);
    let windows = FakeWindows::default().with_window(1, &["https://a.example"]);
    let uuid = a.manager.create_workspace(1, "Doomed", &windows).unwrap();
    b.manager.sync().unwrap();

    assert!(a.manager.delete_workspace(&uuid).unwrap());
    assert!(!a.manager.delete_workspace(&uuid).unwrap());
    assert!(!sync.get_all().unwrap().contains_key(&metadata_key(&uuid)));
    assert!(a.manager.tombstones().load().unwrap().contains_key(&uuid));

    assert_eq!(b.manager.sync().unwrap(), 0);
    assert!(b.manager.get_workspace(uuid.as_str().into()).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_edit_after_delete_resurrects_and_clears_tombstone() {
    let sync = sync_backend();
    let mut a = device(&sync);
    let mut b = device(&sync);
    let windows = FakeWindows::default().with_window(1, &["https://a.example"]);
    let uuid = a.manager.create_workspace(1, "Phoenix", &windows).unwrap();
    b.manager.sync().unwrap();

    a.manager.delete_workspace(&uuid).unwrap();
    std::thread::sleep(Duration::from_millis(5));
    assert!(b.manager.rename_workspace(&uuid, "Phoenix 2").unwrap());

    assert_eq!(b.manager.sync().unwrap(), 1);
    assert!(!b.manager.tombstones().load().unwrap().contains_key(&uuid));

    a.manager.sync().unwrap();
    assert_eq!(
        a.manager.get_workspace(uuid.as_str().into()).unwrap().name(),
        "Phoenix 2"
    );
}

#[tokio::test(start_paused = true)]
async fn test_rename_is_pushed_after_quiet_period() {
    let sync = sync_backend();
    let mut a = device(&sync);
    let windows = FakeWindows::default().with_window(1, &["https://a.example"]);
    let uuid = a.manager.create_workspace(1, "Before", &windows).unwrap();

    assert!(a.manager.rename_workspace(&uuid, "After").unwrap());
    assert!(!a.manager.rename_workspace("missing", "x").unwrap());

    let in_sync = |name: &str| {
        a.manager
            .sync_storage()
            .load_workspace_from_sync(&uuid)
            .unwrap()
            .is_some_and(|w| w.name() == name)
    };
    assert!(in_sync("Before"));

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(in_sync("After"));
}

#[tokio::test(start_paused = true)]
async fn test_update_from_window_replaces_tabs() {
    let sync = sync_backend();
    let mut a = device(&sync);
    let before = FakeWindows::default().with_window(1, &["https://a.example"]);
    let uuid = a.manager.create_workspace(1, "Live", &before).unwrap();

    let after = FakeWindows::default().with_window(
        1,
        &["https://a.example", "https://b.example", "https://c.example"],
    );
    assert!(a.manager.update_workspace_from_window(1, &after).unwrap());
    assert!(!a.manager.update_workspace_from_window(2, &after).unwrap());
    assert_eq!(a.manager.get_workspace(1.into()).unwrap().tab_count(), 3);

    tokio::time::sleep(Duration::from_secs(61)).await;
    let synced = a
        .manager
        .sync_storage()
        .load_workspace_from_sync(&uuid)
        .unwrap()
        .unwrap();
    assert_eq!(synced.tab_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_delete_supersedes_pending_save() {
    let sync = sync_backend();
    let mut a = device(&sync);
    let windows = FakeWindows::default().with_window(1, &["https://a.example"]);
    let uuid = a.manager.create_workspace(1, "Short-lived", &windows).unwrap();

    a.manager.rename_workspace(&uuid, "Renamed").unwrap();
    a.manager.delete_workspace(&uuid).unwrap();

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(!sync.get_all().unwrap().contains_key(&metadata_key(&uuid)));
}

#[tokio::test(start_paused = true)]
async fn test_remote_delete_cancels_pending_save() {
    let sync = sync_backend();
    let mut a = device(&sync);
    let mut b = device(&sync);
    let windows = FakeWindows::default().with_window(1, &["https://a.example"]);
    let uuid = a.manager.create_workspace(1, "Contested", &windows).unwrap();
    b.manager.sync().unwrap();

    a.manager.rename_workspace(&uuid, "Renamed on A").unwrap();
    std::thread::sleep(Duration::from_millis(5));
    b.manager.delete_workspace(&uuid).unwrap();

    a.manager.sync().unwrap();
    assert!(a.manager.get_workspace(uuid.as_str().into()).is_none());

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(!sync.get_all().unwrap().contains_key(&metadata_key(&uuid)));
}

#[test]
fn test_delete_survives_a_large_tombstone_set() {
    let sync = Arc::new(MemoryStorageArea::with_quota(SyncQuota {
        max_write_operations_per_minute: 10_000,
        max_write_operations_per_hour: 10_000,
        ..SyncQuota::default()
    }));
    let mut a = device(&sync);
    let mut b = device(&sync);
    let now = now_millis();
    for i in 0..400 {
        a.manager
            .tombstones()
            .add(&format!("00000000-0000-4000-8000-{:012}", i), now)
            .unwrap();
    }

    let windows = FakeWindows::default().with_window(1, &["https://a.example"]);
    let uuid = a.manager.create_workspace(1, "Crowded", &windows).unwrap();
    b.manager.sync().unwrap();

    assert!(a.manager.delete_workspace(&uuid).unwrap());
    assert_eq!(a.manager.tombstones().load().unwrap().len(), 401);

    b.manager.sync().unwrap();
    a.manager.sync().unwrap();
    assert!(b.manager.get_workspace(uuid.as_str().into()).is_none());
    assert!(a.manager.get_workspace(uuid.as_str().into()).is_none());
}

#[test]
fn test_failed_tombstone_write_keeps_workspace() {
    let sync = Arc::new(MemoryStorageArea::with_quota(SyncQuota {
        max_write_operations_per_minute: 20,
        ..SyncQuota::default()
    }));
    let mut a = device(&sync);
    let windows = FakeWindows::default().with_window(1, &["https://a.example"]);
    let uuid = a.manager.create_workspace(1, "Kept", &windows).unwrap();
    while sync.set(HashMap::from([("filler".to_string(), Value::Null)])).is_ok() {}

    let err = a.manager.delete_workspace(&uuid).unwrap_err();

    assert!(matches!(
        err,
        SyncError::Storage(StorageError::RateLimited(_))
    ));
    assert!(a.manager.get_workspace(uuid.as_str().into()).is_some());
    assert!(sync.get_all().unwrap().contains_key(&metadata_key(&uuid)));
    assert_eq!(a.manager.load().unwrap(), 1);
}

#[test]
fn test_clear_workspace_data_leaves_no_tombstones() {
    let sync = sync_backend();
    let mut a = device(&sync);
    let windows = FakeWindows::default()
        .with_window(1, &["https://a.example"])
        .with_window(2, &["https://b.example"]);
    a.manager.create_workspace(1, "One", &windows).unwrap();
    a.manager.create_workspace(2, "Two", &windows).unwrap();

    a.manager.clear_workspace_data().unwrap();

    assert!(a.manager.list_workspaces().is_empty());
    assert!(sync.get_all().unwrap().is_empty());
    assert!(a.manager.tombstones().load().unwrap().is_empty());
    assert_eq!(a.manager.load().unwrap(), 0);
}

#[test]
fn test_sync_prunes_expired_tombstones() {
    let sync = sync_backend();
    let mut a = device(&sync);
    a.manager.tombstones().add("ancient", 1).unwrap();

    a.manager.sync().unwrap();

    assert!(a.manager.tombstones().load().unwrap().is_empty());
}
