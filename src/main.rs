//! Tabspace: named browser workspaces kept in sync across devices.
//!
//! Runs a console demo of two devices sharing one quota-limited sync area.
//! Log output goes to stderr and is controlled by `RUST_LOG`.

use std::sync::Arc;

use tabspace::database::{MemoryStorageArea, SqliteStorageArea, StorageArea};
use tabspace::managers::workspace_manager::{
    WindowSource, WorkspaceManager, WorkspaceManagerTrait,
};
use tabspace::platform;
use tabspace::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use tabspace::services::sync_workspace_storage::metadata_key;
use tabspace::types::tab::{BrowserTab, BrowserTabGroup};
use tracing_subscriber::EnvFilter;

/// Fake browser window with a fixed set of tabs.
struct DemoWindow {
    tabs: Vec<BrowserTab>,
    groups: Vec<BrowserTabGroup>,
}

impl DemoWindow {
    fn new(window_id: i64, urls: &[&str]) -> Self {
        let tabs = urls
            .iter()
            .enumerate()
            .map(|(i, url)| BrowserTab {
                id: 100 + i as i64,
                index: i as i64,
                window_id,
                url: Some(url.to_string()),
                title: Some(format!("Tab {}", i + 1)),
                active: i == 0,
                ..Default::default()
            })
            .collect();
        let groups = vec![BrowserTabGroup {
            id: 7,
            window_id,
            title: Some("Docs".to_string()),
            color: "blue".to_string(),
            collapsed: false,
        }];
        Self { tabs, groups }
    }
}

impl WindowSource for DemoWindow {
    fn get_tabs_from_window(&self, _window_id: i64) -> Vec<BrowserTab> {
        self.tabs.clone()
    }

    fn get_tab_groups_from_window(&self, _window_id: i64) -> Vec<BrowserTabGroup> {
        self.groups.clone()
    }
}

fn section(name: &str) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  📦 {}", name);
    println!("───────────────────────────────────────────────────────────────");
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    println!();
    println!("  Tabspace v{} (demo mode)", env!("CARGO_PKG_VERSION"));
    println!();

    section("Settings");
    let mut engine = SettingsEngine::new(None);
    let settings = match engine.load() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(error = %e, "Falling back to default settings");
            engine.get_settings().clone()
        }
    };
    println!("  Config path: {}", engine.get_config_path());
    println!("  Debounce: {}s", settings.debounce_secs);
    println!("  Quota per item: {} bytes", settings.quota.quota_bytes_per_item);
    println!();

    let sync: Arc<dyn StorageArea> = Arc::new(MemoryStorageArea::with_quota(settings.quota));
    let data_dir = platform::get_data_dir();
    std::fs::create_dir_all(&data_dir).expect("Failed to create data directory");
    let db_path = data_dir.join("demo.db");
    let local_a: Arc<dyn StorageArea> =
        Arc::new(SqliteStorageArea::open(&db_path).expect("Failed to open local storage"));
    println!("  Device A local store: {}", db_path.display());
    let local_b: Arc<dyn StorageArea> = Arc::new(MemoryStorageArea::new());

    let mut device_a = WorkspaceManager::new(local_a, sync.clone(), settings.clone());
    let mut device_b = WorkspaceManager::new(local_b, sync.clone(), settings);

    section("Device A: create");
    let urls: Vec<String> = (0..60)
        .map(|i| format!("https://docs.example.org/reference/chapter-{}/section-{}", i / 10, i))
        .collect();
    let url_refs: Vec<&str> = urls.iter().map(String::as_str).collect();
    let window = DemoWindow::new(1, &url_refs);
    let uuid = device_a
        .create_workspace(1, "Research", &window)
        .expect("Failed to create workspace");
    let key = metadata_key(&uuid);
    let chunks = sync
        .get(&[key.clone()])
        .expect("Failed to read sync metadata")
        .get(&key)
        .and_then(|metadata| metadata["tabChunks"].as_u64())
        .unwrap_or(0);
    println!(
        "  Created workspace {} with {} tabs in {} chunks",
        uuid,
        urls.len(),
        chunks
    );
    println!();

    section("Device B: sync");
    let count = device_b.sync().expect("Failed to sync device B");
    for ws in device_b.list_workspaces() {
        println!("  {} \"{}\": {} tabs", ws.uuid(), ws.name(), ws.tab_count());
    }
    println!("  Device B now has {} workspace(s)", count);
    println!();

    section("Device B: delete, Device A: sync");
    device_b.delete_workspace(&uuid).expect("Failed to delete workspace");
    let remaining = device_a.sync().expect("Failed to sync device A");
    println!("  Device A has {} workspace(s) after sync", remaining);
    println!(
        "  Tombstones in sync storage: {}",
        device_a.tombstones().load().map(|t| t.len()).unwrap_or(0)
    );
    println!();

    drop(device_a);
    let _ = std::fs::remove_file(&db_path);
    println!("  ✅ Demo finished");
}
