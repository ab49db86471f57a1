//! Property-based tests for Workspace and WorkspaceStorage serialization.
//!
//! A workspace read back from its serialized form keeps its uuid, name,
//! window id and tab set; the storage keeps both lookup keys working.

use std::collections::BTreeMap;

use proptest::prelude::*;
use tabspace::managers::workspace::{Workspace, WorkspaceInit};
use tabspace::managers::workspace_storage::WorkspaceStorage;
use tabspace::services::sync_workspace_storage::SyncWorkspaceStorage;
use tabspace::types::tab::TabStub;

fn arb_tabs() -> impl Strategy<Value = Vec<TabStub>> {
    prop::collection::btree_map(0i64..500, (0i64..1000, "[a-z]{1,20}"), 0..25).prop_map(
        |entries: BTreeMap<i64, (i64, String)>| {
            entries
                .into_iter()
                .map(|(id, (index, host))| TabStub {
                    id,
                    index,
                    url: format!("https://{}.example/", host),
                    title: host,
                    window_id: 1,
                    ..Default::default()
                })
                .collect()
        },
    )
}

fn arb_workspace() -> impl Strategy<Value = Workspace> {
    ("[A-Za-z0-9 ]{0,30}", 0i64..10_000, arb_tabs()).prop_map(|(name, window_id, tabs)| {
        Workspace::new(WorkspaceInit {
            window_id,
            name,
            tab_stubs: Some(tabs),
            ..Default::default()
        })
    })
}

fn tab_set(ws: &Workspace) -> Vec<(i64, String, i64)> {
    ws.get_tabs()
        .iter()
        .map(|t| (t.id, t.url.clone(), t.index))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn workspace_serialize_roundtrip(ws in arb_workspace()) {
        let back = Workspace::deserialize(&ws.serialize().unwrap()).unwrap();
        prop_assert_eq!(back.uuid(), ws.uuid());
        prop_assert_eq!(back.name(), ws.name());
        prop_assert_eq!(back.window_id(), ws.window_id());
        prop_assert_eq!(tab_set(&back), tab_set(&ws));
    }

    #[test]
    fn get_tabs_indexes_are_contiguous(ws in arb_workspace()) {
        let indexes: Vec<i64> = ws.get_tabs().iter().map(|t| t.index).collect();
        let expected: Vec<i64> = (0..indexes.len() as i64).collect();
        prop_assert_eq!(indexes, expected);
    }

    #[test]
    fn sync_data_roundtrip(ws in arb_workspace()) {
        let data = SyncWorkspaceStorage::convert_workspace_to_sync_data(&ws);
        let back = SyncWorkspaceStorage::convert_sync_data_to_workspace(data).unwrap();
        prop_assert_eq!(back, ws);
    }

    #[test]
    fn storage_set_get_delete(workspaces in prop::collection::vec(arb_workspace(), 1..8)) {
        let mut storage = WorkspaceStorage::new();
        for (i, ws) in workspaces.iter().enumerate() {
            storage.set(i as i64, ws.clone());
        }
        for (i, ws) in workspaces.iter().enumerate() {
            prop_assert_eq!(storage.get(ws.uuid()).unwrap().uuid(), ws.uuid());
            prop_assert_eq!(storage.get(i as i64).unwrap().uuid(), ws.uuid());
        }

        let back = WorkspaceStorage::deserialize(&storage.serialize().unwrap()).unwrap();
        prop_assert_eq!(&back, &storage);

        for (i, ws) in workspaces.iter().enumerate() {
            prop_assert!(storage.delete(ws.uuid()));
            prop_assert!(storage.get(ws.uuid()).is_none());
            prop_assert!(storage.get(i as i64).is_none());
        }
        prop_assert!(storage.is_empty());
    }
}
