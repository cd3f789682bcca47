//! Integration test: sled-backed persistence and dashboard rehydration.
//!
//! ## Scenario
//! 1. Install a few widgets into a dashboard backed by a sled store in a temp dir.
//! 2. Drop the dashboard and the store, reopen the same directory.
//! 3. Rehydrate and confirm the same ids come back in the same order, placed
//!    row-major, with properties reset to the configured defaults.

use std::sync::Arc;
use voxgrid_core::{
    CoreConfig, Dashboard, MemorySlotStore, PersistenceBridge, SledSlotStore, SlotStore,
    TracingNotifier, WidgetDefinition, WidgetId,
};

fn sled_dashboard(dir: &std::path::Path) -> Dashboard {
    let store = SledSlotStore::open_path(dir).unwrap();
    Dashboard::new(CoreConfig::default(), Arc::new(store), Arc::new(TracingNotifier))
}

#[test]
fn foo_widget_scenario() {
    let mut dash = Dashboard::new(
        CoreConfig::default(),
        Arc::new(MemorySlotStore::new()),
        Arc::new(TracingNotifier),
    );
    let id = dash
        .install("w1".into(), "const FooWidget = () => render('Foo')")
        .unwrap();
    assert_eq!(id.as_str(), "w1");

    let listed: Vec<_> = dash.registry().list().map(|(id, _, _)| id.clone()).collect();
    assert_eq!(listed, vec![WidgetId::from("w1")]);
    assert_eq!(dash.layout().render_content(&id).unwrap().text_content(), "Foo");

    assert!(dash.remove_widget(&id));
    assert!(!dash.remove_widget(&id));
    assert_eq!(dash.registry().list().count(), 0);
    assert!(dash.layout().is_empty());
}

#[test]
fn widgets_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let ids: Vec<WidgetId> = {
        let mut dash = sled_dashboard(dir.path());
        (0..4)
            .map(|i| {
                dash.install(
                    format!("W{}", i).into(),
                    &format!("const Tile{}Widget = ({{ city }}) => text(city, {})", i, i),
                )
                .unwrap()
            })
            .collect()
    };

    let mut dash = sled_dashboard(dir.path());
    assert_eq!(dash.rehydrate(), 4);
    let restored: Vec<WidgetId> = dash.registry().list().map(|(id, _, _)| id.clone()).collect();
    assert_eq!(restored, ids);

    let positions: Vec<(i64, i64)> = ids
        .iter()
        .map(|id| {
            let c = dash.layout().cell(id).unwrap();
            (c.x, c.y)
        })
        .collect();
    assert_eq!(positions, vec![(0, 0), (4, 0), (8, 0), (0, 4)]);

    let (_, props) = dash.registry().get(&ids[2]).unwrap();
    assert_eq!(props["city"], "San Francisco");
    assert_eq!(
        dash.layout().render_content(&ids[2]).unwrap().text_content(),
        "San Francisco 2"
    );
}

#[test]
fn rehydration_skips_broken_entries() {
    let store: Arc<dyn SlotStore> = Arc::new(MemorySlotStore::new());
    PersistenceBridge::new(store.clone(), "dashboard-widgets")
        .save(&[
            WidgetDefinition::new("good".into(), "const GoodWidget = () => 'ok'", Default::default()),
            WidgetDefinition::new("bad".into(), "const nothing = 1", Default::default()),
            WidgetDefinition::new("late".into(), "const LateWidget = () => 'late'", Default::default()),
        ])
        .unwrap();

    let mut dash = Dashboard::new(CoreConfig::default(), store, Arc::new(TracingNotifier));
    assert_eq!(dash.rehydrate(), 2);
    let ids: Vec<_> = dash.registry().list().map(|(id, _, _)| id.to_string()).collect();
    assert_eq!(ids, vec!["good", "late"]);
    // placement follows registry order, not stored order
    assert_eq!(dash.layout().cell(&"late".into()).unwrap().x, 4);
}

#[test]
fn malformed_sled_slot_loads_empty_and_is_cleared() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = SledSlotStore::open_path(dir.path()).unwrap();
        store.write("dashboard-widgets", b"[{\"id\": 3}]").unwrap();
    }
    let store = Arc::new(SledSlotStore::open_path(dir.path()).unwrap());
    let bridge = PersistenceBridge::new(store.clone(), "dashboard-widgets");
    assert!(bridge.load().is_empty());
    assert!(store.read("dashboard-widgets").unwrap().is_none());
}

#[test]
fn removal_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut dash = sled_dashboard(dir.path());
        dash.install("keep".into(), "const KeepWidget = () => 'k'").unwrap();
        dash.install("drop".into(), "const DropWidget = () => 'd'").unwrap();
        dash.remove_widget(&"drop".into());
    }
    let mut dash = sled_dashboard(dir.path());
    dash.rehydrate();
    assert!(dash.registry().contains(&"keep".into()));
    assert!(!dash.registry().contains(&"drop".into()));
}
