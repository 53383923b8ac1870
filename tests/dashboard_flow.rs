mod common;

use std::sync::Arc;

use common::{all_sources, capture_all, dashboard, rectangle};
use junction_areas_lib::{
    capture::{
        commands::{add_area_point, cancel_area_selection, save_area, start_area_selection},
        CaptureStatus, CommitOutcome,
    },
    events::DashboardEvent,
    models::{Point, SignalId, VideoSourceSet},
    persistence::{MemoryAreaStore, PersistError},
    system::commands::{configure_video_sources, start_system, stop_system},
};
use serde_json::json;

#[tokio::test]
async fn drawing_requires_all_sources() {
    let dir = tempfile::tempdir().unwrap();
    let state = dashboard(dir.path(), Arc::new(MemoryAreaStore::new()));

    configure_video_sources(&state, all_sources().with(SignalId::C, "   "))
        .await
        .unwrap();

    let err = start_area_selection(&state).await.unwrap_err();
    assert!(err.starts_with("Please configure all 4 video sources before drawing areas"));
    assert!(err.contains("missing: C"));
    assert_eq!(state.areas.snapshot().await.status, CaptureStatus::Idle);
}

#[tokio::test]
async fn full_session_saves_and_logs_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryAreaStore::new());
    let state = dashboard(dir.path(), store.clone());
    let mut events = state.events.subscribe();

    configure_video_sources(&state, all_sources()).await.unwrap();
    let outcome = capture_all(&state).await;
    assert!(matches!(outcome, CommitOutcome::Complete { .. }));
    assert_eq!(state.areas.wait_for_pending_save().await, Some(Ok(())));

    assert_eq!(
        state.events.lines(),
        vec![
            "[INFO] Dashboard opened for Junction 1 - Main Street",
            "[INFO] Video sources configured successfully",
            "[INFO] Starting area selection process",
            "[INFO] Area saved for Signal A",
            "[INFO] Area saved for Signal B",
            "[INFO] Area saved for Signal C",
            "[INFO] Area saved for Signal D",
            "[INFO] All areas collected successfully",
            "[INFO] Areas saved to backend successfully",
        ]
    );

    assert_eq!(events.recv().await.unwrap(), DashboardEvent::VideoSourcesConfigured);
    assert_eq!(events.recv().await.unwrap(), DashboardEvent::AreaSelectionStarted);

    assert_eq!(
        store.raw().unwrap()[3],
        json!([[190, 190], [230, 190], [230, 220], [190, 220]])
    );
    assert_eq!(store.videos().unwrap(), all_sources());
}

#[tokio::test]
async fn fractional_clicks_are_quantized_and_a_fifth_click_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let state = dashboard(dir.path(), Arc::new(MemoryAreaStore::new()));
    configure_video_sources(&state, all_sources()).await.unwrap();
    start_area_selection(&state).await.unwrap();

    assert!(add_area_point(&state, f64::NAN, 1.0).await.is_err());
    for (x, y) in [(0.4, 0.5), (10.5, 0.2), (10.49, 9.6), (0.0, 10.0)] {
        add_area_point(&state, x, y).await.unwrap();
    }
    add_area_point(&state, 300.0, 300.0).await.unwrap();

    let snapshot = state.areas.snapshot().await;
    assert_eq!(
        snapshot.points,
        vec![
            Point::new(0, 1),
            Point::new(11, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ]
    );
    assert!(snapshot.can_save);
}

#[tokio::test]
async fn save_with_fewer_than_four_points_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let state = dashboard(dir.path(), Arc::new(MemoryAreaStore::new()));
    configure_video_sources(&state, all_sources()).await.unwrap();
    start_area_selection(&state).await.unwrap();

    for (x, y) in rectangle(0.0).into_iter().take(3) {
        add_area_point(&state, x, y).await.unwrap();
    }
    let err = save_area(&state).await.unwrap_err();
    assert!(err.contains("3 placed"));
    assert_eq!(state.areas.snapshot().await.signal, Some(SignalId::A));
}

#[tokio::test]
async fn failed_save_keeps_areas_usable_for_start() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryAreaStore::new());
    store.fail_saves_with(Some(PersistError::Transport("connection refused".into())));
    let state = dashboard(dir.path(), store.clone());

    configure_video_sources(&state, all_sources()).await.unwrap();
    capture_all(&state).await;
    assert!(matches!(
        state.areas.wait_for_pending_save().await,
        Some(Err(PersistError::Transport(_)))
    ));

    assert!(state.events.lines().last().unwrap().starts_with("[ERROR] Failed to save areas to backend"));
    assert!(state.system.can_start().await);
    start_system(&state).await.unwrap();
    stop_system(&state).await.unwrap();
}

#[tokio::test]
async fn cancel_then_restart_begins_at_signal_a() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryAreaStore::new());
    let state = dashboard(dir.path(), store.clone());
    configure_video_sources(&state, all_sources()).await.unwrap();

    start_area_selection(&state).await.unwrap();
    for (x, y) in rectangle(0.0) {
        add_area_point(&state, x, y).await.unwrap();
    }
    save_area(&state).await.unwrap();
    cancel_area_selection(&state).await.unwrap();

    assert_eq!(state.areas.snapshot().await.status, CaptureStatus::Cancelled);
    assert_eq!(state.areas.active_areas().await, None);
    assert_eq!(store.save_count(), 0);
    assert_eq!(
        state.events.lines().last().unwrap(),
        "[INFO] Area selection cancelled"
    );

    let snapshot = start_area_selection(&state).await.unwrap();
    assert_eq!(snapshot.signal, Some(SignalId::A));
    assert!(snapshot.committed.is_empty());
}

#[tokio::test]
async fn sources_survive_a_dashboard_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let state = dashboard(dir.path(), Arc::new(MemoryAreaStore::new()));
        configure_video_sources(&state, all_sources()).await.unwrap();
    }

    let reopened = dashboard(dir.path(), Arc::new(MemoryAreaStore::new()));
    assert_eq!(reopened.sources.snapshot(), all_sources());
    assert_ne!(reopened.sources.snapshot(), VideoSourceSet::new());
}
