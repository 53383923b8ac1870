#![allow(dead_code)]

use std::{path::Path, sync::Arc};

use junction_areas_lib::{
    capture::CommitOutcome,
    config::{AppConfig, StoreBackend},
    models::{SignalId, VideoSourceSet},
    persistence::AreaStore,
    AppState,
};

pub fn config_in(dir: &Path) -> AppConfig {
    AppConfig {
        junction: "Junction 1 - Main Street".into(),
        data_dir: dir.to_path_buf(),
        store: StoreBackend::Sqlite {
            path: dir.join("areas.sqlite3"),
        },
        store_timeout: None,
        debug: false,
    }
}

pub fn dashboard(dir: &Path, store: Arc<dyn AreaStore>) -> AppState {
    AppState::with_store(config_in(dir), store).unwrap()
}

pub fn all_sources() -> VideoSourceSet {
    VideoSourceSet::new()
        .with(SignalId::A, "rtsp://10.0.0.11/north")
        .with(SignalId::B, "rtsp://10.0.0.12/east")
        .with(SignalId::C, "/videos/south.mp4")
        .with(SignalId::D, "/videos/west.mp4")
}

/// A 40x30 rectangle anchored at `(offset, offset)`.
pub fn rectangle(offset: f64) -> [(f64, f64); 4] {
    [
        (offset, offset),
        (offset + 40.0, offset),
        (offset + 40.0, offset + 30.0),
        (offset, offset + 30.0),
    ]
}

/// Draws and commits one rectangle per signal, offset so each differs.
pub async fn capture_all(state: &AppState) -> CommitOutcome {
    state.areas.start().await.unwrap();
    let mut last = None;
    for i in 0..4 {
        for (x, y) in rectangle(10.0 + i as f64 * 60.0) {
            state.areas.add_point(x, y).await.unwrap();
        }
        last = Some(state.areas.commit_current().await.unwrap());
    }
    last.unwrap()
}
