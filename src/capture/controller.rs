use std::sync::Arc;

use serde::Serialize;
use tokio::{sync::Mutex, task::JoinHandle};
use uuid::Uuid;

use crate::{
    events::{DashboardEvent, EventBus},
    geometry::is_non_degenerate,
    models::{AreaSet, Point, SignalId, VideoSourceRegistry, AREA_VERTICES},
    persistence::{AreaGateway, LoadError, PersistError},
};

use super::{AddPointOutcome, CaptureError, CaptureState, CaptureStatus, CommitOutcome};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

type SaveTask = JoinHandle<Result<(), PersistError>>;

/// What the area-selection modal renders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSnapshot {
    pub status: CaptureStatus,
    pub signal: Option<SignalId>,
    pub points: Vec<Point>,
    pub progress: String,
    pub can_save: bool,
    pub can_reset: bool,
    pub committed: Vec<SignalId>,
    pub has_active_areas: bool,
}

/// Owns the capture session and the junction's active area set.
///
/// The active set changes in exactly two ways: a completed capture, or a
/// successful load. A failed save never takes it back.
#[derive(Clone)]
pub struct AreaSessionController {
    state: Arc<Mutex<CaptureState>>,
    active: Arc<Mutex<Option<AreaSet>>>,
    sources: VideoSourceRegistry,
    gateway: AreaGateway,
    events: EventBus,
    pending_save: Arc<Mutex<Option<SaveTask>>>,
}

impl AreaSessionController {
    pub fn new(sources: VideoSourceRegistry, gateway: AreaGateway, events: EventBus) -> Self {
        Self {
            state: Arc::new(Mutex::new(CaptureState::new())),
            active: Arc::new(Mutex::new(None)),
            sources,
            gateway,
            events,
            pending_save: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn snapshot(&self) -> CaptureSnapshot {
        let has_active_areas = self.active.lock().await.is_some();
        let state = self.state.lock().await;
        let placed = state.points().len();

        CaptureSnapshot {
            status: state.status(),
            signal: state.current_signal(),
            points: state.points().to_vec(),
            progress: format!("({placed}/{AREA_VERTICES} points)"),
            can_save: state.is_capturing() && placed == AREA_VERTICES,
            can_reset: state.is_capturing() && placed > 0,
            committed: state.committed_signals(),
            has_active_areas,
        }
    }

    pub async fn active_areas(&self) -> Option<AreaSet> {
        *self.active.lock().await
    }

    pub async fn start(&self) -> Result<CaptureSnapshot, CaptureError> {
        let missing = self.sources.snapshot().missing();
        if !missing.is_empty() {
            let err = CaptureError::PreconditionNotMet { missing };
            self.events.warn(err.to_string());
            return Err(err);
        }

        {
            let mut state = self.state.lock().await;
            state.start(Uuid::new_v4().to_string())?;
            log_info!(
                "Area capture session {} started",
                state.session_id().unwrap_or_default()
            );
        }

        self.events.emit(DashboardEvent::AreaSelectionStarted);
        Ok(self.snapshot().await)
    }

    pub async fn add_point(&self, x: f64, y: f64) -> Result<AddPointOutcome, CaptureError> {
        self.state.lock().await.add_point((x, y))
    }

    pub async fn reset_current(&self) -> Result<(), CaptureError> {
        self.state.lock().await.reset_current()
    }

    /// Saves the buffered quadrilateral for the current signal. The fourth
    /// commit adopts the full set locally and starts the background save.
    pub async fn commit_current(&self) -> Result<CommitOutcome, CaptureError> {
        let outcome = self.state.lock().await.commit_current()?;

        match &outcome {
            CommitOutcome::Advanced { captured, .. } => {
                self.events
                    .emit(DashboardEvent::AreaCaptured { signal: *captured });
            }
            CommitOutcome::Complete { captured, areas } => {
                self.events
                    .emit(DashboardEvent::AreaCaptured { signal: *captured });
                self.events.emit(DashboardEvent::AllAreasCollected);

                for (signal, area) in areas.iter() {
                    if !is_non_degenerate(area) {
                        self.events.warn(format!(
                            "Area for Signal {signal} encloses no area and will block system start"
                        ));
                    }
                }

                *self.active.lock().await = Some(*areas);
                self.spawn_save(*areas).await;
            }
        }

        Ok(outcome)
    }

    /// Abandons the running session; signals committed in it are discarded
    /// and the active area set is left alone.
    pub async fn cancel(&self) -> Result<(), CaptureError> {
        self.state.lock().await.cancel()?;
        self.events.emit(DashboardEvent::AreaSelectionCancelled);
        Ok(())
    }

    /// Drops a running session without announcing it, used when the operator
    /// navigates away. Returns whether there was one.
    pub async fn abandon(&self) -> bool {
        let mut state = self.state.lock().await;
        if !state.is_capturing() {
            return false;
        }
        let dropped = state.cancel().is_ok();
        if dropped {
            log_info!("Area capture session abandoned");
        }
        dropped
    }

    /// Replaces the active area set with the stored one. On failure the
    /// active set is untouched.
    pub async fn load(&self) -> Result<AreaSet, LoadError> {
        match self.gateway.load().await {
            Ok(areas) => {
                *self.active.lock().await = Some(areas);
                self.events.emit(DashboardEvent::AreaSetLoaded);
                Ok(areas)
            }
            Err(err) => {
                self.events.emit(DashboardEvent::AreaSetLoadFailed {
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Waits for the most recent background save, if any, and returns its
    /// outcome. The outcome has already been published as an event.
    pub async fn wait_for_pending_save(&self) -> Option<Result<(), PersistError>> {
        let handle = self.pending_save.lock().await.take()?;
        Some(join_save(handle).await)
    }

    async fn spawn_save(&self, areas: AreaSet) {
        let videos = self.sources.snapshot();
        let gateway = self.gateway.clone();
        let events = self.events.clone();

        let mut slot = self.pending_save.lock().await;
        // Saves are never cancelled; a newer one waits for the older one so
        // the store ends up with the latest set.
        let previous = slot.take();

        let handle = tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = join_save(previous).await;
            }

            let result = gateway.save(&areas, &videos).await;
            match &result {
                Ok(()) => events.emit(DashboardEvent::AreaSetSaved),
                Err(err) => {
                    log_warn!("Keeping locally captured areas after failed save");
                    events.emit(DashboardEvent::AreaSetSaveFailed {
                        reason: err.to_string(),
                    });
                }
            }
            result
        });

        *slot = Some(handle);
    }
}

async fn join_save(handle: SaveTask) -> Result<(), PersistError> {
    handle
        .await
        .unwrap_or_else(|err| Err(PersistError::Store(format!("save task failed: {err}"))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::VideoSourceSet,
        persistence::{AreaStore, MemoryAreaStore},
    };

    fn configured_sources() -> VideoSourceRegistry {
        VideoSourceRegistry::new(
            VideoSourceSet::new()
                .with(SignalId::A, "cam1")
                .with(SignalId::B, "cam2")
                .with(SignalId::C, "cam3")
                .with(SignalId::D, "cam4"),
        )
    }

    fn controller_with(
        sources: VideoSourceRegistry,
        store: Arc<MemoryAreaStore>,
    ) -> (AreaSessionController, EventBus) {
        let events = EventBus::new();
        let store: Arc<dyn AreaStore> = store;
        let controller =
            AreaSessionController::new(sources, AreaGateway::new(store), events.clone());
        (controller, events)
    }

    async fn capture_signal(controller: &AreaSessionController, offset: f64) -> CommitOutcome {
        for (x, y) in [(0.0, 0.0), (40.0, 0.0), (40.0, 30.0), (0.0, 30.0)] {
            controller.add_point(x + offset, y + offset).await.unwrap();
        }
        controller.commit_current().await.unwrap()
    }

    #[tokio::test]
    async fn start_refuses_without_all_sources() {
        let sources = VideoSourceRegistry::new(VideoSourceSet::new().with(SignalId::A, "cam1"));
        let (controller, events) = controller_with(sources, Arc::new(MemoryAreaStore::new()));

        let err = controller.start().await.unwrap_err();
        assert!(matches!(err, CaptureError::PreconditionNotMet { ref missing } if missing.len() == 3));
        assert_eq!(controller.snapshot().await.status, CaptureStatus::Idle);
        assert!(events.lines()[0].starts_with("[WARN] Please configure all 4 video sources"));
    }

    #[tokio::test]
    async fn full_capture_adopts_areas_and_saves() {
        let store = Arc::new(MemoryAreaStore::new());
        let (controller, events) = controller_with(configured_sources(), store.clone());

        controller.start().await.unwrap();
        for i in 0..4 {
            capture_signal(&controller, i as f64 * 50.0).await;
        }

        assert_eq!(controller.wait_for_pending_save().await, Some(Ok(())));
        let active = controller.active_areas().await.unwrap();
        assert_eq!(active.get(SignalId::D).points()[0], Point::new(150, 150));
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.videos().unwrap().get(SignalId::B).unwrap().descriptor(), "cam2");

        let lines = events.lines();
        assert_eq!(
            lines,
            vec![
                "[INFO] Starting area selection process",
                "[INFO] Area saved for Signal A",
                "[INFO] Area saved for Signal B",
                "[INFO] Area saved for Signal C",
                "[INFO] Area saved for Signal D",
                "[INFO] All areas collected successfully",
                "[INFO] Areas saved to backend successfully",
            ]
        );
    }

    #[tokio::test]
    async fn failed_save_keeps_local_areas() {
        let store = Arc::new(MemoryAreaStore::new());
        store.fail_saves_with(Some(PersistError::Rejected { status: 503 }));
        let (controller, events) = controller_with(configured_sources(), store.clone());

        controller.start().await.unwrap();
        for i in 0..4 {
            capture_signal(&controller, i as f64).await;
        }

        assert_eq!(
            controller.wait_for_pending_save().await,
            Some(Err(PersistError::Rejected { status: 503 }))
        );
        assert!(controller.active_areas().await.is_some());
        assert_eq!(
            events.lines().last().unwrap(),
            "[ERROR] Failed to save areas to backend: area store rejected the save (HTTP 503)"
        );
    }

    #[tokio::test]
    async fn cancel_mid_sequence_discards_progress_but_not_active_set() {
        let store = Arc::new(MemoryAreaStore::new());
        let (controller, _events) = controller_with(configured_sources(), store.clone());

        controller.start().await.unwrap();
        for i in 0..4 {
            capture_signal(&controller, i as f64).await;
        }
        controller.wait_for_pending_save().await;
        let previous = controller.active_areas().await;

        controller.start().await.unwrap();
        capture_signal(&controller, 200.0).await;
        capture_signal(&controller, 200.0).await;
        controller.add_point(1.0, 1.0).await.unwrap();
        assert_eq!(controller.snapshot().await.signal, Some(SignalId::C));

        controller.cancel().await.unwrap();
        assert_eq!(controller.active_areas().await, previous);
        assert_eq!(store.save_count(), 1);

        let snapshot = controller.start().await.unwrap();
        assert_eq!(snapshot.signal, Some(SignalId::A));
        assert!(snapshot.committed.is_empty());
        assert!(snapshot.points.is_empty());
    }

    #[tokio::test]
    async fn snapshot_tracks_progress_and_buttons() {
        let (controller, _events) =
            controller_with(configured_sources(), Arc::new(MemoryAreaStore::new()));
        controller.start().await.unwrap();

        let empty = controller.snapshot().await;
        assert!(!empty.can_reset && !empty.can_save);

        controller.add_point(1.0, 1.0).await.unwrap();
        let one = controller.snapshot().await;
        assert_eq!(one.progress, "(1/4 points)");
        assert!(one.can_reset && !one.can_save);

        for _ in 0..4 {
            controller.add_point(2.0, 3.0).await.unwrap();
        }
        let full = controller.snapshot().await;
        assert_eq!(full.points.len(), 4);
        assert!(full.can_save);
    }

    #[tokio::test]
    async fn failed_load_leaves_active_set_unchanged() {
        let store = Arc::new(MemoryAreaStore::new());
        let (controller, events) = controller_with(configured_sources(), store.clone());

        controller.start().await.unwrap();
        for i in 0..4 {
            capture_signal(&controller, i as f64).await;
        }
        controller.wait_for_pending_save().await;
        let before = controller.active_areas().await;

        store.set_raw(Some(serde_json::json!([[[0, 0], [1, 0], [1, 1], [0, 1]]])));
        let err = controller.load().await.unwrap_err();
        assert!(matches!(err, LoadError::MalformedSchema { signal: None, .. }));
        assert_eq!(controller.active_areas().await, before);
        assert!(events.lines().last().unwrap().starts_with("[ERROR] Failed to load areas"));
    }

    #[tokio::test]
    async fn abandon_drops_session_quietly() {
        let (controller, events) =
            controller_with(configured_sources(), Arc::new(MemoryAreaStore::new()));
        assert!(!controller.abandon().await);

        controller.start().await.unwrap();
        assert!(controller.abandon().await);
        assert_eq!(controller.snapshot().await.status, CaptureStatus::Cancelled);
        assert_eq!(events.lines().len(), 1);
    }
}
