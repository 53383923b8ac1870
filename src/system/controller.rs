use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::{sync::Mutex, task::JoinHandle, time};

use crate::{
    capture::AreaSessionController,
    events::{DashboardEvent, EventBus},
    models::{SignalId, VideoSourceRegistry},
    settings::SettingsStore,
};

use super::{
    readiness::{self, NotReady},
    runtime::{DetectionReport, RuntimeState},
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StartError {
    #[error(transparent)]
    NotReady(#[from] NotReady),

    #[error("system is already running")]
    AlreadyRunning,
}

/// Start/stop for the junction. Starting is gated on configured sources and
/// a complete, valid area set; stopping only clears live figures.
#[derive(Clone)]
pub struct SystemController {
    state: Arc<Mutex<RuntimeState>>,
    areas: AreaSessionController,
    sources: VideoSourceRegistry,
    settings: Arc<SettingsStore>,
    events: EventBus,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
}

impl SystemController {
    pub fn new(
        areas: AreaSessionController,
        sources: VideoSourceRegistry,
        settings: Arc<SettingsStore>,
        events: EventBus,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(RuntimeState::new())),
            areas,
            sources,
            settings,
            events,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_secs(1),
        }
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub async fn get_state(&self) -> RuntimeState {
        self.state.lock().await.clone()
    }

    pub async fn can_start(&self) -> bool {
        let areas = self.areas.active_areas().await;
        readiness::can_start(areas.as_ref(), &self.sources.snapshot())
    }

    pub async fn start(&self) -> Result<RuntimeState, StartError> {
        let areas = self.areas.active_areas().await;
        if let Err(not_ready) = readiness::check(areas.as_ref(), &self.sources.snapshot()) {
            self.events.warn(not_ready.to_string());
            return Err(not_ready.into());
        }

        {
            let mut state = self.state.lock().await;
            if state.is_running() {
                return Err(StartError::AlreadyRunning);
            }
            state.begin(Utc::now());
        }

        self.spawn_ticker().await;
        self.events.emit(DashboardEvent::SystemStarted);
        Ok(self.get_state().await)
    }

    /// Stops the ticker and clears runtime figures. Areas and video sources
    /// are configuration and survive, so the next start needs no redefinition.
    pub async fn stop(&self) -> RuntimeState {
        self.cancel_ticker().await;

        let was_running = {
            let mut state = self.state.lock().await;
            let was_running = state.is_running();
            state.clear();
            was_running
        };

        if was_running {
            self.events.emit(DashboardEvent::SystemStopped);
        }
        self.get_state().await
    }

    pub async fn record_detection(&self, signal: SignalId, report: DetectionReport) {
        let mut state = self.state.lock().await;
        if state.is_running() {
            state.record_detection(signal, report);
        }
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let state = self.state.clone();
        let settings = self.settings.clone();
        let events = self.events.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            // The first tick fires immediately.
            interval.tick().await;

            loop {
                interval.tick().await;

                let timings = settings.timings();
                let changed = {
                    let mut guard = state.lock().await;
                    if !guard.is_running() {
                        break;
                    }
                    guard.advance(1, &timings)
                };

                if let Some(signal) = changed {
                    events.emit(DashboardEvent::ActiveSignalChanged { signal });
                }
            }

            log_info!("System ticker finished");
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    log_error!("System ticker failed: {err}");
                }
            }
        }
    }
}
