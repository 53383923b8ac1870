use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{models::SignalId, settings::TimingSettings};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SystemStatus {
    Stopped,
    Running,
}

impl Default for SystemStatus {
    fn default() -> Self {
        SystemStatus::Stopped
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LightStatus {
    Green,
    Red,
}

/// Live figures for one approach. All of it is runtime-only.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignalRuntime {
    pub signal: SignalId,
    pub light: LightStatus,
    pub green_elapsed_secs: u64,
    pub vehicles: u32,
    pub weight: f64,
}

impl SignalRuntime {
    fn idle(signal: SignalId) -> Self {
        Self {
            signal,
            light: if signal == SignalId::A {
                LightStatus::Green
            } else {
                LightStatus::Red
            },
            green_elapsed_secs: 0,
            vehicles: 0,
            weight: 0.0,
        }
    }
}

/// Counts reported by the external detection service for one signal.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectionReport {
    pub vehicles: u32,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeState {
    pub status: SystemStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub active_signal: SignalId,
    pub cycle_time_secs: u64,
    pub total_vehicles: u64,
    pub signals: [SignalRuntime; SignalId::COUNT],
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            status: SystemStatus::Stopped,
            started_at: None,
            active_signal: SignalId::A,
            cycle_time_secs: 0,
            total_vehicles: 0,
            signals: SignalId::ALL.map(SignalRuntime::idle),
        }
    }
}

impl RuntimeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.status == SystemStatus::Running
    }

    pub fn begin(&mut self, started_at: DateTime<Utc>) {
        *self = Self {
            status: SystemStatus::Running,
            started_at: Some(started_at),
            ..Self::default()
        };
    }

    /// Resets every live figure. Configuration lives elsewhere and is not
    /// touched.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn signal(&self, signal: SignalId) -> &SignalRuntime {
        &self.signals[signal.index()]
    }

    pub fn record_detection(&mut self, signal: SignalId, report: DetectionReport) {
        let slot = &mut self.signals[signal.index()];
        slot.vehicles = report.vehicles;
        slot.weight = report.weight;
        self.total_vehicles = self
            .signals
            .iter()
            .map(|runtime| u64::from(runtime.vehicles))
            .sum();
    }

    /// Advances the green phase by `secs`. Returns the newly green signal when
    /// the phase changes.
    ///
    /// The active signal yields at its max green time, or earlier once its
    /// min green time has passed if it has no vehicles and another signal does.
    pub fn advance(&mut self, secs: u64, timings: &TimingSettings) -> Option<SignalId> {
        if !self.is_running() {
            return None;
        }

        let active = self.active_signal;
        let timing = timings.get(active);
        self.cycle_time_secs += secs;
        let current = &mut self.signals[active.index()];
        current.green_elapsed_secs += secs;

        let elapsed = current.green_elapsed_secs;
        let idle_here = current.vehicles == 0;
        let waiting_elsewhere = self
            .signals
            .iter()
            .any(|runtime| runtime.signal != active && runtime.vehicles > 0);

        let max_reached = elapsed >= u64::from(timing.max_green_secs);
        let may_yield =
            elapsed >= u64::from(timing.min_green_secs) && idle_here && waiting_elsewhere;
        if !(max_reached || may_yield) {
            return None;
        }

        let next = active.next_in_cycle();
        let current = &mut self.signals[active.index()];
        current.light = LightStatus::Red;
        current.green_elapsed_secs = 0;
        self.signals[next.index()].light = LightStatus::Green;
        self.active_signal = next;
        if next == SignalId::A {
            self.cycle_time_secs = 0;
        }
        Some(next)
    }
}
