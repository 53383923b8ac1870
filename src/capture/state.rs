use serde::Serialize;
use thiserror::Error;

use crate::{
    geometry::{quantize, InvalidGeometry},
    models::{Area, AreaSet, Point, SignalId, AREA_VERTICES},
};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CaptureStatus {
    Idle,
    CapturingSignal(SignalId),
    Complete,
    Cancelled,
}

impl Default for CaptureStatus {
    fn default() -> Self {
        CaptureStatus::Idle
    }
}

impl CaptureStatus {
    fn name(&self) -> &'static str {
        match self {
            CaptureStatus::Idle => "idle",
            CaptureStatus::CapturingSignal(_) => "capturing",
            CaptureStatus::Complete => "complete",
            CaptureStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    #[error("Please configure all 4 video sources before drawing areas (missing: {})", join_signals(.missing))]
    PreconditionNotMet { missing: Vec<SignalId> },

    #[error(transparent)]
    InvalidGeometry(#[from] InvalidGeometry),

    #[error("cannot {operation} while area selection is {status}")]
    InvalidState {
        operation: &'static str,
        status: &'static str,
    },

    #[error("Signal {signal} needs exactly 4 points before it can be saved ({placed} placed)")]
    IncompleteArea { signal: SignalId, placed: usize },
}

fn join_signals(signals: &[SignalId]) -> String {
    signals
        .iter()
        .map(|signal| signal.letter())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddPointOutcome {
    Added { placed: usize },
    /// The signal already has all four vertices; the click is discarded.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Advanced { captured: SignalId, next: SignalId },
    Complete { captured: SignalId, areas: AreaSet },
}

/// Point collection for one junction, one signal at a time in A..D order.
#[derive(Debug, Clone, Default)]
pub struct CaptureState {
    status: CaptureStatus,
    session_id: Option<String>,
    points: Vec<Point>,
    committed: [Option<Area>; SignalId::COUNT],
}

impl CaptureState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> CaptureStatus {
        self.status
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn current_signal(&self) -> Option<SignalId> {
        match self.status {
            CaptureStatus::CapturingSignal(signal) => Some(signal),
            _ => None,
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Signals committed in the running session. Not visible outside the
    /// session until capture completes.
    pub fn committed_signals(&self) -> Vec<SignalId> {
        SignalId::ALL
            .into_iter()
            .filter(|signal| self.committed[signal.index()].is_some())
            .collect()
    }

    pub fn is_capturing(&self) -> bool {
        self.current_signal().is_some()
    }

    /// Opens a fresh session at signal A. Any previous session's areas are
    /// gone by now; committed areas are never edited in place.
    pub fn start(&mut self, session_id: String) -> Result<(), CaptureError> {
        if self.is_capturing() {
            return Err(self.invalid("start area selection"));
        }

        *self = Self {
            status: CaptureStatus::CapturingSignal(SignalId::A),
            session_id: Some(session_id),
            points: Vec::with_capacity(AREA_VERTICES),
            committed: Default::default(),
        };
        Ok(())
    }

    pub fn add_point(&mut self, raw: (f64, f64)) -> Result<AddPointOutcome, CaptureError> {
        self.require_capturing("add a point")?;

        if self.points.len() >= AREA_VERTICES {
            return Ok(AddPointOutcome::Ignored);
        }

        let point = quantize(raw)?;
        self.points.push(point);
        Ok(AddPointOutcome::Added {
            placed: self.points.len(),
        })
    }

    pub fn reset_current(&mut self) -> Result<(), CaptureError> {
        self.require_capturing("reset points")?;
        self.points.clear();
        Ok(())
    }

    pub fn commit_current(&mut self) -> Result<CommitOutcome, CaptureError> {
        let signal = self.require_capturing("save an area")?;

        let vertices: [Point; AREA_VERTICES] =
            self.points
                .as_slice()
                .try_into()
                .map_err(|_| CaptureError::IncompleteArea {
                    signal,
                    placed: self.points.len(),
                })?;

        self.committed[signal.index()] = Some(Area::new(vertices));
        self.points.clear();

        match SignalId::from_index(signal.index() + 1) {
            Some(next) => {
                self.status = CaptureStatus::CapturingSignal(next);
                Ok(CommitOutcome::Advanced {
                    captured: signal,
                    next,
                })
            }
            None => {
                let areas = self.take_complete_set(signal)?;
                self.status = CaptureStatus::Complete;
                Ok(CommitOutcome::Complete {
                    captured: signal,
                    areas,
                })
            }
        }
    }

    /// Drops the session, including signals already committed in it.
    pub fn cancel(&mut self) -> Result<(), CaptureError> {
        self.require_capturing("cancel area selection")?;
        *self = Self {
            status: CaptureStatus::Cancelled,
            ..Self::default()
        };
        Ok(())
    }

    fn take_complete_set(&mut self, last: SignalId) -> Result<AreaSet, CaptureError> {
        let committed = std::mem::take(&mut self.committed);
        let mut areas = [Area::new([Point::new(0, 0); AREA_VERTICES]); SignalId::COUNT];
        for (signal, slot) in SignalId::ALL.into_iter().zip(committed) {
            // Every earlier signal was committed to get here.
            areas[signal.index()] = slot.ok_or(CaptureError::IncompleteArea {
                signal,
                placed: 0,
            })?;
        }
        debug_assert_eq!(last, SignalId::D);
        Ok(AreaSet::new(areas))
    }

    fn require_capturing(&self, operation: &'static str) -> Result<SignalId, CaptureError> {
        self.current_signal().ok_or_else(|| self.invalid(operation))
    }

    fn invalid(&self, operation: &'static str) -> CaptureError {
        CaptureError::InvalidState {
            operation,
            status: self.status.name(),
        }
    }
}
