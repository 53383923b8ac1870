pub mod commands;
pub mod controller;
pub mod state;

pub use controller::{AreaSessionController, CaptureSnapshot};
pub use state::{AddPointOutcome, CaptureError, CaptureState, CaptureStatus, CommitOutcome};
