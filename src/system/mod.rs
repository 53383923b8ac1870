pub mod commands;
pub mod controller;
pub mod readiness;
pub mod runtime;

pub use controller::{StartError, SystemController};
pub use readiness::{can_start, check, NotReady};
pub use runtime::{DetectionReport, LightStatus, RuntimeState, SignalRuntime, SystemStatus};
