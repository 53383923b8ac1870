pub mod area;
pub mod signal;
pub mod video;

pub use area::{Area, AreaSet, Point, AREA_VERTICES};
pub use signal::SignalId;
pub use video::{VideoSource, VideoSourceKind, VideoSourceRegistry, VideoSourceSet};
