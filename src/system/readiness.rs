use thiserror::Error;

use crate::{
    geometry::is_non_degenerate,
    models::{AreaSet, SignalId, VideoSourceSet},
};

/// Why the system cannot start. The messages stay signal-agnostic; the
/// fields say which signals are affected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotReady {
    #[error("Please configure all 4 video sources before starting the system.")]
    SourcesMissing { missing: Vec<SignalId> },

    #[error("Please define all 4 areas before starting the system.")]
    AreasMissing { invalid: Vec<SignalId> },
}

/// Sources are checked before areas, so an operator with neither configured
/// is pointed at the video sources first.
pub fn check(areas: Option<&AreaSet>, sources: &VideoSourceSet) -> Result<(), NotReady> {
    let missing = sources.missing();
    if !missing.is_empty() {
        return Err(NotReady::SourcesMissing { missing });
    }

    let Some(areas) = areas else {
        return Err(NotReady::AreasMissing {
            invalid: SignalId::ALL.to_vec(),
        });
    };

    let invalid: Vec<SignalId> = areas
        .iter()
        .filter(|(_, area)| !is_non_degenerate(area))
        .map(|(signal, _)| signal)
        .collect();
    if !invalid.is_empty() {
        return Err(NotReady::AreasMissing { invalid });
    }

    Ok(())
}

pub fn can_start(areas: Option<&AreaSet>, sources: &VideoSourceSet) -> bool {
    check(areas, sources).is_ok()
}
