//! Area persistence: the gateway between the trusted in-memory model and the
//! external area store.

pub mod gateway;
pub mod http;
pub mod memory;
pub mod sqlite;

mod migrations;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::{AreaSet, SignalId, VideoSourceSet};

pub use gateway::{parse_area_set, AreaGateway};
pub use http::HttpAreaStore;
pub use memory::MemoryAreaStore;
pub use sqlite::{Database, SqliteAreaStore};

/// Body of a save request. `areas` serializes as four `[[x, y]; 4]` arrays
/// in signal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavePayload {
    pub videos: VideoSourceSet,
    pub areas: AreaSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistError {
    #[error("could not reach area store: {0}")]
    Transport(String),

    #[error("area store rejected the save (HTTP {status})")]
    Rejected { status: u16 },

    #[error("area store failed: {0}")]
    Store(String),

    #[error("save timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("No saved areas found for this junction")]
    NotFound,

    #[error("{}", malformed_message(.signal, .detail))]
    MalformedSchema {
        signal: Option<SignalId>,
        detail: String,
    },

    #[error("Saved area for Signal {signal} is degenerate (its points enclose no area)")]
    DegenerateArea { signal: SignalId },

    #[error("could not reach area store: {0}")]
    Transport(String),

    #[error("area store refused the load (HTTP {status})")]
    Rejected { status: u16 },

    #[error("area store failed: {0}")]
    Store(String),

    #[error("load timed out after {0:?}")]
    Timeout(Duration),
}

impl LoadError {
    pub(crate) fn malformed(signal: Option<SignalId>, detail: impl Into<String>) -> Self {
        LoadError::MalformedSchema {
            signal,
            detail: detail.into(),
        }
    }
}

fn malformed_message(signal: &Option<SignalId>, detail: &str) -> String {
    match signal {
        Some(signal) => format!("Saved area for Signal {signal} is malformed: {detail}"),
        None => format!("Saved areas are malformed: {detail}"),
    }
}

/// Backend that holds the persisted area set for one junction.
///
/// Stores move raw data only. `fetch` hands back whatever the backend holds,
/// untrusted; [`AreaGateway`] does all validation.
#[async_trait]
pub trait AreaStore: Send + Sync {
    /// Writes the whole payload in one request.
    async fn put(&self, payload: &SavePayload) -> Result<(), PersistError>;

    /// `Ok(None)` when nothing has been stored yet.
    async fn fetch(&self) -> Result<Option<Value>, LoadError>;

    fn describe(&self) -> String;
}
