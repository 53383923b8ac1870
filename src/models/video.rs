use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock},
};

use super::SignalId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum VideoSourceKind {
    Url,
    LocalFile,
}

/// A playable media reference for one signal. The descriptor is kept verbatim;
/// this crate never opens it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSource {
    descriptor: String,
}

impl VideoSource {
    /// Returns `None` for empty or whitespace-only descriptors, which count as
    /// "not configured".
    pub fn parse(descriptor: impl Into<String>) -> Option<Self> {
        let descriptor = descriptor.into();
        if descriptor.trim().is_empty() {
            return None;
        }
        Some(Self { descriptor })
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn kind(&self) -> VideoSourceKind {
        match self.descriptor.split_once("://") {
            Some((scheme, _))
                if !scheme.is_empty()
                    && scheme
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) =>
            {
                VideoSourceKind::Url
            }
            _ => VideoSourceKind::LocalFile,
        }
    }
}

/// Per-signal video sources as supplied by the operator. Serialized as
/// `{"A": "...", "B": "", ...}` with unset signals written as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<SignalId, String>", into = "BTreeMap<SignalId, String>")]
pub struct VideoSourceSet {
    sources: [Option<VideoSource>; SignalId::COUNT],
}

impl VideoSourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, signal: SignalId, descriptor: impl Into<String>) {
        self.sources[signal.index()] = VideoSource::parse(descriptor);
    }

    pub fn with(mut self, signal: SignalId, descriptor: impl Into<String>) -> Self {
        self.set(signal, descriptor);
        self
    }

    pub fn clear(&mut self, signal: SignalId) {
        self.sources[signal.index()] = None;
    }

    pub fn get(&self, signal: SignalId) -> Option<&VideoSource> {
        self.sources[signal.index()].as_ref()
    }

    pub fn missing(&self) -> Vec<SignalId> {
        SignalId::ALL
            .into_iter()
            .filter(|signal| self.get(*signal).is_none())
            .collect()
    }

    /// True only when every signal has a non-empty source.
    pub fn is_complete(&self) -> bool {
        self.sources.iter().all(Option::is_some)
    }
}

impl From<BTreeMap<SignalId, String>> for VideoSourceSet {
    fn from(map: BTreeMap<SignalId, String>) -> Self {
        let mut set = VideoSourceSet::new();
        for (signal, descriptor) in map {
            set.set(signal, descriptor);
        }
        set
    }
}

impl From<VideoSourceSet> for BTreeMap<SignalId, String> {
    fn from(set: VideoSourceSet) -> Self {
        SignalId::ALL
            .into_iter()
            .map(|signal| {
                let descriptor = set
                    .get(signal)
                    .map(|source| source.descriptor().to_string())
                    .unwrap_or_default();
                (signal, descriptor)
            })
            .collect()
    }
}

/// Shared handle to the junction's configured sources. The dashboard writes
/// it; capture and the readiness gate only read snapshots.
#[derive(Debug, Clone, Default)]
pub struct VideoSourceRegistry {
    sources: Arc<RwLock<VideoSourceSet>>,
}

impl VideoSourceRegistry {
    pub fn new(initial: VideoSourceSet) -> Self {
        Self {
            sources: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn snapshot(&self) -> VideoSourceSet {
        match self.sources.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn replace(&self, sources: VideoSourceSet) {
        match self.sources.write() {
            Ok(mut guard) => *guard = sources,
            Err(poisoned) => *poisoned.into_inner() = sources,
        }
    }
}
