use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt, fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use thiserror::Error;

use crate::models::{SignalId, VideoSourceSet};

pub const MIN_GREEN_RANGE: (u32, u32) = (5, 30);
pub const MAX_GREEN_RANGE: (u32, u32) = (20, 120);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignalTiming {
    pub min_green_secs: u32,
    pub max_green_secs: u32,
}

impl Default for SignalTiming {
    fn default() -> Self {
        Self {
            min_green_secs: 10,
            max_green_secs: 45,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimingField {
    MinGreen,
    MaxGreen,
}

impl fmt::Display for TimingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimingField::MinGreen => f.write_str("min green time"),
            TimingField::MaxGreen => f.write_str("max green time"),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimingViolation {
    pub signal: SignalId,
    pub field: TimingField,
    pub message: String,
}

impl fmt::Display for TimingViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signal {}: {}", self.signal, self.message)
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid signal timing: {}", join_violations(.0))]
    InvalidTiming(Vec<TimingViolation>),

    #[error(transparent)]
    Persist(#[from] anyhow::Error),
}

fn join_violations(violations: &[TimingViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Green-phase limits per signal, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct TimingSettings(BTreeMap<SignalId, SignalTiming>);

impl Default for TimingSettings {
    fn default() -> Self {
        Self(
            SignalId::ALL
                .into_iter()
                .map(|signal| (signal, SignalTiming::default()))
                .collect(),
        )
    }
}

impl TimingSettings {
    pub fn get(&self, signal: SignalId) -> SignalTiming {
        self.0.get(&signal).copied().unwrap_or_default()
    }

    pub fn set(&mut self, signal: SignalId, timing: SignalTiming) {
        self.0.insert(signal, timing);
    }

    pub fn with(mut self, signal: SignalId, timing: SignalTiming) -> Self {
        self.set(signal, timing);
        self
    }

    /// Every broken rule across all signals, in signal order.
    pub fn validate(&self) -> Vec<TimingViolation> {
        let mut violations = Vec::new();

        for signal in SignalId::ALL {
            let SignalTiming {
                min_green_secs: min,
                max_green_secs: max,
            } = self.get(signal);

            if !(MIN_GREEN_RANGE.0..=MIN_GREEN_RANGE.1).contains(&min) {
                violations.push(TimingViolation {
                    signal,
                    field: TimingField::MinGreen,
                    message: format!(
                        "Min green time must be between {} and {} seconds",
                        MIN_GREEN_RANGE.0, MIN_GREEN_RANGE.1
                    ),
                });
            }

            if !(MAX_GREEN_RANGE.0..=MAX_GREEN_RANGE.1).contains(&max) {
                violations.push(TimingViolation {
                    signal,
                    field: TimingField::MaxGreen,
                    message: format!(
                        "Max green time must be between {} and {} seconds",
                        MAX_GREEN_RANGE.0, MAX_GREEN_RANGE.1
                    ),
                });
            }

            if min >= max {
                violations.push(TimingViolation {
                    signal,
                    field: TimingField::MinGreen,
                    message: "Min green time must be less than max green time".to_string(),
                });
            }
        }

        violations
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct UserSettings {
    timings: TimingSettings,
    video_sources: VideoSourceSet,
}

/// Operator settings kept in a JSON file next to the area database.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring unreadable settings at {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn timings(&self) -> TimingSettings {
        self.read().timings.clone()
    }

    pub fn update_timings(&self, timings: TimingSettings) -> Result<(), SettingsError> {
        let violations = timings.validate();
        if !violations.is_empty() {
            return Err(SettingsError::InvalidTiming(violations));
        }

        let mut guard = self.write();
        guard.timings = timings;
        self.persist(&guard)?;
        Ok(())
    }

    pub fn video_sources(&self) -> VideoSourceSet {
        self.read().video_sources.clone()
    }

    pub fn update_video_sources(&self, sources: VideoSourceSet) -> Result<()> {
        let mut guard = self.write();
        guard.video_sources = sources;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
