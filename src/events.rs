//! Dashboard event channel.
//!
//! Every observable outcome (captures, saves, loads, warnings, start/stop) is
//! published here. Subscribers get the structured event; the operator sees the
//! rendered line in the bounded system log.

use std::{
    collections::VecDeque,
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::SignalId;

const SYSTEM_LOG_CAPACITY: usize = 200;
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DashboardEvent {
    DashboardOpened { junction: String },
    VideoSourcesConfigured,
    AreaSelectionStarted,
    AreaCaptured { signal: SignalId },
    AllAreasCollected,
    AreaSetSaved,
    AreaSetSaveFailed { reason: String },
    AreaSelectionCancelled,
    AreaSetLoaded,
    AreaSetLoadFailed { reason: String },
    Warning { message: String },
    SettingsUpdated,
    SystemStarted,
    SystemStopped,
    ActiveSignalChanged { signal: SignalId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => f.write_str("INFO"),
            LogLevel::Warn => f.write_str("WARN"),
            LogLevel::Error => f.write_str("ERROR"),
        }
    }
}

impl DashboardEvent {
    pub fn level(&self) -> LogLevel {
        match self {
            DashboardEvent::AreaSetSaveFailed { .. } | DashboardEvent::AreaSetLoadFailed { .. } => {
                LogLevel::Error
            }
            DashboardEvent::Warning { .. } => LogLevel::Warn,
            _ => LogLevel::Info,
        }
    }

    pub fn message(&self) -> String {
        match self {
            DashboardEvent::DashboardOpened { junction } => {
                format!("Dashboard opened for {junction}")
            }
            DashboardEvent::VideoSourcesConfigured => {
                "Video sources configured successfully".to_string()
            }
            DashboardEvent::AreaSelectionStarted => "Starting area selection process".to_string(),
            DashboardEvent::AreaCaptured { signal } => format!("Area saved for Signal {signal}"),
            DashboardEvent::AllAreasCollected => "All areas collected successfully".to_string(),
            DashboardEvent::AreaSetSaved => "Areas saved to backend successfully".to_string(),
            DashboardEvent::AreaSetSaveFailed { reason } => {
                format!("Failed to save areas to backend: {reason}")
            }
            DashboardEvent::AreaSelectionCancelled => "Area selection cancelled".to_string(),
            DashboardEvent::AreaSetLoaded => "Areas loaded from backend".to_string(),
            DashboardEvent::AreaSetLoadFailed { reason } => {
                format!("Failed to load areas: {reason}")
            }
            DashboardEvent::Warning { message } => message.clone(),
            DashboardEvent::SettingsUpdated => "Signal timing settings updated".to_string(),
            DashboardEvent::SystemStarted => "System started".to_string(),
            DashboardEvent::SystemStopped => "System stopped".to_string(),
            DashboardEvent::ActiveSignalChanged { signal } => {
                format!("Signal {signal} is now green")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

#[derive(Debug, Default)]
struct SystemLog {
    entries: VecDeque<LogEntry>,
}

impl SystemLog {
    fn push(&mut self, entry: LogEntry) {
        if self.entries.len() == SYSTEM_LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }
}

/// Cloneable handle shared by every controller.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DashboardEvent>,
    log: Arc<Mutex<SystemLog>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            log: Arc::new(Mutex::new(SystemLog::default())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: DashboardEvent) {
        let level = event.level();
        let message = event.message();

        match level {
            LogLevel::Info => log::info!("{message}"),
            LogLevel::Warn => log::warn!("{message}"),
            LogLevel::Error => log::error!("{message}"),
        }

        self.lock_log().push(LogEntry {
            at: Utc::now(),
            level,
            message,
        });

        // No subscribers is fine; the system log already has the entry.
        let _ = self.sender.send(event);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(DashboardEvent::Warning {
            message: message.into(),
        });
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock_log().entries.iter().cloned().collect()
    }

    /// The log rendered the way the dashboard's log panel shows it.
    pub fn lines(&self) -> Vec<String> {
        self.lock_log()
            .entries
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    fn lock_log(&self) -> MutexGuard<'_, SystemLog> {
        match self.log.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
