use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};

pub const DEFAULT_JUNCTION: &str = "Junction 1 - Main Street";
const DEFAULT_DATA_DIR: &str = "data";

/// Where area sets are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// The dashboard backend's `/api/save-area` and `/api/load-area`.
    Http { base_url: String },
    /// `areas.sqlite3` inside the data directory.
    Sqlite { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub junction: String,
    pub data_dir: PathBuf,
    pub store: StoreBackend,
    pub store_timeout: Option<Duration>,
    pub debug: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup.
    ///
    /// `JUNCTION_NAME`, `JUNCTION_DATA_DIR`, `JUNCTION_STORE_URL`,
    /// `JUNCTION_STORE_TIMEOUT_SECS`, `JUNCTION_DEBUG`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let junction = non_empty("JUNCTION_NAME").unwrap_or_else(|| DEFAULT_JUNCTION.to_string());
        let data_dir = PathBuf::from(
            non_empty("JUNCTION_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
        );

        let store = match non_empty("JUNCTION_STORE_URL") {
            Some(url) => {
                let url = url.trim().to_string();
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    bail!("JUNCTION_STORE_URL must be an http(s) URL, got '{url}'");
                }
                StoreBackend::Http { base_url: url }
            }
            None => StoreBackend::Sqlite {
                path: data_dir.join("areas.sqlite3"),
            },
        };

        let store_timeout = non_empty("JUNCTION_STORE_TIMEOUT_SECS")
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("JUNCTION_STORE_TIMEOUT_SECS is not a number: '{raw}'"))
            })
            .transpose()?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let debug = non_empty("JUNCTION_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            junction,
            data_dir,
            store,
            store_timeout,
            debug,
        })
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }
}
