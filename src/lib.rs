pub mod capture;
pub mod config;
pub mod console;
pub mod events;
pub mod geometry;
pub mod models;
pub mod persistence;
pub mod settings;
pub mod system;
mod utils;

use std::{fs, sync::Arc};

use anyhow::{Context, Result};

use capture::AreaSessionController;
use config::{AppConfig, StoreBackend};
use events::{DashboardEvent, EventBus};
use models::VideoSourceRegistry;
use persistence::{AreaGateway, AreaStore, Database, HttpAreaStore, SqliteAreaStore};
use settings::SettingsStore;
use system::SystemController;

/// One open dashboard: a junction with its sources, areas and runtime.
pub struct AppState {
    pub junction: String,
    pub config: AppConfig,
    pub events: EventBus,
    pub sources: VideoSourceRegistry,
    pub areas: AreaSessionController,
    pub system: SystemController,
    pub settings: Arc<SettingsStore>,
}

impl AppState {
    /// Opens the dashboard on the store selected by `config`.
    pub fn new(config: AppConfig) -> Result<Self> {
        fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("Failed to create data dir {}", config.data_dir.display())
        })?;

        let store: Arc<dyn AreaStore> = match &config.store {
            StoreBackend::Http { base_url } => Arc::new(HttpAreaStore::new(base_url.clone())?),
            StoreBackend::Sqlite { path } => {
                let db = Database::new(path.clone())?;
                Arc::new(SqliteAreaStore::new(db, config.junction.clone()))
            }
        };

        Self::with_store(config, store)
    }

    pub fn with_store(config: AppConfig, store: Arc<dyn AreaStore>) -> Result<Self> {
        fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("Failed to create data dir {}", config.data_dir.display())
        })?;

        let settings = Arc::new(SettingsStore::new(config.settings_path())?);
        let events = EventBus::new();
        let sources = VideoSourceRegistry::new(settings.video_sources());

        let mut gateway = AreaGateway::new(store);
        if let Some(timeout) = config.store_timeout {
            gateway = gateway.with_timeout(timeout);
        }
        log::info!(
            "Opening {} with {}",
            config.junction,
            gateway.store_description()
        );

        let areas = AreaSessionController::new(sources.clone(), gateway, events.clone());
        let system = SystemController::new(
            areas.clone(),
            sources.clone(),
            settings.clone(),
            events.clone(),
        );

        let junction = config.junction.clone();
        events.emit(DashboardEvent::DashboardOpened {
            junction: junction.clone(),
        });

        Ok(Self {
            junction,
            config,
            events,
            sources,
            areas,
            system,
            settings,
        })
    }
}

pub fn run() -> Result<()> {
    let config = AppConfig::from_env()?;
    utils::logging::init(config.debug);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(async move {
        let state = AppState::new(config)?;
        console::run(state).await
    })
}
