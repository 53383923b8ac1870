use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::{migrations::run_migrations, AreaStore, LoadError, PersistError, SavePayload};

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to area DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join area DB thread: {join_err:?}");
            }
        }
    }
}

/// SQLite connection owned by a dedicated thread; async callers send it
/// closures and await the reply.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("junction-areas-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => task(&mut conn),
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Area database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Area database initialized at {}", db_path.display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    /// Replaces the junction's current area set and appends to its history,
    /// in one transaction.
    pub async fn replace_area_set(
        &self,
        junction: &str,
        areas_json: String,
        videos_json: String,
        saved_at: DateTime<Utc>,
    ) -> Result<()> {
        let junction = junction.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO area_sets (junction, areas_json, videos_json, saved_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(junction) DO UPDATE SET
                     areas_json = excluded.areas_json,
                     videos_json = excluded.videos_json,
                     saved_at = excluded.saved_at",
                params![junction, areas_json, videos_json, saved_at.to_rfc3339()],
            )
            .with_context(|| "failed to upsert area set")?;
            tx.execute(
                "INSERT INTO area_set_history (id, junction, areas_json, saved_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    format!("ash_{}", Uuid::new_v4()),
                    junction,
                    areas_json,
                    saved_at.to_rfc3339()
                ],
            )
            .with_context(|| "failed to record area set history")?;
            tx.commit().context("failed to commit area set")?;
            Ok(())
        })
        .await
    }

    pub async fn get_area_set_json(&self, junction: &str) -> Result<Option<String>> {
        let junction = junction.to_string();
        self.execute(move |conn| {
            let raw = conn
                .query_row(
                    "SELECT areas_json FROM area_sets WHERE junction = ?1",
                    params![junction],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(raw)
        })
        .await
    }

    pub async fn count_area_set_history(&self, junction: &str) -> Result<u64> {
        let junction = junction.to_string();
        self.execute(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM area_set_history WHERE junction = ?1",
                params![junction],
                |row| row.get(0),
            )?;
            u64::try_from(count).map_err(|_| anyhow!("history count {count} is negative"))
        })
        .await
    }
}

/// Local area store: one row per junction in the dashboard's SQLite file.
#[derive(Clone)]
pub struct SqliteAreaStore {
    db: Database,
    junction: String,
}

impl SqliteAreaStore {
    pub fn new(db: Database, junction: impl Into<String>) -> Self {
        Self {
            db,
            junction: junction.into(),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl AreaStore for SqliteAreaStore {
    async fn put(&self, payload: &SavePayload) -> Result<(), PersistError> {
        let areas_json = serde_json::to_string(&payload.areas)
            .map_err(|err| PersistError::Store(err.to_string()))?;
        let videos_json = serde_json::to_string(&payload.videos)
            .map_err(|err| PersistError::Store(err.to_string()))?;

        self.db
            .replace_area_set(&self.junction, areas_json, videos_json, Utc::now())
            .await
            .map_err(|err| PersistError::Store(format!("{err:#}")))
    }

    async fn fetch(&self) -> Result<Option<Value>, LoadError> {
        let raw = self
            .db
            .get_area_set_json(&self.junction)
            .await
            .map_err(|err| LoadError::Store(format!("{err:#}")))?;

        raw.map(|text| {
            serde_json::from_str(&text).map_err(|err| {
                LoadError::malformed(None, format!("stored areas are not valid JSON ({err})"))
            })
        })
        .transpose()
    }

    fn describe(&self) -> String {
        format!("local store for {} ({})", self.junction, self.db.path().display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Area, AreaSet, Point, SignalId, VideoSourceSet};

    fn sample_payload() -> SavePayload {
        let area = |o: i64| {
            Area::new([
                Point::new(o, o),
                Point::new(o + 5, o),
                Point::new(o + 5, o + 5),
                Point::new(o, o + 5),
            ])
        };
        SavePayload {
            videos: VideoSourceSet::new().with(SignalId::A, "cam1"),
            areas: AreaSet::new([area(0), area(10), area(20), area(30)]),
        }
    }

    #[tokio::test]
    async fn missing_junction_fetches_none() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("areas.sqlite3")).unwrap();
        let store = SqliteAreaStore::new(db, "Junction 1 - Main Street");
        assert_eq!(store.fetch().await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_replaces_current_set_and_keeps_history() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("areas.sqlite3")).unwrap();
        let store = SqliteAreaStore::new(db.clone(), "Junction 2 - Downtown");

        let payload = sample_payload();
        store.put(&payload).await.unwrap();
        store.put(&payload).await.unwrap();

        let raw = store.fetch().await.unwrap().unwrap();
        assert_eq!(raw, serde_json::to_value(payload.areas).unwrap());
        assert_eq!(
            db.count_area_set_history("Junction 2 - Downtown").await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn junctions_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("areas.sqlite3")).unwrap();
        let first = SqliteAreaStore::new(db.clone(), "Junction 1 - Main Street");
        let second = SqliteAreaStore::new(db, "Junction 3 - Industrial Area");

        first.put(&sample_payload()).await.unwrap();
        assert!(second.fetch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_row_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("areas.sqlite3")).unwrap();
        db.execute(|conn| {
            conn.execute(
                "INSERT INTO area_sets (junction, areas_json, videos_json, saved_at)
                 VALUES ('J', '[[1,2],', '{}', '2026-01-01T00:00:00Z')",
                [],
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let store = SqliteAreaStore::new(db, "J");
        assert!(matches!(
            store.fetch().await.unwrap_err(),
            LoadError::MalformedSchema { signal: None, .. }
        ));
    }
}
