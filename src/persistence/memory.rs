use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::models::VideoSourceSet;

use super::{AreaStore, LoadError, PersistError, SavePayload};

#[derive(Debug, Default)]
struct MemoryInner {
    areas: Option<Value>,
    videos: Option<VideoSourceSet>,
    saves: usize,
    fail_saves: Option<PersistError>,
}

/// Process-local store. Keeps the serialized form so loads go through the
/// same validation as any remote backend.
#[derive(Debug, Default)]
pub struct MemoryAreaStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryAreaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with arbitrary (possibly invalid) raw data.
    pub fn with_raw(raw: Value) -> Self {
        let store = Self::new();
        store.lock().areas = Some(raw);
        store
    }

    pub fn set_raw(&self, raw: Option<Value>) {
        self.lock().areas = raw;
    }

    pub fn raw(&self) -> Option<Value> {
        self.lock().areas.clone()
    }

    pub fn videos(&self) -> Option<VideoSourceSet> {
        self.lock().videos.clone()
    }

    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    /// Makes subsequent saves fail with `error` until cleared with `None`.
    pub fn fail_saves_with(&self, error: Option<PersistError>) {
        self.lock().fail_saves = error;
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl AreaStore for MemoryAreaStore {
    async fn put(&self, payload: &SavePayload) -> Result<(), PersistError> {
        let areas = serde_json::to_value(payload.areas)
            .map_err(|err| PersistError::Store(err.to_string()))?;

        let mut inner = self.lock();
        if let Some(err) = inner.fail_saves.clone() {
            return Err(err);
        }
        inner.areas = Some(areas);
        inner.videos = Some(payload.videos.clone());
        inner.saves += 1;
        Ok(())
    }

    async fn fetch(&self) -> Result<Option<Value>, LoadError> {
        Ok(self.lock().areas.clone())
    }

    fn describe(&self) -> String {
        "in-memory store".to_string()
    }
}
