use std::{future::Future, sync::Arc, time::Duration};

use serde_json::Value;

use crate::{
    geometry::{is_non_degenerate, is_numeric_pair, is_well_formed_area, quantize},
    models::{Area, AreaSet, Point, SignalId, VideoSourceSet, AREA_VERTICES},
};

use super::{AreaStore, LoadError, PersistError, SavePayload};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// The only path by which stored areas enter the in-memory model.
#[derive(Clone)]
pub struct AreaGateway {
    store: Arc<dyn AreaStore>,
    timeout: Option<Duration>,
}

impl AreaGateway {
    pub fn new(store: Arc<dyn AreaStore>) -> Self {
        Self {
            store,
            timeout: None,
        }
    }

    /// Bounds every save and load. Without one, requests wait for the store.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn store_description(&self) -> String {
        self.store.describe()
    }

    pub async fn save(&self, areas: &AreaSet, videos: &VideoSourceSet) -> Result<(), PersistError> {
        let payload = SavePayload {
            videos: videos.clone(),
            areas: *areas,
        };

        let result = match bounded(self.timeout, self.store.put(&payload)).await {
            Some(result) => result,
            None => Err(PersistError::Timeout(self.timeout.unwrap_or_default())),
        };

        match &result {
            Ok(()) => log_info!("Saved area set to {}", self.store.describe()),
            Err(err) => log_warn!("Saving area set to {} failed: {err}", self.store.describe()),
        }
        result
    }

    /// Fetches and validates the stored area set. Any failure rejects the
    /// whole set.
    pub async fn load(&self) -> Result<AreaSet, LoadError> {
        let raw = match bounded(self.timeout, self.store.fetch()).await {
            Some(result) => result?,
            None => return Err(LoadError::Timeout(self.timeout.unwrap_or_default())),
        };

        let raw = raw.ok_or(LoadError::NotFound)?;
        let areas = parse_area_set(&raw)?;
        log_info!("Loaded area set from {}", self.store.describe());
        Ok(areas)
    }
}

async fn bounded<F, T>(timeout: Option<Duration>, future: F) -> Option<T>
where
    F: Future<Output = T>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, future).await.ok(),
        None => Some(future.await),
    }
}

/// Validates a raw stored area set: structure first, then quantization, then
/// non-degeneracy per signal.
pub fn parse_area_set(raw: &Value) -> Result<AreaSet, LoadError> {
    let raw_areas = check_structure(raw)?;

    let mut areas = [Area::new([Point::new(0, 0); AREA_VERTICES]); SignalId::COUNT];
    for (signal, raw_points) in SignalId::ALL.into_iter().zip(raw_areas) {
        let mut points = [Point::new(0, 0); AREA_VERTICES];
        for (index, raw_point) in raw_points.into_iter().enumerate() {
            points[index] = quantize(raw_point).map_err(|err| {
                LoadError::malformed(Some(signal), format!("point {}: {err}", index + 1))
            })?;
        }
        areas[signal.index()] = Area::new(points);
    }

    for (signal, area) in SignalId::ALL.into_iter().zip(areas.iter()) {
        if !is_non_degenerate(area) {
            return Err(LoadError::DegenerateArea { signal });
        }
    }

    Ok(AreaSet::new(areas))
}

type RawArea = [(f64, f64); AREA_VERTICES];

fn check_structure(raw: &Value) -> Result<[RawArea; SignalId::COUNT], LoadError> {
    let entries = match raw {
        Value::Null => return Err(LoadError::NotFound),
        Value::Array(entries) => entries,
        other => {
            return Err(LoadError::malformed(
                None,
                format!("expected an array of 4 areas, found {}", describe(other)),
            ))
        }
    };

    if entries.len() != SignalId::COUNT {
        return Err(LoadError::malformed(
            None,
            format!("expected 4 areas, found {}", entries.len()),
        ));
    }

    let mut parsed = [[(0.0, 0.0); AREA_VERTICES]; SignalId::COUNT];
    for (signal, entry) in SignalId::ALL.into_iter().zip(entries) {
        if !is_well_formed_area(entry) {
            return Err(LoadError::malformed(Some(signal), diagnose(entry)));
        }

        // Shape was checked above, so every point is a numeric pair.
        for (slot, point) in parsed[signal.index()].iter_mut().zip(entry.as_array().into_iter().flatten()) {
            let components = point.as_array().map(Vec::as_slice).unwrap_or_default();
            match components {
                [x, y] => match (x.as_f64(), y.as_f64()) {
                    (Some(x), Some(y)) => *slot = (x, y),
                    _ => return Err(LoadError::malformed(Some(signal), diagnose(entry))),
                },
                _ => return Err(LoadError::malformed(Some(signal), diagnose(entry))),
            }
        }
    }

    Ok(parsed)
}

/// Names the first structural rule an area entry breaks.
fn diagnose(entry: &Value) -> String {
    let Some(points) = entry.as_array() else {
        return format!("expected an array of 4 points, found {}", describe(entry));
    };
    if points.len() != AREA_VERTICES {
        return format!("expected 4 points, found {}", points.len());
    }

    for (index, point) in points.iter().enumerate() {
        if is_numeric_pair(point) {
            continue;
        }
        return match point.as_array() {
            None => format!("point {} is {}, expected an [x, y] pair", index + 1, describe(point)),
            Some(components) if components.len() != 2 => format!(
                "point {} has {} components, expected 2",
                index + 1,
                components.len()
            ),
            Some(_) => format!("point {} has a non-numeric component", index + 1),
        };
    }

    "unrecognised area layout".to_string()
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
