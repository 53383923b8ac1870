use crate::{
    capture::{AddPointOutcome, AreaSessionController, CaptureSnapshot, CommitOutcome},
    models::AreaSet,
};

use crate::AppState;

fn controller_from_state(state: &AppState) -> AreaSessionController {
    state.areas.clone()
}

pub async fn get_capture_state(state: &AppState) -> Result<CaptureSnapshot, String> {
    let controller = controller_from_state(state);
    Ok(controller.snapshot().await)
}

pub async fn start_area_selection(state: &AppState) -> Result<CaptureSnapshot, String> {
    let controller = controller_from_state(state);
    controller.start().await.map_err(|e| e.to_string())
}

pub async fn add_area_point(state: &AppState, x: f64, y: f64) -> Result<AddPointOutcome, String> {
    let controller = controller_from_state(state);
    controller.add_point(x, y).await.map_err(|e| e.to_string())
}

pub async fn reset_area_points(state: &AppState) -> Result<CaptureSnapshot, String> {
    let controller = controller_from_state(state);
    controller.reset_current().await.map_err(|e| e.to_string())?;
    Ok(controller.snapshot().await)
}

pub async fn save_area(state: &AppState) -> Result<CommitOutcome, String> {
    let controller = controller_from_state(state);
    controller.commit_current().await.map_err(|e| e.to_string())
}

pub async fn cancel_area_selection(state: &AppState) -> Result<(), String> {
    let controller = controller_from_state(state);
    controller.cancel().await.map_err(|e| e.to_string())
}

pub async fn load_areas(state: &AppState) -> Result<AreaSet, String> {
    let controller = controller_from_state(state);
    controller.load().await.map_err(|e| e.to_string())
}
