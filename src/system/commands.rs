use crate::{
    events::{DashboardEvent, LogEntry},
    models::{SignalId, VideoSourceSet},
    settings::TimingSettings,
    system::{DetectionReport, RuntimeState, SystemController},
};

use crate::AppState;

fn controller_from_state(state: &AppState) -> SystemController {
    state.system.clone()
}

/// Replaces all four sources at once. Blank descriptors leave a signal unset.
pub async fn configure_video_sources(
    state: &AppState,
    sources: VideoSourceSet,
) -> Result<VideoSourceSet, String> {
    state
        .settings
        .update_video_sources(sources.clone())
        .map_err(|e| e.to_string())?;
    state.sources.replace(sources.clone());
    state.events.emit(DashboardEvent::VideoSourcesConfigured);
    Ok(sources)
}

pub async fn get_video_sources(state: &AppState) -> Result<VideoSourceSet, String> {
    Ok(state.sources.snapshot())
}

pub async fn start_system(state: &AppState) -> Result<RuntimeState, String> {
    let controller = controller_from_state(state);
    controller.start().await.map_err(|e| e.to_string())
}

pub async fn stop_system(state: &AppState) -> Result<RuntimeState, String> {
    let controller = controller_from_state(state);
    Ok(controller.stop().await)
}

pub async fn get_system_state(state: &AppState) -> Result<RuntimeState, String> {
    let controller = controller_from_state(state);
    Ok(controller.get_state().await)
}

pub async fn record_detection(
    state: &AppState,
    signal: SignalId,
    report: DetectionReport,
) -> Result<(), String> {
    let controller = controller_from_state(state);
    controller.record_detection(signal, report).await;
    Ok(())
}

pub async fn get_timing_settings(state: &AppState) -> Result<TimingSettings, String> {
    Ok(state.settings.timings())
}

pub async fn update_timing_settings(
    state: &AppState,
    timings: TimingSettings,
) -> Result<TimingSettings, String> {
    state
        .settings
        .update_timings(timings.clone())
        .map_err(|e| e.to_string())?;
    state.events.emit(DashboardEvent::SettingsUpdated);
    Ok(timings)
}

pub async fn get_system_log(state: &AppState) -> Result<Vec<LogEntry>, String> {
    Ok(state.events.entries())
}
