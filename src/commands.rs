use tauri::{command, AppHandle, Runtime};

use crate::models::*;
use crate::ReadAloudExt;
use crate::Result;

/// Start reading the given text aloud
#[command]
pub(crate) async fn start<R: Runtime>(
    app: AppHandle<R>,
    payload: StartRequest,
) -> Result<StatusResponse> {
    app.read_aloud().start(payload)
}

/// Stop reading and discard the session
#[command]
pub(crate) async fn stop<R: Runtime>(app: AppHandle<R>) -> Result<StatusResponse> {
    app.read_aloud().stop()
}

/// Pause, resume, or restart the last text when idle
#[command]
pub(crate) async fn toggle_pause<R: Runtime>(app: AppHandle<R>) -> Result<StatusResponse> {
    app.read_aloud().toggle_pause()
}

/// Update rate and volume, live when an utterance is in flight
#[command]
pub(crate) async fn update_settings<R: Runtime>(
    app: AppHandle<R>,
    payload: SettingsRequest,
) -> Result<StatusResponse> {
    app.read_aloud().update_settings(payload)
}

#[command]
pub(crate) async fn status<R: Runtime>(app: AppHandle<R>) -> Result<StatusResponse> {
    app.read_aloud().status()
}

/// Check whether speech synthesis is usable on this platform
#[command]
pub(crate) async fn is_available<R: Runtime>(app: AppHandle<R>) -> Result<AvailabilityResponse> {
    app.read_aloud().is_available()
}
