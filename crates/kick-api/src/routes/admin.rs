use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::info;

use kick_core::{SettingsPatch, TrackerSettings};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    #[serde(flatten)]
    pub settings: TrackerSettings,
    /// The channel list in the `username|Display Name` line format.
    pub kick_users_text: String,
    pub effective_interval_ms: u64,
}

impl From<&TrackerSettings> for ConfigResponse {
    fn from(settings: &TrackerSettings) -> Self {
        let kick_users_text = settings
            .channels()
            .iter()
            .map(|c| match c.display_name_override.as_deref() {
                Some(name) => format!("{}|{}", c.identifier, name),
                None => c.identifier.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            settings: settings.clone(),
            kick_users_text,
            effective_interval_ms: settings.effective_interval().as_millis() as u64,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub config: ConfigResponse,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub triggered: bool,
}

pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    let settings = state.tracker().settings();
    Json(ConfigResponse::from(settings.as_ref()))
}

/// Merge, validate, persist, then apply. Nothing changes unless every step succeeds.
pub async fn update_config(
    State(state): State<AppState>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let _guard = state.settings_lock.lock().await;

    let next = state.tracker().settings().merged(patch)?;

    if let Some(path) = state.settings_path.as_deref() {
        next.save(path)?;
    }

    let period = state.scheduler.reconfigure(next.clone()).await?;
    info!(
        channels = next.channels().len(),
        period_ms = period.as_millis() as u64,
        "Settings updated via admin API"
    );

    Ok(Json(UpdateResponse {
        success: true,
        config: ConfigResponse::from(&next),
    }))
}

/// Start an update cycle now instead of waiting for the next tick.
pub async fn refresh(State(state): State<AppState>) -> Result<Json<RefreshResponse>, ApiError> {
    if !state.scheduler.trigger() {
        return Err(ApiError::Conflict(
            "An update cycle is already running".into(),
        ));
    }
    Ok(Json(RefreshResponse { triggered: true }))
}
