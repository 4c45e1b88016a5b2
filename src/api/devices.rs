use crate::api::AppState;
use crate::api::schemas::devices::{ListDevicesResponse, RegisterDeviceRequest, RegisterDeviceResponse};
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

/// Registers a device token, or updates the owner and platform of a known one.
///
/// # Errors
/// Returns `AppError::Validation` if no token is supplied.
/// Returns a storage error if the registry cannot be written.
pub async fn register_device(
    State(state): State<AppState>,
    Json(payload): Json<RegisterDeviceRequest>,
) -> Result<impl IntoResponse> {
    let device = state
        .registry
        .upsert(payload.device_token.as_deref(), payload.user_id.as_deref(), payload.platform.as_deref())
        .await?;
    Ok(Json(RegisterDeviceResponse { success: true, device }))
}

/// Lists every registered device.
///
/// # Errors
/// Returns a storage error if the registry cannot be read.
pub async fn list_devices(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let devices = state.registry.list_all().await?;
    Ok(Json(ListDevicesResponse { count: devices.len(), devices }))
}

/// Removes a device. Unknown tokens succeed as well.
///
/// # Errors
/// Returns a storage error if the registry cannot be written.
pub async fn delete_device(State(state): State<AppState>, Path(token): Path<String>) -> Result<impl IntoResponse> {
    state.registry.delete(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}
