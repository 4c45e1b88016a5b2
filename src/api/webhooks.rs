use crate::adapters::telegram::Update;
use crate::api::AppState;
use crate::error::AppError;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Receives a Telegram update and schedules the fan-out without waiting for it.
///
/// Anything that authenticates is acknowledged with 200 so Telegram does not redeliver.
///
/// # Errors
/// Returns `AppError::Unauthorized` if a secret token is configured and the request does not carry it.
pub async fn telegram_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<Update>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(expected) = state.telegram_secret.as_deref() {
        let supplied = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if supplied != Some(expected) {
            return Err(AppError::Unauthorized);
        }
    }

    let ack = (StatusCode::OK, Json(serde_json::json!({ "ok": true })));

    let Json(update) = match payload {
        Ok(update) => update,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Ignoring unparseable Telegram update");
            return Ok(ack);
        }
    };

    let update_id = update.update_id;
    match update.into_chat_event() {
        Some(event) => {
            tracing::info!(update_id, sender = %event.sender_name, "Telegram message received");
            state.relay.relay(event);
        }
        None => tracing::debug!(update_id, "Ignoring update without message text"),
    }

    Ok(ack)
}
