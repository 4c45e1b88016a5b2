use crate::api::MgmtState;
use crate::error::{AppError, Result};
use axum::{Json, extract::State, response::IntoResponse};

/// Points the Telegram bot's webhook at this relay.
///
/// # Errors
/// Returns `AppError::Validation` if the bot token or webhook URL is not configured.
/// Returns `AppError::Upstream` if the Bot API call fails.
pub async fn setup_webhook(State(state): State<MgmtState>) -> Result<impl IntoResponse> {
    let (Some(client), Some(url)) = (state.telegram.as_ref(), state.webhook_url.as_deref()) else {
        return Err(AppError::Validation("Telegram bot token and webhook URL must be configured".into()));
    };

    let report = client
        .setup_webhook(url, state.telegram_secret.as_deref())
        .await
        .map_err(|e| AppError::Upstream(format!("Telegram API request failed: {e}")))?;

    Ok(Json(report))
}
