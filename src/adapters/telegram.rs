use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

/// Update kinds the relay asks Telegram to deliver.
pub const ALLOWED_UPDATES: [&str; 3] = ["message", "edited_message", "callback_query"];

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub text: Option<String>,
    pub from: Option<User>,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
}

/// The plain event the relay forwards: message text and the sender's display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub update_id: i64,
    pub text: String,
    pub sender_name: String,
}

impl Update {
    /// Extracts a text message, if this update carries one.
    #[must_use]
    pub fn into_chat_event(self) -> Option<ChatEvent> {
        let message = self.message?;
        let text = message.text.filter(|t| !t.trim().is_empty())?;
        let sender_name = message.from.map_or_else(|| "Unknown".to_string(), |from| from.first_name);
        Some(ChatEvent { update_id: self.update_id, text, sender_name })
    }
}

#[derive(Debug, Serialize)]
pub struct WebhookSetupReport {
    #[serde(rename = "webhookInfo")]
    pub webhook_info: Value,
    #[serde(rename = "setupResponse")]
    pub setup_response: Value,
}

/// Minimal Bot API client used to register the webhook.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
}

impl fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramClient").field("api_base", &self.api_base).finish_non_exhaustive()
    }
}

impl TelegramClient {
    #[must_use]
    pub fn new(http: reqwest::Client, api_base: impl Into<String>, bot_token: impl Into<String>) -> Self {
        Self { http, api_base: api_base.into(), bot_token: bot_token.into() }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base.trim_end_matches('/'), self.bot_token)
    }

    /// # Errors
    /// Returns a transport error if Telegram cannot be reached or replies with non-JSON.
    pub async fn get_webhook_info(&self) -> Result<Value, reqwest::Error> {
        self.http.get(self.method_url("getWebhookInfo")).send().await?.json().await
    }

    /// # Errors
    /// Returns a transport error if Telegram cannot be reached or replies with non-JSON.
    pub async fn set_webhook(&self, url: &str, secret_token: Option<&str>) -> Result<Value, reqwest::Error> {
        let mut body = json!({ "url": url, "allowed_updates": ALLOWED_UPDATES });
        if let Some(secret) = secret_token {
            body["secret_token"] = json!(secret);
        }
        self.http.post(self.method_url("setWebhook")).json(&body).send().await?.json().await
    }

    /// Reports the current webhook state, then points the webhook at `url`.
    ///
    /// # Errors
    /// Returns a transport error from either call.
    #[tracing::instrument(skip(self, secret_token), err)]
    pub async fn setup_webhook(&self, url: &str, secret_token: Option<&str>) -> Result<WebhookSetupReport, reqwest::Error> {
        let webhook_info = self.get_webhook_info().await?;
        tracing::debug!(info = %webhook_info, "Current Telegram webhook state");
        let setup_response = self.set_webhook(url, secret_token).await?;
        tracing::info!(response = %setup_response, "Telegram webhook configured");
        Ok(WebhookSetupReport { webhook_info, setup_response })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_message_becomes_event() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 42,
            "message": {
                "message_id": 7,
                "text": "hello",
                "from": { "id": 1001, "is_bot": false, "first_name": "Alice" },
                "chat": { "id": 1001, "type": "private" }
            }
        }))
        .unwrap();

        let event = update.into_chat_event().unwrap();
        assert_eq!(event, ChatEvent { update_id: 42, text: "hello".into(), sender_name: "Alice".into() });
    }

    #[test]
    fn test_non_text_update_is_ignored() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 43,
            "message": { "message_id": 8, "sticker": { "file_id": "x" }, "from": { "id": 1, "first_name": "Bob" } }
        }))
        .unwrap();
        assert!(update.into_chat_event().is_none());

        let update: Update = serde_json::from_value(json!({ "update_id": 44, "callback_query": { "id": "1" } })).unwrap();
        assert!(update.into_chat_event().is_none());
    }

    #[test]
    fn test_missing_sender_uses_placeholder() {
        let update: Update =
            serde_json::from_value(json!({ "update_id": 45, "message": { "text": "channel post" } })).unwrap();
        assert_eq!(update.into_chat_event().unwrap().sender_name, "Unknown");
    }

    #[test]
    fn test_method_url() {
        let client = TelegramClient::new(reqwest::Client::new(), "https://api.telegram.org/", "123:abc");
        assert_eq!(client.method_url("setWebhook"), "https://api.telegram.org/bot123:abc/setWebhook");
    }
}
