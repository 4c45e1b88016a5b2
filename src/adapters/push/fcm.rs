use crate::adapters::push::{PushBackend, PushError, outcome_from};
use crate::domain::delivery::DeliveryOutcome;
use crate::domain::notification::{BackendPayload, PlatformHints};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::fmt;

const FCM_URL: &str = "https://fcm.googleapis.com";

/// Project and OAuth2 bearer token for the FCM HTTP v1 API.
#[derive(Clone)]
pub struct FcmSettings {
    pub project_id: String,
    pub access_token: String,
}

impl fmt::Debug for FcmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FcmSettings").field("project_id", &self.project_id).finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
}

/// Firebase Cloud Messaging over the HTTP v1 API.
pub struct FcmBackend {
    http: reqwest::Client,
    endpoint: String,
    access_token: String,
}

impl fmt::Debug for FcmBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FcmBackend").field("endpoint", &self.endpoint).finish_non_exhaustive()
    }
}

impl FcmBackend {
    #[must_use]
    pub fn new(settings: FcmSettings, http: reqwest::Client) -> Self {
        Self {
            http,
            endpoint: format!("{FCM_URL}/v1/projects/{}/messages:send", settings.project_id),
            access_token: settings.access_token,
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn deliver(&self, payload: &BackendPayload, token: &str) -> Result<(), PushError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&request_body(payload, token))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.json::<ErrorEnvelope>().await.ok().map(|envelope| envelope.error);
        Err(classify_rejection(status, body.as_ref()))
    }
}

#[async_trait]
impl PushBackend for FcmBackend {
    fn name(&self) -> &'static str {
        "fcm"
    }

    async fn send(&self, payload: &BackendPayload, token: &str) -> DeliveryOutcome {
        outcome_from(token, self.deliver(payload, token).await)
    }
}

pub(crate) fn request_body(payload: &BackendPayload, token: &str) -> Value {
    let ttl = format!("{}s", payload.bounded_ttl().as_secs());
    let mut message = Map::new();
    message.insert("token".into(), Value::String(token.to_string()));
    message.insert("notification".into(), json!({ "title": payload.title, "body": payload.body }));
    message.insert("data".into(), json!(payload.data));

    match &payload.hints {
        PlatformHints::Android { priority, channel_id } => {
            message.insert(
                "android".into(),
                json!({
                    "priority": priority.as_fcm_str(),
                    "ttl": ttl,
                    "notification": { "channel_id": channel_id },
                }),
            );
        }
        PlatformHints::Ios { sound, badge, content_available } => {
            let expiration = payload.expires_at().unix_timestamp();
            let mut aps = json!({ "sound": sound, "badge": badge });
            if *content_available {
                aps["content-available"] = json!(1);
            }
            message.insert(
                "apns".into(),
                json!({
                    "headers": { "apns-priority": "10", "apns-expiration": expiration.to_string() },
                    "payload": { "aps": aps },
                }),
            );
        }
        PlatformHints::None => {
            message.insert("android".into(), json!({ "ttl": ttl }));
        }
    }

    json!({ "message": message })
}

fn classify_rejection(status: StatusCode, body: Option<&ErrorBody>) -> PushError {
    let error_code = body.and_then(|b| b.details.iter().find_map(|d| d.error_code.as_deref()));
    let status_name = body.and_then(|b| b.status.as_deref());
    let message = body.map_or_else(|| status.to_string(), |b| b.message.clone());

    match (status, error_code.or(status_name)) {
        (_, Some("UNREGISTERED")) => PushError::Unregistered(message),
        (_, Some("SENDER_ID_MISMATCH")) => PushError::BadToken(message),
        (_, Some("INVALID_ARGUMENT")) if message.contains("registration token") => PushError::BadToken(message),
        (StatusCode::TOO_MANY_REQUESTS, _) | (_, Some("QUOTA_EXCEEDED")) => PushError::QuotaExceeded,
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) | (_, Some("THIRD_PARTY_AUTH_ERROR")) => {
            PushError::Credentials(message)
        }
        (StatusCode::INTERNAL_SERVER_ERROR | StatusCode::SERVICE_UNAVAILABLE, _)
        | (_, Some("UNAVAILABLE" | "INTERNAL")) => PushError::Unavailable(message),
        _ => PushError::Rejected(format!("{status}: {message}")),
    }
}
