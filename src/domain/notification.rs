use crate::domain::device::DeviceFilter;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use time::OffsetDateTime;

/// Longest hold time the push services accept; FCM caps `ttl` at four weeks.
pub const MAX_TIME_TO_LIVE: Duration = Duration::from_secs(28 * 24 * 60 * 60);

/// A logical notification, independent of any push platform.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, Value>,
    pub target: DeviceFilter,
}

impl NotificationRequest {
    #[must_use]
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self { title: title.into(), body: body.into(), data: BTreeMap::new(), target: DeviceFilter::all() }
    }

    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: DeviceFilter) -> Self {
        self.target = target;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AndroidPriority {
    Normal,
    High,
}

impl AndroidPriority {
    #[must_use]
    pub const fn as_fcm_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::High => "HIGH",
        }
    }
}

/// Platform specific delivery hints attached to a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformHints {
    Ios { sound: String, badge: u32, content_available: bool },
    Android { priority: AndroidPriority, channel_id: String },
    None,
}

/// A notification shaped for one platform, ready to be handed to a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendPayload {
    pub title: String,
    pub body: String,
    /// Custom data; values are always strings since backends reject anything else.
    pub data: BTreeMap<String, String>,
    pub hints: PlatformHints,
    /// How long the backend may hold the notification for an offline device.
    pub time_to_live: Duration,
}

impl BackendPayload {
    /// Hold time capped at [`MAX_TIME_TO_LIVE`].
    #[must_use]
    pub fn bounded_ttl(&self) -> Duration {
        self.time_to_live.min(MAX_TIME_TO_LIVE)
    }

    /// Absolute expiry for backends that want a deadline rather than a duration.
    #[must_use]
    pub fn expires_at(&self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();
        time::Duration::try_from(self.bounded_ttl()).ok().and_then(|ttl| now.checked_add(ttl)).unwrap_or(now)
    }
}
