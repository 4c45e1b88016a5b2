use crate::config::DispatchConfig;
use crate::domain::device::Platform;
use crate::domain::notification::{
    AndroidPriority, BackendPayload, MAX_TIME_TO_LIVE, NotificationRequest, PlatformHints,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Shapes logical notifications into per-platform payloads.
#[derive(Clone, Debug)]
pub struct PayloadBuilder {
    android_channel_id: String,
    time_to_live: Duration,
}

impl PayloadBuilder {
    #[must_use]
    pub fn new(config: &DispatchConfig) -> Self {
        Self {
            android_channel_id: config.android_channel_id.clone(),
            time_to_live: Duration::from_secs(config.notification_ttl_secs).min(MAX_TIME_TO_LIVE),
        }
    }

    #[must_use]
    pub fn build(&self, request: &NotificationRequest, platform: Platform) -> BackendPayload {
        let hints = match platform {
            Platform::Ios => PlatformHints::Ios { sound: "default".to_string(), badge: 1, content_available: true },
            Platform::Android => PlatformHints::Android {
                priority: AndroidPriority::High,
                channel_id: self.android_channel_id.clone(),
            },
            Platform::Other => PlatformHints::None,
        };

        BackendPayload {
            title: request.title.clone(),
            body: request.body.clone(),
            data: stringify_data(&request.data),
            hints,
            time_to_live: self.time_to_live,
        }
    }
}

fn stringify_data(data: &BTreeMap<String, Value>) -> BTreeMap<String, String> {
    data.iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> NotificationRequest {
        NotificationRequest::new("New message", "hello")
            .with_data("sender", "Alice")
            .with_data("count", 3)
            .with_data("flags", json!({"urgent": true}))
            .with_data("empty", Value::Null)
    }

    fn builder() -> PayloadBuilder {
        PayloadBuilder::new(&DispatchConfig::default())
    }

    #[test]
    fn test_ios_payload_has_sound_badge_and_background_flag() {
        let payload = builder().build(&request(), Platform::Ios);

        assert_eq!(
            payload.hints,
            PlatformHints::Ios { sound: "default".into(), badge: 1, content_available: true }
        );
        assert_eq!(payload.title, "New message");
        assert_eq!(payload.body, "hello");
    }

    #[test]
    fn test_android_payload_has_priority_and_channel() {
        let payload = builder().build(&request(), Platform::Android);

        assert_eq!(
            payload.hints,
            PlatformHints::Android { priority: AndroidPriority::High, channel_id: "default".into() }
        );
    }

    #[test]
    fn test_other_platform_gets_base_fields_only() {
        let payload = builder().build(&request(), Platform::Other);

        assert_eq!(payload.hints, PlatformHints::None);
        assert_eq!(payload.title, "New message");
        assert_eq!(payload.body, "hello");
        assert_eq!(payload.data.get("sender").map(String::as_str), Some("Alice"));
    }

    #[test]
    fn test_data_values_are_coerced_to_strings() {
        let payload = builder().build(&request(), Platform::Ios);

        assert_eq!(payload.data["sender"], "Alice");
        assert_eq!(payload.data["count"], "3");
        assert_eq!(payload.data["flags"], r#"{"urgent":true}"#);
        assert_eq!(payload.data["empty"], "");
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = builder();
        let req = request();
        assert_eq!(builder.build(&req, Platform::Android), builder.build(&req, Platform::Android));
    }

    #[test]
    fn test_ttl_follows_config() {
        let config = DispatchConfig { notification_ttl_secs: 120, ..DispatchConfig::default() };
        let payload = PayloadBuilder::new(&config).build(&request(), Platform::Ios);
        assert_eq!(payload.time_to_live, Duration::from_secs(120));
    }

    #[test]
    fn test_ttl_is_capped_at_four_weeks() {
        let config = DispatchConfig { notification_ttl_secs: u64::MAX, ..DispatchConfig::default() };
        let payload = PayloadBuilder::new(&config).build(&request(), Platform::Ios);
        assert_eq!(payload.time_to_live, MAX_TIME_TO_LIVE);
    }
}
