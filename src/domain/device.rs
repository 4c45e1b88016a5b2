use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

/// Owner assigned to devices registered without a user id.
pub const ANONYMOUS_OWNER: &str = "anonymous";

/// The push platform a device token was issued by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Ios,
    Android,
    Other,
}

impl Platform {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
            Self::Other => "other",
        }
    }

    /// Parses a client supplied platform label.
    ///
    /// Missing or blank labels resolve to [`Platform::Ios`]; anything unrecognized
    /// resolves to [`Platform::Other`] so the device still receives the base payload.
    #[must_use]
    pub fn from_label(label: Option<&str>) -> Self {
        let Some(label) = label.map(str::trim).filter(|l| !l.is_empty()) else {
            return Self::default();
        };

        match label.to_ascii_lowercase().as_str() {
            "ios" | "apns" | "iphone" | "ipad" => Self::Ios,
            "android" | "fcm" => Self::Android,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered push endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub token: String,
    #[serde(rename = "userId")]
    pub owner_id: String,
    pub platform: Platform,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Validated registration input, ready to be written to a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDevice {
    pub token: String,
    pub owner_id: String,
    pub platform: Platform,
}

/// Selects which devices receive a notification.
///
/// Criteria are combined with AND; an empty filter matches every device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    pub owner_id: Option<String>,
    pub platform: Option<Platform>,
    pub exclude_token_prefix: Option<String>,
}

impl DeviceFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn owner(owner_id: impl Into<String>) -> Self {
        Self { owner_id: Some(owner_id.into()), ..Self::default() }
    }

    #[must_use]
    pub fn platform(platform: Platform) -> Self {
        Self { platform: Some(platform), ..Self::default() }
    }

    #[must_use]
    pub fn excluding_prefix(mut self, prefix: Option<String>) -> Self {
        if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
            self.exclude_token_prefix = Some(prefix);
        }
        self
    }

    #[must_use]
    pub fn matches(&self, device: &DeviceRecord) -> bool {
        if let Some(owner) = &self.owner_id
            && device.owner_id != *owner
        {
            return false;
        }
        if let Some(platform) = self.platform
            && device.platform != platform
        {
            return false;
        }
        if let Some(prefix) = &self.exclude_token_prefix
            && device.token.starts_with(prefix.as_str())
        {
            return false;
        }
        true
    }
}
