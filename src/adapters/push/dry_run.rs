use crate::adapters::push::PushBackend;
use crate::domain::delivery::DeliveryOutcome;
use crate::domain::notification::BackendPayload;
use async_trait::async_trait;

/// Logs notifications instead of delivering them. Used when a platform has no credentials.
#[derive(Debug, Clone)]
pub struct DryRunBackend {
    name: &'static str,
}

impl DryRunBackend {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl Default for DryRunBackend {
    fn default() -> Self {
        Self::new("dry-run")
    }
}

#[async_trait]
impl PushBackend for DryRunBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn send(&self, payload: &BackendPayload, token: &str) -> DeliveryOutcome {
        tracing::info!(
            backend = self.name,
            token = %token,
            title = %payload.title,
            hints = ?payload.hints,
            "Dry run: push notification not sent"
        );
        DeliveryOutcome::delivered(token)
    }
}
