pub mod apns;
pub mod dry_run;
pub mod fcm;
pub mod router;

use crate::domain::delivery::{DeliveryOutcome, FailureKind};
use crate::domain::notification::BackendPayload;
use async_trait::async_trait;
use thiserror::Error;

pub use apns::ApnsBackend;
pub use dry_run::DryRunBackend;
pub use fcm::FcmBackend;
pub use router::BackendRouter;

#[derive(Error, Debug)]
pub enum PushError {
    #[error("Token is no longer registered: {0}")]
    Unregistered(String),
    #[error("Token rejected as invalid: {0}")]
    BadToken(String),
    #[error("Rate limit exceeded")]
    QuotaExceeded,
    #[error("Provider credentials rejected: {0}")]
    Credentials(String),
    #[error("Push service unavailable: {0}")]
    Unavailable(String),
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Rejected by push service: {0}")]
    Rejected(String),
    #[error("External service error: {0}")]
    Other(#[from] anyhow::Error),
}

impl PushError {
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Unregistered(_) | Self::BadToken(_) => FailureKind::PermanentInvalidToken,
            Self::QuotaExceeded | Self::Credentials(_) | Self::Unavailable(_) | Self::Transport(_) => {
                FailureKind::Transient
            }
            Self::Rejected(_) | Self::Other(_) => FailureKind::Unknown,
        }
    }

    #[must_use]
    pub fn into_outcome(self, token: &str) -> DeliveryOutcome {
        DeliveryOutcome::failed(token, self.kind(), self.to_string())
    }
}

/// A push transport able to deliver a payload to a device token.
///
/// Failures are reported inside the returned [`DeliveryOutcome`]; one bad token never
/// fails the others.
#[async_trait]
pub trait PushBackend: Send + Sync + std::fmt::Debug {
    /// Short label used in logs and metrics.
    fn name(&self) -> &'static str;

    async fn send(&self, payload: &BackendPayload, token: &str) -> DeliveryOutcome;

    /// Delivers the same payload to several tokens, one outcome per token in input order.
    async fn send_batch(&self, payload: &BackendPayload, tokens: &[String]) -> Vec<DeliveryOutcome> {
        futures::future::join_all(tokens.iter().map(|token| self.send(payload, token))).await
    }
}

/// Maps a backend call result onto an outcome.
pub(crate) fn outcome_from(token: &str, result: Result<(), PushError>) -> DeliveryOutcome {
    match result {
        Ok(()) => DeliveryOutcome::delivered(token),
        Err(e) => e.into_outcome(token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notification::PlatformHints;
    use std::collections::BTreeMap;
    use std::time::Duration;

    #[derive(Debug)]
    struct RejectOdd;

    #[async_trait]
    impl PushBackend for RejectOdd {
        fn name(&self) -> &'static str {
            "reject-odd"
        }

        async fn send(&self, _payload: &BackendPayload, token: &str) -> DeliveryOutcome {
            let n: u32 = token.parse().unwrap_or_default();
            if n % 2 == 1 {
                PushError::Unregistered("odd".into()).into_outcome(token)
            } else {
                DeliveryOutcome::delivered(token)
            }
        }
    }

    #[tokio::test]
    async fn test_default_batch_keeps_order_and_isolates_failures() {
        let payload = BackendPayload {
            title: "t".into(),
            body: "b".into(),
            data: BTreeMap::new(),
            hints: PlatformHints::None,
            time_to_live: Duration::from_secs(60),
        };
        let tokens: Vec<String> = (0..4).map(|i| i.to_string()).collect();

        let outcomes = RejectOdd.send_batch(&payload, &tokens).await;

        assert_eq!(outcomes.len(), 4);
        assert_eq!(outcomes.iter().map(|o| o.token.as_str()).collect::<Vec<_>>(), ["0", "1", "2", "3"]);
        assert!(outcomes[0].success());
        assert_eq!(outcomes[1].error_kind(), Some(FailureKind::PermanentInvalidToken));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(PushError::BadToken("x".into()).kind(), FailureKind::PermanentInvalidToken);
        assert_eq!(PushError::QuotaExceeded.kind(), FailureKind::Transient);
        assert_eq!(PushError::Credentials("expired".into()).kind(), FailureKind::Transient);
        assert_eq!(PushError::Rejected("PayloadTooLarge".into()).kind(), FailureKind::Unknown);
    }
}
