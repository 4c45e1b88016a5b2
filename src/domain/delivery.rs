use serde::Serialize;

/// How a failed delivery should be treated by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// Retryable later: network trouble, rate limits, credential refresh.
    Transient,
    /// The backend will never accept this token again; it must be removed.
    PermanentInvalidToken,
    /// Unclassified. Kept like a transient failure but reported separately.
    Unknown,
}

impl FailureKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::PermanentInvalidToken => "permanent_invalid_token",
            Self::Unknown => "unknown",
        }
    }
}

/// Result of one delivery attempt to one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub token: String,
    pub failure: Option<DeliveryFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub kind: FailureKind,
    pub reason: String,
}

impl DeliveryOutcome {
    #[must_use]
    pub fn delivered(token: impl Into<String>) -> Self {
        Self { token: token.into(), failure: None }
    }

    #[must_use]
    pub fn failed(token: impl Into<String>, kind: FailureKind, reason: impl Into<String>) -> Self {
        Self { token: token.into(), failure: Some(DeliveryFailure { kind, reason: reason.into() }) }
    }

    #[must_use]
    pub const fn success(&self) -> bool {
        self.failure.is_none()
    }

    #[must_use]
    pub fn error_kind(&self) -> Option<FailureKind> {
        self.failure.as_ref().map(|f| f.kind)
    }
}

/// Aggregate counts for one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub permanently_invalid_removed: usize,
    pub transient_failed: usize,
    pub unknown_failed: usize,
    /// Devices skipped because no backend serves their platform.
    pub unrouted: usize,
}

impl DispatchSummary {
    pub(crate) fn record(&mut self, outcome: &DeliveryOutcome) {
        self.attempted += 1;
        match outcome.error_kind() {
            None => self.succeeded += 1,
            Some(FailureKind::Transient) => self.transient_failed += 1,
            Some(FailureKind::Unknown) => self.unknown_failed += 1,
            // Counted once the registry deletion actually succeeds.
            Some(FailureKind::PermanentInvalidToken) => {}
        }
    }
}
