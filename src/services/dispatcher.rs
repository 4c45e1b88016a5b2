use crate::adapters::push::{BackendRouter, PushBackend};
use crate::config::DispatchConfig;
use crate::domain::delivery::{DeliveryOutcome, DispatchSummary, FailureKind};
use crate::domain::device::{DeviceFilter, DeviceRecord, Platform};
use crate::domain::notification::{BackendPayload, NotificationRequest};
use crate::error::Result;
use crate::services::device_registry::DeviceRegistry;
use crate::services::payload_builder::PayloadBuilder;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::Instrument;

#[derive(Clone, Debug)]
struct Metrics {
    sent: Counter<u64>,
    errors: Counter<u64>,
    invalidated_tokens: Counter<u64>,
    fanout_duration: Histogram<f64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("push-relay");
        Self {
            sent: meter
                .u64_counter("push_sent_total")
                .with_description("Total number of push notifications successfully sent")
                .build(),
            errors: meter
                .u64_counter("push_errors_total")
                .with_description("Total number of push notification delivery errors")
                .build(),
            invalidated_tokens: meter
                .u64_counter("push_invalidated_tokens_total")
                .with_description("Total number of device tokens removed after being reported invalid")
                .build(),
            fanout_duration: meter
                .f64_histogram("push_fanout_duration_seconds")
                .with_description("Wall time of one notification fan-out")
                .build(),
        }
    }
}

/// Delivers one notification to every matching device and prunes dead tokens.
///
/// Each call works on the device snapshot taken when it starts.
#[derive(Debug)]
pub struct Dispatcher {
    registry: DeviceRegistry,
    builder: PayloadBuilder,
    router: BackendRouter,
    semaphore: Arc<Semaphore>,
    send_timeout: Duration,
    title: String,
    body_max_chars: usize,
    mock_token_prefix: Option<String>,
    metrics: Metrics,
}

impl Dispatcher {
    #[must_use]
    pub fn new(registry: DeviceRegistry, router: BackendRouter, config: &DispatchConfig) -> Self {
        Self {
            registry,
            builder: PayloadBuilder::new(config),
            router,
            semaphore: Arc::new(Semaphore::new(config.concurrency.max(1))),
            send_timeout: Duration::from_secs(config.send_timeout_secs),
            title: config.title.clone(),
            body_max_chars: config.body_max_chars,
            mock_token_prefix: Some(config.mock_token_prefix.clone()).filter(|p| !p.is_empty()),
            metrics: Metrics::new(),
        }
    }

    /// Relays a chat event to the devices selected by `filter`.
    ///
    /// # Errors
    /// Returns a storage error if the device list cannot be read. Delivery failures never
    /// produce an error; they are reported in the summary.
    #[tracing::instrument(skip_all, fields(sender = %sender_name))]
    pub async fn notify(&self, text: &str, sender_name: &str, filter: DeviceFilter) -> Result<DispatchSummary> {
        let request = self.event_request(text, sender_name, filter);
        self.dispatch(&request).await
    }

    /// Builds the notification for a chat event: fixed title, message text as body.
    #[must_use]
    pub fn event_request(&self, text: &str, sender_name: &str, filter: DeviceFilter) -> NotificationRequest {
        let now = OffsetDateTime::now_utc();
        let timestamp = now.format(&Rfc3339).unwrap_or_else(|_| now.unix_timestamp().to_string());
        let body: String = text.chars().take(self.body_max_chars).collect();

        NotificationRequest::new(self.title.clone(), body)
            .with_data("sender", sender_name)
            .with_data("messageType", "event")
            .with_data("timestamp", timestamp)
            .with_target(filter)
    }

    /// Fans a prepared notification out to its target devices.
    ///
    /// # Errors
    /// Returns a storage error if the device list cannot be read.
    pub async fn dispatch(&self, request: &NotificationRequest) -> Result<DispatchSummary> {
        let started = Instant::now();
        let filter = if request.target.exclude_token_prefix.is_some() {
            request.target.clone()
        } else {
            request.target.clone().excluding_prefix(self.mock_token_prefix.clone())
        };

        let devices = self.registry.list_by_filter(&filter).await?;
        let mut summary = DispatchSummary::default();

        if devices.is_empty() {
            tracing::info!("No registered devices, nothing to send");
            return Ok(summary);
        }

        tracing::info!(count = devices.len(), "Dispatching push notifications");

        let outcomes = self.deliver_all(request, devices, &mut summary).await;

        let mut invalid_tokens = Vec::new();
        for outcome in &outcomes {
            summary.record(outcome);
            match &outcome.failure {
                None => self.metrics.sent.add(1, &[]),
                Some(failure) => {
                    self.metrics.errors.add(1, &[KeyValue::new("reason", failure.kind.as_str())]);
                    if failure.kind == FailureKind::PermanentInvalidToken {
                        invalid_tokens.push(outcome.token.as_str());
                    }
                }
            }
        }

        summary.permanently_invalid_removed = self.remove_invalid_tokens(&invalid_tokens).await;

        self.metrics.fanout_duration.record(started.elapsed().as_secs_f64(), &[]);
        tracing::info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            removed = summary.permanently_invalid_removed,
            transient_failed = summary.transient_failed,
            unknown_failed = summary.unknown_failed,
            unrouted = summary.unrouted,
            "Fan-out finished"
        );
        Ok(summary)
    }

    async fn deliver_all(
        &self,
        request: &NotificationRequest,
        devices: Vec<DeviceRecord>,
        summary: &mut DispatchSummary,
    ) -> Vec<DeliveryOutcome> {
        let mut payloads: HashMap<Platform, Arc<BackendPayload>> = HashMap::new();
        let mut tasks = JoinSet::new();
        let mut task_tokens: HashMap<task::Id, String> = HashMap::new();

        for device in devices {
            let Some(backend) = self.router.route(device.platform) else {
                tracing::debug!(platform = %device.platform, "No backend for platform, skipping device");
                summary.unrouted += 1;
                continue;
            };
            let backend = Arc::clone(backend);
            let payload = Arc::clone(
                payloads.entry(device.platform).or_insert_with(|| Arc::new(self.builder.build(request, device.platform))),
            );

            // Closed only if the dispatcher is gone, in which case nothing can be delivered anyway.
            let Ok(permit) = Arc::clone(&self.semaphore).acquire_owned().await else {
                break;
            };
            let send_timeout = self.send_timeout;
            let token = device.token;
            let span = tracing::debug_span!("dispatch_push", backend = backend.name(), platform = %device.platform);

            let task_token = token.clone();
            let handle = tasks.spawn(
                async move {
                    let _permit = permit;
                    let outcome = send_with_timeout(backend.as_ref(), &payload, token, send_timeout).await;
                    match &outcome.failure {
                        None => tracing::debug!("Push notification sent"),
                        Some(failure) if failure.kind == FailureKind::PermanentInvalidToken => {
                            tracing::info!(reason = %failure.reason, "Token rejected as invalid");
                        }
                        Some(failure) => {
                            tracing::warn!(kind = failure.kind.as_str(), reason = %failure.reason, "Push delivery failed");
                        }
                    }
                    outcome
                }
                .instrument(span),
            );
            task_tokens.insert(handle.id(), task_token);
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    tracing::error!(error = %e, "Delivery task failed");
                    if let Some(token) = task_tokens.remove(&e.id()) {
                        outcomes.push(DeliveryOutcome::failed(
                            token,
                            FailureKind::Unknown,
                            format!("delivery task failed: {e}"),
                        ));
                    }
                }
            }
        }
        outcomes
    }

    async fn remove_invalid_tokens(&self, tokens: &[&str]) -> usize {
        let results = futures::future::join_all(tokens.iter().map(|token| async move {
            match self.registry.delete(token).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to delete invalid token, will retry on next failed send");
                    false
                }
            }
        }))
        .await;

        let removed = results.into_iter().filter(|removed| *removed).count();
        if removed > 0 {
            self.metrics.invalidated_tokens.add(removed as u64, &[]);
        }
        removed
    }
}

async fn send_with_timeout(
    backend: &dyn PushBackend,
    payload: &BackendPayload,
    token: String,
    send_timeout: Duration,
) -> DeliveryOutcome {
    match tokio::time::timeout(send_timeout, backend.send(payload, &token)).await {
        Ok(outcome) => outcome,
        Err(_) => DeliveryOutcome::failed(
            token,
            FailureKind::Transient,
            format!("no response within {}s", send_timeout.as_secs()),
        ),
    }
}
