use crate::adapters::telegram::TelegramClient;
use crate::services::{DeviceRegistry, EventRelay, HealthService};
use axum::body::Body;
use axum::http::{HeaderName, Request};
use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub mod devices;
pub mod health;
pub mod schemas;
pub mod telegram;
pub mod webhooks;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone, Debug)]
pub struct AppState {
    pub registry: DeviceRegistry,
    pub relay: EventRelay,
    pub telegram_secret: Option<String>,
}

#[derive(Clone, Debug)]
pub struct MgmtState {
    pub health_service: HealthService,
    pub telegram: Option<TelegramClient>,
    pub webhook_url: Option<String>,
    pub telegram_secret: Option<String>,
}

/// Configures the public router: device registration and the inbound webhook.
pub fn app_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/devices", post(devices::register_device).get(devices::list_devices))
        .route("/devices/{token}", delete(devices::delete_device))
        .route("/webhooks/telegram", post(webhooks::telegram_webhook));

    with_http_tracing(Router::new().nest("/v1", api_routes)).with_state(state)
}

/// Configures the management router: probes and webhook administration.
pub fn mgmt_router(state: MgmtState) -> Router {
    Router::new()
        .route("/livez", get(health::livez))
        .route("/readyz", get(health::readyz))
        .route("/telegram/webhook", post(telegram::setup_webhook))
        .with_state(state)
}

fn with_http_tracing<S: Clone + Send + Sync + 'static>(router: Router<S>) -> Router<S> {
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);

    router
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .extensions()
                        .get::<RequestId>()
                        .and_then(|id| id.header_value().to_str().ok())
                        .unwrap_or_default()
                        .to_string();

                    tracing::info_span!(
                        "request",
                        "request_id" = %request_id,
                        "http.request.method" = %request.method(),
                        "url.path" = %request.uri().path(),
                        "http.response.status_code" = tracing::field::Empty,
                        "otel.kind" = "server",
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                        let status = response.status();
                        span.record("http.response.status_code", status.as_u16());

                        tracing::info!(
                            latency_ms = %latency.as_millis(),
                            status = %status.as_u16(),
                            "request completed"
                        );
                    },
                )
                .on_failure(|error, _latency, _span: &tracing::Span| {
                    tracing::error!(error = %error, "request failed");
                }),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
}
