#![allow(dead_code)]
use async_trait::async_trait;
use clap::Parser;
use push_relay::adapters::push::{BackendRouter, PushBackend};
use push_relay::config::Config;
use push_relay::domain::delivery::{DeliveryOutcome, FailureKind};
use push_relay::domain::notification::BackendPayload;
use push_relay::services::Dispatcher;
use push_relay::storage::InMemoryDeviceStore;
use push_relay::{App, AppBuilder};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::task::TaskTracker;

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("push_relay=debug".parse().unwrap())
            .add_directive("tower=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap())
            .add_directive("rustls=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().init();
    });
}

pub fn get_test_config() -> Config {
    Config::try_parse_from(["push-relay", "--host", "127.0.0.1", "--port", "0", "--mgmt-port", "0"]).unwrap()
}

/// Backend that records every send and answers with scripted failures.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    sent: Mutex<Vec<(String, BackendPayload)>>,
    failures: Mutex<HashMap<String, FailureKind>>,
}

impl RecordingBackend {
    pub fn fail(&self, token: &str, kind: FailureKind) {
        self.failures.lock().unwrap().insert(token.to_string(), kind);
    }

    pub fn sent(&self) -> Vec<(String, BackendPayload)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self.sent().into_iter().map(|(token, _)| token).collect();
        tokens.sort();
        tokens
    }
}

#[async_trait]
impl PushBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, payload: &BackendPayload, token: &str) -> DeliveryOutcome {
        self.sent.lock().unwrap().push((token.to_string(), payload.clone()));
        match self.failures.lock().unwrap().get(token) {
            Some(kind) => DeliveryOutcome::failed(token, *kind, "scripted"),
            None => DeliveryOutcome::delivered(token),
        }
    }
}

pub struct TestApp {
    pub server_url: String,
    pub mgmt_url: String,
    pub client: reqwest::Client,
    pub store: InMemoryDeviceStore,
    pub backend: Arc<RecordingBackend>,
    pub dispatcher: Arc<Dispatcher>,
    pub tracker: TaskTracker,
    pub config: Config,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_config(get_test_config()).await
    }

    pub async fn spawn_with_config(config: Config) -> Self {
        let backend = Arc::new(RecordingBackend::default());
        let router = BackendRouter::single(backend.clone());
        Self::spawn_with_backends(config, router, backend).await
    }

    pub async fn spawn_with_backends(config: Config, router: BackendRouter, backend: Arc<RecordingBackend>) -> Self {
        setup_tracing();

        let store = InMemoryDeviceStore::new();
        let app: App = AppBuilder::new(config.clone())
            .with_store(Arc::new(store.clone()))
            .with_backends(router)
            .build()
            .unwrap();

        let tracker = app.tracker.clone();
        let dispatcher = Arc::clone(&app.dispatcher);
        let api_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mgmt_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server_url = format!("http://{}", api_listener.local_addr().unwrap());
        let mgmt_url = format!("http://{}", mgmt_listener.local_addr().unwrap());

        let app_router = push_relay::api::app_router(app.api_state);
        let mgmt_app = push_relay::api::mgmt_router(app.mgmt_state);
        tokio::spawn(async move { axum::serve(api_listener, app_router).await.unwrap() });
        tokio::spawn(async move { axum::serve(mgmt_listener, mgmt_app).await.unwrap() });

        Self { server_url, mgmt_url, client: reqwest::Client::new(), store, backend, dispatcher, tracker, config }
    }

    pub async fn register(&self, token: &str, user_id: Option<&str>, platform: Option<&str>) -> reqwest::Response {
        let mut body = serde_json::json!({ "deviceToken": token });
        if let Some(user_id) = user_id {
            body["userId"] = user_id.into();
        }
        if let Some(platform) = platform {
            body["platform"] = platform.into();
        }
        self.client.post(format!("{}/v1/devices", self.server_url)).json(&body).send().await.unwrap()
    }

    pub async fn post_update(&self, update: &serde_json::Value) -> reqwest::Response {
        self.client.post(format!("{}/v1/webhooks/telegram", self.server_url)).json(update).send().await.unwrap()
    }

    /// Polls until `count` sends are recorded or the timeout elapses.
    pub async fn wait_for_sends(&self, count: usize) -> Vec<String> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let tokens = self.backend.sent_tokens();
            if tokens.len() >= count || tokio::time::Instant::now() >= deadline {
                return tokens;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

pub fn text_update(update_id: i64, text: &str, first_name: &str) -> serde_json::Value {
    serde_json::json!({
        "update_id": update_id,
        "message": {
            "message_id": 1,
            "text": text,
            "from": { "id": 42, "first_name": first_name, "is_bot": false },
            "chat": { "id": 42, "type": "private" }
        }
    })
}
