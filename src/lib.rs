#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

pub mod adapters;
pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod storage;
pub mod telemetry;

use crate::adapters::push::apns::ApnsSettings;
use crate::adapters::push::fcm::FcmSettings;
use crate::adapters::push::{ApnsBackend, BackendRouter, DryRunBackend, FcmBackend, PushBackend};
use crate::adapters::telegram::TelegramClient;
use crate::api::{AppState, MgmtState};
use crate::config::{ApnsConfig, Config, DatabaseConfig, FcmConfig};
use crate::domain::device::Platform;
use crate::services::{DeviceRegistry, Dispatcher, EventRelay, HealthService};
use crate::storage::{DeviceStore, InMemoryDeviceStore, PgDeviceStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::task::TaskTracker;

const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(30);

/// Fully wired application, ready to be served.
#[derive(Debug)]
pub struct App {
    pub api_state: AppState,
    pub mgmt_state: MgmtState,
    pub dispatcher: Arc<Dispatcher>,
    /// Tracks detached fan-outs so shutdown can wait for them.
    pub tracker: TaskTracker,
}

#[derive(Debug)]
pub struct AppBuilder {
    config: Config,
    store: Option<Arc<dyn DeviceStore>>,
    router: Option<BackendRouter>,
    http: Option<reqwest::Client>,
}

impl AppBuilder {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config, store: None, router: None, http: None }
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn DeviceStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_backends(mut self, router: BackendRouter) -> Self {
        self.router = Some(router);
        self
    }

    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Wires services on top of the supplied store and backends.
    ///
    /// Missing pieces fall back to an in-memory store and the backends described by the config.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built or a backend rejects its credentials.
    pub fn build(self) -> anyhow::Result<App> {
        let http = match self.http {
            Some(http) => http,
            None => build_http_client()?,
        };
        let store = self.store.unwrap_or_else(|| Arc::new(InMemoryDeviceStore::new()));
        let router = match self.router {
            Some(router) => router,
            None => build_backend_router(&self.config, &http)?,
        };

        let registry = DeviceRegistry::new(store);
        let dispatcher = Arc::new(Dispatcher::new(registry.clone(), router, &self.config.dispatch));
        let tracker = TaskTracker::new();
        let relay = EventRelay::new(
            Arc::clone(&dispatcher),
            Duration::from_secs(self.config.telegram.dedup_window_secs),
            tracker.clone(),
        );

        let telegram = self
            .config
            .telegram
            .bot_token
            .as_ref()
            .map(|token| TelegramClient::new(http.clone(), self.config.telegram.api_base.clone(), token.clone()));

        let api_state = AppState {
            registry: registry.clone(),
            relay,
            telegram_secret: self.config.telegram.secret_token.clone(),
        };
        let mgmt_state = MgmtState {
            health_service: HealthService::new(registry, self.config.health.clone()),
            telegram,
            webhook_url: self.config.telegram.webhook_url.clone(),
            telegram_secret: self.config.telegram.secret_token,
        };

        Ok(App { api_state, mgmt_state, dispatcher, tracker })
    }
}

/// Opens the device store described by the config: Postgres when a URL is set, memory otherwise.
///
/// # Errors
/// Returns an error if the database cannot be reached or migrations fail.
pub async fn init_store(config: &DatabaseConfig) -> anyhow::Result<Arc<dyn DeviceStore>> {
    let Some(url) = config.url.as_deref() else {
        tracing::warn!("No database URL configured, devices are kept in memory");
        return Ok(Arc::new(InMemoryDeviceStore::new()));
    };

    let pool = storage::init_pool(url, config).await?;
    storage::run_migrations(&pool).await?;
    Ok(Arc::new(PgDeviceStore::new(pool)))
}

/// # Errors
/// Returns an error if the TLS backend cannot be initialized.
pub fn build_http_client() -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(OUTBOUND_TIMEOUT).build()?)
}

/// Builds the platform routing table from configured credentials.
///
/// APNs serves iOS unless FCM is told to. FCM serves Android and acts as fallback for other platforms.
/// With no credentials at all every device goes to the dry-run backend.
///
/// # Errors
/// Returns an error if the APNs signing key cannot be read or parsed.
pub fn build_backend_router(config: &Config, http: &reqwest::Client) -> anyhow::Result<BackendRouter> {
    let apns = apns_backend(&config.apns, http)?;
    let fcm = fcm_backend(&config.fcm, http);

    if apns.is_none() && fcm.is_none() {
        tracing::warn!("No push credentials configured, notifications are only logged");
        return Ok(BackendRouter::single(Arc::new(DryRunBackend::default())));
    }

    let mut router = BackendRouter::new();
    if let Some(apns) = apns {
        router = router.with_route(Platform::Ios, apns);
    }
    if let Some(fcm) = fcm {
        router = router.with_route(Platform::Android, Arc::clone(&fcm));
        if config.fcm.serves_ios {
            router = router.with_route(Platform::Ios, Arc::clone(&fcm));
        }
        router = router.with_fallback(fcm);
    }
    Ok(router)
}

fn apns_backend(config: &ApnsConfig, http: &reqwest::Client) -> anyhow::Result<Option<Arc<dyn PushBackend>>> {
    let (Some(key_path), Some(key_id), Some(team_id), Some(topic)) =
        (config.key_path.as_ref(), config.key_id.as_ref(), config.team_id.as_ref(), config.topic.as_ref())
    else {
        return Ok(None);
    };

    let signing_key_pem = std::fs::read(key_path)
        .map_err(|e| anyhow::anyhow!("Failed to read APNs key {}: {e}", key_path.display()))?;
    let settings = ApnsSettings {
        signing_key_pem,
        key_id: key_id.clone(),
        team_id: team_id.clone(),
        topic: topic.clone(),
        environment: config.environment,
    };

    tracing::info!(environment = ?config.environment, topic = %topic, "APNs delivery enabled");
    Ok(Some(Arc::new(ApnsBackend::new(settings, http.clone())?)))
}

fn fcm_backend(config: &FcmConfig, http: &reqwest::Client) -> Option<Arc<dyn PushBackend>> {
    let (Some(project_id), Some(access_token)) = (config.project_id.as_ref(), config.access_token.as_ref()) else {
        return None;
    };

    tracing::info!(project_id = %project_id, "FCM delivery enabled");
    let settings = FcmSettings { project_id: project_id.clone(), access_token: access_token.clone() };
    Some(Arc::new(FcmBackend::new(settings, http.clone())))
}

/// Flips the shutdown channel on SIGINT or SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for SIGINT");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {},
            () = terminate => {},
        }

        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });
}

/// Routes panics through tracing before the default hook runs.
pub fn setup_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!(panic = %info, "Unhandled panic");
        default_hook(info);
    }));
}
