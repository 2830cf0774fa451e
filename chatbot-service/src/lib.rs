pub mod config;
pub mod handlers;
pub mod services;

use axum::{routing::get, Router};
use service_core::store::PaymentStore;
use service_core::surface::{ConfigSurface, UpiConfig};
use service_core::whatsapp::WhatsAppClient;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

use config::Config;
use services::{
    init_metrics, CodeResolver, DedupCache, IssueJob, IssueWorkerPool, QrComposer, QrIssuer,
};

/// Shared application state. Everything is constructed once in
/// [`Application::build`] and injected into the handlers; the webhook only
/// enqueues jobs, the worker pool owns the issuance pipeline.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: PaymentStore,
    pub whatsapp: WhatsAppClient,
    pub resolver: CodeResolver,
    pub dedup: Arc<DedupCache>,
    pub job_tx: mpsc::Sender<IssueJob>,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
    pool: IssueWorkerPool,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        init_metrics();

        let store = PaymentStore::connect(&config.mongodb.uri, &config.mongodb.database).await?;
        let surface = ConfigSurface::new(&config.files.merchant_config_path);

        let whatsapp = WhatsAppClient::new(config.whatsapp.clone());
        if whatsapp.is_configured() {
            match whatsapp.check_access_token().await {
                Ok(true) => tracing::info!("WhatsApp access token verified"),
                Ok(false) => tracing::warn!("WhatsApp access token check failed - check permissions"),
                Err(e) => tracing::warn!("WhatsApp access token check errored: {}", e),
            }
        } else {
            tracing::warn!("WhatsApp credentials not configured - messages will fail");
        }

        // The merchant identity comes from the shared config surface; a
        // missing block falls back to placeholders so the bot still answers.
        let upi = match surface.read_upi_config().await {
            Ok(Some(upi)) => upi,
            Ok(None) => {
                tracing::warn!("No UPI_CONFIG block on the config surface, using placeholders");
                placeholder_upi()
            }
            Err(e) => {
                tracing::warn!("Failed to read the config surface ({}), using placeholders", e);
                placeholder_upi()
            }
        };
        tracing::info!(upi_id = %upi.upi_id, merchant = %upi.name, amount = %upi.amount, "Merchant UPI configuration loaded");

        let resolver = CodeResolver::new(store.clone(), surface.clone());
        let composer = Arc::new(QrComposer::new(upi, config.assets.clone()));
        let issuer = QrIssuer::new(
            store.clone(),
            resolver.clone(),
            whatsapp.clone(),
            Arc::clone(&composer),
        );
        let pool = IssueWorkerPool::new(config.worker.clone(), issuer);

        let state = AppState {
            config: config.clone(),
            store,
            whatsapp,
            resolver,
            dedup: Arc::new(DedupCache::new(config.dedup_capacity)),
            job_tx: pool.sender(),
        };

        // Bind listener (port 0 = random port for testing)
        let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        tracing::info!("Chatbot service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
            pool,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get the application state (used by tests for store cleanup).
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let shutdown = self.pool.shutdown_token();
        self.pool.start();

        let router = Router::new()
            .route("/", get(handlers::home))
            .route("/health", get(handlers::health_check))
            .route("/metrics", get(handlers::metrics_endpoint))
            .route(
                "/webhook",
                get(handlers::webhook::verify_webhook).post(handlers::webhook::receive_webhook),
            )
            .route("/status", get(handlers::status))
            .route("/store-test", get(handlers::store_test))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state);

        let result = axum::serve(self.listener, router).await;
        shutdown.cancel();
        result
    }
}

fn placeholder_upi() -> UpiConfig {
    UpiConfig {
        upi_id: "merchant@upi".to_string(),
        name: "Acme Payments".to_string(),
        amount: "1".to_string(),
    }
}
