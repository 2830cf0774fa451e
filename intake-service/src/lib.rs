pub mod config;
pub mod dtos;
pub mod handlers;
pub mod services;

use axum::{
    routing::{get, post},
    Router,
};
use service_core::store::PaymentStore;
use service_core::surface::ConfigSurface;
use service_core::whatsapp::WhatsAppClient;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use config::Config;
use services::{init_metrics, HistoryLog};

/// Shared application state. Everything is constructed once in
/// [`Application::build`] and injected into the handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: PaymentStore,
    pub whatsapp: WhatsAppClient,
    pub surface: ConfigSurface,
    pub history: HistoryLog,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        init_metrics();

        let store = PaymentStore::connect(&config.mongodb.uri, &config.mongodb.database).await?;

        // The store is a collaborator, not a prerequisite: intake keeps
        // serving with local fallbacks when it is unreachable.
        if let Err(e) = store.initialize_indexes().await {
            tracing::warn!("Store unreachable at startup, continuing degraded: {}", e);
        }

        let whatsapp = WhatsAppClient::new(config.whatsapp.clone());
        if whatsapp.is_configured() {
            tracing::info!("WhatsApp client initialized");
        } else {
            tracing::warn!("WhatsApp credentials not configured - confirmations will be skipped");
        }

        let surface = ConfigSurface::new(&config.files.merchant_config_path);
        let history = HistoryLog::new(&config.files.history_log_path);

        let state = AppState {
            config: config.clone(),
            store,
            whatsapp,
            surface,
            history,
        };

        // Bind listener (port 0 = random port for testing)
        let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        tracing::info!("Intake service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
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
        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/metrics", get(handlers::metrics_endpoint))
            .route("/save-payment-code", post(handlers::records::save_payment_code))
            .route("/confirm-payment", post(handlers::confirm::confirm_payment))
            .route(
                "/get-current-payment-code",
                get(handlers::records::get_current_payment_code),
            )
            .route("/get-upi-config", get(handlers::records::get_upi_config))
            .route("/payment-history", get(handlers::records::payment_history))
            .route("/store-data", get(handlers::records::store_data))
            .route("/csv-data", get(handlers::records::csv_data))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state);

        axum::serve(self.listener, router).await
    }
}
