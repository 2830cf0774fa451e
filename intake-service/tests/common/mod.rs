use intake_service::config::{Config, FilesConfig, MongoConfig, ServerConfig};
use intake_service::{AppState, Application};
use secrecy::Secret;
use service_core::whatsapp::WhatsAppConfig;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::MockServer;

/// Merchant config surface seeded into every test app.
pub const TEST_SURFACE: &str = r#"# Merchant payment configuration.

UPI_CONFIG = {
  "upi_id": "merchant@testupi",
  "name": "Test Merchant",
  "amount": "1"
}

CURRENT_PAYMENT_CODE = {}
"#;

pub struct TestApp {
    pub address: String,
    pub state: AppState,
    pub whatsapp_server: MockServer,
    pub db_name: String,
    // Keeps the surface/history files alive for the test's duration.
    _dir: TempDir,
}

impl TestApp {
    /// Spawn against the local test MongoDB (guard with [`mongo_available`]).
    pub async fn spawn() -> Self {
        let uri = std::env::var("TEST_MONGODB_URI").unwrap_or_else(|_| {
            "mongodb://localhost:27017/?serverSelectionTimeoutMS=2000".to_string()
        });
        Self::spawn_with_store(&uri).await
    }

    /// Spawn with a store that is guaranteed unreachable, for the degraded
    /// local-fallback paths. The short timeout keeps failures fast.
    pub async fn spawn_degraded() -> Self {
        Self::spawn_with_store(
            "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200&connectTimeoutMS=200",
        )
        .await
    }

    async fn spawn_with_store(mongodb_uri: &str) -> Self {
        let whatsapp_server = MockServer::start().await;
        let dir = tempfile::tempdir().expect("Failed to create temp dir");

        let surface_path = dir.path().join("merchant_config.conf");
        std::fs::write(&surface_path, TEST_SURFACE).expect("Failed to seed surface");
        let history_path = dir.path().join("payment_codes_log.json");

        let db_name = format!("intake_test_{}", uuid::Uuid::new_v4().simple());

        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Random port
            },
            mongodb: MongoConfig {
                uri: mongodb_uri.to_string(),
                database: db_name.clone(),
            },
            whatsapp: WhatsAppConfig {
                api_base_url: whatsapp_server.uri(),
                phone_number_id: "12345".to_string(),
                access_token: Secret::new("test-token".to_string()),
            },
            files: FilesConfig {
                merchant_config_path: surface_path.to_string_lossy().into_owned(),
                history_log_path: history_path.to_string_lossy().into_owned(),
            },
            service_name: "intake-service-test".to_string(),
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        let port = app.port();
        let state = app.state();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let address = format!("http://127.0.0.1:{}", port);

        // Wait for the server to come up by polling the health endpoint.
        let client = reqwest::Client::new();
        for _ in 0..50 {
            if client.get(format!("{}/health", address)).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            state,
            whatsapp_server,
            db_name,
            _dir: dir,
        }
    }

    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::new()
    }

    /// Cleanup test database after test completes.
    pub async fn cleanup(&self) {
        self.state.store.database().drop(None).await.ok();
    }
}

/// Whether a MongoDB instance is reachable for store-backed tests. Tests that
/// need a real store early-return when it is not.
pub async fn mongo_available() -> bool {
    if std::env::var("TEST_MONGODB_URI").is_ok() {
        return true;
    }
    tokio::time::timeout(
        Duration::from_millis(500),
        tokio::net::TcpStream::connect("127.0.0.1:27017"),
    )
    .await
    .map(|r| r.is_ok())
    .unwrap_or(false)
}

/// A complete, valid intake payload.
pub fn sample_payload(unique_id: &str) -> serde_json::Value {
    serde_json::json!({
        "unique_id": unique_id,
        "first_name": "Asha",
        "last_name": "Rao",
        "email": "asha@example.com",
        "whatsapp": "+91 98765-43210",
        "customer_upi_id": "asha@upi",
        "timestamp": "2026-08-01T10:00:00Z",
        "expiry_time": "2026-08-01T10:30:00Z",
    })
}
