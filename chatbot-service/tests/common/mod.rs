use chatbot_service::config::{
    AssetConfig, Config, FilesConfig, MongoConfig, ServerConfig, WorkerConfig,
};
use chatbot_service::{AppState, Application};
use secrecy::Secret;
use service_core::whatsapp::WhatsAppConfig;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::MockServer;

pub const TEST_VERIFY_TOKEN: &str = "test-verify-token";

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

    /// Spawn with a store that is guaranteed unreachable, exercising the
    /// config-surface fallback paths. The short timeout keeps failures fast.
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

        let db_name = format!("chatbot_test_{}", uuid::Uuid::new_v4().simple());

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
            verify_token: Secret::new(TEST_VERIFY_TOKEN.to_string()),
            files: FilesConfig {
                merchant_config_path: surface_path.to_string_lossy().into_owned(),
            },
            assets: AssetConfig {
                company_logo_path: dir.path().join("logo.png").to_string_lossy().into_owned(),
                upi_logo_path: dir.path().join("upi_logo.png").to_string_lossy().into_owned(),
                font_path: "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".to_string(),
                font_bold_path: "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf".to_string(),
            },
            worker: WorkerConfig {
                worker_count: 2,
                queue_size: 8,
            },
            dedup_capacity: 64,
            service_name: "chatbot-service-test".to_string(),
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

        // Wait for the server to come up.
        let client = reqwest::Client::new();
        for _ in 0..50 {
            if client.get(format!("{}/", address)).send().await.is_ok() {
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

    /// The shared config surface, as intake-service would write it.
    pub fn surface(&self) -> service_core::surface::ConfigSurface {
        service_core::surface::ConfigSurface::new(&self.state.config.files.merchant_config_path)
    }

    /// Requests the WhatsApp mock has received for the given path suffix.
    pub async fn whatsapp_requests(&self, path_suffix: &str) -> Vec<wiremock::Request> {
        self.whatsapp_server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path().ends_with(path_suffix))
            .collect()
    }

    /// Poll until at least `count` requests hit the given path suffix.
    pub async fn wait_for_whatsapp_requests(
        &self,
        path_suffix: &str,
        count: usize,
    ) -> Vec<wiremock::Request> {
        for _ in 0..100 {
            let requests = self.whatsapp_requests(path_suffix).await;
            if requests.len() >= count {
                return requests;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        self.whatsapp_requests(path_suffix).await
    }

    /// Cleanup test database after test completes.
    pub async fn cleanup(&self) {
        self.state.store.database().drop(None).await.ok();
    }
}

/// Whether a MongoDB instance is reachable for store-backed tests.
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

/// A webhook delivery carrying one inbound text message.
pub fn inbound_text(message_id: &str, from: &str, body: &str) -> serde_json::Value {
    serde_json::json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "changes": [{
                "value": {
                    "messages": [{
                        "id": message_id,
                        "from": from,
                        "type": "text",
                        "text": { "body": body }
                    }]
                }
            }]
        }]
    })
}
