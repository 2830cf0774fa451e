use secrecy::Secret;
use serde::Deserialize;
use service_core::config::{get_env, is_prod};
use service_core::error::AppError;
use service_core::whatsapp::WhatsAppConfig;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub mongodb: MongoConfig,
    pub whatsapp: WhatsAppConfig,
    /// Shared secret echoed back in the webhook verification handshake.
    pub verify_token: Secret<String>,
    pub files: FilesConfig,
    pub assets: AssetConfig,
    pub worker: WorkerConfig,
    pub dedup_capacity: usize,
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// The merchant config surface written by intake-service; read here for
    /// the merchant UPI block and as the current-code fallback.
    pub merchant_config_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
    pub company_logo_path: String,
    pub upi_logo_path: String,
    pub font_path: String,
    pub font_bold_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    pub worker_count: usize,
    pub queue_size: usize,
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let is_prod = is_prod();

        let host = env::var("CHATBOT_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("CHATBOT_PORT")
            .unwrap_or_else(|_| "5001".to_string())
            .parse()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid CHATBOT_PORT: {}", e)))?;

        let worker_count = env::var("QR_WORKER_COUNT")
            .unwrap_or_else(|_| "2".to_string())
            .parse()
            .unwrap_or(2);
        let queue_size = env::var("QR_QUEUE_SIZE")
            .unwrap_or_else(|_| "32".to_string())
            .parse()
            .unwrap_or(32);
        let dedup_capacity = env::var("DEDUP_CAPACITY")
            .unwrap_or_else(|_| "1024".to_string())
            .parse()
            .unwrap_or(1024);

        Ok(Self {
            server: ServerConfig { host, port },
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("payments_db"), is_prod)?,
            },
            whatsapp: WhatsAppConfig {
                api_base_url: get_env(
                    "WHATSAPP_API_BASE_URL",
                    Some("https://graph.facebook.com/v19.0"),
                    false,
                )?,
                phone_number_id: get_env("WHATSAPP_PHONE_NUMBER_ID", Some(""), is_prod)?,
                access_token: Secret::new(get_env("WHATSAPP_ACCESS_TOKEN", Some(""), is_prod)?),
            },
            verify_token: Secret::new(get_env("WHATSAPP_VERIFY_TOKEN", Some("dev-verify"), is_prod)?),
            files: FilesConfig {
                merchant_config_path: get_env(
                    "MERCHANT_CONFIG_PATH",
                    Some("merchant_config.conf"),
                    false,
                )?,
            },
            assets: AssetConfig {
                company_logo_path: get_env("COMPANY_LOGO_PATH", Some("logo.png"), false)?,
                upi_logo_path: get_env("UPI_LOGO_PATH", Some("upi_logo.png"), false)?,
                font_path: get_env(
                    "QR_FONT_PATH",
                    Some("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
                    false,
                )?,
                font_bold_path: get_env(
                    "QR_FONT_BOLD_PATH",
                    Some("/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf"),
                    false,
                )?,
            },
            worker: WorkerConfig {
                worker_count,
                queue_size,
            },
            dedup_capacity,
            service_name: "chatbot-service".to_string(),
        })
    }
}
