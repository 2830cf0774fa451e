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
    pub files: FilesConfig,
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

/// Locally persisted surfaces: the merchant config file (current-code cache)
/// and the capped audit log.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    pub merchant_config_path: String,
    pub history_log_path: String,
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let is_prod = is_prod();

        let host = env::var("INTAKE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("INTAKE_PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid INTAKE_PORT: {}", e)))?;

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
            files: FilesConfig {
                merchant_config_path: get_env(
                    "MERCHANT_CONFIG_PATH",
                    Some("merchant_config.conf"),
                    false,
                )?,
                history_log_path: get_env(
                    "PAYMENT_LOG_PATH",
                    Some("payment_codes_log.json"),
                    false,
                )?,
            },
            service_name: "intake-service".to_string(),
        })
    }
}
