use crate::error::AppError;
use crate::models::CurrentPaymentCode;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Merchant UPI identity, owned by the operator. Read-only for both services;
/// the intake patch path must never touch this block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpiConfig {
    pub upi_id: String,
    pub name: String,
    pub amount: String,
}

const DEFAULT_SURFACE: &str = r#"# Merchant payment configuration.
# UPI_CONFIG is owned by the operator and is never modified by the services.

UPI_CONFIG = {
  "upi_id": "merchant@upi",
  "name": "Acme Payments",
  "amount": "1"
}

# Auto-updated by intake-service. Do not edit by hand.
CURRENT_PAYMENT_CODE = {}
"#;

/// The locally persisted config surface shared by both services.
///
/// The file holds named `NAME = { ...json... }` blocks with flat JSON values.
/// `CURRENT_PAYMENT_CODE` is a derived, rebuildable cache of the newest intake
/// record, consulted only when the store is unreachable; updating it replaces
/// exactly the block's value and leaves every other byte of the file intact.
#[derive(Clone)]
pub struct ConfigSurface {
    path: PathBuf,
}

impl ConfigSurface {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read_upi_config(&self) -> Result<Option<UpiConfig>, AppError> {
        Ok(self.read_block("UPI_CONFIG").await?)
    }

    pub async fn read_current_code(&self) -> Result<Option<CurrentPaymentCode>, AppError> {
        let code: Option<CurrentPaymentCode> = self.read_block("CURRENT_PAYMENT_CODE").await?;
        // An empty {} block means "no current code".
        Ok(code.filter(|c| !c.unique_id.is_empty()))
    }

    /// Replace the value of the `CURRENT_PAYMENT_CODE` block, creating the
    /// file from the default template when it does not exist yet.
    pub async fn write_current_code(&self, code: &CurrentPaymentCode) -> Result<(), AppError> {
        let mut content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => DEFAULT_SURFACE.to_string(),
            Err(e) => {
                tracing::error!(path = ?self.path, "Failed to read config surface: {}", e);
                return Err(e.into());
            }
        };

        if !content.contains("CURRENT_PAYMENT_CODE") {
            content.push_str("\n# Auto-updated by intake-service. Do not edit by hand.\n");
            content.push_str("CURRENT_PAYMENT_CODE = {}\n");
        }

        let value = serde_json::to_string_pretty(code)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;

        let pattern = Regex::new(r"(CURRENT_PAYMENT_CODE\s*=\s*)\{[^}]*\}")
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;
        let patched = pattern
            .replace(&content, |caps: &regex::Captures<'_>| {
                format!("{}{}", &caps[1], value)
            })
            .into_owned();

        tokio::fs::write(&self.path, patched).await.map_err(|e| {
            tracing::error!(path = ?self.path, "Failed to write config surface: {}", e);
            AppError::from(e)
        })?;

        tracing::info!(unique_id = %code.unique_id, "Current payment code cache updated");
        Ok(())
    }

    async fn read_block<T: serde::de::DeserializeOwned>(
        &self,
        name: &str,
    ) -> Result<Option<T>, AppError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                tracing::error!(path = ?self.path, "Failed to read config surface: {}", e);
                return Err(e.into());
            }
        };

        let pattern = Regex::new(&format!(r"{}\s*=\s*(\{{[^}}]*\}})", regex::escape(name)))
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;

        let Some(caps) = pattern.captures(&content) else {
            return Ok(None);
        };

        serde_json::from_str(&caps[1])
            .map(Some)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Invalid {} block: {}", name, e)))
    }
}
