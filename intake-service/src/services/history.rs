use chrono::Utc;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use service_core::models::{PaymentRecord, PaymentStatus};
use std::path::PathBuf;

/// Audit-log retention window.
const MAX_ENTRIES: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub unique_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub whatsapp: String,
    #[serde(default)]
    pub customer_upi_id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub expiry_time: String,
    pub status: PaymentStatus,
    pub logged_at: String,
}

/// Append-only JSON log of created payment codes, capped at the last 100
/// entries (oldest truncated first). Independent of store state.
#[derive(Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn append(&self, record: &PaymentRecord) -> Result<(), AppError> {
        let mut entries = self.read_all().await?;

        entries.push(HistoryEntry {
            unique_id: record.unique_id.clone(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            email: record.email.clone(),
            whatsapp: record.whatsapp.clone(),
            customer_upi_id: record.customer_upi_id.clone(),
            timestamp: record.timestamp.clone(),
            expiry_time: record.expiry_time.clone(),
            status: record.status,
            logged_at: Utc::now().to_rfc3339(),
        });

        if entries.len() > MAX_ENTRIES {
            let excess = entries.len() - MAX_ENTRIES;
            entries.drain(..excess);
        }

        let body = serde_json::to_string_pretty(&entries)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;
        tokio::fs::write(&self.path, body).await.map_err(|e| {
            tracing::warn!(path = ?self.path, "Failed to write history log: {}", e);
            AppError::from(e)
        })?;

        Ok(())
    }

    pub async fn read_all(&self) -> Result<Vec<HistoryEntry>, AppError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Corrupt history log: {}", e)))
    }
}
