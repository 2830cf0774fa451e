use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use service_core::models::{PaymentRecord, PaymentStatus};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct SavePaymentCodeRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing required field: unique_id"))]
    pub unique_id: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing required field: first_name"))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing required field: last_name"))]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing required field: email"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing required field: whatsapp"))]
    pub whatsapp: String,
    #[serde(default)]
    pub customer_upi_id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub expiry_time: String,
    /// Defaults to `pending` when not supplied.
    pub status: Option<PaymentStatus>,
}

impl SavePaymentCodeRequest {
    pub fn into_record(self, created_at: DateTime<Utc>) -> PaymentRecord {
        PaymentRecord {
            unique_id: self.unique_id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            whatsapp: self.whatsapp,
            customer_upi_id: self.customer_upi_id,
            timestamp: self.timestamp,
            expiry_time: self.expiry_time,
            status: self.status.unwrap_or(PaymentStatus::Pending),
            created_at,
            updated_at: Some(created_at),
            qr_generated_at: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SavePaymentCodeResponse {
    pub message: String,
    pub unique_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub store_saved: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing required field: uniqueId"))]
    pub unique_id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing required field: whatsapp"))]
    pub whatsapp: String,
}

impl ConfirmPaymentRequest {
    pub fn customer_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Serialize)]
pub struct ConfirmPaymentResponse {
    pub message: String,
    pub unique_id: String,
    pub customer_name: String,
    pub whatsapp_sent: bool,
    pub store_updated: bool,
}

/// Record shape for the store dump endpoints, BSON timestamps stringified.
#[derive(Debug, Serialize)]
pub struct StoreRecord {
    pub unique_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub whatsapp: String,
    pub customer_upi_id: String,
    pub timestamp: String,
    pub expiry_time: String,
    pub status: PaymentStatus,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_generated_at: Option<String>,
}

impl From<PaymentRecord> for StoreRecord {
    fn from(record: PaymentRecord) -> Self {
        StoreRecord {
            unique_id: record.unique_id,
            first_name: record.first_name,
            last_name: record.last_name,
            email: record.email,
            whatsapp: record.whatsapp,
            customer_upi_id: record.customer_upi_id,
            timestamp: record.timestamp,
            expiry_time: record.expiry_time,
            status: record.status,
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.map(|t| t.to_rfc3339()),
            qr_generated_at: record.qr_generated_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Legacy CSV-era dump shape: same data re-keyed with the spreadsheet column
/// names clients of the retired CSV export still expect.
#[derive(Debug, Serialize)]
pub struct CsvRecord {
    #[serde(rename = "Unique ID")]
    pub unique_id: String,
    #[serde(rename = "First Name")]
    pub first_name: String,
    #[serde(rename = "Last Name")]
    pub last_name: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "WhatsApp")]
    pub whatsapp: String,
    #[serde(rename = "Customer UPI ID")]
    pub customer_upi_id: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Expiry Time")]
    pub expiry_time: String,
    #[serde(rename = "Status")]
    pub status: PaymentStatus,
}

impl From<PaymentRecord> for CsvRecord {
    fn from(record: PaymentRecord) -> Self {
        CsvRecord {
            unique_id: record.unique_id,
            first_name: record.first_name,
            last_name: record.last_name,
            email: record.email,
            whatsapp: record.whatsapp,
            customer_upi_id: record.customer_upi_id,
            timestamp: record.timestamp,
            expiry_time: record.expiry_time,
            status: record.status,
        }
    }
}
