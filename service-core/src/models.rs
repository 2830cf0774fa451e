use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a payment request. Forward-only: `pending` records become
/// `qr_generated` when a QR is delivered and `confirmed` once payment is
/// acknowledged; there is no transition out of `confirmed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    QrGenerated,
    Confirmed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::QrGenerated => "qr_generated",
            PaymentStatus::Confirmed => "confirmed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment request as stored in the `payment_requests` collection.
///
/// `unique_id` is the document key; a second intake with the same id replaces
/// the whole document. `timestamp` and `expiry_time` are the client-supplied
/// times carried through as opaque strings, while `created_at` is assigned by
/// the server at write time and is what recency ordering is based on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    #[serde(rename = "_id")]
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
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_chrono_datetime_as_bson_datetime"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_chrono_datetime_as_bson_datetime"
    )]
    pub qr_generated_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    /// Customer display name: `first_name + " " + last_name`, trimmed.
    pub fn customer_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// The normalized "current payment code" shape shared by the resolver and the
/// local cache block. Field names are the wire contract of the cache surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrentPaymentCode {
    #[serde(default)]
    pub unique_id: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub customer_upi_id: String,
    #[serde(default)]
    pub whatsapp: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub expires_at: String,
    #[serde(default)]
    pub status: String,
}

impl From<&PaymentRecord> for CurrentPaymentCode {
    fn from(record: &PaymentRecord) -> Self {
        CurrentPaymentCode {
            unique_id: record.unique_id.clone(),
            customer_name: record.customer_name(),
            email: record.email.clone(),
            customer_upi_id: record.customer_upi_id.clone(),
            whatsapp: record.whatsapp.clone(),
            created_at: record.timestamp.clone(),
            expires_at: record.expiry_time.clone(),
            status: record.status.to_string(),
        }
    }
}

// Helper module for optional DateTime<Utc> as BSON DateTime
mod opt_chrono_datetime_as_bson_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{self, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(dt) => bson::DateTime::from_chrono(*dt).serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<bson::DateTime> = Option::deserialize(deserializer)?;
        Ok(opt.map(|dt| dt.to_chrono()))
    }
}
