//! QR issuance: resolve the current code, compose the image, deliver it.

use crate::services::metrics;
use crate::services::qr::{fallback_transaction_note, QrComposer};
use crate::services::resolver::CodeResolver;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use service_core::models::{CurrentPaymentCode, PaymentStatus};
use service_core::store::PaymentStore;
use service_core::surface::UpiConfig;
use service_core::whatsapp::WhatsAppClient;
use std::sync::Arc;

const APOLOGY: &str = "❌ Failed to generate QR code. Please try again.";
const ALREADY_IN_FLIGHT: &str =
    "⏳ A QR code for this payment is already being generated. Please wait a moment.";

#[derive(Clone)]
pub struct QrIssuer {
    store: PaymentStore,
    resolver: CodeResolver,
    whatsapp: WhatsAppClient,
    composer: Arc<QrComposer>,
    in_flight: Arc<DashMap<String, ()>>,
}

impl QrIssuer {
    pub fn new(
        store: PaymentStore,
        resolver: CodeResolver,
        whatsapp: WhatsAppClient,
        composer: Arc<QrComposer>,
    ) -> Self {
        Self {
            store,
            resolver,
            whatsapp,
            composer,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Issue a QR to one recipient. All failures degrade to a plain-text
    /// apology; nothing is retried and nothing propagates.
    pub async fn issue_to(&self, recipient: &str) {
        let code = self.resolver.current_code().await;

        // At most one concurrent issuance per resolved code. A duplicate
        // trigger (redelivery, impatient re-send) gets a notice instead of a
        // second copy of the same QR.
        let _guard = match &code {
            Some(code) => match InFlightGuard::acquire(&self.in_flight, &code.unique_id) {
                Some(guard) => Some(guard),
                None => {
                    tracing::info!(
                        unique_id = %code.unique_id,
                        "Issuance already in flight for this code, dropping duplicate"
                    );
                    metrics::record_qr_issued("duplicate_dropped");
                    self.send_or_log(recipient, ALREADY_IN_FLIGHT).await;
                    return;
                }
            },
            None => None,
        };

        match self.try_issue(recipient, code.as_ref()).await {
            Ok(()) => {
                metrics::record_qr_issued("sent");
            }
            Err(e) => {
                tracing::error!(recipient = %recipient, "QR issuance failed: {:#}", e);
                metrics::record_qr_issued("failed");
                self.send_or_log(recipient, APOLOGY).await;
            }
        }
    }

    async fn try_issue(&self, recipient: &str, code: Option<&CurrentPaymentCode>) -> Result<()> {
        let transaction_note = match code {
            Some(code) => code.unique_id.clone(),
            None => fallback_transaction_note(Utc::now()),
        };

        let customer_name = code
            .map(|c| c.customer_name.as_str())
            .filter(|name| !name.is_empty());
        let upi_link = self.composer.build_upi_link(&transaction_note, customer_name);

        tracing::info!(
            transaction_note = %transaction_note,
            upi_link = %upi_link,
            "Composing QR"
        );

        let image = self
            .composer
            .compose(&upi_link)
            .context("QR composition failed")?;

        // Scoped temp file per render, removed after the upload.
        let temp = tempfile::Builder::new()
            .prefix("upi-qr-")
            .suffix(".png")
            .tempfile()
            .context("Failed to create temp file")?;
        image
            .save(temp.path())
            .context("Failed to write QR image")?;

        let caption = build_caption(code, &transaction_note, self.composer.upi(), Utc::now());
        self.whatsapp
            .send_image_file(recipient, temp.path(), &caption)
            .await
            .context("Failed to deliver QR image")?;

        // Only after successful delivery does the record move forward.
        if let Some(code) = code {
            match self
                .store
                .update_status(&code.unique_id, PaymentStatus::QrGenerated)
                .await
            {
                Ok(true) => {
                    tracing::info!(unique_id = %code.unique_id, "Status updated to qr_generated");
                }
                Ok(false) => {
                    tracing::warn!(unique_id = %code.unique_id, "No record matched for status update");
                }
                Err(e) => {
                    tracing::warn!(unique_id = %code.unique_id, "Status update failed: {}", e);
                }
            }
        }

        temp.close().context("Failed to remove temp file")?;
        Ok(())
    }

    async fn send_or_log(&self, recipient: &str, body: &str) {
        if let Err(e) = self.whatsapp.send_text(recipient, body).await {
            tracing::error!(recipient = %recipient, "Failed to send text message: {}", e);
        }
    }
}

/// Removes its key from the in-flight map on drop.
struct InFlightGuard {
    map: Arc<DashMap<String, ()>>,
    key: String,
}

impl InFlightGuard {
    fn acquire(map: &Arc<DashMap<String, ()>>, key: &str) -> Option<Self> {
        use dashmap::mapref::entry::Entry;
        match map.entry(key.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(vacant) => {
                vacant.insert(());
                Some(Self {
                    map: Arc::clone(map),
                    key: key.to_string(),
                })
            }
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.map.remove(&self.key);
    }
}

/// The caption sent with the QR image.
pub fn build_caption(
    code: Option<&CurrentPaymentCode>,
    transaction_note: &str,
    upi: &UpiConfig,
    now: DateTime<Utc>,
) -> String {
    match code {
        Some(code) => {
            let remaining = minutes_remaining(&code.expires_at, now).unwrap_or_default();
            format!(
                "*🔥 {merchant} Payment*\n\
                 👤 Customer: {customer}\n\
                 📧 Email: {email}\n\
                 💰 Amount: ₹{amount}\n\
                 ⏰ Valid till: {expires}{remaining}\n\
                 🆔 Payment ID: {id}\n\n\
                 📱 Scan & pay via any UPI app\n\
                 💳 Payment to: {merchant}\n\
                 ✅ Payment will be verified automatically.",
                merchant = upi.name,
                customer = or_na(&code.customer_name),
                email = or_na(&code.email),
                amount = upi.amount,
                expires = code.expires_at,
                remaining = remaining,
                id = or_na(&code.unique_id),
            )
        }
        None => format!(
            "*🔥 {merchant} Payment*\n\
             💰 Amount: ₹{amount}\n\
             👤 Payee: {merchant}\n\
             🔖 TXN: {note}\n\n\
             📱 Scan & pay via any UPI app\n\
             ✅ Payment will be verified automatically.\n\n\
             ⚠️ No active payment code found",
            merchant = upi.name,
            amount = upi.amount,
            note = transaction_note,
        ),
    }
}

/// `" (N min left)"` while the expiry is ahead, `" (EXPIRED)"` once it has
/// passed, `None` when the expiry cannot be parsed. Minutes are
/// `floor(remaining seconds / 60)`.
pub fn minutes_remaining(expires_at: &str, now: DateTime<Utc>) -> Option<String> {
    let expiry = DateTime::parse_from_rfc3339(expires_at).ok()?;
    let now = now.with_timezone(expiry.offset());

    if expiry > now {
        let minutes = (expiry - now).num_seconds() / 60;
        Some(format!(" ({} min left)", minutes))
    } else {
        Some(" (EXPIRED)".to_string())
    }
}

fn or_na(value: &str) -> &str {
    if value.is_empty() {
        "N/A"
    } else {
        value
    }
}
