//! WhatsApp webhook: verification handshake and inbound message dispatch.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use service_core::error::AppError;

use crate::services::metrics;
use crate::services::worker::IssueJob;
use crate::AppState;

/// Inbound texts containing any of these (substring, case-insensitive)
/// trigger QR issuance.
const TRIGGER_WORDS: [&str; 6] = ["hi", "hello", "pay", "qr", "payment", "buy"];

const PROMPT: &str = "👋 Send 'pay' to get the payment QR code.";
const QUEUE_FULL: &str =
    "⏳ We are handling a lot of requests right now. Please try again in a moment.";

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// The platform's subscription handshake: echo the challenge when the shared
/// secret matches.
pub async fn verify_webhook(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let token_matches = params.verify_token.as_deref()
        == Some(state.config.verify_token.expose_secret().as_str());

    if params.mode.as_deref() == Some("subscribe") && token_matches {
        tracing::info!("Webhook verified");
        (StatusCode::OK, params.challenge.unwrap_or_default()).into_response()
    } else {
        tracing::warn!("Webhook verification failed");
        (StatusCode::FORBIDDEN, "Verification failed").into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub value: WebhookValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookValue {
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    pub from: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<InboundText>,
}

#[derive(Debug, Deserialize)]
pub struct InboundText {
    pub body: String,
}

impl WebhookEnvelope {
    fn first_message(&self) -> Option<&InboundMessage> {
        self.entry
            .first()?
            .changes
            .first()?
            .value
            .messages
            .first()
    }
}

/// Inbound message dispatch. Replies are best-effort; the webhook always
/// acknowledges so the platform stops redelivering.
pub async fn receive_webhook(
    State(state): State<AppState>,
    Json(envelope): Json<WebhookEnvelope>,
) -> Result<String, AppError> {
    let Some(message) = envelope.first_message() else {
        return Ok("No message found".to_string());
    };

    if !state.dedup.insert(&message.id) {
        tracing::debug!(message_id = %message.id, "Duplicate delivery dropped");
        return Ok("MESSAGE_ALREADY_PROCESSED".to_string());
    }

    if message.kind == "text" {
        metrics::record_inbound("text");
        let body = message
            .text
            .as_ref()
            .map(|t| t.body.to_lowercase())
            .unwrap_or_default();
        let body = body.trim();

        if TRIGGER_WORDS.iter().any(|word| body.contains(word)) {
            handle_trigger(&state, &message.from).await;
        } else if let Err(e) = state.whatsapp.send_text(&message.from, PROMPT).await {
            tracing::warn!(to = %message.from, "Failed to send prompt: {}", e);
        }
    } else {
        metrics::record_inbound("other");
    }

    Ok("EVENT_RECEIVED".to_string())
}

async fn handle_trigger(state: &AppState, sender: &str) {
    // Immediate acknowledgement mirroring what the issuance job will find.
    let ack = match state.resolver.current_code().await {
        Some(code) if !code.customer_name.is_empty() => {
            format!("🔄 Generating QR code for {}...", code.customer_name)
        }
        Some(_) => "🔄 Generating QR code...".to_string(),
        None => "🔄 Generating QR code... (no active payment found)".to_string(),
    };
    if let Err(e) = state.whatsapp.send_text(sender, &ack).await {
        tracing::warn!(to = %sender, "Failed to send acknowledgement: {}", e);
    }

    let job = IssueJob {
        recipient: sender.to_string(),
    };
    if let Err(e) = state.job_tx.try_send(job) {
        tracing::warn!(to = %sender, "QR issuance queue full: {}", e);
        if let Err(e) = state.whatsapp.send_text(sender, QUEUE_FULL).await {
            tracing::warn!(to = %sender, "Failed to send queue-full notice: {}", e);
        }
    }
}
