//! Payment confirmation: status update plus WhatsApp notification.

use axum::{extract::State, http::StatusCode, response::IntoResponse, response::Response, Json};
use chrono::{DateTime, Utc};
use serde_json::json;
use service_core::error::AppError;
use service_core::models::PaymentStatus;
use service_core::whatsapp::normalize_phone;
use validator::Validate;

use crate::dtos::{ConfirmPaymentRequest, ConfirmPaymentResponse};
use crate::services::metrics;
use crate::AppState;

/// Mark a record `confirmed` and notify the customer. The two operations have
/// no atomicity: the response distinguishes full success, partial success
/// (status updated, notification failed) and failure.
pub async fn confirm_payment(
    State(state): State<AppState>,
    Json(request): Json<ConfirmPaymentRequest>,
) -> Result<Response, AppError> {
    request.validate()?;

    let customer_name = request.customer_name();

    tracing::info!(
        unique_id = %request.unique_id,
        customer = %customer_name,
        "Confirming payment"
    );

    let store_updated = match state
        .store
        .update_status(&request.unique_id, PaymentStatus::Confirmed)
        .await
    {
        Ok(matched) => {
            if !matched {
                tracing::warn!(unique_id = %request.unique_id, "No record matched for confirmation");
            }
            matched
        }
        Err(e) => {
            tracing::error!(unique_id = %request.unique_id, "Status update failed: {}", e);
            false
        }
    };

    let whatsapp_sent = send_confirmation(&state, &request, &customer_name).await;

    let response = if store_updated && whatsapp_sent {
        metrics::record_confirmation("confirmed");
        (
            StatusCode::OK,
            Json(ConfirmPaymentResponse {
                message: "Payment confirmed successfully and WhatsApp message sent".to_string(),
                unique_id: request.unique_id,
                customer_name,
                whatsapp_sent: true,
                store_updated: true,
            }),
        )
            .into_response()
    } else if store_updated {
        metrics::record_confirmation("notification_failed");
        (
            StatusCode::OK,
            Json(ConfirmPaymentResponse {
                message: "Payment confirmed but WhatsApp message failed".to_string(),
                unique_id: request.unique_id,
                customer_name,
                whatsapp_sent: false,
                store_updated: true,
            }),
        )
            .into_response()
    } else {
        metrics::record_confirmation("failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Failed to confirm payment",
                "store_updated": false,
                "whatsapp_sent": whatsapp_sent,
            })),
        )
            .into_response()
    };

    Ok(response)
}

async fn send_confirmation(
    state: &AppState,
    request: &ConfirmPaymentRequest,
    customer_name: &str,
) -> bool {
    if !state.whatsapp.is_configured() {
        tracing::warn!("WhatsApp not configured - skipping confirmation message");
        return false;
    }

    let merchant_name = state
        .surface
        .read_upi_config()
        .await
        .ok()
        .flatten()
        .map(|upi| upi.name)
        .unwrap_or_else(|| "our team".to_string());

    let to = normalize_phone(&request.whatsapp);
    let message = confirmation_message(customer_name, &request.unique_id, &merchant_name, Utc::now());

    match state.whatsapp.send_text(&to, &message).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(to = %to, "Failed to send confirmation message: {}", e);
            false
        }
    }
}

fn confirmation_message(
    customer_name: &str,
    unique_id: &str,
    merchant_name: &str,
    now: DateTime<Utc>,
) -> String {
    format!(
        "🎉 *Payment Confirmed!*\n\n\
         Hello {customer_name}! 👋\n\n\
         ✅ Your payment has been successfully confirmed!\n\n\
         📋 *Payment Details:*\n\
         • Transaction ID: {unique_id}\n\
         • Status: CONFIRMED\n\
         • Date: {date}\n\n\
         🎁 Thank you for choosing {merchant_name}!\n\
         If you have any questions, feel free to reach out to us.\n\n\
         Best regards,\n\
         {merchant_name} Team",
        customer_name = customer_name,
        unique_id = unique_id,
        merchant_name = merchant_name,
        date = now.format("%d/%m/%Y %I:%M %p"),
    )
}
