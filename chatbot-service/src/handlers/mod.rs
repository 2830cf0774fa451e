pub mod webhook;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::services::get_metrics;
use crate::AppState;

/// Running banner.
pub async fn home() -> impl IntoResponse {
    "🤖 WhatsApp payment bot is up and running!"
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "service": "chatbot-service",
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "service": "chatbot-service",
                "error": e.to_string()
            })),
        ),
    }
}

/// Current payment code status.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let store_connected = state.store.health_check().await.is_ok();

    match state.resolver.current_code().await {
        Some(code) => Json(json!({
            "service": "chatbot-service",
            "current_payment_code": code.unique_id,
            "customer": code.customer_name,
            "email": code.email,
            "whatsapp": code.whatsapp,
            "status": code.status,
            "expires_at": code.expires_at,
            "store_connected": store_connected,
        })),
        None => Json(json!({
            "service": "chatbot-service",
            "message": "No active payment code found",
            "store_connected": store_connected,
        })),
    }
}

/// Store connectivity self-test.
pub async fn store_test(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.sample_count(5).await {
        Ok(count) => (
            StatusCode::OK,
            Json(json!({
                "message": format!("Store connection successful! Found {} payment requests.", count)
            })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("Store connection error: {}", e) })),
        ),
    }
}

/// Prometheus metrics endpoint.
pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
