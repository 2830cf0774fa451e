//! WhatsApp Cloud API client.
//!
//! Thin wrapper over the Graph API messages/media endpoints. Callers decide
//! how to degrade on failure; nothing here retries.

use anyhow::{anyhow, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppConfig {
    /// Graph API base, e.g. `https://graph.facebook.com/v19.0`.
    pub api_base_url: String,
    pub phone_number_id: String,
    pub access_token: Secret<String>,
}

#[derive(Clone)]
pub struct WhatsAppClient {
    client: Client,
    config: WhatsAppConfig,
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    text: TextBody<'a>,
}

#[derive(Debug, Serialize)]
struct TextBody<'a> {
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct MediaUploadResponse {
    id: String,
}

impl WhatsAppClient {
    pub fn new(config: WhatsAppConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Check if the client is configured (credentials are set).
    pub fn is_configured(&self) -> bool {
        !self.config.phone_number_id.is_empty()
            && !self.config.access_token.expose_secret().is_empty()
    }

    /// Verify the access token has the required permissions.
    pub async fn check_access_token(&self) -> Result<bool> {
        let url = format!(
            "{}/{}",
            self.config.api_base_url, self.config.phone_number_id
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.config.access_token.expose_secret())
            .send()
            .await?;

        if response.status().is_success() {
            Ok(true)
        } else {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(body = %body, "Access token verification failed");
            Ok(false)
        }
    }

    /// Send a plain text message.
    pub async fn send_text(&self, to: &str, body: &str) -> Result<()> {
        let url = format!(
            "{}/{}/messages",
            self.config.api_base_url, self.config.phone_number_id
        );
        let payload = TextMessage {
            messaging_product: "whatsapp",
            to,
            kind: "text",
            text: TextBody { body },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.access_token.expose_secret())
            .json(&payload)
            .send()
            .await?;

        if response.status().is_success() {
            tracing::info!(to = %to, "Text message sent");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(to = %to, body = %body, "Failed to send text message");
            Err(anyhow!("WhatsApp text send failed: {}", body))
        }
    }

    /// Upload an image file to the media endpoint, returning the media id.
    pub async fn upload_media(&self, image_path: &Path) -> Result<String> {
        let url = format!(
            "{}/{}/media",
            self.config.api_base_url, self.config.phone_number_id
        );

        let file_name = image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "qr.png".to_string());
        let mime_type = match image_path.extension().and_then(|e| e.to_str()) {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            _ => "image/png",
        };

        let bytes = tokio::fs::read(image_path).await?;
        let part = Part::bytes(bytes).file_name(file_name).mime_str(mime_type)?;
        let form = Form::new()
            .part("file", part)
            .text("messaging_product", "whatsapp");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.access_token.expose_secret())
            .multipart(form)
            .send()
            .await?;

        if response.status().is_success() {
            let upload: MediaUploadResponse = response.json().await?;
            tracing::info!(media_id = %upload.id, "Image uploaded");
            Ok(upload.id)
        } else {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(body = %body, "Failed to upload image");
            Err(anyhow!("WhatsApp media upload failed: {}", body))
        }
    }

    /// Send an image message using an already uploaded media id.
    pub async fn send_image(&self, to: &str, media_id: &str, caption: &str) -> Result<()> {
        let url = format!(
            "{}/{}/messages",
            self.config.api_base_url, self.config.phone_number_id
        );
        let payload = json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "image",
            "image": { "id": media_id, "caption": caption }
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.access_token.expose_secret())
            .json(&payload)
            .send()
            .await?;

        if response.status().is_success() {
            tracing::info!(to = %to, media_id = %media_id, "Image message sent");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(to = %to, body = %body, "Failed to send image message");
            Err(anyhow!("WhatsApp image send failed: {}", body))
        }
    }

    /// Upload an image and send it in one step.
    pub async fn send_image_file(&self, to: &str, image_path: &Path, caption: &str) -> Result<()> {
        let media_id = self.upload_media(image_path).await?;
        self.send_image(to, &media_id, caption).await
    }
}

/// Normalize a WhatsApp number: strip `+`, spaces and dashes, and prefix the
/// default country code to bare 10-digit Indian numbers.
pub fn normalize_phone(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '+' | ' ' | '-'))
        .collect();

    if cleaned.len() == 10 && !cleaned.starts_with("91") {
        format!("91{}", cleaned)
    } else {
        cleaned
    }
}
