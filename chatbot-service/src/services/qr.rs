//! UPI deep-link construction and branded QR image composition.

use crate::config::AssetConfig;
use anyhow::Result;
use chrono::{DateTime, Utc};
use image::{imageops, imageops::FilterType, DynamicImage, Luma, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use qrcode::{EcLevel, QrCode};
use rand::Rng;
use rusttype::{Font, Scale};
use service_core::surface::UpiConfig;
use std::path::Path;

const QR_SIZE: u32 = 300;
const TOP_SPACE: u32 = 100;
const BOTTOM_SPACE: u32 = 100;
const CANVAS_WIDTH: u32 = 400;
const CANVAS_HEIGHT: u32 = QR_SIZE + TOP_SPACE + BOTTOM_SPACE;

const COMPANY_LOGO_SIZE: u32 = 100;
const BRAND_BOX_SIZE: u32 = 80;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const BOX_FILL: Rgba<u8> = Rgba([240, 240, 240, 255]);
const BOX_BORDER: Rgba<u8> = Rgba([221, 221, 221, 255]);
const TEXT_DIM: Rgba<u8> = Rgba([102, 102, 102, 255]);
const TEXT_DARK: Rgba<u8> = Rgba([51, 51, 51, 255]);

pub struct QrComposer {
    upi: UpiConfig,
    assets: AssetConfig,
    font: Option<Font<'static>>,
    font_bold: Option<Font<'static>>,
}

impl QrComposer {
    pub fn new(upi: UpiConfig, assets: AssetConfig) -> Self {
        let font = load_font(&assets.font_path);
        let font_bold = load_font(&assets.font_bold_path);
        Self {
            upi,
            assets,
            font,
            font_bold,
        }
    }

    pub fn upi(&self) -> &UpiConfig {
        &self.upi
    }

    /// The UPI intent link. The payee is always the merchant; the customer
    /// name only decorates the display name.
    pub fn build_upi_link(&self, transaction_note: &str, customer_name: Option<&str>) -> String {
        let display_name = match customer_name {
            Some(name) if !name.is_empty() => format!("{} - {}", self.upi.name, name),
            _ => self.upi.name.clone(),
        };

        format!(
            "upi://pay?pa={}&pn={}&am={}&tn={}",
            self.upi.upi_id,
            urlencoding::encode(&display_name),
            self.upi.amount,
            urlencoding::encode(transaction_note),
        )
    }

    /// Render the link as a high-error-correction QR and composite the
    /// branded canvas: company logo band on top, QR centered, UPI brand band
    /// below.
    pub fn compose(&self, upi_link: &str) -> Result<RgbaImage> {
        let code = QrCode::with_error_correction_level(upi_link.as_bytes(), EcLevel::H)?;
        let qr = code
            .render::<Luma<u8>>()
            .min_dimensions(QR_SIZE, QR_SIZE)
            .build();
        let qr = imageops::resize(
            &DynamicImage::ImageLuma8(qr).to_rgba8(),
            QR_SIZE,
            QR_SIZE,
            FilterType::Nearest,
        );

        let mut canvas = RgbaImage::from_pixel(CANVAS_WIDTH, CANVAS_HEIGHT, WHITE);

        self.draw_company_band(&mut canvas);
        imageops::overlay(&mut canvas, &qr, (CANVAS_WIDTH - QR_SIZE) / 2, TOP_SPACE);
        self.draw_brand_band(&mut canvas);

        Ok(canvas)
    }

    fn draw_company_band(&self, canvas: &mut RgbaImage) {
        if let Some(logo) = load_image(&self.assets.company_logo_path) {
            let logo = imageops::resize(
                &logo.to_rgba8(),
                COMPANY_LOGO_SIZE,
                COMPANY_LOGO_SIZE,
                FilterType::Lanczos3,
            );
            imageops::overlay(canvas, &logo, (CANVAS_WIDTH - COMPANY_LOGO_SIZE) / 2, 10);
            return;
        }

        // No logo asset: fall back to the merchant name as text.
        if let Some(font) = self.font_bold.as_ref().or(self.font.as_ref()) {
            let scale = Scale::uniform(24.0);
            let width = text_width(font, scale, &self.upi.name);
            let x = (CANVAS_WIDTH.saturating_sub(width)) / 2;
            draw_text_mut(canvas, BLACK, x, 30, scale, font, &self.upi.name);
        } else {
            tracing::warn!("No font available for the company text fallback");
        }
    }

    fn draw_brand_band(&self, canvas: &mut RgbaImage) {
        let box_x = (CANVAS_WIDTH - BRAND_BOX_SIZE) / 2;
        let box_y = CANVAS_HEIGHT - BRAND_BOX_SIZE;

        if let Some(font) = self.font.as_ref() {
            let scale = Scale::uniform(12.0);
            let caption = "Scan & Pay with UPI:";
            let width = text_width(font, scale, caption);
            let x = (CANVAS_WIDTH.saturating_sub(width)) / 2;
            draw_text_mut(canvas, TEXT_DIM, x, box_y - 25, scale, font, caption);
        }

        if let Some(logo) = load_image(&self.assets.upi_logo_path) {
            let logo = logo.thumbnail(BRAND_BOX_SIZE - 4, BRAND_BOX_SIZE - 4).to_rgba8();
            let x = box_x + (BRAND_BOX_SIZE - logo.width()) / 2;
            let y = box_y + (BRAND_BOX_SIZE - logo.height()) / 2;
            imageops::overlay(canvas, &logo, x, y);
            return;
        }

        // Placeholder box with a "UPI" label when the brand asset is missing.
        let rect = Rect::at(box_x as i32, box_y as i32).of_size(BRAND_BOX_SIZE, BRAND_BOX_SIZE);
        draw_filled_rect_mut(canvas, rect, BOX_FILL);
        draw_hollow_rect_mut(canvas, rect, BOX_BORDER);

        if let Some(font) = self.font_bold.as_ref().or(self.font.as_ref()) {
            let scale = Scale::uniform(14.0);
            let width = text_width(font, scale, "UPI");
            let x = box_x + (BRAND_BOX_SIZE.saturating_sub(width)) / 2;
            let y = box_y + BRAND_BOX_SIZE / 2 - 7;
            draw_text_mut(canvas, TEXT_DARK, x, y, scale, font, "UPI");
        }
    }
}

/// Fallback transaction note when no payment code resolves:
/// `TXN-<timestamp>-<6 uppercase alphanumerics>`.
pub fn fallback_transaction_note(now: DateTime<Utc>) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    format!("TXN-{}-{}", now.format("%Y%m%d%H%M%S"), suffix)
}

fn load_image(path: &str) -> Option<DynamicImage> {
    if !Path::new(path).exists() {
        return None;
    }
    match image::open(path) {
        Ok(img) => Some(img),
        Err(e) => {
            tracing::warn!(path = %path, "Failed to load image asset: {}", e);
            None
        }
    }
}

fn load_font(path: &str) -> Option<Font<'static>> {
    let bytes = std::fs::read(path).ok()?;
    let font = Font::try_from_vec(bytes);
    if font.is_none() {
        tracing::warn!(path = %path, "Failed to parse font");
    }
    font
}

fn text_width(font: &Font<'_>, scale: Scale, text: &str) -> u32 {
    font.layout(text, scale, rusttype::point(0.0, 0.0))
        .filter_map(|g| g.pixel_bounding_box())
        .last()
        .map(|bb| bb.max.x.max(0) as u32)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn composer() -> QrComposer {
        QrComposer::new(
            UpiConfig {
                upi_id: "merchant@testupi".to_string(),
                name: "Test Merchant".to_string(),
                amount: "1".to_string(),
            },
            AssetConfig {
                company_logo_path: "does-not-exist.png".to_string(),
                upi_logo_path: "does-not-exist.png".to_string(),
                font_path: "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".to_string(),
                font_bold_path: "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf".to_string(),
            },
        )
    }

    #[test]
    fn link_always_pays_the_merchant() {
        let composer = composer();
        let link = composer.build_upi_link("PAY-42", Some("Asha Rao"));
        assert!(link.starts_with("upi://pay?pa=merchant@testupi&"));
        assert!(link.contains("pn=Test%20Merchant%20-%20Asha%20Rao"));
        assert!(link.contains("am=1"));
        assert!(link.ends_with("&tn=PAY-42"));
    }

    #[test]
    fn link_without_customer_uses_plain_merchant_name() {
        let composer = composer();
        let link = composer.build_upi_link("PAY-42", None);
        assert!(link.contains("pn=Test%20Merchant&"));
    }

    #[test]
    fn fallback_note_has_the_expected_shape() {
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 10, 30, 0).unwrap();
        let note = fallback_transaction_note(now);
        assert!(note.starts_with("TXN-20260801103000-"));
        let suffix = note.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 6);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn composes_a_full_canvas_without_assets() {
        let composer = composer();
        let link = composer.build_upi_link("PAY-42", None);
        let canvas = composer.compose(&link).unwrap();

        assert_eq!(canvas.width(), 400);
        assert_eq!(canvas.height(), 500);
        // Corners stay white; the QR sits inside the bands.
        assert_eq!(canvas.get_pixel(0, 0), &WHITE);
        assert_eq!(canvas.get_pixel(399, 0), &WHITE);
    }
}
