//! QR image for the donation key.

use std::fmt::Write;

use base64::{Engine, engine::general_purpose::STANDARD};
use qrcode::{Color, QrCode, types::QrError};

use crate::prelude::*;
use crate::settings::{Settings, SettingsPatch, SettingsStore};

const SVG_DATA_URL_PREFIX: &str = "data:image/svg+xml;base64,";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrOptions {
    /// Quiet zone around the symbol, in modules.
    pub margin: u32,
    /// Pixels per module.
    pub scale: u32,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            margin: 1,
            scale: 6,
        }
    }
}

/// Turns text into an image data URL.
pub trait QrEncoder: Send + Sync {
    fn encode(&self, text: &str, options: QrOptions) -> Result<String>;
}

/// Encodes to an SVG image wrapped in a base64 data URL.
#[derive(Debug, Default, Clone, Copy)]
pub struct SvgQrEncoder;

impl SvgQrEncoder {
    fn render(code: &QrCode, options: QrOptions) -> Result<String> {
        let width = code.width();
        let margin = options.margin as usize;
        let side = width + 2 * margin;
        let pixels = side * options.scale as usize;

        let mut path = String::new();
        for (i, color) in code.to_colors().into_iter().enumerate() {
            if color == Color::Dark {
                let x = i % width + margin;
                let y = i / width + margin;
                write!(path, "M{x} {y}h1v1h-1z")?;
            }
        }
        Ok(format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{pixels}" height="{pixels}" viewBox="0 0 {side} {side}" shape-rendering="crispEdges"><rect width="{side}" height="{side}" fill="#ffffff"/><path fill="#000000" d="{path}"/></svg>"##
        ))
    }
}

impl QrEncoder for SvgQrEncoder {
    fn encode(&self, text: &str, options: QrOptions) -> Result<String> {
        if text.is_empty() {
            client_bail!("nothing to encode: payment key is empty");
        }
        if options.scale == 0 {
            client_bail!("QR scale must be at least 1");
        }
        let code = QrCode::new(text.as_bytes()).map_err(|err| match err {
            QrError::DataTooLong => {
                client_error!("payment key is too long for a QR code ({} bytes)", text.len())
            }
            other => internal_error!("QR encoding failed: {other}"),
        })?;
        let svg = Self::render(&code, options)?;
        Ok(format!("{SVG_DATA_URL_PREFIX}{}", STANDARD.encode(svg)))
    }
}

/// Encodes the current payment key and stores the image in the settings.
/// An encoder failure leaves the settings as they were.
pub async fn generate_payment_qr(
    store: &SettingsStore,
    encoder: &dyn QrEncoder,
    options: QrOptions,
) -> Result<Settings> {
    let key = store.current().pix_key;
    let url = encoder
        .encode(&key, options)
        .context("generate payment QR")?;
    info!(bytes = url.len(), "payment QR generated");
    store.update(SettingsPatch::pix_qr_data_url(url)).await
}
