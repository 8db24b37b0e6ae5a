use base64::{engine::general_purpose::STANDARD, Engine as _};
use qrcode::render::svg;
use qrcode::QrCode;

use crate::error::AppError;

/// Render `login_url` as a QR code image, as a data URL usable in `img { src }`
pub fn login_code_data_url(login_url: &str) -> Result<String, AppError> {
    let code = QrCode::new(login_url.as_bytes())
        .map_err(|e| AppError::Other(format!("QR code error: {}", e)))?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(360, 360)
        .quiet_zone(true)
        .build();

    Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(image)))
}
