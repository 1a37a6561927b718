//! Renderable QR codes for wallet-facing strings.

use qrcode::QrCode;
use qrcode::render::svg;
use qrcode::types::QrError;

/// Render a string (bolt11 invoice or bech32 lnurl) as an SVG QR code.
pub fn svg_qr(data: &str) -> Result<String, QrError> {
    let code = QrCode::new(data.as_bytes())?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(256, 256)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_svg() {
        let svg = svg_qr("lnurl1dp68gurn8ghj7mrww4exctnxd9shg6npvchxxmmd9akxuatjdskkx6rpw3jhxaqkvepcx").unwrap();
        assert!(svg.starts_with("<?xml") || svg.starts_with("<svg"));
        assert!(svg.contains("svg"));
    }
}
