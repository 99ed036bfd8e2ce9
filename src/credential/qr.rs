use qrcode::{render::svg, EcLevel, QrCode};

/// Render a payload JSON string as an SVG QR image.
///
/// Error correction is pinned at level H so a credential stays scannable
/// with up to ~30% of the symbol damaged, which crumpled printouts and
/// cracked phone screens routinely are.
pub fn render_svg(payload_json: &str) -> Result<String, qrcode::types::QrError> {
    let code = QrCode::with_error_correction_level(payload_json.as_bytes(), EcLevel::H)?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(256, 256)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}
