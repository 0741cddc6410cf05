//! Human-readable formatting of byte quantities and percentages

/// Binary-scale unit ladder; values beyond TB clamp to TB
const BINARY_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
const SCALE: f64 = 1024.0;

/// Format a byte quantity at binary scale, e.g. `1536 -> "1.5 KB"`.
///
/// Exactly zero (and anything non-positive or non-finite) short-circuits to
/// `"0 B"` so no logarithm is taken of zero.
pub fn format_bytes(bytes: f64) -> String {
    if !(bytes > 0.0) || !bytes.is_finite() {
        return "0 B".to_string();
    }

    let exponent = ((bytes.ln() / SCALE.ln()).floor() as usize).min(BINARY_UNITS.len() - 1);
    let scaled = bytes / SCALE.powi(exponent as i32);
    format!("{} {}", trim_decimals(scaled), BINARY_UNITS[exponent])
}

/// Format a transfer rate; reuses the byte formatter with a `/s` suffix
pub fn format_speed(bytes_per_sec: f64) -> String {
    if !(bytes_per_sec > 0.0) || !bytes_per_sec.is_finite() {
        return "0 B/s".to_string();
    }
    format!("{}/s", format_bytes(bytes_per_sec))
}

/// One-decimal percentage, e.g. `41.53 -> "41.5%"`
pub fn format_percent(percent: f64) -> String {
    format!("{:.1}%", percent)
}

/// Two decimal places with trailing zeros trimmed: `1.00 -> "1"`, `1.50 -> "1.5"`
fn trim_decimals(value: f64) -> String {
    let rendered = format!("{:.2}", value);
    rendered.trim_end_matches('0').trim_end_matches('.').to_string()
}
