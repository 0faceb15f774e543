//! Formatting of ledger base units.

/// Render `units` as a decimal string for a token with `decimals` digits.
///
/// Trailing fractional zeros are trimmed, keeping at least one digit after
/// the point (`1500000` at 6 decimals is `"1.5"`, `0` is `"0.0"`).
pub fn format_units(units: u128, decimals: u32) -> String {
    if decimals == 0 {
        return format!("{units}.0");
    }

    let digits = units.to_string();
    let width = decimals as usize;
    let padded = if digits.len() <= width {
        format!("{}{}", "0".repeat(width + 1 - digits.len()), digits)
    } else {
        digits
    };

    let (whole, fraction) = padded.split_at(padded.len() - width);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{whole}.0")
    } else {
        format!("{whole}.{fraction}")
    }
}
