/// Render a measurement for display: scientific notation for very small or
/// very large magnitudes, three significant digits otherwise.
pub fn format_value(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".into();
    }
    let magnitude = value.abs();
    if magnitude < 0.001 || magnitude > 10_000.0 {
        return format!("{:.2e}", value);
    }
    let exponent = magnitude.log10().floor() as i32;
    let scale = 10f64.powi(2 - exponent);
    let rounded = (value * scale).round() / scale;
    let decimals = (2 - exponent).max(0) as usize;
    let text = format!("{:.*}", decimals, rounded);
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

/// `format_value` followed by the unit, when there is one.
pub fn format_with_unit(value: f64, unit: &str) -> String {
    if unit.is_empty() {
        format_value(value)
    } else {
        format!("{} {}", format_value(value), unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_three_significant_digits() {
        assert_eq!(format_value(95.5), "95.5");
        assert_eq!(format_value(0.123456), "0.123");
        assert_eq!(format_value(1234.5), "1230");
        assert_eq!(format_value(0.12), "0.12");
        assert_eq!(format_value(-42.0), "-42");
    }

    #[test]
    fn extreme_magnitudes_use_exponent() {
        assert_eq!(format_value(2.1e9), "2.10e9");
        assert_eq!(format_value(0.0001234), "1.23e-4");
    }

    #[test]
    fn zero_and_units() {
        assert_eq!(format_value(0.0), "0");
        assert_eq!(format_with_unit(120.0, "nm"), "120 nm");
        assert_eq!(format_with_unit(0.15, ""), "0.15");
    }
}
