// Display formatting for derived metrics

/// Sentinel shown when a metric cannot be computed for this interval
pub const NOT_AVAILABLE: &str = "n/a";

/// `num / den`, or `None` when the denominator is zero or not finite
pub fn ratio(num: f64, den: f64) -> Option<f64> {
    if den == 0.0 || !den.is_finite() || !num.is_finite() {
        return None;
    }
    Some(num / den)
}

/// Format a fraction as a percentage with two decimals
pub fn format_percent(fraction: Option<f64>) -> String {
    match fraction {
        Some(value) => format!("{:.2}%", 100.0 * value),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Scale to K/M/G with two decimals, leaving room for a unit suffix
pub fn format_large_number(n: f64) -> String {
    if n > 1e9 {
        format!("{:.2} G", n / 1e9)
    } else if n > 1e6 {
        format!("{:.2} M", n / 1e6)
    } else if n > 1e3 {
        format!("{:.2} K", n / 1e3)
    } else {
        format!("{n:.2} ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_large_number_suffixes() {
        assert_eq!(format_large_number(57_600.0), "57.60 K");
        assert_eq!(format_large_number(1_000.0), "1000.00 ");
        assert_eq!(format_large_number(2_500_000.0), "2.50 M");
        assert_eq!(format_large_number(3.2e10), "32.00 G");
        assert_eq!(format_large_number(0.0), "0.00 ");
    }

    #[test]
    fn test_ratio_zero_denominator() {
        assert_eq!(ratio(100.0, 0.0), None);
        assert_eq!(ratio(0.0, 0.0), None);
        assert_eq!(ratio(1.0, f64::NAN), None);
        assert_eq!(format_percent(ratio(5.0, 0.0)), NOT_AVAILABLE);
    }

    #[test]
    fn test_percent_formatting() {
        assert_eq!(format_percent(ratio(100.0, 1000.0).map(|m| 1.0 - m)), "90.00%");
        assert_eq!(format_percent(Some(0.125)), "12.50%");
    }
}
