// Number formatting shared by the findings record and anything that renders it.

pub const NOT_AVAILABLE: &str = "N/A";

// Fixed-point rendering; NaN and infinities become the "N/A" sentinel.
pub fn format_fixed(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return NOT_AVAILABLE.to_string();
    }
    format!("{:.decimals$}", value, decimals = decimals)
}

pub fn format_optional(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format_fixed(v, decimals),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Scientific notation with a signed, two-digit exponent (`1.23e-05`).
pub fn format_scientific(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return NOT_AVAILABLE.to_string();
    }
    let raw = format!("{:.decimals$e}", value, decimals = decimals);
    match raw.split_once('e') {
        Some((mantissa, exponent)) => {
            let exp: i32 = exponent.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_fixed() {
        assert_eq!(format_fixed(0.123456, 4), "0.1235");
        assert_eq!(format_fixed(2.0, 2), "2.00");
        assert_eq!(format_fixed(-0.5238095, 4), "-0.5238");
    }

    #[test]
    fn test_format_fixed_non_finite_is_sentinel() {
        assert_eq!(format_fixed(f64::NAN, 4), "N/A");
        assert_eq!(format_fixed(f64::INFINITY, 2), "N/A");
    }

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(Some(7.126), 2), "7.13");
        assert_eq!(format_optional(None, 2), "N/A");
    }

    #[test]
    fn test_format_scientific() {
        assert_eq!(format_scientific(1.2345e-5, 2), "1.23e-05");
        assert_eq!(format_scientific(0.5, 2), "5.00e-01");
        assert_eq!(format_scientific(0.0, 2), "0.00e+00");
        assert_eq!(format_scientific(123456.0, 2), "1.23e+05");
        assert_eq!(format_scientific(3.0e-120, 2), "3.00e-120");
        assert_eq!(format_scientific(f64::NAN, 2), "N/A");
    }
}
