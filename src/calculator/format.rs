//! Number formatting for the calculator screen.
//!
//! Numbers are shown with a fixed budget of display digits. Values whose
//! integer part does not fit the budget fall back to scientific notation.

/// Default number of digits [0-9] the screen can show, not counting the point.
pub const MAX_DISPLAY_DIGITS: usize = 11;

/// Characters of `d.E+nnn` besides the fractional digits.
const SCIENTIFIC_OVERHEAD: usize = 7;

/// Format a number with the default digit budget.
pub fn format_number(value: f64) -> String {
    format_number_with_digits(value, MAX_DISPLAY_DIGITS)
}

/// Format a number so that it shows at most `max_display_digits` digits.
///
/// Fixed point is used while the integer part fits, trailing fractional zeros
/// are dropped. Larger values use `d.dddE+nnn`.
pub fn format_number_with_digits(value: f64, max_display_digits: usize) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        let msg = if value.is_sign_positive() {
            "Infinity"
        } else {
            "-Infinity"
        };
        return msg.to_string();
    }

    let leading = if value < 0.0 { "-" } else { "" };
    let value = value.abs();

    let integer_digits = integer_digits(value);
    if integer_digits > max_display_digits {
        let fractional_digits = max_display_digits.saturating_sub(SCIENTIFIC_OVERHEAD);
        return format!("{}{}", leading, format_scientific(value, fractional_digits));
    }

    let fractional_digits = max_display_digits - integer_digits;
    let formatted = format!("{:.*}", fractional_digits, value);
    if fractional_digits > 0 {
        let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
        format!("{}{}", leading, trimmed)
    } else {
        format!("{}{}", leading, formatted)
    }
}

/// Number of digits left of the point. Values below one count as one digit.
fn integer_digits(value: f64) -> usize {
    if value < 1.0 {
        1
    } else {
        value.log10().floor() as usize + 1
    }
}

/// Scientific notation with an explicitly signed, three digit exponent.
fn format_scientific(value: f64, fractional_digits: usize) -> String {
    // Rust renders `{:e}` as `9.8765e13`.
    let raw = format!("{:.*e}", fractional_digits, value);
    let (mantissa, exponent) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{}E{}{:03}", mantissa, sign, exponent.unsigned_abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(-0.0), "0");
    }

    #[test]
    fn test_tiny_negative_keeps_sign() {
        assert_eq!(format_number(-1e-12), "-0");
        assert_eq!(format_number(1e-12), "0");
    }

    #[test]
    fn test_fixed_point() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(3.14), "3.14");
        assert_eq!(format_number(31.4), "31.4");
        assert_eq!(format_number(100.0), "100");
        assert_eq!(format_number(99999.0), "99999");
        assert_eq!(format_number(9.999e9), "9999000000");
        assert_eq!(format_number(1e10), "10000000000");
        assert_eq!(format_number(10000000000.001), "10000000000");
        assert_eq!(format_number(60000000000.0), "60000000000");
    }

    #[test]
    fn test_small_values() {
        assert_eq!(format_number(1e-10), "0.0000000001");
        assert_eq!(format_number(1.1e-10), "0.0000000001");
        assert_eq!(format_number_with_digits(1.1e-10, 13), "0.00000000011");
        assert_eq!(format_number(-0.000001), "-0.000001");
    }

    #[test]
    fn test_rounding_to_budget() {
        assert_eq!(format_number(3.14159265358979e9), "3141592653.6");
        assert_eq!(format_number_with_digits(3.14159265358979e9, 13), "3141592653.59");
        assert_eq!(format_number(1.0 / 3.0), "0.3333333333");
        assert_eq!(format_number(2.0 / 3.0), "0.6666666667");
    }

    #[test]
    fn test_scientific() {
        assert_eq!(format_number(1e11), "1.0000E+011");
        assert_eq!(format_number(98765432109876.0), "9.8765E+013");
        assert_eq!(format_number(-98765432109876.0), "-9.8765E+013");
        assert_eq!(format_number(-1234567890123.0), "-1.2346E+012");
        assert_eq!(format_number(1e200), "1.0000E+200");
    }

    #[test]
    fn test_scientific_without_fraction() {
        // Budgets at or below the notation overhead keep only the leading digit.
        assert_eq!(format_number_with_digits(123456789.0, 5), "1E+008");
    }

    #[test]
    fn test_negation_is_symmetric() {
        for value in [0.5, 3.0, 42.125, 1e-7, 123456.789, 1e15] {
            assert_eq!(format_number(-value), format!("-{}", format_number(value)));
        }
    }

    #[test]
    fn test_non_finite() {
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }
}
