//! Display formatting for calculator values.
//!
//! Two passes: render with the full digit budget as precision to learn how many
//! integer digits the value has, then render again giving the remaining budget
//! to the fraction. Trailing zeros and a dangling decimal point are stripped.

/// Format `value` so that it shows at most `total_digits` digits.
///
/// A leading minus sign does not consume a digit position (it has its own
/// indicator on the tubes). Negative zero, including negative values that round
/// to zero, prints as `"0"`.
pub fn format_value(value: f64, total_digits: usize) -> String {
    let value = if value == 0.0 { 0.0 } else { value };

    let probe = format!("{:.*}", total_digits, value);
    let mut decimals = total_digits.saturating_sub(integer_digits(&probe));
    let mut rendered = format!("{:.*}", decimals, value);
    // Rounding can carry into a new integer digit (9.99.. -> 10.0..); give that digit
    // back from the fraction.
    while decimals > 0 && used_digits(&rendered) > total_digits {
        decimals -= 1;
        rendered = format!("{:.*}", decimals, value);
    }

    if rendered.contains('.') {
        let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
        rendered.truncate(trimmed.len());
    }
    if rendered == "-0" {
        rendered.remove(0);
    }
    rendered
}

/// Placeholder shown while the engine is in its error state: one dot per digit.
pub fn error_placeholder(total_digits: usize) -> String {
    ".".repeat(total_digits)
}

/// Number of digit positions a display string occupies (signs and points excluded).
pub fn used_digits(s: &str) -> usize {
    s.bytes().filter(u8::is_ascii_digit).count()
}

fn integer_digits(s: &str) -> usize {
    let int_part = s.split('.').next().unwrap_or(s);
    used_digits(int_part)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_drop_the_fraction() {
        assert_eq!(format_value(8.0, 14), "8");
        assert_eq!(format_value(100.0, 14), "100");
        assert_eq!(format_value(-42.0, 14), "-42");
    }

    #[test]
    fn fraction_uses_remaining_budget() {
        assert_eq!(format_value(123.456, 6), "123.456");
        assert_eq!(format_value(123.4567, 6), "123.457");
        assert_eq!(format_value(1.0 / 3.0, 8), "0.3333333");
        assert_eq!(format_value(-2.0 / 3.0, 8), "-0.6666667");
    }

    #[test]
    fn negative_zero_is_plain_zero() {
        assert_eq!(format_value(-0.0, 14), "0");
        assert_eq!(format_value(-0.000_000_001, 6), "0");
        assert_eq!(format_value(0.0, 1), "0");
    }

    #[test]
    fn trailing_zeros_and_point_are_stripped() {
        assert_eq!(format_value(0.5, 14), "0.5");
        assert_eq!(format_value(2.50, 4), "2.5");
        assert_eq!(format_value(0.000_000_1, 4), "0");
    }

    #[test]
    fn rounding_carry_stays_within_budget() {
        assert_eq!(format_value(9.999_999, 4), "10");
        assert_eq!(format_value(99.96, 3), "100");
        assert_eq!(format_value(-9.9999, 3), "-10");
    }

    #[test]
    fn full_width_values() {
        assert_eq!(format_value(99_999_999_999_999.0, 14), "99999999999999");
        assert_eq!(format_value(std::f64::consts::PI, 14), "3.1415926535898");
    }

    #[test]
    fn placeholder_matches_budget() {
        assert_eq!(error_placeholder(8), "........");
        assert_eq!(error_placeholder(0), "");
    }

    #[test]
    fn used_digits_ignores_signs_and_points() {
        assert_eq!(used_digits("-12.5"), 3);
        assert_eq!(used_digits("+0."), 1);
        assert_eq!(used_digits(""), 0);
    }
}
