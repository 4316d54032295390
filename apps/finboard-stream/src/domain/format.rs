//! Display formatting for prices, changes and volumes.

use rust_decimal::{Decimal, RoundingStrategy};

/// Format a USD amount: `$1,234.56`, negatives as `-$1,234.56`.
#[must_use]
pub fn format_currency(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    let digits = format!("{:.2}", rounded.abs());
    let (whole, cents) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    format!("{sign}${}.{cents}", group_thousands(whole))
}

/// Format a percentage change with an explicit sign: `+1.23%`, `-0.50%`.
#[must_use]
pub fn format_percent(value: f64) -> String {
    if value >= 0.0 {
        format!("+{value:.2}%")
    } else {
        format!("{value:.2}%")
    }
}

/// Compact large numbers: `1.23B`, `4.56M`, `7.89K`, else two decimals.
#[must_use]
pub fn format_number(value: f64) -> String {
    if value >= 1_000_000_000.0 {
        format!("{:.2}B", value / 1_000_000_000.0)
    } else if value >= 1_000_000.0 {
        format!("{:.2}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.2}K", value / 1_000.0)
    } else {
        format!("{value:.2}")
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use test_case::test_case;

    use super::*;

    #[test_case("0", "$0.00")]
    #[test_case("5.5", "$5.50")]
    #[test_case("178.5", "$178.50")]
    #[test_case("1234.567", "$1,234.57")]
    #[test_case("999999.999", "$1,000,000.00")]
    #[test_case("-1234.56", "-$1,234.56")]
    #[test_case("-0.001", "$0.00")]
    fn currency(input: &str, expected: &str) {
        assert_eq!(format_currency(Decimal::from_str(input).unwrap()), expected);
    }

    #[test_case(1.234, "+1.23%")]
    #[test_case(0.0, "+0.00%")]
    #[test_case(-0.5, "-0.50%")]
    fn percent(input: f64, expected: &str) {
        assert_eq!(format_percent(input), expected);
    }

    #[test_case(1_234_000_000.0, "1.23B")]
    #[test_case(4_560_000.0, "4.56M")]
    #[test_case(7_890.0, "7.89K")]
    #[test_case(999.5, "999.50")]
    #[test_case(-2_500.0, "-2500.00")]
    fn number(input: f64, expected: &str) {
        assert_eq!(format_number(input), expected);
    }
}
