//! Display formatting for prices, figures and timestamps.
//!
//! Every formatter renders a missing or non-finite value as [`MISSING`].

use chrono::{DateTime, Utc};

pub const MISSING: &str = "–";

const MAX_FRACTION_DIGITS: usize = 2;

/// Inserts `,` thousands separators into the integer part of a formatted
/// number, keeping any sign and fraction as-is.
fn group_thousands(formatted: &str) -> String {
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    match fraction {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Fixed-precision formatting that never prints `-0`.
fn fixed(value: f64, digits: usize) -> String {
    let formatted = format!("{value:.digits$}");
    if formatted.trim_start_matches('-').chars().all(|c| c == '0' || c == '.') {
        formatted.trim_start_matches('-').to_string()
    } else {
        formatted
    }
}

fn trim_fraction(formatted: String) -> String {
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn currency_symbol(code: &str) -> Option<&'static str> {
    match code.to_uppercase().as_str() {
        "USD" => Some("$"),
        "AUD" => Some("A$"),
        "CAD" => Some("CA$"),
        "NZD" => Some("NZ$"),
        "EUR" => Some("€"),
        "GBP" => Some("£"),
        "JPY" => Some("¥"),
        "INR" => Some("₹"),
        _ => None,
    }
}

/// Formats an amount in `currency` with two fraction digits, e.g. `$1,234.50`
/// or `XBT 0.25` for codes without a well-known symbol.
pub fn format_currency(value: Option<f64>, currency: &str) -> String {
    let Some(value) = finite(value) else {
        return MISSING.to_string();
    };
    let digits = group_thousands(&fixed(value.abs(), MAX_FRACTION_DIGITS));
    let sign = if value < 0.0 && digits.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    match currency_symbol(currency) {
        Some(symbol) => format!("{sign}{symbol}{digits}"),
        None => format!("{sign}{} {digits}", currency.to_uppercase()),
    }
}

/// Formats a plain figure with at most two fraction digits, e.g. `120,000`.
pub fn format_number(value: Option<f64>) -> String {
    match finite(value) {
        Some(v) => group_thousands(&trim_fraction(fixed(v, MAX_FRACTION_DIGITS))),
        None => MISSING.to_string(),
    }
}

/// Formats a percent change, prefixing positive values with `+`.
pub fn format_percent(value: Option<f64>) -> String {
    match finite(value) {
        Some(v) => {
            let sign = if v > 0.0 { "+" } else { "" };
            format!("{sign}{}%", format_number(Some(v)))
        }
        None => MISSING.to_string(),
    }
}

/// Coarse relative age of `then` measured at `now`: `42s ago`, `5m ago`,
/// `3h ago`.
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    if seconds < 60 {
        return format!("{seconds}s ago");
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    format!("{}h ago", minutes / 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("0"), "0");
        assert_eq!(group_thousands("999"), "999");
        assert_eq!(group_thousands("1000"), "1,000");
        assert_eq!(group_thousands("1234567.89"), "1,234,567.89");
        assert_eq!(group_thousands("-120000"), "-120,000");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(Some(50000.0), "USD"), "$50,000.00");
        assert_eq!(format_currency(Some(1234.567), "aud"), "A$1,234.57");
        assert_eq!(format_currency(Some(-2.5), "EUR"), "-€2.50");
        assert_eq!(format_currency(Some(0.25), "XBT"), "XBT 0.25");
        assert_eq!(format_currency(Some(-0.001), "USD"), "$0.00");
        assert_eq!(format_currency(None, "USD"), MISSING);
        assert_eq!(format_currency(Some(f64::NAN), "USD"), MISSING);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(Some(120000.0)), "120,000");
        assert_eq!(format_number(Some(3.14159)), "3.14");
        assert_eq!(format_number(Some(2.5)), "2.5");
        assert_eq!(format_number(Some(-0.001)), "0");
        assert_eq!(format_number(None), MISSING);
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(Some(3.2)), "+3.2%");
        assert_eq!(format_percent(Some(-5.0)), "-5%");
        assert_eq!(format_percent(Some(0.0)), "0%");
        assert_eq!(format_percent(Some(f64::INFINITY)), MISSING);
    }

    #[test]
    fn test_time_ago() {
        let now = Utc::now();
        assert_eq!(time_ago(now - Duration::seconds(42), now), "42s ago");
        assert_eq!(time_ago(now - Duration::seconds(330), now), "5m ago");
        assert_eq!(time_ago(now - Duration::minutes(200), now), "3h ago");
        assert_eq!(time_ago(now + Duration::seconds(5), now), "0s ago");
    }
}
