//! Exact monetary arithmetic helpers.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Decimal places kept on every monetary amount.
pub const MONEY_SCALE: u32 = 2;

/// Round to cents, midpoint away from zero, always carrying two decimals.
pub fn round2(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Parse a number written with either `.` or `,` as decimal separator
/// (e.g. "150", "2,5", "99.90").
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let normalized = s.trim().replacen(',', ".", 1);
    Decimal::from_str(&normalized).ok()
}

/// Format an amount with two decimals and thousands separators (1,234.56).
pub fn format_amount(amount: Decimal) -> String {
    let s = format!("{:.2}", round2(amount));
    let (sign, unsigned) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s.as_str()),
    };

    let Some((integer_part, decimal_part)) = unsigned.split_once('.') else {
        return s;
    };

    let chars: Vec<char> = integer_part.chars().collect();
    let mut formatted = String::new();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(*c);
    }

    format!("{}{}.{}", sign, formatted, decimal_part)
}
