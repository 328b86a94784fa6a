use rust_decimal::Decimal;

use crate::table::Value;

/// Sanitizes a raw `montant-gen` cell into a decimal amount.
///
/// Text cells go through the historical sanitization: comma→dot substitution,
/// then every character that is not a digit or a dot is stripped, then the
/// result is parsed. Anything unparsable degrades to zero, never to an error.
///
/// Known limitation, kept on purpose: thousands-grouped values like
/// `"1.234,56"` become `"1.234.56"` after substitution, fail to parse and
/// coerce to zero. Plain `"1234,56"` parses as 1234.56.
pub fn sanitize_amount(raw: &Value) -> Decimal {
    match raw {
        Value::Decimal(dec) => *dec,
        Value::Integer(int) => Decimal::from(*int),
        Value::Empty => Decimal::ZERO,
        Value::Text(text) => sanitize_amount_text(text),
    }
}

fn sanitize_amount_text(text: &str) -> Decimal {
    let cleaned: String = text
        .replace(',', ".")
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    Decimal::from_str_exact(&cleaned).unwrap_or(Decimal::ZERO)
}
