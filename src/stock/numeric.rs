//! Lenient numeric coercion and Turkish number formatting

use crate::data::CellValue;

/// Coerce a cell into a finite number, never failing.
///
/// Numbers pass through (non-finite collapses to 0). Text has its first
/// comma replaced by a period and is parsed as the longest leading decimal,
/// so `"1,5"` is 1.5 and `"12 adet"` is 12; anything unparsable is 0. Other
/// kinds are 0.
///
/// ```
/// use sheetstock::data::CellValue;
/// use sheetstock::stock::to_numeric_value;
///
/// assert_eq!(to_numeric_value(&CellValue::text("1,5")), 1.5);
/// assert_eq!(to_numeric_value(&CellValue::text("abc")), 0.0);
/// assert_eq!(to_numeric_value(&CellValue::Number(f64::NAN)), 0.0);
/// ```
pub fn to_numeric_value(value: &CellValue) -> f64 {
    match value {
        CellValue::Number(n) if n.is_finite() => *n,
        CellValue::Number(_) => 0.0,
        CellValue::Text(text) => parse_decimal_prefix(&text.replacen(',', ".", 1)).unwrap_or(0.0),
        CellValue::Empty | CellValue::Other(_) => 0.0,
    }
}

/// Parse the longest decimal literal at the start of `text` (after leading
/// whitespace): optional sign, digits with an optional fraction, optional
/// exponent. Returns `None` when there is no digit or the value overflows.
pub fn parse_decimal_prefix(text: &str) -> Option<f64> {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let digits_from = |start: usize| {
        bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_digits = digits_from(end);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digits_from(end + 1);
        if int_digits + frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits + frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exp_digits = digits_from(end + 1 + sign);
        if exp_digits > 0 {
            end += 1 + sign + exp_digits;
        }
    }

    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Format with Turkish separators: `.` for thousands, `,` for decimals
pub fn format_number(value: f64, decimals: usize) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(formatted.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let is_zero = formatted.chars().all(|c| c == '0' || c == '.');
    let mut out = String::new();
    if value < 0.0 && !is_zero {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push(',');
        out.push_str(frac);
    }
    out
}
