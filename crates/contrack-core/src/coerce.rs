//! Safe coercion of backend cells into typed values.
//!
//! The spreadsheet backend returns whatever a cell holds: JSON numbers,
//! numeric strings in either `1234.5` or Brazilian `1.234,50` form, empty
//! strings, `null`, or free text. Every numeric column is decoded through
//! [`to_f64`], which maps anything unusable to `0.0`. Text columns go
//! through [`to_text`]. Both are wired into the record types via the
//! `lenient_*` serde adapters, so the rest of the workspace only ever sees
//! clean `f64` and `String` fields.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// Coerce a JSON cell to a finite `f64`.
///
/// Numbers pass through, numeric strings are parsed with [`parse_number`],
/// and everything else (null, booleans, arrays, garbage text, NaN, infinity)
/// becomes `0.0`. Never panics.
pub fn to_f64(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_number(s).unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_finite() { n } else { 0.0 }
}

/// Parse a numeric string, accepting plain and Brazilian notation.
///
/// `"1234.5"`, `" 1234.5 "`, `"1.234,50"`, `"R$ 1.234,50"` and `"0,15"` all
/// parse. Dot-grouped integers such as `"10.000"` or `"1.234.567"` are read
/// as Brazilian thousands, so `"1.500"` is 1500 and not 1.5; a single dot
/// followed by anything other than three digits (`"1.5"`, `"0.150"`) stays
/// a decimal point. Returns `None` for empty, non-numeric or non-finite
/// input.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    let s = s.strip_prefix("R$").unwrap_or(s).trim();
    if s.is_empty() {
        return None;
    }
    if is_dot_grouped(s) {
        return s.replace('.', "").parse::<f64>().ok();
    }
    if let Ok(n) = s.parse::<f64>()
        && n.is_finite()
    {
        return Some(n);
    }
    // Brazilian form: dots group thousands, the comma marks decimals.
    let normalised = s.replace('.', "").replace(',', ".");
    normalised.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// `10.000`, `-1.234.567`: an optional sign, a leading group of one to three
/// digits not starting with `0`, then one or more `.ddd` groups.
fn is_dot_grouped(s: &str) -> bool {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let mut groups = unsigned.split('.');
    let Some(head) = groups.next() else {
        return false;
    };
    let all_digits = |g: &str| !g.is_empty() && g.bytes().all(|b| b.is_ascii_digit());
    let mut rest = groups.peekable();
    rest.peek().is_some()
        && (1..=3).contains(&head.len())
        && all_digits(head)
        && !head.starts_with('0')
        && rest.all(|g| g.len() == 3 && all_digits(g))
}

/// Coerce a JSON cell to text. `null` and structured values become empty.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Serde adapter for numeric columns. Pair with `#[serde(default)]`.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(to_f64(&value))
}

/// Serde adapter for text columns. Pair with `#[serde(default)]`.
pub fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(to_text(&value))
}

/// Serde adapter for optional text columns: blank cells become `None`.
pub fn lenient_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let text = to_text(&value);
    Ok(if text.is_empty() { None } else { Some(text) })
}

/// Decode raw backend rows into typed records.
///
/// Rows that are not JSON objects are skipped with a warning; one bad row
/// never empties the whole table.
pub fn decode_records<T: DeserializeOwned>(table: &str, rows: Vec<Value>) -> Vec<T> {
    let total = rows.len();
    let records: Vec<T> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(row, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(table, row, error = %e, "skipping malformed record");
                None
            }
        })
        .collect();
    if records.len() < total {
        warn!(table, kept = records.len(), total, "some records were skipped");
    }
    records
}
