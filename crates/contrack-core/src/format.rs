//! Display formatting: Brazilian currency and dates, schedule status lights.
//!
//! Nothing in here fails. Bad input degrades to a fixed fallback (`R$ 0,00`,
//! `-`, the raw text, or the gray "no data" status).

use std::fmt;

use chrono::NaiveDate;
use serde_json::Value;

use crate::coerce;
use crate::dates::parse_date;

pub const FALLBACK_CURRENCY: &str = "R$ 0,00";
pub const EMPTY_DATE: &str = "-";

/// `4430.11` → `R$ 4.430,11`.
///
/// Dots group thousands, the comma marks decimals, two places, rounded half
/// away from zero. Negative values keep the sign after the prefix
/// (`R$ -12,50`). Non-finite input yields [`FALLBACK_CURRENCY`].
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return FALLBACK_CURRENCY.to_string();
    }
    let rounded = (value.abs() * 100.0).round() / 100.0;
    let fixed = format!("{rounded:.2}");
    let (whole, decimals) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if value < 0.0 && rounded > 0.0 { "-" } else { "" };
    format!("R$ {sign}{},{decimals}", group_thousands(whole))
}

/// Like [`format_currency`], for a raw backend cell.
pub fn format_currency_value(value: &Value) -> String {
    format_currency(coerce::to_f64(value))
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

/// `0.5` → `50,00%`.
pub fn format_percent(fraction: f64) -> String {
    let fraction = if fraction.is_finite() { fraction } else { 0.0 };
    format!("{:.2}%", fraction * 100.0).replace('.', ",")
}

/// `2025-11-01` → `01/11/2025`. Blank input gives `-`; unparseable input is
/// returned unchanged.
pub fn format_date(raw: &str) -> String {
    if raw.trim().is_empty() {
        return EMPTY_DATE.to_string();
    }
    match parse_date(raw) {
        Some(d) => d.format("%d/%m/%Y").to_string(),
        None => raw.to_string(),
    }
}

/// Traffic-light colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Green,
    Yellow,
    Red,
    Gray,
}

impl Signal {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Green => "🟢",
            Self::Yellow => "🟡",
            Self::Red => "🔴",
            Self::Gray => "⚪",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
            Self::Gray => "gray",
        }
    }
}

/// Schedule position of one item relative to its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleStatus {
    pub label: String,
    pub signal: Signal,
}

impl ScheduleStatus {
    pub fn no_data() -> Self {
        Self {
            label: "no data".to_string(),
            signal: Signal::Gray,
        }
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.signal.symbol(), self.label)
    }
}

/// Compare a deadline against the reference date.
///
/// The reference is the measurement date once the item is complete
/// (`fraction >= 1`), otherwise `today`. `diff = deadline - reference` in
/// days: positive is green "N days ahead", zero is yellow "at limit",
/// negative is red "N days late". A missing or unparseable deadline, a
/// complete item without a usable measurement date, an unparseable
/// measurement date, or a non-finite fraction all give [`ScheduleStatus::no_data`].
pub fn schedule_status(
    deadline: &str,
    measurement_date: Option<&str>,
    fraction: f64,
    today: NaiveDate,
) -> ScheduleStatus {
    if !fraction.is_finite() {
        return ScheduleStatus::no_data();
    }
    let Some(deadline) = parse_date(deadline) else {
        return ScheduleStatus::no_data();
    };
    let measured = match measurement_date.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => match parse_date(raw) {
            Some(d) => Some(d),
            None => return ScheduleStatus::no_data(),
        },
        None => None,
    };
    let reference = if fraction >= 1.0 {
        match measured {
            Some(d) => d,
            None => return ScheduleStatus::no_data(),
        }
    } else {
        today
    };

    let diff = (deadline - reference).num_days();
    if diff > 0 {
        ScheduleStatus {
            label: format!("{diff} days ahead"),
            signal: Signal::Green,
        }
    } else if diff == 0 {
        ScheduleStatus {
            label: "at limit".to_string(),
            signal: Signal::Yellow,
        }
    } else {
        ScheduleStatus {
            label: format!("{} days late", -diff),
            signal: Signal::Red,
        }
    }
}
