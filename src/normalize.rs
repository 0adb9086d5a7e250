//! Scalar normalization for source fields.
//!
//! Nothing in here fails: unparseable input degrades to a default (the original text,
//! `None`, `0.0` or `0`) and the caller decides whether that deserves a warning.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// One accepted date layout, with enough shape information to reject a value
/// before handing it to the full calendar parser.
struct DateLayout {
    separator: char,
    year_position: usize,
    format: &'static str,
}

/// Tried in order; the first plausible layout that parses wins.
const DATE_LAYOUTS: [DateLayout; 4] = [
    DateLayout {
        separator: '-',
        year_position: 0,
        format: "%Y-%m-%d",
    },
    DateLayout {
        separator: '/',
        year_position: 2,
        format: "%m/%d/%Y",
    },
    DateLayout {
        separator: '-',
        year_position: 2,
        format: "%d-%m-%Y",
    },
    DateLayout {
        separator: '/',
        year_position: 0,
        format: "%Y/%m/%d",
    },
];

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

impl DateLayout {
    fn is_plausible(&self, value: &str) -> bool {
        // Shortest is `1-1-2023`, longest `2023-01-01`.
        if !(8..=10).contains(&value.len()) {
            return false;
        }
        let mut fields = 0usize;
        for (idx, part) in value.split(self.separator).enumerate() {
            let width_ok = if idx == self.year_position {
                part.len() == 4
            } else {
                (1..=2).contains(&part.len())
            };
            if !width_ok || !part.bytes().all(|b| b.is_ascii_digit()) {
                return false;
            }
            fields += 1;
        }
        fields == 3
    }

    fn parse(&self, value: &str) -> Option<NaiveDate> {
        if !self.is_plausible(value) {
            return None;
        }
        NaiveDate::parse_from_str(value, self.format).ok()
    }
}

/// Normalizes a free-text date to `YYYY-MM-DD`.
///
/// Empty input stays empty and anything that matches no known layout is
/// returned verbatim.
pub fn normalize_date(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    DATE_LAYOUTS
        .iter()
        .find_map(|layout| layout.parse(value))
        .map(|date| date.format(CANONICAL_DATE_FORMAT).to_string())
        .unwrap_or_else(|| value.to_string())
}

/// Parses a visit timestamp, with or without a time component.
///
/// Fractional seconds are discarded. Date-only values resolve to midnight.
pub fn parse_visit_datetime(value: &str) -> Option<NaiveDateTime> {
    if value.is_empty() {
        return None;
    }

    if value.contains('T') || value.contains(' ') {
        let whole_seconds = value.split_once('.').map_or(value, |(head, _)| head);
        if let Some(parsed) = DATETIME_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(whole_seconds, format).ok())
        {
            return Some(parsed);
        }
    }

    let normalized = normalize_date(value);
    NaiveDate::parse_from_str(&normalized, CANONICAL_DATE_FORMAT)
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN))
}

/// Coerces a monetary value; empty, malformed and non-finite input yield `0.0`.
pub fn coerce_amount(value: &str) -> f64 {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
        .unwrap_or(0.0)
}

/// Coerces a possibly fractional day count, truncating toward zero.
pub fn coerce_duration_days(value: &str) -> i64 {
    let days = coerce_amount(value);
    days.trunc() as i64
}

/// Renders an amount as decimal text that always carries a fractional part.
///
/// Magnitudes below `1e-4` or from `1e16` up switch to exponent form with a
/// signed, two-digit exponent (`1e+16`, `2.5e-05`), as legacy float text does.
pub fn format_amount(value: f64) -> String {
    if value != 0.0 && value.is_finite() {
        let scientific = format!("{value:e}");
        if let Some((mantissa, exponent)) = scientific.split_once('e') {
            if let Ok(exponent) = exponent.parse::<i32>() {
                if !(-4..16).contains(&exponent) {
                    let sign = if exponent < 0 { '-' } else { '+' };
                    return format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs());
                }
            }
        }
    }

    let plain = format!("{value}");
    if plain.contains('.') || !value.is_finite() {
        plain
    } else {
        format!("{plain}.0")
    }
}
