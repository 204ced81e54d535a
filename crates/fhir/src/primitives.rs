//! FHIR primitive format checks.

use chrono::{DateTime, NaiveDate};

/// Whether `value` is a valid FHIR `dateTime`.
///
/// Accepted shapes are `YYYY`, `YYYY-MM`, `YYYY-MM-DD`, and a full timestamp with a zone
/// offset (`2024-03-01T10:15:00Z`, `2024-03-01T10:15:00.123+01:00`). The year must be at
/// least `0001`, the separator is an uppercase `T`, the zone is `Z` or `+hh:mm`/`-hh:mm`, and
/// seconds run to `59`.
pub fn is_valid_date_time(value: &str) -> bool {
    if !value.is_ascii() || value.get(..4).is_none_or(|year| year == "0000") {
        return false;
    }

    match value.len() {
        4 => value.bytes().all(|b| b.is_ascii_digit()),
        7 => NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d").is_ok(),
        10 => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
        _ => is_full_timestamp(value),
    }
}

/// `YYYY-MM-DDThh:mm:ss[.f+](Z|+hh:mm|-hh:mm)`, checked for shape before chrono reads it.
fn is_full_timestamp(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() < 20 || bytes[10] != b'T' {
        return false;
    }

    let two_digits = |at: usize| match (bytes.get(at), bytes.get(at + 1)) {
        (Some(a), Some(b)) if a.is_ascii_digit() && b.is_ascii_digit() => {
            Some((a - b'0') * 10 + (b - b'0'))
        }
        _ => None,
    };
    let time_ok = bytes[13] == b':'
        && bytes[16] == b':'
        && two_digits(11).is_some_and(|hour| hour < 24)
        && two_digits(14).is_some_and(|minute| minute < 60)
        && two_digits(17).is_some_and(|second| second < 60);
    if !time_ok {
        return false;
    }

    let mut rest = &value[19..];
    if let Some(fraction) = rest.strip_prefix('.') {
        let digits = fraction.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return false;
        }
        rest = &fraction[digits..];
    }

    let zone_ok = match rest.as_bytes() {
        [b'Z'] => true,
        [b'+' | b'-', h1, h2, b':', m1, m2] => {
            [h1, h2, m1, m2].iter().all(|b| b.is_ascii_digit())
                && (*h1 - b'0') * 10 + (*h2 - b'0') <= 14
                && *m1 < b'6'
        }
        _ => false,
    };

    zone_ok && DateTime::parse_from_rfc3339(value).is_ok()
}
