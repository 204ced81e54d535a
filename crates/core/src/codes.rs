//! Translation tables between the single-letter codes held in a referral record and their
//! FHIR enumerations.
//!
//! Both tables are total over the letters they list. A letter outside a table is a hard
//! failure for the caller; nothing here substitutes a default.

use fhir::{RequestPriority, UnitsOfTime};
use serde_json::Number;

/// Priority letters and the request priority each stands for.
pub const PRIORITY_TABLE: [(char, RequestPriority); 4] = [
    ('U', RequestPriority::Urgent),
    ('A', RequestPriority::Asap),
    ('R', RequestPriority::Routine),
    ('S', RequestPriority::Stat),
];

/// Frequency letters and the unit of time each stands for.
///
/// Minutes have no letter.
pub const FREQUENCY_TABLE: [(char, UnitsOfTime); 6] = [
    ('A', UnitsOfTime::Year),
    ('D', UnitsOfTime::Day),
    ('H', UnitsOfTime::Hour),
    ('M', UnitsOfTime::Month),
    ('S', UnitsOfTime::Second),
    ('W', UnitsOfTime::Week),
];

/// Priority for a letter, compared case-insensitively.
pub fn priority_from_letter(letter: char) -> Option<RequestPriority> {
    let letter = letter.to_ascii_uppercase();
    PRIORITY_TABLE
        .iter()
        .find(|(code, _)| *code == letter)
        .map(|(_, priority)| *priority)
}

/// The letter a priority is recorded as.
pub fn priority_letter(priority: RequestPriority) -> char {
    match priority {
        RequestPriority::Urgent => 'U',
        RequestPriority::Asap => 'A',
        RequestPriority::Routine => 'R',
        RequestPriority::Stat => 'S',
    }
}

/// Unit of time for a frequency letter, compared case-insensitively.
pub fn unit_from_letter(letter: char) -> Option<UnitsOfTime> {
    let letter = letter.to_ascii_uppercase();
    FREQUENCY_TABLE
        .iter()
        .find(|(code, _)| *code == letter)
        .map(|(_, unit)| *unit)
}

/// The letter a unit of time is recorded as, if it has one.
pub fn unit_letter(unit: UnitsOfTime) -> Option<char> {
    FREQUENCY_TABLE
        .iter()
        .find(|(_, candidate)| *candidate == unit)
        .map(|(code, _)| *code)
}

/// A repeat period split into its magnitude and unit, e.g. `"6D"` is six days.
#[derive(Clone, Debug, PartialEq)]
pub struct RepeatPeriod {
    pub magnitude: Number,
    pub unit: UnitsOfTime,
}

impl RepeatPeriod {
    /// Parse `<magnitude><unit letter>`.
    ///
    /// The magnitude is a non-negative integer or a decimal with digits on both sides of the
    /// point. Returns `None` if either part is missing or malformed, or if the unit letter is
    /// not in [`FREQUENCY_TABLE`].
    pub fn parse(value: &str) -> Option<Self> {
        let letter = value.chars().last()?;
        let unit = unit_from_letter(letter)?;
        let magnitude = &value[..value.len() - letter.len_utf8()];
        let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        let well_formed = match magnitude.split_once('.') {
            Some((whole, fraction)) => digits(whole) && digits(fraction),
            None => digits(magnitude),
        };
        if !well_formed {
            return None;
        }

        let magnitude = match magnitude.parse::<u64>() {
            Ok(whole) => Number::from(whole),
            Err(_) => magnitude
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)?,
        };

        Some(Self { magnitude, unit })
    }

    /// Format a FHIR timing period back into record form. `None` if the unit has no letter.
    pub fn format(magnitude: &Number, unit: UnitsOfTime) -> Option<String> {
        unit_letter(unit).map(|letter| format!("{magnitude}{letter}"))
    }
}
