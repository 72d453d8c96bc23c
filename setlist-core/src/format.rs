//! Human-readable concert lines.
//!
//! Template:
//!
//! ```text
//! {artist} at {venue}[ in {city}] on {date}[ (Upcoming)]
//! ```
//!
//! The city clause is dropped when the venue has no city name, and the
//! upcoming marker is only added for concerts strictly after today.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::select::DatedConcert;

/// Placeholder when a setlist has no artist name.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
/// Placeholder when a setlist has no venue name.
pub const UNKNOWN_VENUE: &str = "Unknown Venue";

// ---------------------------------------------------------------------------
// Date formats
// ---------------------------------------------------------------------------

/// Supported display formats for the concert date.
///
/// Configured by strftime pattern (`"%d-%m-%Y"`) or by label (`"DD-MM-YYYY"`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateFormat {
    /// `31-12-2024`
    #[default]
    #[serde(rename = "%d-%m-%Y", alias = "DD-MM-YYYY")]
    DayMonthYear,
    /// `31-12-24`
    #[serde(rename = "%d-%m-%y", alias = "DD-MM-YY")]
    DayMonthShortYear,
    /// `12-31-2024`
    #[serde(rename = "%m-%d-%Y", alias = "MM-DD-YYYY")]
    MonthDayYear,
    /// `12-31-24`
    #[serde(rename = "%m-%d-%y", alias = "MM-DD-YY")]
    MonthDayShortYear,
}

impl DateFormat {
    /// Every supported format, in configuration order.
    pub const ALL: [DateFormat; 4] = [
        Self::DayMonthYear,
        Self::DayMonthShortYear,
        Self::MonthDayYear,
        Self::MonthDayShortYear,
    ];

    /// The strftime pattern for chrono.
    #[must_use]
    pub fn pattern(self) -> &'static str {
        match self {
            Self::DayMonthYear => "%d-%m-%Y",
            Self::DayMonthShortYear => "%d-%m-%y",
            Self::MonthDayYear => "%m-%d-%Y",
            Self::MonthDayShortYear => "%m-%d-%y",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::DayMonthYear => "DD-MM-YYYY",
            Self::DayMonthShortYear => "DD-MM-YY",
            Self::MonthDayYear => "MM-DD-YYYY",
            Self::MonthDayShortYear => "MM-DD-YY",
        }
    }

    /// Render `date` in this format.
    #[must_use]
    pub fn render(self, date: NaiveDate) -> String {
        date.format(self.pattern()).to_string()
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pattern())
    }
}

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

/// Connecting words used in a concert line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    /// Between artist and venue.
    pub at: String,
    /// Between venue and city.
    #[serde(rename = "in")]
    pub in_: String,
    /// Before the date.
    pub on: String,
    /// Marker for concerts after today.
    pub upcoming: String,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            at: "at".to_string(),
            in_: "in".to_string(),
            on: "on".to_string(),
            upcoming: "Upcoming".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

/// Format one concert as a display line.
#[must_use]
pub fn format_line(
    dated: &DatedConcert<'_>,
    today: NaiveDate,
    format: DateFormat,
    vocabulary: &Vocabulary,
) -> String {
    let concert = dated.concert;
    let artist = or_placeholder(&concert.artist.name, UNKNOWN_ARTIST);
    let venue = or_placeholder(&concert.venue.name, UNKNOWN_VENUE);

    let mut line = format!("{artist} {} {venue}", vocabulary.at);

    let city = concert.city_name();
    if !city.is_empty() {
        line.push_str(&format!(" {} {city}", vocabulary.in_));
    }

    line.push_str(&format!(" {} {}", vocabulary.on, format.render(dated.date)));

    if dated.is_upcoming(today) {
        line.push_str(&format!(" ({})", vocabulary.upcoming));
    }

    line
}

/// Format every selected concert, preserving order.
#[must_use]
pub fn format_lines(
    selected: &[DatedConcert<'_>],
    today: NaiveDate,
    format: DateFormat,
    vocabulary: &Vocabulary,
) -> Vec<String> {
    selected
        .iter()
        .map(|dated| format_line(dated, today, format, vocabulary))
        .collect()
}
