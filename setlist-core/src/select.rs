//! Concert selection: date parsing, newest-first ordering and the
//! upcoming / past filter.
//!
//! The rule is:
//!   - **upcoming**: event date on or after today
//!   - **past**: event date strictly before today
//!   - **all**: no filter
//!
//! The list is sorted newest first *before* filtering, and the result is
//! capped to the configured maximum.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CoreError;
use crate::types::Concert;

/// Which concerts a user wants to see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowConcerts {
    /// Every concert, past and upcoming.
    #[default]
    All,
    /// Concerts today or later.
    Upcoming,
    /// Concerts before today.
    Past,
}

impl ShowConcerts {
    /// Whether a concert on `date` passes this filter.
    #[must_use]
    pub fn admits(self, date: NaiveDate, today: NaiveDate) -> bool {
        match self {
            Self::All => true,
            Self::Upcoming => date >= today,
            Self::Past => date < today,
        }
    }

    /// Configuration keyword.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Upcoming => "upcoming",
            Self::Past => "past",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All concerts",
            Self::Upcoming => "Upcoming only",
            Self::Past => "Past only",
        }
    }
}

impl fmt::Display for ShowConcerts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShowConcerts {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "upcoming" => Ok(Self::Upcoming),
            "past" => Ok(Self::Past),
            other => Err(CoreError::Config(format!(
                "unknown show_concerts value '{other}' (expected all, upcoming or past)"
            ))),
        }
    }
}

/// A concert paired with its parsed event date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatedConcert<'a> {
    /// Parsed event date.
    pub date: NaiveDate,
    /// The concert itself.
    pub concert: &'a Concert,
}

impl DatedConcert<'_> {
    /// Whether the concert lies strictly after `today`.
    #[must_use]
    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        self.date > today
    }
}

/// Parse every concert's date, dropping (and logging) the ones that fail.
#[must_use]
pub fn date_concerts(concerts: &[Concert]) -> Vec<DatedConcert<'_>> {
    concerts
        .iter()
        .filter_map(|concert| match concert.parse_event_date() {
            Ok(date) => Some(DatedConcert { date, concert }),
            Err(err) => {
                warn!(
                    concert_id = concert.id.as_deref().unwrap_or("-"),
                    error = %err,
                    "Skipping concert with unparsable event date"
                );
                None
            }
        })
        .collect()
}

/// Select the concerts to display.
///
/// Sorts newest first (stable, so same-day concerts keep API order),
/// applies the `mode` filter relative to `today`, and keeps at most `max`.
#[must_use]
pub fn select_concerts(
    concerts: &[Concert],
    mode: ShowConcerts,
    today: NaiveDate,
    max: usize,
) -> Vec<DatedConcert<'_>> {
    let mut dated = date_concerts(concerts);
    dated.sort_by(|a, b| b.date.cmp(&a.date));

    dated
        .into_iter()
        .filter(|d| mode.admits(d.date, today))
        .take(max)
        .collect()
}
