//! Core type definitions for setlist.fm concert data.
//!
//! These mirror the JSON shape of the setlist.fm REST API (camelCase keys).
//! Every field that the API may omit is defaulted, so a partially filled
//! setlist still deserializes and can be shown with placeholders.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Date format the API uses for `eventDate`.
pub const EVENT_DATE_FORMAT: &str = "%d-%m-%Y";

// ---------------------------------------------------------------------------
// Concert
// ---------------------------------------------------------------------------

/// One attended concert ("setlist" in API terms).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Concert {
    /// setlist.fm setlist id.
    pub id: Option<String>,
    /// Raw event date, `dd-mm-YYYY`.
    pub event_date: String,
    /// Performing artist.
    pub artist: Artist,
    /// Where the concert took place.
    pub venue: Venue,
    /// Tour the concert was part of, if any.
    pub tour: Option<Tour>,
    /// Songs played, grouped by set.
    pub sets: Sets,
    /// Free-form notes attached to the setlist.
    pub info: Option<String>,
    /// Link to the setlist page on setlist.fm.
    pub url: Option<String>,
}

impl Concert {
    /// Parse `event_date` into a calendar date.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidEventDate` when the value is not `dd-mm-YYYY`.
    pub fn parse_event_date(&self) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(self.event_date.trim(), EVENT_DATE_FORMAT).map_err(|source| {
            CoreError::InvalidEventDate {
                value: self.event_date.clone(),
                source,
            }
        })
    }

    /// Total number of songs across every set, encores included.
    #[must_use]
    pub fn song_count(&self) -> usize {
        self.sets.set.iter().map(|s| s.song.len()).sum()
    }

    /// City name of the venue, or `""` when unknown.
    #[must_use]
    pub fn city_name(&self) -> &str {
        self.venue.city.as_ref().map_or("", |c| c.name.as_str())
    }
}

// ---------------------------------------------------------------------------
// Artist / Venue / Location
// ---------------------------------------------------------------------------

/// A performing artist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Artist {
    /// MusicBrainz identifier.
    pub mbid: Option<String>,
    /// Display name.
    pub name: String,
    /// Name used for sorting ("Beatles, The").
    pub sort_name: Option<String>,
}

/// A concert venue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Venue {
    /// setlist.fm venue id.
    pub id: Option<String>,
    /// Venue name.
    pub name: String,
    /// City the venue is in.
    pub city: Option<City>,
}

/// A city, as attached to a venue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct City {
    /// GeoNames id.
    pub id: Option<String>,
    /// City name.
    pub name: String,
    /// State or region name.
    pub state: Option<String>,
    /// State or region code.
    pub state_code: Option<String>,
    /// Country the city belongs to.
    pub country: Option<Country>,
    /// Geographic coordinates.
    pub coords: Option<Coords>,
}

/// A country.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Country {
    /// ISO 3166-1 alpha-2 code.
    pub code: String,
    /// Country name.
    pub name: String,
}

/// Latitude / longitude pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coords {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub long: f64,
}

/// A tour.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tour {
    /// Tour name.
    pub name: String,
}

// ---------------------------------------------------------------------------
// Sets & Songs
// ---------------------------------------------------------------------------

/// Wrapper object the API uses around the list of sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sets {
    /// The sets played, in order.
    pub set: Vec<Set>,
}

/// One set (main set, encore, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Set {
    /// Optional set name.
    pub name: Option<String>,
    /// Encore number, when this set is an encore.
    pub encore: Option<u32>,
    /// Songs in play order.
    pub song: Vec<Song>,
}

/// A song performed in a set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Song {
    /// Song title.
    pub name: String,
    /// Performance notes.
    pub info: Option<String>,
    /// Whether the song was played from tape.
    pub tape: bool,
}
