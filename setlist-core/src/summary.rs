//! Compact per-concert records published alongside the formatted lines.

use serde::{Deserialize, Serialize};

use crate::types::Concert;

/// Artist portion of a [`ConcertSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistSummary {
    /// Artist name.
    pub name: String,
    /// MusicBrainz identifier, when known.
    pub mbid: Option<String>,
}

/// Venue portion of a [`ConcertSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueSummary {
    /// Venue name.
    pub name: String,
    /// City name (may be empty).
    pub city: String,
    /// State or region (may be empty).
    pub state: String,
    /// Country name (may be empty).
    pub country: String,
}

/// A flattened concert record for host attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcertSummary {
    /// setlist.fm setlist id.
    pub id: Option<String>,
    /// Raw `dd-mm-YYYY` event date.
    pub date: String,
    /// Who played.
    pub artist: ArtistSummary,
    /// Where.
    pub venue: VenueSummary,
    /// Number of songs across all sets.
    pub song_count: usize,
    /// Setlist page URL (empty when unknown).
    pub url: String,
}

/// Flatten a concert into its summary record.
#[must_use]
pub fn summarize(concert: &Concert) -> ConcertSummary {
    let city = concert.venue.city.as_ref();

    ConcertSummary {
        id: concert.id.clone(),
        date: concert.event_date.clone(),
        artist: ArtistSummary {
            name: concert.artist.name.clone(),
            mbid: concert.artist.mbid.clone(),
        },
        venue: VenueSummary {
            name: concert.venue.name.clone(),
            city: concert.city_name().to_string(),
            state: city.and_then(|c| c.state.clone()).unwrap_or_default(),
            country: city
                .and_then(|c| c.country.as_ref())
                .map(|c| c.name.clone())
                .unwrap_or_default(),
        },
        song_count: concert.song_count(),
        url: concert.url.clone().unwrap_or_default(),
    }
}
