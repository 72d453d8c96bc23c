//! # setlist-core
//!
//! Host-agnostic model of a user's concert history on setlist.fm.
//!
//! The crate turns the raw `setlist` array returned by the API into the
//! lines a dashboard shows:
//!
//! ```text
//! Vec<Concert> ──► select_concerts(mode, today, max) ──► format_lines ──► "A at V in C on 01-02-2024"
//!                                                    └─► summarize     ──► ConcertSummary (attributes)
//! ```
//!
//! - **types**: serde model of setlists (artist, venue, city, sets, songs)
//! - **select**: date parsing, newest-first ordering, upcoming/past filtering
//! - **format**: date formats, vocabulary and the line template
//! - **summary**: compact per-concert attribute records
//! - **config**: TOML configuration for hosts, users and vocabulary
//!
//! Nothing in here performs I/O beyond reading a config file; HTTP lives in
//! `setlist-client` and publication in `setlist-hass`.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod format;
pub mod select;
pub mod summary;
pub mod types;

pub use config::{ApiConfig, HostConfig, SetlistConfig, UserConfig};
pub use error::CoreError;
pub use format::{DateFormat, Vocabulary};
pub use select::{DatedConcert, ShowConcerts};
pub use types::*;
