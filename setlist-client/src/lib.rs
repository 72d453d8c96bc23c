//! # setlist-client: setlist.fm REST client
//!
//! Thin async wrapper over the two endpoints setlist-hass needs:
//!
//! ```text
//! GET /user/{userId}                 -> UserProfile
//! GET /user/{userId}/attended?p={n}  -> AttendedPage { setlist: Vec<Concert>, .. }
//! ```
//!
//! Every request carries `x-api-key` and `Accept: application/json`.
//! The attended-concerts request goes through a [`RetryPolicy`]
//! (3 attempts, 5 s apart by default) so that HTTP 429 bursts and dropped
//! connections do not fail a whole refresh.

pub mod client;
pub mod error;
pub mod retry;
pub mod types;

pub use client::SetlistClient;
pub use error::ClientError;
pub use retry::RetryPolicy;
pub use types::{AttendedPage, UserProfile};
