//! Bridge module: maps refresh results onto Home Assistant entities.
//!
//! Each tracked user owns three entities, keyed by the user's slug:
//!
//! | entity                                | state                              |
//! |---------------------------------------|------------------------------------|
//! | `sensor.setlistfm_{slug}_last_update` | ISO-8601 time of the last refresh  |
//! | `sensor.setlistfm_{slug}_response`    | `200`, or `"{status}: {body}"`     |
//! | `sensor.setlistfm_{slug}_concerts`    | number of selected concerts        |

use chrono::{DateTime, Local};
use serde_json::{Value, json};
use setlist_client::ClientError;
use setlist_core::UserConfig;
use setlist_core::summary::ConcertSummary;

use crate::coordinator::CoordinatorStatus;
use crate::sink::StateUpdate;

/// Prefix shared by every entity this integration writes.
pub const ENTITY_PREFIX: &str = "setlistfm";

/// Icon of the concerts sensor.
pub const CONCERTS_ICON: &str = "mdi:music-note";
/// Icon of the last-update sensor.
pub const LAST_UPDATE_ICON: &str = "mdi:clock-outline";
/// Icon of the response sensor.
pub const RESPONSE_ICON: &str = "mdi:api";

/// Entity ids for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityIds {
    /// Time of the last refresh attempt.
    pub last_update: String,
    /// Outcome of the last API call.
    pub response: String,
    /// Selected concerts.
    pub concerts: String,
}

impl EntityIds {
    /// Entity ids derived from the user's slug.
    #[must_use]
    pub fn for_user(user: &UserConfig) -> Self {
        let slug = user.slug();
        Self {
            last_update: format!("sensor.{ENTITY_PREFIX}_{slug}_last_update"),
            response: format!("sensor.{ENTITY_PREFIX}_{slug}_response"),
            concerts: format!("sensor.{ENTITY_PREFIX}_{slug}_concerts"),
        }
    }
}

/// One-line description of a user's display options.
#[must_use]
pub fn describe_user(user: &UserConfig) -> String {
    format!(
        "{}, up to {} concerts, dates as {}, every {}h, published to {}",
        user.show_concerts.label(),
        user.number_of_concerts,
        user.date_format.label(),
        user.refresh_period,
        EntityIds::for_user(user).concerts,
    )
}

/// Text published on the response sensor for a failed call.
///
/// HTTP failures read `"{status}: {body excerpt}"`, also after retries ran
/// out; transport failures carry the error message alone.
#[must_use]
pub fn response_text(err: &ClientError) -> String {
    match (err.status(), err.body()) {
        (Some(status), Some(body)) => format!("{status}: {body}"),
        _ => err.to_string(),
    }
}

/// `sensor.…_last_update`.
#[must_use]
pub fn last_update_state(
    ids: &EntityIds,
    user: &UserConfig,
    now: DateTime<Local>,
    status: &CoordinatorStatus,
) -> StateUpdate {
    let mut update = StateUpdate::new(&ids.last_update, now.to_rfc3339())
        .with_attribute("friendly_name", format!("{} Last Update", user.name))
        .with_attribute("icon", LAST_UPDATE_ICON)
        .with_attribute("last_update_success", status.last_update_success);

    if let Some(success) = status.last_success {
        update = update.with_attribute("last_success", success.to_rfc3339());
    }
    if let Some(error) = &status.last_error {
        update = update.with_attribute("last_error", error.as_str());
    }
    update
}

/// `sensor.…_response`: `Ok(status)` for a successful call.
#[must_use]
pub fn response_state(ids: &EntityIds, user: &UserConfig, outcome: Result<u16, &ClientError>) -> StateUpdate {
    let state: Value = match outcome {
        Ok(status) => json!(status),
        Err(err) => json!(response_text(err)),
    };
    StateUpdate::new(&ids.response, state)
        .with_attribute("friendly_name", format!("{} Response", user.name))
        .with_attribute("icon", RESPONSE_ICON)
}

/// `sensor.…_concerts`: count as state, lines and summaries as attributes.
#[must_use]
pub fn concerts_state(
    ids: &EntityIds,
    user: &UserConfig,
    lines: &[String],
    summaries: &[ConcertSummary],
) -> StateUpdate {
    StateUpdate::new(&ids.concerts, lines.len())
        .with_attribute("concert_list", lines.join("\n"))
        .with_attribute("concerts", json!(summaries))
        .with_attribute("show_concerts", user.show_concerts.as_str())
        .with_attribute("friendly_name", format!("{} Concerts", user.name))
        .with_attribute("icon", CONCERTS_ICON)
}
