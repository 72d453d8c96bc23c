//! Per-user refresh cycle.
//!
//! One refresh is:
//!
//! 1. fetch the user profile (validates id and key),
//! 2. fetch attended concerts (retried on 429),
//! 3. select + format against today's date,
//! 4. publish `last_update`, `response` and `concerts`.
//!
//! A failed fetch still publishes `last_update` and `response`, so the
//! dashboard shows why the list is stale; the concerts entity keeps its
//! previous state.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use setlist_client::{ClientError, SetlistClient, UserProfile};
use setlist_core::format::{self, Vocabulary};
use setlist_core::select;
use setlist_core::summary::{self, ConcertSummary};
use setlist_core::{Concert, UserConfig};
use tracing::{debug, error, info, warn};

use crate::bridge::{self, EntityIds};
use crate::error::{RefreshError, SinkError};
use crate::sink::{StateSink, StateUpdate};

/// Where concert data comes from.
#[async_trait]
pub trait ConcertSource: Send + Sync {
    /// Fetch the user's profile.
    async fn user(&self, userid: &str) -> Result<UserProfile, ClientError>;

    /// Fetch up to `max_pages` pages of attended concerts.
    async fn attended(&self, userid: &str, max_pages: u32) -> Result<Vec<Concert>, ClientError>;
}

#[async_trait]
impl ConcertSource for SetlistClient {
    async fn user(&self, userid: &str) -> Result<UserProfile, ClientError> {
        self.fetch_user(userid).await
    }

    async fn attended(&self, userid: &str, max_pages: u32) -> Result<Vec<Concert>, ClientError> {
        self.fetch_attended_all(userid, max_pages).await
    }
}

/// Health of a user's refreshes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinatorStatus {
    /// When the last refresh ran.
    pub last_update: Option<DateTime<Local>>,
    /// When the last successful refresh ran.
    pub last_success: Option<DateTime<Local>>,
    /// Whether the last refresh succeeded.
    pub last_update_success: bool,
    /// Error of the last refresh, if it failed.
    pub last_error: Option<String>,
    /// Concerts published by the last successful refresh.
    pub concert_count: usize,
}

/// What a successful refresh published.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    /// Name resolved from the user profile.
    pub display_name: String,
    /// Concerts returned by the API before selection.
    pub fetched: usize,
    /// Formatted lines, newest first.
    pub lines: Vec<String>,
    /// Structured records for the same concerts.
    pub summaries: Vec<ConcertSummary>,
}

/// Drives refreshes for a single configured user.
pub struct UserCoordinator {
    user: UserConfig,
    vocabulary: Vocabulary,
    source: Arc<dyn ConcertSource>,
    sink: Arc<dyn StateSink>,
    entities: EntityIds,
    status: Mutex<CoordinatorStatus>,
    in_flight: tokio::sync::Mutex<()>,
}

impl UserCoordinator {
    /// Create a coordinator for `user`.
    pub fn new(
        user: UserConfig,
        vocabulary: Vocabulary,
        source: Arc<dyn ConcertSource>,
        sink: Arc<dyn StateSink>,
    ) -> Self {
        let entities = EntityIds::for_user(&user);
        Self {
            user,
            vocabulary,
            source,
            sink,
            entities,
            status: Mutex::new(CoordinatorStatus::default()),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    /// The user this coordinator refreshes.
    #[must_use]
    pub fn user(&self) -> &UserConfig {
        &self.user
    }

    /// Entity ids written by this coordinator.
    #[must_use]
    pub fn entities(&self) -> &EntityIds {
        &self.entities
    }

    /// Snapshot of the refresh status.
    #[must_use]
    pub fn status(&self) -> CoordinatorStatus {
        self.status.lock().clone()
    }

    /// Refresh against the current local time.
    ///
    /// # Errors
    /// See [`refresh_at`](Self::refresh_at).
    pub async fn refresh(&self) -> Result<RefreshReport, RefreshError> {
        self.refresh_at(Local::now()).await
    }

    /// Refresh as if the time were `now`. Concurrent calls are serialized.
    ///
    /// # Errors
    /// `RefreshError::Fetch` when setlist.fm could not be read (failure
    /// states are still published), `RefreshError::Publish` when the host
    /// rejected a state.
    pub async fn refresh_at(&self, now: DateTime<Local>) -> Result<RefreshReport, RefreshError> {
        let _guard = self.in_flight.lock().await;
        let name = self.user.name.as_str();
        debug!(user = name, userid = %self.user.userid, "Updating data");

        let fetched = self.fetch().await;
        let (profile, concerts) = match fetched {
            Ok(data) => data,
            Err(err) => return Err(self.publish_failure(now, err).await),
        };

        let today = now.date_naive();
        let selected = select::select_concerts(
            &concerts,
            self.user.show_concerts,
            today,
            self.user.number_of_concerts,
        );
        let lines = format::format_lines(&selected, today, self.user.date_format, &self.vocabulary);
        let summaries: Vec<ConcertSummary> = selected.iter().map(|d| summary::summarize(d.concert)).collect();
        for line in &lines {
            debug!(user = name, line = %line, "Built concert line");
        }

        // Committed only once every state is accepted.
        let published = CoordinatorStatus {
            last_update: Some(now),
            last_success: Some(now),
            last_update_success: true,
            last_error: None,
            concert_count: lines.len(),
        };

        let updates = [
            bridge::last_update_state(&self.entities, &self.user, now, &published),
            bridge::response_state(&self.entities, &self.user, Ok(200)),
            bridge::concerts_state(&self.entities, &self.user, &lines, &summaries),
        ];
        if let Err(err) = self.publish_all(updates).await {
            let mut status = self.status.lock();
            status.last_update = Some(now);
            status.last_update_success = false;
            status.last_error = Some(err.to_string());
            return Err(err);
        }
        *self.status.lock() = published;

        info!(
            user = name,
            fetched = concerts.len(),
            published = lines.len(),
            mode = %self.user.show_concerts,
            "Updated concert list"
        );

        Ok(RefreshReport {
            display_name: profile.display_name().unwrap_or(name).to_string(),
            fetched: concerts.len(),
            lines,
            summaries,
        })
    }

    async fn fetch(&self) -> Result<(UserProfile, Vec<Concert>), ClientError> {
        let profile = self.source.user(&self.user.userid).await?;
        let concerts = self.source.attended(&self.user.userid, self.user.max_pages).await?;
        Ok((profile, concerts))
    }

    async fn publish_failure(&self, now: DateTime<Local>, err: ClientError) -> RefreshError {
        let name = self.user.name.clone();
        error!(user = %name, error = %err, "Failed to fetch setlist.fm data");

        let status = {
            let mut status = self.status.lock();
            status.last_update = Some(now);
            status.last_update_success = false;
            status.last_error = Some(err.to_string());
            status.clone()
        };

        let updates = [
            bridge::last_update_state(&self.entities, &self.user, now, &status),
            bridge::response_state(&self.entities, &self.user, Err(&err)),
        ];
        if let Err(publish_err) = self.publish_all(updates).await {
            warn!(user = %name, error = %publish_err, "Could not publish failure state");
        }

        RefreshError::Fetch { user: name, source: err }
    }

    async fn publish_all<const N: usize>(&self, updates: [StateUpdate; N]) -> Result<(), RefreshError> {
        for update in updates {
            let entity_id = update.entity_id.clone();
            self.sink
                .set_state(update)
                .await
                .map_err(|source: SinkError| RefreshError::Publish {
                    user: self.user.name.clone(),
                    source,
                })?;
            debug!(user = %self.user.name, entity_id = %entity_id, "Published state");
        }
        Ok(())
    }
}
