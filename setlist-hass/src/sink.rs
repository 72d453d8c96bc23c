//! State sinks: where published entity states end up.
//!
//! Home Assistant accepts arbitrary entity states over
//! `POST /api/states/{entity_id}` with a long-lived access token. That is
//! the only host surface used; entities are not registered.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::{Map, Value};
use setlist_client::error::excerpt;
use tracing::debug;

use crate::error::SinkError;

/// One entity state to publish.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateUpdate {
    /// Target entity, e.g. `sensor.setlistfm_john_concerts`.
    #[serde(skip)]
    pub entity_id: String,
    /// Entity state.
    pub state: Value,
    /// Extra attributes.
    pub attributes: Map<String, Value>,
}

impl StateUpdate {
    /// A state with no attributes.
    pub fn new(entity_id: impl Into<String>, state: impl Into<Value>) -> Self {
        Self {
            entity_id: entity_id.into(),
            state: state.into(),
            attributes: Map::new(),
        }
    }

    /// Add an attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    /// Look up an attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// Destination for entity states.
#[async_trait]
pub trait StateSink: Send + Sync {
    /// Create or overwrite the state of `update.entity_id`.
    async fn set_state(&self, update: StateUpdate) -> Result<(), SinkError>;
}

// ---------------------------------------------------------------------------
// Home Assistant REST
// ---------------------------------------------------------------------------

/// Publishes states to Home Assistant's REST API.
#[derive(Debug, Clone)]
pub struct HassRestSink {
    http: Client,
    base_url: Url,
    token: String,
}

impl HassRestSink {
    /// Create a sink for the instance at `base_url`.
    ///
    /// # Errors
    /// `SinkError::Config` for an unusable URL or empty token.
    pub fn new(base_url: &str, token: &str) -> Result<Self, SinkError> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| SinkError::Config(format!("invalid Home Assistant url '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(SinkError::Config(format!("Home Assistant url '{base_url}' cannot carry a path")));
        }
        if token.trim().is_empty() {
            return Err(SinkError::Config("Home Assistant access token is empty".into()));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SinkError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            token: token.trim().to_string(),
        })
    }

    fn state_url(&self, entity_id: &str) -> Result<Url, SinkError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SinkError::Config(format!("Home Assistant url '{}' cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "states", entity_id]);
        Ok(url)
    }
}

#[async_trait]
impl StateSink for HassRestSink {
    async fn set_state(&self, update: StateUpdate) -> Result<(), SinkError> {
        let url = self.state_url(&update.entity_id)?;
        debug!(entity_id = %update.entity_id, state = %update.state, "Setting state");

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&update)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(SinkError::Rejected {
            entity_id: update.entity_id,
            status: status.as_u16(),
            body: excerpt(&body),
        })
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Keeps the latest state per entity in memory (dry runs, tests).
#[derive(Debug, Default)]
pub struct MemorySink {
    states: Mutex<BTreeMap<String, StateUpdate>>,
    writes: Mutex<usize>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest state written for `entity_id`.
    #[must_use]
    pub fn get(&self, entity_id: &str) -> Option<StateUpdate> {
        self.states.lock().get(entity_id).cloned()
    }

    /// Snapshot of every entity's latest state, ordered by entity id.
    #[must_use]
    pub fn states(&self) -> Vec<StateUpdate> {
        self.states.lock().values().cloned().collect()
    }

    /// Total number of `set_state` calls.
    #[must_use]
    pub fn writes(&self) -> usize {
        *self.writes.lock()
    }
}

#[async_trait]
impl StateSink for MemorySink {
    async fn set_state(&self, update: StateUpdate) -> Result<(), SinkError> {
        *self.writes.lock() += 1;
        self.states.lock().insert(update.entity_id.clone(), update);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn state_url_is_built_under_api_states() {
        let sink = HassRestSink::new("http://ha.local:8123/", "token").expect("sink");
        let url = sink.state_url("sensor.setlistfm_john_concerts").expect("url");
        assert_eq!(url.as_str(), "http://ha.local:8123/api/states/sensor.setlistfm_john_concerts");
    }

    #[test]
    fn rejects_empty_token() {
        assert!(matches!(HassRestSink::new("http://ha.local:8123", " "), Err(SinkError::Config(_))));
        assert!(matches!(HassRestSink::new("nope", "t"), Err(SinkError::Config(_))));
    }

    #[test]
    fn payload_omits_entity_id() {
        let update = StateUpdate::new("sensor.x", 3).with_attribute("icon", "mdi:music-note");
        let body = serde_json::to_value(&update).expect("serializable");
        assert_eq!(body, json!({ "state": 3, "attributes": { "icon": "mdi:music-note" } }));
    }

    #[tokio::test]
    async fn memory_sink_keeps_latest() {
        let sink = MemorySink::new();
        sink.set_state(StateUpdate::new("sensor.a", 1)).await.expect("write");
        sink.set_state(StateUpdate::new("sensor.a", 2)).await.expect("write");
        sink.set_state(StateUpdate::new("sensor.b", "x")).await.expect("write");

        assert_eq!(sink.writes(), 3);
        assert_eq!(sink.get("sensor.a").map(|s| s.state), Some(json!(2)));
        assert_eq!(sink.states().len(), 2);
    }
}
