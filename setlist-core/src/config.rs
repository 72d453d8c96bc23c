//! Configuration for setlist-hass.
//!
//! Maps directly to `setlist-hass.toml`:
//!
//! ```toml
//! [host]
//! url = "http://homeassistant.local:8123"
//!
//! [[users]]
//! userid = "someone"
//! name = "Someone"
//! api_key = "..."
//! show_concerts = "upcoming"
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::format::{DateFormat, Vocabulary};
use crate::select::ShowConcerts;

/// Default hours between refreshes.
pub const DEFAULT_REFRESH_PERIOD: u64 = 6;
/// Default number of concerts shown.
pub const DEFAULT_NUMBER_OF_CONCERTS: usize = 10;
/// setlist.fm REST base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.setlist.fm/rest/1.0";

/// Allowed refresh period range (hours).
pub const REFRESH_PERIOD_RANGE: std::ops::RangeInclusive<u64> = 1..=24;
/// Allowed number-of-concerts range.
pub const NUMBER_OF_CONCERTS_RANGE: std::ops::RangeInclusive<usize> = 1..=50;
/// Allowed attended-pages range.
pub const MAX_PAGES_RANGE: std::ops::RangeInclusive<u32> = 1..=10;

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetlistConfig {
    /// Where states are published.
    #[serde(default)]
    pub host: HostConfig,
    /// setlist.fm API settings.
    #[serde(default)]
    pub api: ApiConfig,
    /// Words used in concert lines.
    #[serde(default)]
    pub vocabulary: Vocabulary,
    /// Tracked users.
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

impl SetlistConfig {
    /// Load and validate configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `CoreError::Config` if the TOML is invalid or fails validation.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| CoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Check ranges and required fields.
    ///
    /// # Errors
    /// Returns `CoreError::Config` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.users.is_empty() {
            return Err(CoreError::Config("at least one [[users]] entry is required".into()));
        }

        self.api.validate()?;

        let mut slugs = HashSet::new();
        for user in &self.users {
            user.validate()?;
            if !slugs.insert(user.slug()) {
                return Err(CoreError::Config(format!(
                    "duplicate user name '{}' (entity ids would collide)",
                    user.name
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Home Assistant connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Base URL of the Home Assistant instance.
    #[serde(default = "default_host_url")]
    pub url: String,
    /// Long-lived access token. May instead be supplied on the command line
    /// or through the environment.
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            url: default_host_url(),
            token: None,
        }
    }
}

/// setlist.fm API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// REST base URL.
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Attempts for the attended-concerts request.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Seconds to wait between attempts.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_secs: default_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

impl ApiConfig {
    fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(CoreError::Config("api.base_url must not be empty".into()));
        }
        if self.retry_attempts == 0 {
            return Err(CoreError::Config("api.retry_attempts must be at least 1".into()));
        }
        if self.timeout_secs == 0 {
            return Err(CoreError::Config("api.timeout_secs must be at least 1".into()));
        }
        Ok(())
    }
}

/// One tracked setlist.fm user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    /// setlist.fm user id.
    pub userid: String,
    /// Display name; also the source of entity ids.
    pub name: String,
    /// setlist.fm API key.
    pub api_key: String,
    /// Hours between refreshes.
    #[serde(default = "default_refresh_period")]
    pub refresh_period: u64,
    /// Maximum concerts shown.
    #[serde(default = "default_number_of_concerts")]
    pub number_of_concerts: usize,
    /// Date display format.
    #[serde(default)]
    pub date_format: DateFormat,
    /// Which concerts to show.
    #[serde(default)]
    pub show_concerts: ShowConcerts,
    /// How many pages of attended concerts to fetch.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

impl UserConfig {
    /// Create a user with default options.
    #[must_use]
    pub fn new(userid: impl Into<String>, name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            userid: userid.into(),
            name: name.into(),
            api_key: api_key.into(),
            refresh_period: DEFAULT_REFRESH_PERIOD,
            number_of_concerts: DEFAULT_NUMBER_OF_CONCERTS,
            date_format: DateFormat::default(),
            show_concerts: ShowConcerts::default(),
            max_pages: default_max_pages(),
        }
    }

    /// Lowercased, underscore-separated name used in entity ids.
    #[must_use]
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.name.len());
        for c in self.name.trim().chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.ends_with('_') {
                slug.push('_');
            }
        }
        slug.trim_matches('_').to_string()
    }

    /// Refresh period as a `Duration`.
    #[must_use]
    pub fn refresh_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.refresh_period * 3600)
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("userid", &self.userid),
            ("name", &self.name),
            ("api_key", &self.api_key),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::Config(format!("user field '{field}' must not be empty")));
            }
        }
        if self.slug().is_empty() {
            return Err(CoreError::Config(format!(
                "user name '{}' has no ASCII letters or digits",
                self.name
            )));
        }
        if !REFRESH_PERIOD_RANGE.contains(&self.refresh_period) {
            return Err(CoreError::Config(format!(
                "refresh_period for '{}' must be within 1..=24 hours, got {}",
                self.name, self.refresh_period
            )));
        }
        if !NUMBER_OF_CONCERTS_RANGE.contains(&self.number_of_concerts) {
            return Err(CoreError::Config(format!(
                "number_of_concerts for '{}' must be within 1..=50, got {}",
                self.name, self.number_of_concerts
            )));
        }
        if !MAX_PAGES_RANGE.contains(&self.max_pages) {
            return Err(CoreError::Config(format!(
                "max_pages for '{}' must be within 1..=10, got {}",
                self.name, self.max_pages
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

fn default_host_url() -> String {
    "http://localhost:8123".to_string()
}
fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_delay_secs() -> u64 {
    5
}
fn default_refresh_period() -> u64 {
    DEFAULT_REFRESH_PERIOD
}
fn default_number_of_concerts() -> usize {
    DEFAULT_NUMBER_OF_CONCERTS
}
fn default_max_pages() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [[users]]
        userid = "jdoe"
        name = "John Doe"
        api_key = "secret"
    "#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = SetlistConfig::from_toml(MINIMAL).expect("valid config");
        let user = &config.users[0];
        assert_eq!(user.refresh_period, 6);
        assert_eq!(user.number_of_concerts, 10);
        assert_eq!(user.date_format, DateFormat::DayMonthYear);
        assert_eq!(user.show_concerts, ShowConcerts::All);
        assert_eq!(user.max_pages, 1);
        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.api.retry_attempts, 3);
        assert_eq!(config.api.retry_delay_secs, 5);
        assert_eq!(config.vocabulary, Vocabulary::default());
    }

    #[test]
    fn full_config_parses() {
        let toml = r#"
            [host]
            url = "http://ha.lan:8123"
            token = "abc"

            [vocabulary]
            at = "op"
            in = "in"
            on = "op"
            upcoming = "Binnenkort"

            [[users]]
            userid = "jdoe"
            name = "John"
            api_key = "k1"
            refresh_period = 12
            number_of_concerts = 5
            date_format = "%m-%d-%y"
            show_concerts = "upcoming"

            [[users]]
            userid = "asmith"
            name = "Anna"
            api_key = "k2"
            date_format = "MM-DD-YYYY"
        "#;
        let config = SetlistConfig::from_toml(toml).expect("valid config");
        assert_eq!(config.host.token.as_deref(), Some("abc"));
        assert_eq!(config.vocabulary.upcoming, "Binnenkort");
        assert_eq!(config.users[0].date_format, DateFormat::MonthDayShortYear);
        assert_eq!(config.users[0].show_concerts, ShowConcerts::Upcoming);
        assert_eq!(config.users[1].date_format, DateFormat::MonthDayYear);
        assert_eq!(config.users[0].refresh_interval().as_secs(), 12 * 3600);
    }

    #[test]
    fn rejects_unknown_date_format() {
        let toml = format!("{MINIMAL}\ndate_format = \"%Y-%m-%d\"");
        assert!(matches!(SetlistConfig::from_toml(&toml), Err(CoreError::Config(_))));
    }

    #[test]
    fn rejects_out_of_range_values() {
        for extra in ["number_of_concerts = 0", "number_of_concerts = 51", "refresh_period = 0", "refresh_period = 25", "max_pages = 11"] {
            let toml = format!("{MINIMAL}\n{extra}");
            assert!(SetlistConfig::from_toml(&toml).is_err(), "{extra} should be rejected");
        }
    }

    #[test]
    fn rejects_empty_users() {
        assert!(SetlistConfig::from_toml("").is_err());
        let toml = r#"
            [[users]]
            userid = ""
            name = "x"
            api_key = "y"
        "#;
        assert!(SetlistConfig::from_toml(toml).is_err());
    }

    #[test]
    fn rejects_colliding_slugs() {
        let toml = r#"
            [[users]]
            userid = "a"
            name = "John Doe"
            api_key = "k"

            [[users]]
            userid = "b"
            name = "john-doe"
            api_key = "k"
        "#;
        let err = SetlistConfig::from_toml(toml).expect_err("duplicate slug");
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn slug_normalises_name() {
        assert_eq!(UserConfig::new("u", "John Doe", "k").slug(), "john_doe");
        assert_eq!(UserConfig::new("u", "  Zoë's  Gigs! ", "k").slug(), "zo_s_gigs");
        assert_eq!(UserConfig::new("u", "ALICE", "k").slug(), "alice");
    }
}
