//! setlist.fm client: user profile and attended-concerts endpoints.

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use setlist_core::config::ApiConfig;
use setlist_core::Concert;
use tracing::{debug, info};

use crate::error::{ClientError, Result, excerpt};
use crate::retry::RetryPolicy;
use crate::types::{AttendedPage, UserProfile};

/// Header carrying the setlist.fm API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// A setlist.fm client bound to one API key.
#[derive(Debug, Clone)]
pub struct SetlistClient {
    http: Client,
    base_url: Url,
    timeout: Duration,
    retry: RetryPolicy,
}

impl SetlistClient {
    /// Create a client for `api_key` using the endpoint, timeout and retry
    /// settings in `config`.
    ///
    /// # Errors
    /// `ClientError::Config` if the base URL or API key cannot be used.
    pub fn new(api_key: &str, config: &ApiConfig) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim())
            .map_err(|e| ClientError::Config(format!("invalid base url '{}': {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Config(format!("base url '{base_url}' cannot carry a path")));
        }

        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key.trim())
            .map_err(|_| ClientError::Config("API key contains invalid header characters".into()))?;
        key.set_sensitive(true);
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let timeout = Duration::from_secs(config.timeout_secs);
        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .user_agent(concat!("setlist-hass/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            timeout,
            retry: RetryPolicy::new(config.retry_attempts, Duration::from_secs(config.retry_delay_secs)),
        })
    }

    /// Replace the retry policy for the attended-concerts request.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The retry policy in use.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Fetch a user's public profile. Not retried.
    ///
    /// # Errors
    /// `Unauthorized`, `UserNotFound`, `RateLimited`, `Status`, or a
    /// transport/decode error.
    pub async fn fetch_user(&self, userid: &str) -> Result<UserProfile> {
        let url = self.endpoint(&["user", userid])?;
        debug!(%url, "Fetching user data");
        let profile: UserProfile = self.get_json(url, userid).await?;
        debug!(userid, fullname = profile.fullname.as_deref().unwrap_or("-"), "Fetched user data");
        Ok(profile)
    }

    /// Fetch one page of a user's attended concerts, retrying rate limits
    /// and transport failures according to the retry policy.
    ///
    /// # Errors
    /// As [`fetch_user`](Self::fetch_user), plus `RetriesExhausted`.
    pub async fn fetch_attended(&self, userid: &str, page: u32) -> Result<AttendedPage> {
        let mut url = self.endpoint(&["user", userid, "attended"])?;
        url.query_pairs_mut().append_pair("p", &page.max(1).to_string());
        debug!(%url, "Fetching attended concerts");

        self.retry
            .run("attended", |_| self.get_json(url.clone(), userid))
            .await
    }

    /// Fetch attended concerts across up to `max_pages` pages.
    ///
    /// Stops early on a short page or once the reported total is reached.
    ///
    /// # Errors
    /// The first page's error. Failures on later pages are returned as well;
    /// a partial list is never reported as complete.
    pub async fn fetch_attended_all(&self, userid: &str, max_pages: u32) -> Result<Vec<Concert>> {
        let mut concerts = Vec::new();

        for page in 1..=max_pages.max(1) {
            let body = self.fetch_attended(userid, page).await?;
            let more = {
                let fetched = concerts.len() + body.setlist.len();
                body.has_more(fetched)
            };
            concerts.extend(body.setlist);
            if !more {
                break;
            }
        }

        info!(userid, count = concerts.len(), "Fetched attended concerts");
        Ok(concerts)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::Config(format!("base url '{}' cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, userid: &str) -> Result<T> {
        let response = self.http.get(url).send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        match status {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED => return Err(ClientError::Unauthorized { body: excerpt(&body) }),
            StatusCode::NOT_FOUND => {
                return Err(ClientError::UserNotFound {
                    userid: userid.to_string(),
                    body: excerpt(&body),
                });
            }
            StatusCode::TOO_MANY_REQUESTS => return Err(ClientError::RateLimited { body: excerpt(&body) }),
            other => {
                return Err(ClientError::Status {
                    status: other.as_u16(),
                    body: excerpt(&body),
                });
            }
        }

        debug!(userid, body = %body, "setlist.fm response");
        serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    fn transport_error(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout(self.timeout)
        } else {
            ClientError::from(err)
        }
    }
}
