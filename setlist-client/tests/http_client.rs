//! Client behaviour against an in-process fake of the setlist.fm API.
//!
//! The fake serves `/user/:userid` and `/user/:userid/attended`, checks the
//! API key header, and can be told to answer the first N attended requests
//! with a chosen status.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use serde_json::json;

use setlist_client::{ClientError, RetryPolicy, SetlistClient};
use setlist_core::config::ApiConfig;

const KEY: &str = "test-key";

// ---------------------------------------------------------------------------
// Fake API
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct Fake {
    attended_calls: Arc<AtomicU32>,
    /// Answer this many attended requests with `failure_status` first.
    failures: u32,
    failure_status: StatusCode,
    total: u32,
}

impl Fake {
    fn new() -> Self {
        Self {
            attended_calls: Arc::new(AtomicU32::new(0)),
            failures: 0,
            failure_status: StatusCode::TOO_MANY_REQUESTS,
            total: 2,
        }
    }

    fn failing(mut self, failures: u32, status: StatusCode) -> Self {
        self.failures = failures;
        self.failure_status = status;
        self
    }

    fn with_total(mut self, total: u32) -> Self {
        self.total = total;
        self
    }
}

#[derive(Deserialize)]
struct PageQuery {
    p: Option<u32>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("x-api-key").and_then(|v| v.to_str().ok()) == Some(KEY)
        && headers.get("accept").and_then(|v| v.to_str().ok()) == Some("application/json")
}

async fn user(Path(userid): Path<String>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "bad key").into_response();
    }
    if userid == "ghost" {
        return (StatusCode::NOT_FOUND, "no such user").into_response();
    }
    Json(json!({ "userId": userid, "fullname": "John Doe" })).into_response()
}

async fn attended(
    State(fake): State<Fake>,
    Path(_userid): Path<String>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "bad key").into_response();
    }
    let call = fake.attended_calls.fetch_add(1, Ordering::SeqCst);
    if call < fake.failures {
        return (fake.failure_status, "x".repeat(400)).into_response();
    }

    let page = query.p.unwrap_or(1);
    let per_page = 20u32;
    let start = (page - 1) * per_page;
    let end = (start + per_page).min(fake.total);
    let setlist: Vec<_> = (start..end)
        .map(|i| {
            json!({
                "id": format!("s{i}"),
                "eventDate": format!("{:02}-01-2020", (i % 28) + 1),
                "artist": { "name": format!("Artist {i}") },
                "venue": { "name": "Venue", "city": { "name": "City" } }
            })
        })
        .collect();

    Json(json!({
        "type": "setlists",
        "itemsPerPage": per_page,
        "page": page,
        "total": fake.total,
        "setlist": setlist,
    }))
    .into_response()
}

async fn serve(fake: Fake) -> String {
    let app = Router::new()
        .route("/user/:userid", get(user))
        .route("/user/:userid/attended", get(attended))
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake server");
    });
    format!("http://{addr}")
}

fn client(base_url: &str, key: &str) -> SetlistClient {
    let config = ApiConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
        ..ApiConfig::default()
    };
    SetlistClient::new(key, &config)
        .expect("client")
        .with_retry(RetryPolicy::new(3, Duration::from_millis(10)))
}

// ---------------------------------------------------------------------------
// User profile
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetches_user_profile() {
    let base = serve(Fake::new()).await;
    let profile = client(&base, KEY).fetch_user("jdoe").await.expect("profile");
    assert_eq!(profile.user_id, "jdoe");
    assert_eq!(profile.display_name(), Some("John Doe"));
}

#[tokio::test]
async fn wrong_key_is_unauthorized() {
    let base = serve(Fake::new()).await;
    let err = client(&base, "wrong").fetch_user("jdoe").await.expect_err("401");
    assert!(matches!(err, ClientError::Unauthorized { ref body } if body == "bad key"));
}

#[tokio::test]
async fn unknown_user_is_not_found() {
    let base = serve(Fake::new()).await;
    let err = client(&base, KEY).fetch_user("ghost").await.expect_err("404");
    assert!(matches!(
        err,
        ClientError::UserNotFound { ref userid, ref body } if userid == "ghost" && body == "no such user"
    ));
    assert_eq!(err.status(), Some(404));
}

// ---------------------------------------------------------------------------
// Attended concerts + retry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn attended_retries_rate_limits() {
    let fake = Fake::new().failing(2, StatusCode::TOO_MANY_REQUESTS);
    let calls = Arc::clone(&fake.attended_calls);
    let base = serve(fake).await;

    let page = client(&base, KEY).fetch_attended("jdoe", 1).await.expect("third attempt");
    assert_eq!(page.setlist.len(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn attended_gives_up_after_three_rate_limits() {
    let fake = Fake::new().failing(10, StatusCode::TOO_MANY_REQUESTS);
    let calls = Arc::clone(&fake.attended_calls);
    let base = serve(fake).await;

    let err = client(&base, KEY).fetch_attended("jdoe", 1).await.expect_err("exhausted");
    assert!(matches!(err, ClientError::RetriesExhausted { attempts: 3, .. }));
    assert_eq!(err.status(), Some(429));
    assert_eq!(err.body().map(str::len), Some(150));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn server_errors_are_not_retried_and_truncated() {
    let fake = Fake::new().failing(1, StatusCode::INTERNAL_SERVER_ERROR);
    let calls = Arc::clone(&fake.attended_calls);
    let base = serve(fake).await;

    let err = client(&base, KEY).fetch_attended("jdoe", 1).await.expect_err("500");
    match err {
        ClientError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body.len(), 150);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn attended_all_walks_pages() {
    let base = serve(Fake::new().with_total(25)).await;
    let c = client(&base, KEY);

    let one_page = c.fetch_attended_all("jdoe", 1).await.expect("page 1");
    assert_eq!(one_page.len(), 20);

    let everything = c.fetch_attended_all("jdoe", 5).await.expect("all pages");
    assert_eq!(everything.len(), 25);
    assert_eq!(everything[24].artist.name, "Artist 24");
}

#[tokio::test]
async fn connection_refused_is_retried_then_reported() {
    // Bind and drop to get a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = client(&format!("http://{addr}"), KEY)
        .fetch_attended("jdoe", 1)
        .await
        .expect_err("nothing listening");
    assert!(matches!(err, ClientError::RetriesExhausted { attempts: 3, .. }));
}
