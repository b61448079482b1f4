//! services/api/tests/pipeline.rs
//!
//! Exercises the ingestion pipeline and the auth flow end to end against
//! in-memory implementations of the core ports. The fakes honor the port
//! contracts (uniqueness on write, newest-first listing) so the handlers see
//! the same behavior the Postgres adapter provides.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use tower::ServiceExt;
use uuid::Uuid;

use api_lib::config::Config;
use api_lib::error::ApiError;
use api_lib::token::{AuthUser, TokenService};
use api_lib::web::auth::{signin_handler, signup_handler, SigninRequest, SignupRequest};
use api_lib::web::links::{add_link_handler, list_links_handler, AddLinkRequest};
use api_lib::web::middleware::require_auth;
use api_lib::web::state::AppState;
use linkstash_core::domain::{Annotation, LinkRecord, User, UserCredentials};
use linkstash_core::ports::{
    AnnotationError, CredentialStore, LinkAnnotator, LinkStore, StorageError,
};

const TEST_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

//=========================================================================================
// In-Memory Port Fakes
//=========================================================================================

#[derive(Default)]
struct FakeCredentialStore {
    users: Mutex<Vec<UserCredentials>>,
}

#[async_trait]
impl CredentialStore for FakeCredentialStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StorageError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == email) {
            return Err(StorageError::Conflict);
        }
        let creds = UserCredentials {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
        };
        users.push(creds.clone());
        Ok(User {
            id: creds.id,
            email: creds.email,
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>, StorageError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }
}

#[derive(Default)]
struct FakeLinkStore {
    links: Mutex<Vec<LinkRecord>>,
}

impl FakeLinkStore {
    fn stored(&self) -> Vec<LinkRecord> {
        self.links.lock().unwrap().clone()
    }
}

#[async_trait]
impl LinkStore for FakeLinkStore {
    async fn insert_link(&self, record: &LinkRecord) -> Result<(), StorageError> {
        let mut links = self.links.lock().unwrap();
        // Same uniqueness guarantee as the database's (user_id, url) index.
        if links
            .iter()
            .any(|l| l.user_id == record.user_id && l.url == record.url)
        {
            return Err(StorageError::Conflict);
        }
        links.push(record.clone());
        Ok(())
    }

    async fn links_for_user(&self, user_id: Uuid) -> Result<Vec<LinkRecord>, StorageError> {
        let links = self.links.lock().unwrap();
        let mut records: Vec<LinkRecord> = links
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn url_exists(&self, user_id: Uuid, url: &str) -> Result<bool, StorageError> {
        let links = self.links.lock().unwrap();
        Ok(links.iter().any(|l| l.user_id == user_id && l.url == url))
    }
}

struct StubAnnotator {
    calls: AtomicUsize,
    result: Result<Annotation, ()>,
}

impl StubAnnotator {
    fn fixed(title: &str, summary: &str, tags: &[&str]) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            result: Ok(Annotation {
                title: title.to_string(),
                summary: summary.to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
            }),
        }
    }

    /// An annotator whose upstream answers with a payload missing `tags`.
    fn malformed() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            result: Err(()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LinkAnnotator for StubAnnotator {
    async fn annotate(&self, _url: &str) -> Result<Annotation, AnnotationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Ok(annotation) => Ok(annotation.clone()),
            Err(()) => Err(AnnotationError::MalformedResult(
                "missing field `tags`".to_string(),
            )),
        }
    }
}

//=========================================================================================
// Test Harness
//=========================================================================================

struct Harness {
    state: Arc<AppState>,
    credentials: Arc<FakeCredentialStore>,
    links: Arc<FakeLinkStore>,
    annotator: Arc<StubAnnotator>,
}

fn harness_with(annotator: StubAnnotator) -> Harness {
    let credentials = Arc::new(FakeCredentialStore::default());
    let links = Arc::new(FakeLinkStore::default());
    let annotator = Arc::new(annotator);
    let state = Arc::new(AppState {
        config: Arc::new(test_config()),
        credentials: credentials.clone(),
        links: links.clone(),
        annotator: annotator.clone(),
        tokens: TokenService::new(TEST_SECRET),
    });
    Harness {
        state,
        credentials,
        links,
        annotator,
    }
}

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        log_level: tracing::Level::INFO,
        jwt_secret: TEST_SECRET.to_string(),
        openai_api_key: "test-key".to_string(),
        annotation_model: "gpt-4o-mini".to_string(),
        annotation_timeout: Duration::from_secs(5),
        cors_origin: None,
    }
}

fn caller(email: &str) -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        email: email.to_string(),
    }
}

/// Renders a handler result the way axum would and decodes the JSON body.
async fn render(
    result: Result<impl IntoResponse, ApiError>,
) -> (StatusCode, serde_json::Value) {
    let response = match result {
        Ok(ok) => ok.into_response(),
        Err(e) => e.into_response(),
    };
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, json)
}

async fn signup(harness: &Harness, email: &str, password: &str) -> (StatusCode, serde_json::Value) {
    render(
        signup_handler(
            State(harness.state.clone()),
            Json(SignupRequest {
                email: Some(email.to_string()),
                password: Some(password.to_string()),
            }),
        )
        .await,
    )
    .await
}

async fn signin(harness: &Harness, email: &str, password: &str) -> (StatusCode, serde_json::Value) {
    render(
        signin_handler(
            State(harness.state.clone()),
            Json(SigninRequest {
                email: Some(email.to_string()),
                password: Some(password.to_string()),
            }),
        )
        .await,
    )
    .await
}

async fn add_link(
    harness: &Harness,
    identity: &AuthUser,
    url: &str,
) -> (StatusCode, serde_json::Value) {
    render(
        add_link_handler(
            State(harness.state.clone()),
            Extension(identity.clone()),
            Json(AddLinkRequest {
                url: Some(url.to_string()),
            }),
        )
        .await,
    )
    .await
}

async fn list_links(harness: &Harness, identity: &AuthUser) -> (StatusCode, serde_json::Value) {
    render(
        list_links_handler(State(harness.state.clone()), Extension(identity.clone())).await,
    )
    .await
}

//=========================================================================================
// Credential Flow
//=========================================================================================

#[tokio::test]
async fn signup_then_signin_succeeds() {
    let harness = harness_with(StubAnnotator::fixed("T", "S", &["a"]));

    let (status, body) = signup(&harness, "user@example.com", "secret1").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "user@example.com");
    assert!(!body["token"].as_str().unwrap().is_empty());

    let (status, body) = signin(&harness, "user@example.com", "secret1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn signup_rejects_weak_password_and_creates_nothing() {
    let harness = harness_with(StubAnnotator::fixed("T", "S", &["a"]));

    let (status, _) = signup(&harness, "user@example.com", "short").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(harness.credentials.users.lock().unwrap().is_empty());
}

#[tokio::test]
async fn signup_rejects_missing_fields() {
    let harness = harness_with(StubAnnotator::fixed("T", "S", &["a"]));

    let (status, _) = render(
        signup_handler(
            State(harness.state.clone()),
            Json(SignupRequest {
                email: Some("user@example.com".to_string()),
                password: None,
            }),
        )
        .await,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn second_signup_with_same_email_conflicts() {
    let harness = harness_with(StubAnnotator::fixed("T", "S", &["a"]));

    let (status, _) = signup(&harness, "user@example.com", "secret1").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = signup(&harness, "user@example.com", "different-password").await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The first account's password is unaffected.
    let (status, _) = signin(&harness, "user@example.com", "secret1").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn signin_rejects_unknown_email_and_wrong_password_identically() {
    let harness = harness_with(StubAnnotator::fixed("T", "S", &["a"]));
    signup(&harness, "user@example.com", "secret1").await;

    let (status, unknown_body) = signin(&harness, "nobody@example.com", "secret1").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, wrong_body) = signin(&harness, "user@example.com", "wrong-password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Same message either way, so accounts cannot be enumerated.
    assert_eq!(unknown_body["error"], wrong_body["error"]);
}

//=========================================================================================
// Ingestion Pipeline
//=========================================================================================

#[tokio::test]
async fn invalid_url_is_rejected_before_annotation() {
    let harness = harness_with(StubAnnotator::fixed("T", "S", &["a"]));
    let identity = caller("user@example.com");

    let (status, _) = add_link(&harness, &identity, "not a url").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(harness.annotator.calls(), 0);
    assert!(harness.links.stored().is_empty());
}

#[tokio::test]
async fn missing_url_is_rejected_before_annotation() {
    let harness = harness_with(StubAnnotator::fixed("T", "S", &["a"]));
    let identity = caller("user@example.com");

    let (status, _) = render(
        add_link_handler(
            State(harness.state.clone()),
            Extension(identity.clone()),
            Json(AddLinkRequest { url: None }),
        )
        .await,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(harness.annotator.calls(), 0);
}

#[tokio::test]
async fn duplicate_url_is_rejected_without_annotation() {
    let harness = harness_with(StubAnnotator::fixed("T", "S", &["a"]));
    let identity = caller("user@example.com");

    let (status, _) = add_link(&harness, &identity, "https://example.com").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(harness.annotator.calls(), 1);

    let (status, _) = add_link(&harness, &identity, "https://example.com").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    // The second submission never reached the annotator.
    assert_eq!(harness.annotator.calls(), 1);
    assert_eq!(harness.links.stored().len(), 1);
}

#[tokio::test]
async fn annotation_is_persisted_and_listed_newest_first() {
    let harness = harness_with(StubAnnotator::fixed("T", "S", &["a", "b"]));
    let identity = caller("user@example.com");

    let before = Utc::now();
    let (status, body) = add_link(&harness, &identity, "https://example.com").await;
    let after = Utc::now();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["title"], "T");
    assert_eq!(body["summary"], "S");
    assert_eq!(body["tags"], serde_json::json!(["a", "b"]));
    assert_eq!(body["url"], "https://example.com");
    assert_eq!(body["user_id"], identity.user_id.to_string());
    assert!(Uuid::parse_str(body["id"].as_str().unwrap()).is_ok());

    let created_at: DateTime<Utc> =
        body["created_at"].as_str().unwrap().parse().expect("timestamp");
    assert!(created_at >= before && created_at <= after);

    // A later submission lists first.
    tokio::time::sleep(Duration::from_millis(5)).await;
    add_link(&harness, &identity, "https://example.com/second").await;

    let (status, body) = list_links(&harness, &identity).await;
    assert_eq!(status, StatusCode::OK);
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["url"], "https://example.com/second");
    assert_eq!(listed[1]["url"], "https://example.com");
}

#[tokio::test]
async fn listing_never_crosses_users() {
    let harness = harness_with(StubAnnotator::fixed("T", "S", &["a"]));
    let alice = caller("alice@example.com");
    let bob = caller("bob@example.com");

    add_link(&harness, &alice, "https://example.com/alice").await;
    add_link(&harness, &bob, "https://example.com/bob").await;

    let (_, body) = list_links(&harness, &alice).await;
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["url"], "https://example.com/alice");

    let (_, body) = list_links(&harness, &bob).await;
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["url"], "https://example.com/bob");
}

#[tokio::test]
async fn malformed_annotation_persists_nothing() {
    let harness = harness_with(StubAnnotator::malformed());
    let identity = caller("user@example.com");

    let (status, body) = add_link(&harness, &identity, "https://example.com").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    // Opaque message only; no upstream detail leaks to the client.
    assert_eq!(body["error"], "Failed to analyze or save the link.");
    assert!(harness.links.stored().is_empty());
}

#[tokio::test]
async fn concurrent_identical_submissions_store_at_most_one_record() {
    let harness = harness_with(StubAnnotator::fixed("T", "S", &["a"]));
    let identity = caller("user@example.com");

    let (first, second) = tokio::join!(
        add_link(&harness, &identity, "https://example.com"),
        add_link(&harness, &identity, "https://example.com"),
    );

    let mut statuses = [first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::BAD_REQUEST]);
    assert_eq!(harness.links.stored().len(), 1);
}

//=========================================================================================
// Auth Gateway
//=========================================================================================

fn protected_app(harness: &Harness) -> Router {
    Router::new()
        .route("/links", axum::routing::get(list_links_handler))
        .layer(axum::middleware::from_fn_with_state(
            harness.state.clone(),
            require_auth,
        ))
        .with_state(harness.state.clone())
}

#[tokio::test]
async fn protected_route_rejects_missing_token() {
    let harness = harness_with(StubAnnotator::fixed("T", "S", &["a"]));
    let app = protected_app(&harness);

    let response = app
        .oneshot(Request::builder().uri("/links").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_route_rejects_non_bearer_and_tampered_tokens() {
    let harness = harness_with(StubAnnotator::fixed("T", "S", &["a"]));

    let response = protected_app(&harness)
        .oneshot(
            Request::builder()
                .uri("/links")
                .header(header::AUTHORIZATION, "Token abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let other = TokenService::new("a-completely-different-secret-key");
    let forged = other.issue(Uuid::new_v4(), "user@example.com").unwrap();
    let response = protected_app(&harness)
        .oneshot(
            Request::builder()
                .uri("/links")
                .header(header::AUTHORIZATION, format!("Bearer {forged}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_route_accepts_valid_token() {
    let harness = harness_with(StubAnnotator::fixed("T", "S", &["a"]));
    let token = harness
        .state
        .tokens
        .issue(Uuid::new_v4(), "user@example.com")
        .unwrap();

    let response = protected_app(&harness)
        .oneshot(
            Request::builder()
                .uri("/links")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
