use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use authlocal::{
    build_router,
    directory::{AuthenticatedUser, DirectoryError, InMemoryDirectory, UserDirectory, UserRecord},
    state::AppState,
    token::{JwtService, TokenCredentials, TokenError, TokenService},
};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use jsonwebtoken::Algorithm;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const ALICE_ID: &str = "6f1c2a4e-8a43-4a3e-9c1b-2f0d8e5b7c11";

/// Counts every login check before handing it to an in-memory directory.
struct CountingDirectory {
    inner: InMemoryDirectory,
    checks: AtomicUsize,
}

impl CountingDirectory {
    fn with_alice() -> Self {
        Self {
            inner: InMemoryDirectory::new([UserRecord {
                id: ALICE_ID.parse().unwrap(),
                username: "alice".into(),
                password: "secret".into(),
                verified: true,
            }]),
            checks: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl UserDirectory for CountingDirectory {
    async fn can_log_in_with(
        &self,
        username: &str,
        password: &str,
    ) -> Result<bool, DirectoryError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.inner.can_log_in_with(username, password).await
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AuthenticatedUser>, DirectoryError> {
        self.inner.find_by_username(username).await
    }
}

/// Hands out a fixed token, or fails when asked to.
#[derive(Default)]
struct FakeTokens {
    fail: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl TokenService for FakeTokens {
    async fn get_credentials(&self, _user_id: Uuid) -> Result<TokenCredentials, TokenError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        Ok(TokenCredentials {
            key: "key".into(),
            secret: "signing-secret".into(),
            algorithm: Algorithm::HS256,
        })
    }

    async fn get_token(
        &self,
        _credentials: &TokenCredentials,
        _session: &AuthenticatedUser,
    ) -> Result<String, TokenError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            Err(TokenError::Lock)
        } else {
            Ok("tok-123".into())
        }
    }
}

struct Harness {
    router: Router,
    directory: Arc<CountingDirectory>,
    tokens: Arc<FakeTokens>,
    state: Arc<AppState>,
}

fn harness(tokens: FakeTokens) -> Harness {
    let directory = Arc::new(CountingDirectory::with_alice());
    let tokens = Arc::new(tokens);
    let state = Arc::new(AppState::new(directory.clone(), tokens.clone()));

    Harness {
        router: build_router(state.clone()),
        directory,
        tokens,
        state,
    }
}

fn login_request(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/auths/local")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();

    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn valid_credentials_return_token_and_user() {
    let harness = harness(FakeTokens::default());

    let (status, body) = send(
        harness.router,
        login_request(json!({"username": "alice", "password": "secret"}).to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "accessToken": "tok-123",
            "user": {"id": ALICE_ID, "username": "alice", "verified": true}
        })
    );
    assert_eq!(harness.tokens.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn missing_fields_fail_validation_without_authenticating() {
    for payload in [
        json!({"username": "alice"}),
        json!({"password": "secret"}),
        json!({"username": "alice", "password": ""}),
        json!({"username": "alice", "password": 7}),
    ] {
        let harness = harness(FakeTokens::default());

        let (status, body) = send(harness.router, login_request(payload.to_string())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {payload}");
        assert_eq!(body["status"], "VALIDATION_FAILED");
        assert_eq!(harness.directory.checks.load(Ordering::SeqCst), 0);
        assert_eq!(harness.tokens.calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn array_bodies_fail_validation_without_authenticating() {
    let harness = harness(FakeTokens::default());

    let (status, body) = send(
        harness.router,
        login_request(json!(["alice", "secret"]).to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "VALIDATION_FAILED");
    assert!(body.get("accessToken").is_none());
    assert_eq!(harness.directory.checks.load(Ordering::SeqCst), 0);
    assert_eq!(harness.tokens.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unreadable_bodies_fail_validation() {
    let harness = harness(FakeTokens::default());

    let (status, body) = send(harness.router, login_request("{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "VALIDATION_FAILED");
    assert_eq!(harness.directory.checks.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rejected_credentials_are_unauthorized_and_issue_no_token() {
    let harness = harness(FakeTokens::default());

    let (status, body) = send(
        harness.router,
        login_request(json!({"username": "alice", "password": "guess"}).to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body,
        json!({
            "status": "AUTHENTICATION_FAILED",
            "error": "Incorrect username or password."
        })
    );
    assert_eq!(harness.directory.checks.load(Ordering::SeqCst), 1);
    assert_eq!(harness.tokens.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn token_service_failures_are_internal_errors() {
    let harness = harness(FakeTokens {
        fail: true,
        ..FakeTokens::default()
    });

    let (status, body) = send(
        harness.router,
        login_request(json!({"username": "alice", "password": "secret"}).to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "AUTHENTICATION_ERROR");
    assert!(body.get("user").is_none());
    assert!(!body.to_string().contains("lock"));
}

#[tokio::test]
async fn route_declares_public_create_action() {
    let harness = harness(FakeTokens::default());

    let entry = harness.state.acl.get("authLocal").unwrap();

    assert_eq!(entry.route, "/auths/local");
    assert!(!harness.state.acl.is_protected("authLocal", "create"));
}

#[tokio::test]
async fn issued_jwt_carries_the_session() {
    let directory = Arc::new(CountingDirectory::with_alice());
    let tokens = Arc::new(JwtService::default());
    let router = build_router(Arc::new(AppState::new(directory, tokens.clone())));

    let (status, body) = send(
        router,
        login_request(json!({"username": "alice", "password": "secret"}).to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);

    let token = body["accessToken"].as_str().unwrap();
    let claims = tokens.decode_token(token).unwrap();

    assert_eq!(claims.sub.to_string(), ALICE_ID);
    assert_eq!(claims.session.username, "alice");
}
