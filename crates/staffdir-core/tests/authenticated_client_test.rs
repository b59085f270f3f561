//! Authenticated client and session coordinator tests against a `wiremock`
//! mock backend.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use staffdir_core::api::{ApiClient, ApiError, ApiRequest, WriteOutcome};
use staffdir_core::auth::{
    CredentialStore, MemoryStore, SessionCoordinator, SessionState, SignInError, SignInGrant,
    SignInProvider, StorageError,
};
use staffdir_core::models::{Employee, NewEmployee};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_client(base_url: &str, store: Arc<MemoryStore>) -> ApiClient {
    ApiClient::with_base_url(base_url, Duration::from_secs(5), store).expect("client builds")
}

fn employee_json(id: i64, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "email": format!("{}@example.com", name.to_lowercase()),
        "position": "Engineer",
        "department": "R&D",
        "phone": "5551234567",
        "hire_date": "2022-03-01"
    })
}

/// Store whose `clear_token` always fails; everything else is in memory.
struct StuckTokenStore {
    inner: MemoryStore,
}

impl CredentialStore for StuckTokenStore {
    fn get_token(&self) -> Result<Option<String>, StorageError> {
        self.inner.get_token()
    }
    fn set_token(&self, token: &str) -> Result<(), StorageError> {
        self.inner.set_token(token)
    }
    fn clear_token(&self) -> Result<(), StorageError> {
        Err(StorageError::Poisoned)
    }
    fn set_expired_flag(&self) -> Result<(), StorageError> {
        self.inner.set_expired_flag()
    }
    fn consume_expired_flag(&self) -> Result<bool, StorageError> {
        self.inner.consume_expired_flag()
    }
}

/// One-shot server that sends a 401 status line, promises a body, and
/// hangs up before sending it.
fn spawn_truncated_401_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    std::thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            let _ = stream.write_all(
                b"HTTP/1.1 401 Unauthorized\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{\"msg\"",
            );
            let _ = stream.flush();
        }
    });
    format!("http://{}", addr)
}

// ---------------------------------------------------------------------------
// Request authentication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_bearer_token_attached_when_present() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/employees"))
        .and(header("authorization", "Bearer abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::with_token("abc123"));
    let api = make_client(&server.uri(), store);

    let employees = api.list_employees().await.expect("list succeeds");
    assert!(employees.is_empty());
}

#[tokio::test]
async fn test_request_dispatched_without_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/employees"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([employee_json(1, "Alice")])))
        .expect(1)
        .mount(&server)
        .await;

    let api = make_client(&server.uri(), Arc::new(MemoryStore::new()));
    let employees = api.list_employees().await.expect("list succeeds");
    assert_eq!(employees.len(), 1);
    assert_eq!(employees[0].name(), "Alice");

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_success_body_passes_through_unmodified() {
    let server = MockServer::start().await;
    let raw = r#"{"anything":  [1, 2, 3]}"#;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string(raw))
        .mount(&server)
        .await;

    let api = make_client(&server.uri(), Arc::new(MemoryStore::new()));
    let response = api.send(Method::GET, "/status", None).await.expect("send succeeds");
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.body(), raw);
}

// ---------------------------------------------------------------------------
// 401 teardown
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_unauthorized_clears_token_and_sets_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/employees"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "Token has expired"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::with_token("abc123"));
    let api = make_client(&server.uri(), store.clone());

    let err = api.list_employees().await.expect_err("401 is surfaced");
    assert!(err.is_unauthorized());
    match err {
        ApiError::Http { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("Token has expired"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(store.token(), None);
    assert!(store.consume_expired_flag().unwrap());
    assert!(!store.consume_expired_flag().unwrap());
}

#[tokio::test]
async fn test_unauthorized_with_broken_body_still_tears_down() {
    let base_url = spawn_truncated_401_server();
    let store = Arc::new(MemoryStore::with_token("abc123"));
    let api = make_client(&base_url, store.clone());

    let err = api.list_employees().await.expect_err("401 is surfaced");
    assert_eq!(err.status(), Some(401));
    assert_eq!(store.token(), None);
    assert!(store.consume_expired_flag().unwrap());
}

#[tokio::test]
async fn test_teardown_sets_flag_when_clear_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/employees"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let store = Arc::new(StuckTokenStore {
        inner: MemoryStore::with_token("abc123"),
    });
    let api = ApiClient::with_base_url(&server.uri(), Duration::from_secs(5), store.clone())
        .expect("client builds");

    let err = api.list_employees().await.expect_err("401 is surfaced");
    assert_eq!(err.status(), Some(401));
    assert!(store.inner.consume_expired_flag().unwrap());
}

#[tokio::test]
async fn test_retried_request_skips_teardown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/employees"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::with_token("abc123"));
    let api = make_client(&server.uri(), store.clone());

    let request = ApiRequest::new(Method::GET, "/employees");
    let err = api.send_request(&request, true).await.expect_err("401 is surfaced");
    assert_eq!(err.status(), Some(401));

    assert_eq!(store.token().as_deref(), Some("abc123"));
    assert!(!store.consume_expired_flag().unwrap());
}

#[tokio::test]
async fn test_other_errors_pass_through_without_teardown() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/employees/42"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/employees"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "Server error"})))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::with_token("abc123"));
    let api = make_client(&server.uri(), store.clone());

    match api.delete_employee(42).await {
        Err(ApiError::Http { status, body }) => {
            assert_eq!(status, 404);
            assert_eq!(body, "not found");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(api.list_employees().await.unwrap_err().status(), Some(500));

    assert_eq!(store.token().as_deref(), Some("abc123"));
    assert!(!store.consume_expired_flag().unwrap());
}

#[tokio::test]
async fn test_connection_failure_is_network_error() {
    // Nothing listens on the discard port
    let store = Arc::new(MemoryStore::with_token("abc123"));
    let api = make_client("http://127.0.0.1:9", store.clone());

    let err = api.list_employees().await.expect_err("no server");
    assert!(err.is_network());
    assert_eq!(store.token().as_deref(), Some("abc123"));
}

// ---------------------------------------------------------------------------
// Employee endpoints
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_employee_posts_record_without_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/employees"))
        .and(body_json(json!({
            "name": "Carol",
            "email": "carol@example.com",
            "position": "Manager",
            "department": "Sales",
            "phone": null,
            "hire_date": "2024-01-02",
            "salary": 70000.0
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"message": "Employee added successfully"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = make_client(&server.uri(), Arc::new(MemoryStore::with_token("abc123")));
    let new = NewEmployee {
        name: "Carol".into(),
        email: "carol@example.com".into(),
        position: "Manager".into(),
        department: "Sales".into(),
        phone: None,
        hire_date: NaiveDate::from_ymd_opt(2024, 1, 2),
        salary: Some(70000.0),
    };

    let outcome = api.create_employee(&new).await.expect("create succeeds");
    assert!(matches!(outcome, WriteOutcome::Acknowledged { .. }));
}

#[tokio::test]
async fn test_update_employee_puts_to_record_path() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/employees/7"))
        .and(header("authorization", "Bearer abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(employee_json(7, "Dora")))
        .expect(1)
        .mount(&server)
        .await;

    let api = make_client(&server.uri(), Arc::new(MemoryStore::with_token("abc123")));
    let employee: Employee = serde_json::from_value(employee_json(7, "Dora")).unwrap();

    let outcome = api.update_employee(&employee).await.expect("update succeeds");
    assert_eq!(outcome.record(), Some(&employee));
}

#[tokio::test]
async fn test_delete_employee_ignores_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/employees/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let api = make_client(&server.uri(), Arc::new(MemoryStore::with_token("abc123")));
    api.delete_employee(3).await.expect("delete succeeds");
}

#[tokio::test]
async fn test_incomplete_record_is_not_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let api = make_client(&server.uri(), Arc::new(MemoryStore::with_token("abc123")));
    let new = NewEmployee {
        name: "Eve".into(),
        ..Default::default()
    };

    let err = api.create_employee(&new).await.expect_err("missing fields");
    assert!(matches!(err, ApiError::MissingInput("email")));
}

// ---------------------------------------------------------------------------
// Session scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_login_stores_token_and_authenticates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(json!({"username": "alice", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "abc123"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let api = make_client(&server.uri(), store.clone());
    let mut session = SessionCoordinator::new(store.clone());
    assert_eq!(session.check(), SessionState::Unauthenticated);

    let state = session.login(&api, "alice", "secret").await.expect("login succeeds");
    assert_eq!(state, SessionState::Authenticated);
    assert_eq!(store.token().as_deref(), Some("abc123"));
    assert_eq!(session.check(), SessionState::Authenticated);
}

#[tokio::test]
async fn test_login_with_bad_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid credentials"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let api = make_client(&server.uri(), store.clone());
    let mut session = SessionCoordinator::new(store.clone());

    let err = session.login(&api, "alice", "wrong").await.expect_err("rejected");
    assert!(err.is_unauthorized());
    assert_eq!(session.state(), SessionState::Unauthenticated);
    assert_eq!(session.check(), SessionState::Unauthenticated);
    assert!(!session.session_expired());
    assert_eq!(store.token(), None);
}

#[tokio::test]
async fn test_bad_login_keeps_existing_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid credentials"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::with_token("valid-token"));
    let api = make_client(&server.uri(), store.clone());
    let mut session = SessionCoordinator::new(store.clone());
    assert_eq!(session.check(), SessionState::Authenticated);

    session.login(&api, "alice", "wrong").await.expect_err("rejected");

    let requests = server.received_requests().await.expect("recording enabled");
    assert!(!requests[0].headers.contains_key("authorization"));
    assert_eq!(store.token().as_deref(), Some("valid-token"));
    assert_eq!(session.check(), SessionState::Authenticated);
    assert!(!session.session_expired());
}

#[tokio::test]
async fn test_login_requires_credentials_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let api = make_client(&server.uri(), store.clone());
    let mut session = SessionCoordinator::new(store);

    assert!(matches!(
        session.login(&api, "  ", "secret").await,
        Err(ApiError::MissingInput("username"))
    ));
    assert!(matches!(
        session.login(&api, "alice", "").await,
        Err(ApiError::MissingInput("password"))
    ));
}

#[tokio::test]
async fn test_expired_token_routes_to_login_on_next_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/employees"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::with_token("abc123"));
    let api = make_client(&server.uri(), store.clone());
    let mut session = SessionCoordinator::new(store.clone());
    assert_eq!(session.check(), SessionState::Authenticated);

    let err = api.list_employees().await.expect_err("expired");
    assert_eq!(err.status(), Some(401));

    // The transition is deferred until the next check point
    assert_eq!(session.state(), SessionState::Authenticated);
    assert_eq!(session.check(), SessionState::Unauthenticated);
    assert!(session.session_expired());
    assert_eq!(store.token(), None);
}

#[tokio::test]
async fn test_login_after_expiry_starts_fresh_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "def456"})))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.set_expired_flag().unwrap();
    let api = make_client(&server.uri(), store.clone());
    let mut session = SessionCoordinator::new(store.clone());

    session.login(&api, "alice", "secret").await.expect("login succeeds");
    assert_eq!(session.check(), SessionState::Authenticated);
}

struct StaticSignIn {
    id_token: &'static str,
}

#[async_trait]
impl SignInProvider for StaticSignIn {
    async fn sign_in(&self) -> Result<SignInGrant, SignInError> {
        Ok(SignInGrant {
            id_token: self.id_token.to_string(),
            email: Some("alice@example.com".to_string()),
        })
    }

    async fn revoke(&self) -> Result<(), SignInError> {
        Err(SignInError::Other("revoke not supported".to_string()))
    }
}

#[tokio::test]
async fn test_external_sign_in_exchanges_id_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/google"))
        .and(body_json(json!({"token": "google-id-token"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "abc123"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let api = make_client(&server.uri(), store.clone());
    let mut session = SessionCoordinator::new(store.clone()).with_sign_in(Arc::new(StaticSignIn {
        id_token: "google-id-token",
    }));

    let state = session.login_with_sign_in(&api).await.expect("sign-in succeeds");
    assert_eq!(state, SessionState::Authenticated);
    assert_eq!(store.token().as_deref(), Some("abc123"));

    // Revoke fails, logout still completes
    session.logout().await.expect("logout succeeds");
    assert_eq!(store.token(), None);
    assert_eq!(session.check(), SessionState::Unauthenticated);
}
