use super::*;
use crate::models::{Gender, SessionEnvelope};
use crate::storage::MemoryStorage;
use std::sync::Mutex;

/// Scripted transport: pops one outcome per call and records what was sent.
struct MockApi {
    outcomes: Mutex<Vec<Result<AuthReply, GatewayError>>>,
    calls: Mutex<Vec<String>>,
}

impl MockApi {
    fn new(outcomes: Vec<Result<AuthReply, GatewayError>>) -> Self {
        Self { outcomes: Mutex::new(outcomes), calls: Mutex::new(Vec::new()) }
    }

    fn next(&self, call: String) -> Result<AuthReply, GatewayError> {
        self.calls.lock().unwrap().push(call);
        self.outcomes.lock().unwrap().remove(0)
    }
}

#[async_trait::async_trait]
impl AuthApi for MockApi {
    async fn login(&self, credentials: &LoginRequest) -> Result<AuthReply, GatewayError> {
        self.next(format!("login:{}", credentials.username))
    }

    async fn register(&self, profile: &RegisterRequest) -> Result<AuthReply, GatewayError> {
        self.next(format!("register:{}", profile.email))
    }
}

fn envelope(token: &str) -> SessionEnvelope {
    SessionEnvelope {
        token: token.into(),
        refresh_token: "r".into(),
        token_type: "Bearer".into(),
        user_id: 3,
        email: "a@b.com".into(),
        roles: vec!["USER".into()],
        ..SessionEnvelope::default()
    }
}

fn ok_reply(token: &str) -> AuthReply {
    AuthReply { success: true, code: 200, message: "ok".into(), data: Some(envelope(token)) }
}

fn rejected_reply() -> AuthReply {
    AuthReply { success: false, code: 401, message: "bad creds".into(), data: None }
}

fn credentials() -> LoginRequest {
    LoginRequest { username: "a@b.com".into(), password: "x".into() }
}

fn profile() -> RegisterRequest {
    RegisterRequest {
        email: "a@b.com".into(),
        password: "longenough".into(),
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        gender: Gender::Female,
        identifier: "X1".into(),
        phone: "+34".into(),
    }
}

fn gateway(outcomes: Vec<Result<AuthReply, GatewayError>>) -> (AuthGateway, Arc<MockApi>, MemoryStorage) {
    let storage = MemoryStorage::new();
    let api = Arc::new(MockApi::new(outcomes));
    let session = SessionStore::new(Arc::new(storage.clone()));
    (AuthGateway::new(api.clone(), session), api, storage)
}

// =============================================================================
// login
// =============================================================================

#[tokio::test]
async fn successful_login_commits_session() {
    let (gw, api, storage) = gateway(vec![Ok(ok_reply("t1"))]);

    let reply = gw.login(&credentials()).await.unwrap();

    assert!(reply.success);
    assert!(gw.session().is_authenticated());
    assert_eq!(gw.session().token().as_deref(), Some("t1"));
    assert!(storage.raw(crate::session::SESSION_STORAGE_KEY).is_some());
    assert_eq!(*api.calls.lock().unwrap(), vec!["login:a@b.com".to_owned()]);
}

#[tokio::test]
async fn rejected_login_leaves_session_unchanged() {
    let (gw, _, _) = gateway(vec![Ok(rejected_reply())]);

    let reply = gw.login(&credentials()).await.unwrap();

    assert!(!reply.success);
    assert_eq!(reply.message, "bad creds");
    assert!(!gw.session().is_authenticated());
}

#[tokio::test]
async fn rejected_login_keeps_existing_session() {
    let (gw, _, _) = gateway(vec![Ok(ok_reply("t1")), Ok(rejected_reply())]);

    gw.login(&credentials()).await.unwrap();
    gw.login(&credentials()).await.unwrap();

    assert_eq!(gw.session().token().as_deref(), Some("t1"));
}

#[tokio::test]
async fn success_without_data_commits_nothing() {
    let reply = AuthReply { success: true, code: 200, message: "ok".into(), data: None };
    let (gw, _, _) = gateway(vec![Ok(reply)]);

    gw.login(&credentials()).await.unwrap();

    assert!(!gw.session().is_authenticated());
}

#[tokio::test]
async fn transport_error_is_returned_unchanged() {
    let err = GatewayError::Status { status: 503, message: "down".into() };
    let (gw, _, _) = gateway(vec![Ok(ok_reply("t1")), Err(err)]);
    gw.login(&credentials()).await.unwrap();

    let err = gw.login(&credentials()).await.unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert_eq!(gw.session().token().as_deref(), Some("t1"));
}

#[tokio::test]
async fn successful_reply_with_invalid_session_is_an_error() {
    let reply = AuthReply { success: true, code: 200, message: "ok".into(), data: Some(envelope("")) };
    let (gw, _, _) = gateway(vec![Ok(reply)]);

    let err = gw.login(&credentials()).await.unwrap_err();

    assert!(matches!(err, GatewayError::Session(SessionError::InvalidEnvelope)));
    assert!(!gw.session().is_authenticated());
}

#[tokio::test]
async fn later_login_replaces_session() {
    let (gw, _, _) = gateway(vec![Ok(ok_reply("t1")), Ok(ok_reply("t2"))]);

    gw.login(&credentials()).await.unwrap();
    gw.login(&credentials()).await.unwrap();

    assert_eq!(gw.session().token().as_deref(), Some("t2"));
}

// =============================================================================
// register / logout
// =============================================================================

#[tokio::test]
async fn successful_registration_commits_session() {
    let (gw, api, _) = gateway(vec![Ok(ok_reply("t-reg"))]);

    gw.register(&profile()).await.unwrap();

    assert_eq!(gw.session().token().as_deref(), Some("t-reg"));
    assert_eq!(*api.calls.lock().unwrap(), vec!["register:a@b.com".to_owned()]);
}

#[tokio::test]
async fn failed_registration_commits_nothing() {
    let reply = AuthReply { success: false, code: 409, message: "exists".into(), data: Some(envelope("t")) };
    let (gw, _, _) = gateway(vec![Ok(reply)]);

    let reply = gw.register(&profile()).await.unwrap();

    assert!(!reply.success);
    assert!(!gw.session().is_authenticated());
}

#[tokio::test]
async fn logout_clears_session_and_storage() {
    let (gw, api, storage) = gateway(vec![Ok(ok_reply("t1"))]);
    gw.login(&credentials()).await.unwrap();

    gw.logout().unwrap();

    assert!(!gw.session().is_authenticated());
    assert_eq!(storage.raw(crate::session::SESSION_STORAGE_KEY), None);
    assert_eq!(api.calls.lock().unwrap().len(), 1);
}

#[test]
fn logout_when_signed_out_is_noop() {
    let (gw, _, _) = gateway(Vec::new());
    gw.logout().unwrap();
    gw.logout().unwrap();
}

#[test]
fn status_is_only_set_for_http_failures() {
    assert_eq!(GatewayError::Request("refused".into()).status(), None);
    assert_eq!(GatewayError::Parse("bad".into()).status(), None);
    assert_eq!(GatewayError::Status { status: 401, message: String::new() }.status(), Some(401));
}
