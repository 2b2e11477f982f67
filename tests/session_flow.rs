//! End-to-end: HTTP login through the gateway into file-backed storage, then
//! a simulated restart reading the same directory.

use std::sync::Arc;
use std::time::Duration;

use portal_auth::{AuthGateway, FileStorage, HttpAuthApi, LoginRequest, SESSION_STORAGE_KEY, SessionStore};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn login_body(token: &str) -> serde_json::Value {
    json!({
        "success": true,
        "code": 200,
        "message": "ok",
        "data": {
            "token": token,
            "refreshToken": "r1",
            "type": "Bearer",
            "issuedAt": "2025-01-01T10:00:00Z",
            "expiresAt": "2025-01-01T11:00:00Z",
            "userId": 11,
            "email": "a@b.com",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "roles": ["USER"]
        }
    })
}

fn gateway(server: &MockServer, dir: &std::path::Path) -> AuthGateway {
    let api = HttpAuthApi::new(&format!("{}/auth", server.uri()), Duration::from_secs(5), Duration::from_secs(5))
        .unwrap();
    let session = SessionStore::new(Arc::new(FileStorage::new(dir)));
    AuthGateway::new(Arc::new(api), session)
}

fn credentials() -> LoginRequest {
    LoginRequest { username: "a@b.com".into(), password: "x".into() }
}

#[tokio::test]
async fn login_survives_restart_and_logout_does_not() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body("t1")))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    let first = gateway(&server, dir.path());
    first.login(&credentials()).await.unwrap();
    assert_eq!(first.session().token().as_deref(), Some("t1"));

    let record = std::fs::read_to_string(dir.path().join(format!("{SESSION_STORAGE_KEY}.json"))).unwrap();
    let stored: serde_json::Value = serde_json::from_str(&record).unwrap();
    assert_eq!(stored["tokenType"], "Bearer");
    assert_eq!(stored["userId"], 11);

    let restarted = gateway(&server, dir.path());
    assert_eq!(restarted.session().snapshot(), first.session().snapshot());

    restarted.logout().unwrap();
    let after_logout = gateway(&server, dir.path());
    assert!(!after_logout.session().is_authenticated());
}

#[tokio::test]
async fn rejected_login_over_http_keeps_prior_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body("t1")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false, "code": 401, "message": "bad creds"
        })))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let gw = gateway(&server, dir.path());

    gw.login(&credentials()).await.unwrap();
    let err = gw.login(&credentials()).await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(gw.session().token().as_deref(), Some("t1"));
}

#[tokio::test]
async fn corrupt_record_on_disk_is_discarded_at_startup() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let record = dir.path().join(format!("{SESSION_STORAGE_KEY}.json"));
    std::fs::write(&record, "{\"token\": ").unwrap();

    let gw = gateway(&server, dir.path());

    assert!(!gw.session().is_authenticated());
    assert!(!record.exists());
}
