//! End-to-end tests of the authenticated client over real HTTP.

use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use touriquest_integration::{
    AuthenticatedHttpClient, ClientConfig, CredentialStore, Credentials, FailureInfo,
    FileCredentialStore, HttpMethod, InMemoryCredentialStore, RetryExecutor, RetryPolicy,
    TIMEOUT,
};
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(
    server: &MockServer,
    store: Arc<dyn CredentialStore>,
    logins: Arc<Mutex<Vec<String>>>,
) -> AuthenticatedHttpClient {
    let config = ClientConfig::builder()
        .base_url(format!("{}/api/v1", server.uri()))
        .timeout(Duration::from_millis(500))
        .build()
        .unwrap();

    AuthenticatedHttpClient::builder()
        .config(config)
        .credential_store(store)
        .reauth_handler(Arc::new(move |login: &str| {
            logins.lock().push(login.to_string())
        }))
        .build()
        .unwrap()
}

fn expired_session() -> Arc<InMemoryCredentialStore> {
    Arc::new(InMemoryCredentialStore::with_credentials(Credentials::new(
        "expired-access",
        Some("refresh-1".to_string()),
    )))
}

#[tokio::test]
async fn expired_token_is_refreshed_and_request_replayed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/bookings"))
        .and(header("authorization", "Bearer expired-access"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Token expired"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .and(body_json(json!({"refreshToken": "refresh-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "fresh-access"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/bookings"))
        .and(header("authorization", "Bearer fresh-access"))
        .and(header_exists("x-request-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let store = expired_session();
    let logins = Arc::new(Mutex::new(Vec::new()));
    let client = client_for(&server, store.clone(), logins.clone());

    let bookings: serde_json::Value = client.get("/bookings").await.unwrap();
    assert_eq!(bookings, json!([{"id": 1}]));

    let credentials = store.read().await.unwrap().unwrap();
    assert_eq!(credentials.access_token(), "fresh-access");
    assert_eq!(credentials.refresh_token(), Some("refresh-1"));
    assert!(logins.lock().is_empty());
}

#[tokio::test]
async fn rejected_refresh_clears_persisted_credentials() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileCredentialStore::new(dir.path().join("credentials.json")));
    store
        .write(Credentials::new("expired-access", Some("refresh-1".to_string())))
        .await
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/v1/profile"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Token expired"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "Refresh token revoked"})))
        .expect(1)
        .mount(&server)
        .await;

    let logins = Arc::new(Mutex::new(Vec::new()));
    let client = client_for(&server, store.clone(), logins.clone());

    let failure: FailureInfo = client.get::<serde_json::Value>("/profile").await.unwrap_err();
    assert_eq!(failure.status_code, 401);
    assert!(failure.needs_reauth());
    assert!(store.read().await.unwrap().is_none());
    assert_eq!(*logins.lock(), vec!["/login".to_string()]);
}

#[tokio::test]
async fn transient_503_is_retried_until_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/tours"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"message": "Try later"})))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/tours"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, expired_session(), Arc::new(Mutex::new(Vec::new())));
    let retry = RetryExecutor::new(
        RetryPolicy::builder()
            .base_delay(Duration::from_millis(10))
            .max_delay(Duration::from_millis(50))
            .build()
            .unwrap(),
    );

    let request = client.request(HttpMethod::Get, "/tours").unwrap();
    let response = client.send_with_retry(request, &retry).await.unwrap();
    assert_eq!(response.status, 200);

    let stats = retry.stats();
    assert_eq!(stats.total_attempts, 3);
    assert_eq!(stats.retries_scheduled, 2);
}

#[tokio::test]
async fn not_found_is_surfaced_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/tours/404"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"message": "Tour not found", "errors": ["id: unknown"]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, expired_session(), Arc::new(Mutex::new(Vec::new())));
    let retry = RetryExecutor::new(RetryPolicy::default());

    let request = client.request(HttpMethod::Get, "/tours/404").unwrap();
    let failure = client.send_with_retry(request, &retry).await.unwrap_err();
    assert_eq!(failure.status_code, 404);
    assert_eq!(failure.message, "Tour not found");
    assert_eq!(failure.errors, vec!["id: unknown".to_string()]);
    assert_eq!(retry.stats().total_attempts, 1);
}

#[tokio::test]
async fn slow_response_maps_to_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let client = client_for(&server, expired_session(), Arc::new(Mutex::new(Vec::new())));

    let failure = client.get::<serde_json::Value>("/slow").await.unwrap_err();
    assert_eq!(failure.status_code, 0);
    assert_eq!(failure.code.as_deref(), Some(TIMEOUT));
    assert!(failure.is_retryable());
}
