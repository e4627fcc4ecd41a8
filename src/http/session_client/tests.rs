use super::*;
use crate::error::{CODE_INVALID_REFRESH_TOKEN, NETWORK_ERROR_MESSAGE};
use crate::http::mock::MockHttpClient;
use crate::protocol::CurrentUserRequest;
use crate::session::{MemoryStorage, encode_test_token};
use serde_json::json;

// =========================================================
// 辅助函数
// =========================================================

const BASE: &str = "https://api.test";
const ITEMS_URL: &str = "https://api.test/api/items";
const TOKEN_URL: &str = "https://api.test/oauth/token";

fn config(auth_mode: AuthMode) -> ClientConfig {
    ClientConfig {
        api_base_url: BASE.to_string(),
        service_key: "svc-key".to_string(),
        auth_mode,
        client_id: Some("web".to_string()),
        ..Default::default()
    }
}

fn create_client(auth_mode: AuthMode) -> SessionClient<MockHttpClient> {
    let session = SessionStore::open(MemoryStorage::new(), "auth-storage");
    SessionClient::new(MockHttpClient::new(), config(auth_mode), session)
}

fn mock(client: &SessionClient<MockHttpClient>) -> &MockHttpClient {
    &client.client
}

// =========================================================
// 请求头
// =========================================================

#[tokio::test]
async fn test_cookie_mode_headers() {
    let client = create_client(AuthMode::Cookie);
    client.session().login("access-1", "refresh-1");
    mock(&client).mock_response(ITEMS_URL, 200, json!([1, 2, 3]));

    let items: Vec<u32> = client
        .request("/api/items", RequestOptions::get())
        .await
        .unwrap();
    assert_eq!(items, vec![1, 2, 3]);

    let sent = mock(&client).request(0);
    assert_eq!(sent.header("Content-Type"), Some("application/json"));
    assert_eq!(sent.header(HEADER_SERVICE_KEY), Some("svc-key"));
    assert_eq!(sent.header("Authorization"), None);
}

#[tokio::test]
async fn test_bearer_mode_headers_and_body() {
    let client = create_client(AuthMode::Bearer);
    client.session().login("access-1", "refresh-1");
    mock(&client).mock_response(ITEMS_URL, 201, json!({ "id": 9 }));

    let created: serde_json::Value = client
        .request(
            "/api/items",
            RequestOptions::post(json!({ "name": "bolt" })).header("X-Request-Id", "r1"),
        )
        .await
        .unwrap();
    assert_eq!(created["id"], 9);

    let sent = mock(&client).request(0);
    assert_eq!(sent.method, HttpMethod::Post);
    assert_eq!(sent.header("Authorization"), Some("Bearer access-1"));
    assert_eq!(sent.header("X-Request-Id"), Some("r1"));
    assert_eq!(sent.body.as_deref(), Some(r#"{"name":"bolt"}"#));
}

// =========================================================
// 错误映射
// =========================================================

#[tokio::test]
async fn test_non_2xx_becomes_http_error() {
    let client = create_client(AuthMode::Cookie);
    mock(&client).mock_response(
        ITEMS_URL,
        422,
        json!({ "error": { "error": "validation_failed", "details": { "name": ["required"] } } }),
    );

    let err = client
        .request::<serde_json::Value>("/api/items", RequestOptions::post(json!({})))
        .await
        .unwrap_err();
    assert_eq!(err.status, 422);
    assert_eq!(err.error_code().as_deref(), Some("validation_failed"));
}

#[tokio::test]
async fn test_transport_failure_is_network_error() {
    let client = create_client(AuthMode::Cookie);
    mock(&client).mock_transport_failure(ITEMS_URL);

    let err = client
        .request::<serde_json::Value>("/api/items", RequestOptions::get())
        .await
        .unwrap_err();
    assert_eq!(err.status, 500);
    assert_eq!(err.body, json!({ "error": NETWORK_ERROR_MESSAGE }));
}

// =========================================================
// 401 刷新与重试
// =========================================================

#[tokio::test]
async fn test_unauthorized_without_refresh_token_fails_immediately() {
    let client = create_client(AuthMode::Bearer);
    mock(&client).mock_response(ITEMS_URL, 401, json!({ "error": "unauthorized" }));

    let err = client
        .request::<serde_json::Value>("/api/items", RequestOptions::get())
        .await
        .unwrap_err();
    assert_eq!(err, HttpError::invalid_refresh_token());
    assert_eq!(mock(&client).request_count(), 1);
}

#[tokio::test]
async fn test_unauthorized_refreshes_and_retries_once() {
    let client = create_client(AuthMode::Bearer);
    client.session().login("stale", "refresh-1");

    let fresh = encode_test_token(&json!({ "sub": "u1", "org_id": "org-5" }));
    mock(&client).mock_response(ITEMS_URL, 401, json!({ "error": "unauthorized" }));
    mock(&client).mock_response(ITEMS_URL, 200, json!({ "ok": true }));
    mock(&client).mock_response(
        TOKEN_URL,
        200,
        json!({ "access_token": fresh, "token_type": "Bearer", "expires_in": 300 }),
    );

    let body: serde_json::Value = client
        .request("/api/items", RequestOptions::get())
        .await
        .unwrap();
    assert_eq!(body, json!({ "ok": true }));

    // 原请求之后恰好两次网络调用：刷新 + 重试
    assert_eq!(mock(&client).request_count(), 3);

    let refresh = mock(&client).request(1);
    assert_eq!(refresh.url, TOKEN_URL);
    assert_eq!(refresh.method, HttpMethod::Post);
    assert_eq!(
        refresh.header("Content-Type"),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(
        refresh.body.as_deref(),
        Some("grant_type=refresh_token&refresh_token=refresh-1&client_id=web")
    );

    let retry = mock(&client).request(2);
    assert_eq!(retry.url, ITEMS_URL);
    assert_eq!(
        retry.header("Authorization"),
        Some(format!("Bearer {}", fresh).as_str())
    );

    let session = client.session().snapshot();
    assert_eq!(session.access_token.as_deref(), Some(fresh.as_str()));
    assert_eq!(session.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(session.selected_org_id.as_deref(), Some("org-5"));
}

#[tokio::test]
async fn test_invalid_refresh_token_is_not_retried() {
    let client = create_client(AuthMode::Bearer);
    client.session().login("stale", "revoked");
    mock(&client).mock_response(ITEMS_URL, 401, json!({}));
    mock(&client).mock_response(
        TOKEN_URL,
        400,
        json!({ "error": CODE_INVALID_REFRESH_TOKEN, "error_description": "revoked" }),
    );

    let err = client
        .request::<serde_json::Value>("/api/items", RequestOptions::get())
        .await
        .unwrap_err();
    assert_eq!(err.status, 401);
    assert!(err.is_invalid_refresh_token());
    // 原请求 + 刷新，没有重试
    assert_eq!(mock(&client).request_count(), 2);
    assert_eq!(client.session().access_token().as_deref(), Some("stale"));
}

#[tokio::test]
async fn test_second_unauthorized_does_not_refresh_again() {
    let client = create_client(AuthMode::Bearer);
    client.session().login("stale", "refresh-1");
    mock(&client).mock_response(ITEMS_URL, 401, json!({ "error": "still_unauthorized" }));
    mock(&client).mock_response(TOKEN_URL, 200, json!({ "access_token": "fresh" }));

    let err = client
        .request::<serde_json::Value>("/api/items", RequestOptions::get())
        .await
        .unwrap_err();
    assert_eq!(err.status, 401);
    assert_eq!(err.error_code().as_deref(), Some("still_unauthorized"));
    assert_eq!(mock(&client).request_count(), 3);
}

#[tokio::test]
async fn test_refresh_server_error_propagates() {
    let client = create_client(AuthMode::Cookie);
    client.session().login("stale", "refresh-1");
    mock(&client).mock_response(ITEMS_URL, 401, json!({}));
    mock(&client).mock_response(TOKEN_URL, 503, json!({ "error": "unavailable" }));

    let err = client
        .request::<serde_json::Value>("/api/items", RequestOptions::get())
        .await
        .unwrap_err();
    assert_eq!(err.status, 503);
    assert_eq!(mock(&client).request_count(), 2);
}

// =========================================================
// 登录与类型化接口
// =========================================================

#[tokio::test]
async fn test_login_with_password() {
    let client = create_client(AuthMode::Bearer);
    let access = encode_test_token(&json!({ "sub": "u1", "org_id": "org-1", "roles": "admin" }));
    mock(&client).mock_response(
        TOKEN_URL,
        200,
        json!({ "access_token": access, "refresh_token": "r-1" }),
    );

    client.login_with_password("ada@example.com", "p&ss word").await.unwrap();

    let sent = mock(&client).request(0);
    assert_eq!(
        sent.body.as_deref(),
        Some("grant_type=password&username=ada%40example.com&password=p%26ss+word&client_id=web")
    );
    let session = client.session().snapshot();
    assert!(session.is_authenticated);
    assert_eq!(session.refresh_token.as_deref(), Some("r-1"));
    assert_eq!(session.user.unwrap().roles, vec!["admin"]);
}

#[tokio::test]
async fn test_login_without_refresh_token_is_rejected() {
    let client = create_client(AuthMode::Bearer);
    mock(&client).mock_response(TOKEN_URL, 200, json!({ "access_token": "a" }));

    let err = client.login_with_password("ada", "pw").await.unwrap_err();
    assert_eq!(err.status, 500);
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn test_typed_call() {
    let client = create_client(AuthMode::Bearer);
    client.session().login("access-1", "refresh-1");
    mock(&client).mock_response(
        "https://api.test/api/me",
        200,
        json!({ "id": "u1", "roles": ["admin"], "permissions": [] }),
    );

    let me = client.call(&CurrentUserRequest).await.unwrap();
    assert_eq!(me.id, "u1");
    assert_eq!(mock(&client).request(0).body, None);
}
