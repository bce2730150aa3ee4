use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Send a request with optional JSON body and bearer token, returning
/// (status, body).
async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<&serde_json::Value>,
    token: Option<&str>,
) -> (StatusCode, String) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    let request = if let Some(json) = body {
        builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap_or_default()
    } else {
        builder.body(Body::empty()).unwrap_or_default()
    };

    let response = app.clone().oneshot(request).await.unwrap_or_default();

    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .unwrap_or_default();
    let body_str = String::from_utf8(bytes.to_vec()).unwrap_or_default();

    (status, body_str)
}

/// Test helper: send a GET request to the app and return (status, body).
pub async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    send(app, "GET", uri, None, None).await
}

/// Test helper: authenticated GET.
pub async fn get_with_auth(app: &Router, uri: &str, token: &str) -> (StatusCode, String) {
    send(app, "GET", uri, None, Some(token)).await
}

/// Test helper: unauthenticated POST with a JSON body.
pub async fn post_json(app: &Router, uri: &str, json: &serde_json::Value) -> (StatusCode, String) {
    send(app, "POST", uri, Some(json), None).await
}

/// Test helper: authenticated POST with a JSON body.
pub async fn post_json_with_auth(
    app: &Router,
    uri: &str,
    json: &serde_json::Value,
    token: &str,
) -> (StatusCode, String) {
    send(app, "POST", uri, Some(json), Some(token)).await
}

/// Test helper: authenticated POST without a body.
pub async fn post_with_auth(app: &Router, uri: &str, token: &str) -> (StatusCode, String) {
    send(app, "POST", uri, None, Some(token)).await
}

/// Test helper: authenticated PUT with a JSON body.
pub async fn put_json_with_auth(
    app: &Router,
    uri: &str,
    json: &serde_json::Value,
    token: &str,
) -> (StatusCode, String) {
    send(app, "PUT", uri, Some(json), Some(token)).await
}

/// Test helper: authenticated DELETE.
pub async fn delete_with_auth(app: &Router, uri: &str, token: &str) -> (StatusCode, String) {
    send(app, "DELETE", uri, None, Some(token)).await
}
