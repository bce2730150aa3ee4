mod common;

use axum::Router;
use axum::http::StatusCode;
use migration::{Migrator, MigratorTrait};

use optiscan_api::config::{Config, Environment};
use optiscan_api::state::AppState;

async fn test_app() -> Router {
    let db = sea_orm::Database::connect("sqlite::memory:")
        .await
        .unwrap_or_default();
    Migrator::up(&db, None).await.unwrap_or_default();

    let state = AppState {
        db,
        config: Config {
            database_url: String::new(),
            server_host: std::net::IpAddr::from([127, 0, 0, 1]),
            server_port: 0,
            environment: Environment::Development,
            log_level: "warn".to_string(),
            jwt_secret: "test-secret-key-for-testing-only-32chars".to_string(),
            jwt_expiration_secs: 86_400,
            frontend_url: "http://localhost:3001".to_string(),
        },
    };

    optiscan_api::routes::router().with_state(state)
}

#[tokio::test]
async fn root_health_returns_ok() {
    let app = test_app().await;
    let (status, body) = common::get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn api_health_reports_database() {
    let app = test_app().await;
    let (status, body) = common::get(&app, "/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["database"], "connected");
    assert!(json["version"].is_string());
}
