mod common;

use axum::Router;
use axum::http::StatusCode;
use migration::{Migrator, MigratorTrait};
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde_json::json;

use optiscan_api::config::{Config, Environment};
use optiscan_api::entities::user;
use optiscan_api::state::AppState;

async fn test_app() -> (Router, DatabaseConnection) {
    let db = sea_orm::Database::connect("sqlite::memory:")
        .await
        .unwrap_or_default();
    Migrator::up(&db, None).await.unwrap_or_default();

    let state = AppState {
        db: db.clone(),
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

    (optiscan_api::routes::router().with_state(state), db)
}

async fn register_user(app: &Router, email: &str) -> String {
    let (status, body) = common::post_json(
        app,
        "/api/v1/auth/register",
        &json!({
            "name": "Carlos",
            "lastName": "Mora",
            "company": "Optica Este",
            "email": email,
            "password": "Password123",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    let json: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    json["token"].as_str().unwrap_or_default().to_string()
}

/// Helper: promote an account to admin directly in the database, then log
/// in again so the new token carries the admin role.
async fn make_admin(app: &Router, db: &DatabaseConnection, email: &str) -> String {
    let Some(user_model) = user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await
        .unwrap_or_default()
    else {
        return String::new();
    };
    let mut active: user::ActiveModel = user_model.into();
    active.role = Set("admin".to_string());
    let _ = active.update(db).await;

    let (status, body) = common::post_json(
        app,
        "/api/v1/auth/login",
        &json!({ "email": email, "password": "Password123" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "admin login failed: {body}");
    let json: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    json["token"].as_str().unwrap_or_default().to_string()
}

async fn user_id_by_email(db: &DatabaseConnection, email: &str) -> String {
    user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await
        .unwrap_or_default()
        .map(|u| u.id.to_string())
        .unwrap_or_default()
}

// ──────────────────────────────────────────────────────────────────────────────
// Authorization
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_routes_reject_regular_users() {
    let (app, _db) = test_app().await;
    let token = register_user(&app, "pleb@example.com").await;

    let (status, _body) = common::get_with_auth(&app, "/api/v1/admin/users", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _body) =
        common::post_with_auth(&app, "/api/v1/admin/subscriptions/sweep", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_routes_reject_anonymous() {
    let (app, _db) = test_app().await;
    let (status, _body) = common::get(&app, "/api/v1/admin/users").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ──────────────────────────────────────────────────────────────────────────────
// GET /api/v1/admin/users
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_users_includes_subscriptions() {
    let (app, db) = test_app().await;
    register_user(&app, "first@example.com").await;
    register_user(&app, "admin@example.com").await;
    let admin_token = make_admin(&app, &db, "admin@example.com").await;

    let (status, body) = common::get_with_auth(&app, "/api/v1/admin/users", &admin_token).await;
    assert_eq!(status, StatusCode::OK, "list failed: {body}");

    let json: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    let empty = vec![];
    let users = json.as_array().unwrap_or(&empty);
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u["subscription"]["plan"] == "free"));
}

#[tokio::test]
async fn list_users_filters_by_search_term() {
    let (app, db) = test_app().await;
    register_user(&app, "findme@example.com").await;
    register_user(&app, "someone@example.com").await;
    register_user(&app, "admin@example.com").await;
    let admin_token = make_admin(&app, &db, "admin@example.com").await;

    let (status, body) =
        common::get_with_auth(&app, "/api/v1/admin/users?q=findme", &admin_token).await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    let empty = vec![];
    let users = json.as_array().unwrap_or(&empty);
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["email"], "findme@example.com");
}

// ──────────────────────────────────────────────────────────────────────────────
// GET / PUT /api/v1/admin/users/{id}
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_user_returns_account_with_subscription() {
    let (app, db) = test_app().await;
    register_user(&app, "lookup@example.com").await;
    register_user(&app, "admin@example.com").await;
    let admin_token = make_admin(&app, &db, "admin@example.com").await;
    let id = user_id_by_email(&db, "lookup@example.com").await;

    let (status, body) =
        common::get_with_auth(&app, &format!("/api/v1/admin/users/{id}"), &admin_token).await;
    assert_eq!(status, StatusCode::OK, "get failed: {body}");

    let json: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    assert_eq!(json["email"], "lookup@example.com");
    assert_eq!(json["subscription"]["status"], "trial");
}

#[tokio::test]
async fn update_user_is_partial() {
    let (app, db) = test_app().await;
    register_user(&app, "editable@example.com").await;
    register_user(&app, "admin@example.com").await;
    let admin_token = make_admin(&app, &db, "admin@example.com").await;
    let id = user_id_by_email(&db, "editable@example.com").await;

    let (status, body) = common::put_json_with_auth(
        &app,
        &format!("/api/v1/admin/users/{id}"),
        &json!({ "company": "Optica Nueva" }),
        &admin_token,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "update failed: {body}");

    let json: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    assert_eq!(json["company"], "Optica Nueva");
    // Absent fields stay untouched
    assert_eq!(json["name"], "Carlos");
    assert_eq!(json["email"], "editable@example.com");
}

#[tokio::test]
async fn update_user_rejects_taken_email() {
    let (app, db) = test_app().await;
    register_user(&app, "holder@example.com").await;
    register_user(&app, "mover@example.com").await;
    register_user(&app, "admin@example.com").await;
    let admin_token = make_admin(&app, &db, "admin@example.com").await;
    let id = user_id_by_email(&db, "mover@example.com").await;

    let (status, _body) = common::put_json_with_auth(
        &app,
        &format!("/api/v1/admin/users/{id}"),
        &json!({ "email": "holder@example.com" }),
        &admin_token,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// ──────────────────────────────────────────────────────────────────────────────
// PUT /api/v1/admin/users/{id}/plan
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn change_plan_activates_and_sets_quota() {
    let (app, db) = test_app().await;
    register_user(&app, "upgrade@example.com").await;
    register_user(&app, "admin@example.com").await;
    let admin_token = make_admin(&app, &db, "admin@example.com").await;
    let id = user_id_by_email(&db, "upgrade@example.com").await;

    let (status, body) = common::put_json_with_auth(
        &app,
        &format!("/api/v1/admin/users/{id}/plan"),
        &json!({ "plan": "pro" }),
        &admin_token,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "plan change failed: {body}");

    let json: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    assert_eq!(json["subscription"]["plan"], "pro");
    assert_eq!(json["subscription"]["status"], "active");
    assert_eq!(json["subscription"]["analysisLimit"], 50);
    assert_eq!(json["subscription"]["daysRemaining"], 30);
    assert_eq!(json["isActive"], true);
}

#[tokio::test]
async fn change_plan_rejects_unknown_plan() {
    let (app, db) = test_app().await;
    register_user(&app, "typo@example.com").await;
    register_user(&app, "admin@example.com").await;
    let admin_token = make_admin(&app, &db, "admin@example.com").await;
    let id = user_id_by_email(&db, "typo@example.com").await;

    let (status, _body) = common::put_json_with_auth(
        &app,
        &format!("/api/v1/admin/users/{id}/plan"),
        &json!({ "plan": "platinum" }),
        &admin_token,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn change_plan_reactivates_deactivated_account() {
    let (app, db) = test_app().await;
    register_user(&app, "comeback@example.com").await;
    register_user(&app, "admin@example.com").await;
    let admin_token = make_admin(&app, &db, "admin@example.com").await;
    let id = user_id_by_email(&db, "comeback@example.com").await;

    // Deactivate, then change plan; the account comes back
    let (status, _body) =
        common::delete_with_auth(&app, &format!("/api/v1/admin/users/{id}"), &admin_token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = common::put_json_with_auth(
        &app,
        &format!("/api/v1/admin/users/{id}/plan"),
        &json!({ "plan": "basic" }),
        &admin_token,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "plan change failed: {body}");

    let json: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    assert_eq!(json["isActive"], true);
    assert_eq!(json["subscription"]["analysisLimit"], 15);
}

#[tokio::test]
async fn change_plan_unknown_user_not_found() {
    let (app, db) = test_app().await;
    register_user(&app, "admin@example.com").await;
    let admin_token = make_admin(&app, &db, "admin@example.com").await;

    let (status, _body) = common::put_json_with_auth(
        &app,
        &format!("/api/v1/admin/users/{}/plan", uuid::Uuid::new_v4()),
        &json!({ "plan": "pro" }),
        &admin_token,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ──────────────────────────────────────────────────────────────────────────────
// PUT /api/v1/admin/users/{id}/status · DELETE /api/v1/admin/users/{id}
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn toggle_status_flips_active_flag() {
    let (app, db) = test_app().await;
    register_user(&app, "flip@example.com").await;
    register_user(&app, "admin@example.com").await;
    let admin_token = make_admin(&app, &db, "admin@example.com").await;
    let id = user_id_by_email(&db, "flip@example.com").await;

    let (status, body) = common::put_json_with_auth(
        &app,
        &format!("/api/v1/admin/users/{id}/status"),
        &json!({}),
        &admin_token,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "toggle failed: {body}");
    let json: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    assert_eq!(json["isActive"], false);

    let (status, body) = common::put_json_with_auth(
        &app,
        &format!("/api/v1/admin/users/{id}/status"),
        &json!({}),
        &admin_token,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "toggle failed: {body}");
    let json: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    assert_eq!(json["isActive"], true);
}

#[tokio::test]
async fn deactivated_user_cannot_login() {
    let (app, db) = test_app().await;
    register_user(&app, "locked@example.com").await;
    register_user(&app, "admin@example.com").await;
    let admin_token = make_admin(&app, &db, "admin@example.com").await;
    let id = user_id_by_email(&db, "locked@example.com").await;

    let (status, _body) =
        common::delete_with_auth(&app, &format!("/api/v1/admin/users/{id}"), &admin_token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = common::post_json(
        &app,
        "/api/v1/auth/login",
        &json!({ "email": "locked@example.com", "password": "Password123" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("deactivated"), "body: {body}");
}

#[tokio::test]
async fn admin_cannot_deactivate_self() {
    let (app, db) = test_app().await;
    register_user(&app, "admin@example.com").await;
    let admin_token = make_admin(&app, &db, "admin@example.com").await;
    let id = user_id_by_email(&db, "admin@example.com").await;

    let (status, _body) =
        common::delete_with_auth(&app, &format!("/api/v1/admin/users/{id}"), &admin_token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ──────────────────────────────────────────────────────────────────────────────
// POST /api/v1/admin/users/{id}/renew
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn renew_reactivates_and_records_payment() {
    let (app, db) = test_app().await;
    register_user(&app, "renewal@example.com").await;
    register_user(&app, "admin@example.com").await;
    let admin_token = make_admin(&app, &db, "admin@example.com").await;
    let id = user_id_by_email(&db, "renewal@example.com").await;

    let (status, body) = common::post_json_with_auth(
        &app,
        &format!("/api/v1/admin/users/{id}/renew"),
        &json!({ "plan": "basic" }),
        &admin_token,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "renew failed: {body}");

    let json: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    assert_eq!(json["subscription"]["plan"], "basic");
    assert_eq!(json["subscription"]["status"], "active");
    assert_eq!(json["isActive"], true);
    assert!(json["subscription"]["lastPaymentDate"].is_string());
    assert_eq!(json["subscription"]["daysRemaining"], 30);
}
