use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, TransactionTrait};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::auth::{jwt, password};
use crate::billing;
use crate::entities::{subscription, user};
use crate::error::{AppError, FieldError};
use crate::state::AppState;
use crate::subscription as subscriptions;
use crate::subscription::SubscriptionStatus;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the auth route group: `/auth/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify", get(verify))
        .route("/increment-analysis", post(increment_analysis))
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub last_name: String,
    pub company: String,
    pub role: String,
    pub is_active: bool,
    pub subscription: SubscriptionInfo,
    pub created_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInfo {
    pub plan: String,
    pub status: String,
    pub analysis_count: i32,
    pub analysis_limit: i32,
    pub next_billing_date: Option<String>,
    pub last_payment_date: Option<String>,
    /// Whole days until the next billing date, floored at zero. Display
    /// only; expiry detection compares raw timestamps.
    pub days_remaining: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncrementAnalysisRequest {
    /// Target account; defaults to the authenticated account. Admins may
    /// increment on behalf of any account.
    pub user_id: Option<Uuid>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncrementAnalysisResponse {
    pub analysis_count: i32,
    pub analysis_limit: i32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Build the full account response including subscription state.
pub(crate) fn user_response(
    u: &user::Model,
    sub: &subscription::Model,
    now: DateTime<Utc>,
) -> UserResponse {
    UserResponse {
        id: u.id,
        email: u.email.clone(),
        name: u.name.clone(),
        last_name: u.last_name.clone(),
        company: u.company.clone(),
        role: u.role.clone(),
        is_active: u.is_active,
        subscription: SubscriptionInfo {
            plan: sub.plan.clone(),
            status: sub.status.clone(),
            analysis_count: sub.analysis_count,
            analysis_limit: sub.analysis_limit,
            next_billing_date: sub.next_billing_date.map(|t| t.to_rfc3339()),
            last_payment_date: sub.last_payment_date.map(|t| t.to_rfc3339()),
            days_remaining: sub
                .next_billing_date
                .map(|t| billing::days_remaining(t.to_utc(), now)),
        },
        created_at: u.created_at.to_rfc3339(),
    }
}

/// Find an account by email (case-insensitive via lowercasing on write).
async fn find_by_email(
    db: &sea_orm::DatabaseConnection,
    email: &str,
) -> Result<Option<user::Model>, AppError> {
    user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await
        .map_err(|e| AppError::Internal(e.into()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `POST /api/v1/auth/register`
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    let email = body.email.trim().to_lowercase();

    // Every profile field is required; report all missing ones at once
    let mut missing = Vec::new();
    for (field, value) in [
        ("name", body.name.trim()),
        ("lastName", body.last_name.trim()),
        ("company", body.company.trim()),
        ("email", email.as_str()),
        ("password", body.password.as_str()),
    ] {
        if value.is_empty() {
            missing.push(FieldError::new(field, "This field is required."));
        }
    }
    if !missing.is_empty() {
        return Err(AppError::Validation(missing));
    }

    password::validate_email(&email).map_err(AppError::BadRequest)?;
    password::validate_password(&body.password).map_err(AppError::BadRequest)?;

    if find_by_email(&state.db, &email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered.".to_string()));
    }

    let password_hash = password::hash_password(&body.password)?;

    let now = Utc::now();
    let fixed_now = now.fixed_offset();
    let user_id = Uuid::new_v4();

    let txn = state
        .db
        .begin()
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let new_user = user::ActiveModel {
        id: Set(user_id),
        email: Set(email),
        name: Set(body.name.trim().to_string()),
        last_name: Set(body.last_name.trim().to_string()),
        company: Set(body.company.trim().to_string()),
        password_hash: Set(password_hash),
        role: Set("user".to_string()),
        is_active: Set(true),
        created_at: Set(fixed_now),
        updated_at: Set(fixed_now),
    };
    let user_model = new_user
        .insert(&txn)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let sub = subscriptions::initial_subscription(user_id, now)
        .insert(&txn)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    txn.commit()
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let token = jwt::generate_token(&user_model, &state.config)?;

    tracing::info!(user_id = %user_model.id, "Account registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user_response(&user_model, &sub, now),
            token,
        }),
    )
        .into_response())
}

/// `POST /api/v1/auth/login`
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = body.email.trim().to_lowercase();

    if email.is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required.".to_string(),
        ));
    }
    password::validate_email(&email).map_err(AppError::BadRequest)?;

    let user_model = find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

    let valid = password::verify_password(&body.password, &user_model.password_hash)?;
    if !valid {
        return Err(AppError::Unauthorized("Incorrect password.".to_string()));
    }

    let sub = subscriptions::find_for_user(&state.db, user_model.id).await?;

    // Resolve a stale active flag before deciding whether login is allowed
    let now = Utc::now();
    let (user_model, sub) =
        subscriptions::lazy_expire_on_login(&state.db, user_model, sub, now).await;

    if !user_model.is_active {
        if SubscriptionStatus::parse(&sub.status) == SubscriptionStatus::Inactive {
            return Err(AppError::Forbidden(
                "Your subscription has expired. Renew your plan to continue using the service."
                    .to_string(),
            ));
        }
        return Err(AppError::Forbidden(
            "Account is deactivated. Contact the administrator.".to_string(),
        ));
    }

    let token = jwt::generate_token(&user_model, &state.config)?;

    tracing::info!(user_id = %user_model.id, "Login succeeded");

    Ok(Json(AuthResponse {
        user: user_response(&user_model, &sub, now),
        token,
    }))
}

/// `GET /api/v1/auth/verify`
async fn verify(
    State(state): State<AppState>,
    AuthUser(user_model): AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let sub = subscriptions::find_for_user(&state.db, user_model.id).await?;
    Ok(Json(user_response(&user_model, &sub, Utc::now())))
}

/// `POST /api/v1/auth/increment-analysis`
async fn increment_analysis(
    State(state): State<AppState>,
    AuthUser(user_model): AuthUser,
    Json(body): Json<IncrementAnalysisRequest>,
) -> Result<Json<IncrementAnalysisResponse>, AppError> {
    let target = body.user_id.unwrap_or(user_model.id);

    if target != user_model.id && user_model.role != "admin" {
        return Err(AppError::Forbidden(
            "Cannot record analyses for another account.".to_string(),
        ));
    }

    let sub = subscriptions::increment_analysis(&state.db, target, Utc::now()).await?;

    Ok(Json(IncrementAnalysisResponse {
        analysis_count: sub.analysis_count,
        analysis_limit: sub.analysis_limit,
    }))
}
