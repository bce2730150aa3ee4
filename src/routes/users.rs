use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::middleware::AdminUser;
use crate::auth::password;
use crate::entities::{subscription, user};
use crate::error::AppError;
use crate::plans::Plan;
use crate::routes::auth::{UserResponse, user_response};
use crate::state::AppState;
use crate::subscription as subscriptions;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Admin-only user management: `/admin/users/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route(
            "/{id}",
            get(get_user).put(update_user).delete(deactivate_user),
        )
        .route("/{id}/plan", put(change_plan))
        .route("/{id}/status", put(toggle_status))
        .route("/{id}/renew", post(renew_subscription))
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ListUsersQuery {
    role: Option<String>,
    active: Option<bool>,
    plan: Option<String>,
    /// Free-text search over name, last name, email, and company.
    q: Option<String>,
}

#[derive(Deserialize)]
struct ChangePlanRequest {
    plan: String,
}

#[derive(Deserialize)]
struct RenewRequest {
    /// Plan to renew onto; defaults to the subscription's current plan.
    plan: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateUserRequest {
    name: Option<String>,
    last_name: Option<String>,
    company: Option<String>,
    email: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /api/v1/admin/users`
async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let mut select = user::Entity::find().order_by_desc(user::Column::CreatedAt);

    if let Some(ref role) = query.role {
        select = select.filter(user::Column::Role.eq(role));
    }
    if let Some(active) = query.active {
        select = select.filter(user::Column::IsActive.eq(active));
    }
    if let Some(term) = query.q.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        select = select.filter(
            Condition::any()
                .add(user::Column::Name.contains(term))
                .add(user::Column::LastName.contains(term))
                .add(user::Column::Email.contains(term))
                .add(user::Column::Company.contains(term)),
        );
    }

    let rows = select
        .find_also_related(subscription::Entity)
        .all(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let now = Utc::now();
    let users = rows
        .into_iter()
        .filter_map(|(u, sub)| {
            let sub = sub?;
            if let Some(ref plan) = query.plan
                && &sub.plan != plan
            {
                return None;
            }
            Some(user_response(&u, &sub, now))
        })
        .collect();

    Ok(Json(users))
}

/// `GET /api/v1/admin/users/{id}`
async fn get_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    let user_model = find_user(&state.db, id).await?;
    let sub = subscriptions::find_for_user(&state.db, id).await?;
    Ok(Json(user_response(&user_model, &sub, Utc::now())))
}

/// `PUT /api/v1/admin/users/{id}` — partial profile update; absent fields
/// stay untouched.
async fn update_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user_model = find_user(&state.db, id).await?;

    let mut active: user::ActiveModel = user_model.into();

    if let Some(ref name) = body.name {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AppError::BadRequest("Name cannot be empty.".to_string()));
        }
        active.name = Set(trimmed.to_string());
    }
    if let Some(ref last_name) = body.last_name {
        let trimmed = last_name.trim();
        if trimmed.is_empty() {
            return Err(AppError::BadRequest(
                "Last name cannot be empty.".to_string(),
            ));
        }
        active.last_name = Set(trimmed.to_string());
    }
    if let Some(ref company) = body.company {
        active.company = Set(company.trim().to_string());
    }
    if let Some(ref email) = body.email {
        let email = email.trim().to_lowercase();
        password::validate_email(&email).map_err(AppError::BadRequest)?;

        let existing = user::Entity::find()
            .filter(user::Column::Email.eq(&email))
            .one(&state.db)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        if let Some(existing_user) = existing
            && existing_user.id != id
        {
            return Err(AppError::Conflict("Email is already in use.".to_string()));
        }

        active.email = Set(email);
    }

    active.updated_at = Set(Utc::now().fixed_offset());
    let updated = active
        .update(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let sub = subscriptions::find_for_user(&state.db, id).await?;
    Ok(Json(user_response(&updated, &sub, Utc::now())))
}

/// `PUT /api/v1/admin/users/{id}/plan`
async fn change_plan(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ChangePlanRequest>,
) -> Result<Json<UserResponse>, AppError> {
    // Admin input is strict: a typo must not silently become the free plan
    if !Plan::is_known(&body.plan) {
        return Err(AppError::BadRequest(format!(
            "Unknown plan '{}'.",
            body.plan
        )));
    }
    let plan = Plan::parse(&body.plan);

    let now = Utc::now();
    let sub = subscriptions::change_plan(&state.db, id, plan, now).await?;
    let user_model = find_user(&state.db, id).await?;

    tracing::info!(user_id = %id, plan = plan.as_str(), "Plan changed by admin");

    Ok(Json(user_response(&user_model, &sub, now)))
}

/// `PUT /api/v1/admin/users/{id}/status` — flip the account's active flag.
async fn toggle_status(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    let user_model = find_user(&state.db, id).await?;

    let is_active = !user_model.is_active;
    let mut active: user::ActiveModel = user_model.into();
    active.is_active = Set(is_active);
    active.updated_at = Set(Utc::now().fixed_offset());
    let updated = active
        .update(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let sub = subscriptions::find_for_user(&state.db, id).await?;
    Ok(Json(user_response(&updated, &sub, Utc::now())))
}

/// `POST /api/v1/admin/users/{id}/renew`
async fn renew_subscription(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<RenewRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let current = subscriptions::find_for_user(&state.db, id).await?;
    let plan = match body.plan {
        Some(ref requested) => {
            if !Plan::is_known(requested) {
                return Err(AppError::BadRequest(format!("Unknown plan '{requested}'.")));
            }
            Plan::parse(requested)
        }
        None => Plan::parse(&current.plan),
    };

    let now = Utc::now();
    let sub = subscriptions::renew(&state.db, id, plan, now).await?;
    let user_model = find_user(&state.db, id).await?;

    tracing::info!(user_id = %id, plan = plan.as_str(), "Subscription renewed");

    Ok(Json(user_response(&user_model, &sub, now)))
}

/// `DELETE /api/v1/admin/users/{id}` — soft-deactivate. Accounts are never
/// hard-deleted.
async fn deactivate_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if admin.id == id {
        return Err(AppError::BadRequest(
            "Admins cannot deactivate their own account.".to_string(),
        ));
    }

    let user_model = find_user(&state.db, id).await?;

    let mut active: user::ActiveModel = user_model.into();
    active.is_active = Set(false);
    active.updated_at = Set(Utc::now().fixed_offset());
    active
        .update(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}

async fn find_user(db: &sea_orm::DatabaseConnection, id: Uuid) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .ok_or_else(|| AppError::NotFound("User not found.".to_string()))
}
