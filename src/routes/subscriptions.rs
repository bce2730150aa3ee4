use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::AdminUser;
use crate::entities::{subscription, user};
use crate::error::AppError;
use crate::plans::Plan;
use crate::state::AppState;
use crate::subscription as subscriptions;
use crate::subscription::SubscriptionStatus;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Admin-only subscription operations: `/admin/subscriptions/...`
///
/// The sweep and reminder endpoints exist for an external scheduler; the
/// service keeps no internal timer.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sweep", post(run_sweep))
        .route("/reminders", post(send_reminders))
        .route("/stats", get(stats))
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SweepResponse {
    deactivated_count: u64,
}

#[derive(Deserialize)]
struct RemindersQuery {
    /// How many days ahead of the billing date to remind; defaults to 3.
    days_before: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RemindersResponse {
    reminders_sent: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    total_users: u64,
    active_users: u64,
    total_analyses: i64,
    /// Sum of plan prices across active subscriptions.
    total_revenue: i64,
    monthly_revenue: i64,
    average_revenue_per_user: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `POST /api/v1/admin/subscriptions/sweep`
async fn run_sweep(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<SweepResponse>, AppError> {
    let deactivated_count = subscriptions::sweep_expired(&state.db, Utc::now()).await?;
    Ok(Json(SweepResponse { deactivated_count }))
}

/// `POST /api/v1/admin/subscriptions/reminders`
///
/// Reminder delivery is log-only: the service records each account that is
/// about to be billed and leaves actual dispatch to an external channel.
async fn send_reminders(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<RemindersQuery>,
) -> Result<Json<RemindersResponse>, AppError> {
    let days_before = query.days_before.unwrap_or(3);
    if days_before < 0 {
        return Err(AppError::BadRequest(
            "days_before must not be negative.".to_string(),
        ));
    }

    let expiring = subscriptions::find_expiring(&state.db, days_before, Utc::now()).await?;

    for entry in &expiring {
        tracing::info!(
            email = %entry.user.email,
            plan = %entry.subscription.plan,
            days_remaining = entry.days_remaining,
            "Payment reminder queued"
        );
    }

    Ok(Json(RemindersResponse {
        reminders_sent: expiring.len() as u64,
    }))
}

/// `GET /api/v1/admin/subscriptions/stats`
async fn stats(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<StatsResponse>, AppError> {
    let total_users = user::Entity::find()
        .count(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let active_users = user::Entity::find()
        .filter(user::Column::IsActive.eq(true))
        .count(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let active_subs = subscription::Entity::find()
        .filter(subscription::Column::Status.eq(SubscriptionStatus::Active.as_str()))
        .all(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let total_analyses: i64 = active_subs
        .iter()
        .map(|sub| i64::from(sub.analysis_count))
        .sum();
    let total_revenue: i64 = active_subs
        .iter()
        .map(|sub| Plan::parse(&sub.plan).monthly_price())
        .sum();

    #[allow(clippy::cast_possible_wrap)]
    let average_revenue_per_user = if total_users > 0 {
        total_revenue / total_users as i64
    } else {
        0
    };

    Ok(Json(StatsResponse {
        total_users,
        active_users,
        total_analyses,
        total_revenue,
        monthly_revenue: total_revenue / 12,
        average_revenue_per_user,
    }))
}
