//! Subscription lifecycle: trial/active/inactive transitions, expiry
//! detection, renewal, and the analysis quota gate.
//!
//! Every transition that touches both the account and its subscription runs
//! in a single transaction so a failure cannot leave `user.is_active` and
//! `subscription.status` disagreeing.

use chrono::{DateTime, Duration, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait,
};
use uuid::Uuid;

use crate::billing;
use crate::entities::{subscription, user};
use crate::error::AppError;
use crate::plans::Plan;

/// Subscription lifecycle states. Cancellation has no state of its own; a
/// cancelled subscription is `Inactive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Trial,
    Active,
    Inactive,
}

impl SubscriptionStatus {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "inactive" => Self::Inactive,
            _ => Self::Trial,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

/// Build the subscription a freshly registered account starts with:
/// free plan, trial status, first billing date one cycle out.
#[must_use]
pub fn initial_subscription(user_id: Uuid, now: DateTime<Utc>) -> subscription::ActiveModel {
    let fixed_now = now.fixed_offset();
    subscription::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        plan: Set(Plan::Free.as_str().to_string()),
        status: Set(SubscriptionStatus::Trial.as_str().to_string()),
        analysis_count: Set(0),
        analysis_limit: Set(Plan::Free.analysis_limit()),
        next_billing_date: Set(Some(
            billing::next_billing_date(Plan::Free, now).fixed_offset(),
        )),
        last_payment_date: Set(None),
        created_at: Set(fixed_now),
        updated_at: Set(fixed_now),
    }
}

/// An `active` subscription whose billing date has passed is expired. This
/// compares raw timestamps; a date even one second in the past counts,
/// unlike the display-facing `billing::days_remaining`.
#[must_use]
pub fn is_expired(sub: &subscription::Model, now: DateTime<Utc>) -> bool {
    SubscriptionStatus::parse(&sub.status) == SubscriptionStatus::Active
        && sub
            .next_billing_date
            .is_some_and(|next| next < now.fixed_offset())
}

/// Load the subscription belonging to `user_id`.
///
/// # Errors
///
/// `NotFound` if the account has no subscription row.
pub async fn find_for_user(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<subscription::Model, AppError> {
    subscription::Entity::find()
        .filter(subscription::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .ok_or_else(|| AppError::NotFound("Subscription not found.".to_string()))
}

/// Move an account onto `plan`: new quota, active status, billing date one
/// cycle from `now`. Re-activates the account if it had been deactivated.
///
/// # Errors
///
/// `NotFound` if the account or its subscription does not exist; `Internal`
/// on persistence failures.
pub async fn change_plan(
    db: &DatabaseConnection,
    user_id: Uuid,
    plan: Plan,
    now: DateTime<Utc>,
) -> Result<subscription::Model, AppError> {
    let sub = find_for_user(db, user_id).await?;
    let user_model = user::Entity::find_by_id(user_id)
        .one(db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

    let fixed_now = now.fixed_offset();
    let txn = db.begin().await.map_err(|e| AppError::Internal(e.into()))?;

    let mut active_sub: subscription::ActiveModel = sub.into();
    active_sub.plan = Set(plan.as_str().to_string());
    active_sub.analysis_limit = Set(plan.analysis_limit());
    active_sub.status = Set(SubscriptionStatus::Active.as_str().to_string());
    active_sub.next_billing_date = Set(Some(billing::next_billing_date(plan, now).fixed_offset()));
    active_sub.updated_at = Set(fixed_now);
    let updated = active_sub
        .update(&txn)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let mut active_user: user::ActiveModel = user_model.into();
    active_user.is_active = Set(true);
    active_user.updated_at = Set(fixed_now);
    active_user
        .update(&txn)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    txn.commit().await.map_err(|e| AppError::Internal(e.into()))?;
    Ok(updated)
}

/// Renew a subscription on its current (or a new) plan: active status, a
/// fresh billing date, payment recorded, account re-activated.
///
/// # Errors
///
/// `NotFound` if the account or its subscription does not exist; `Internal`
/// on persistence failures.
pub async fn renew(
    db: &DatabaseConnection,
    user_id: Uuid,
    plan: Plan,
    now: DateTime<Utc>,
) -> Result<subscription::Model, AppError> {
    let sub = find_for_user(db, user_id).await?;
    let user_model = user::Entity::find_by_id(user_id)
        .one(db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

    let fixed_now = now.fixed_offset();
    let txn = db.begin().await.map_err(|e| AppError::Internal(e.into()))?;

    let mut active_sub: subscription::ActiveModel = sub.into();
    active_sub.plan = Set(plan.as_str().to_string());
    active_sub.analysis_limit = Set(plan.analysis_limit());
    active_sub.status = Set(SubscriptionStatus::Active.as_str().to_string());
    active_sub.next_billing_date = Set(Some(billing::next_billing_date(plan, now).fixed_offset()));
    active_sub.last_payment_date = Set(Some(fixed_now));
    active_sub.updated_at = Set(fixed_now);
    let updated = active_sub
        .update(&txn)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let mut active_user: user::ActiveModel = user_model.into();
    active_user.is_active = Set(true);
    active_user.updated_at = Set(fixed_now);
    active_user
        .update(&txn)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    txn.commit().await.map_err(|e| AppError::Internal(e.into()))?;
    Ok(updated)
}

/// Deactivate one expired subscription together with its account.
async fn expire(
    db: &DatabaseConnection,
    sub: subscription::Model,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let user_id = sub.user_id;
    let user_model = user::Entity::find_by_id(user_id)
        .one(db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

    let fixed_now = now.fixed_offset();
    let txn = db.begin().await.map_err(|e| AppError::Internal(e.into()))?;

    let mut active_sub: subscription::ActiveModel = sub.into();
    active_sub.status = Set(SubscriptionStatus::Inactive.as_str().to_string());
    active_sub.updated_at = Set(fixed_now);
    active_sub
        .update(&txn)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let mut active_user: user::ActiveModel = user_model.into();
    active_user.is_active = Set(false);
    active_user.updated_at = Set(fixed_now);
    active_user
        .update(&txn)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    txn.commit().await.map_err(|e| AppError::Internal(e.into()))?;

    tracing::info!(%user_id, "Subscription expired, account deactivated");
    Ok(())
}

/// Expiry sweep, invoked by an external scheduler: every subscription with
/// `active` status and a billing date in the past becomes `inactive`, its
/// account deactivated. Idempotent: already-inactive rows are not selected,
/// so a second run is a no-op. Returns the number of accounts deactivated.
///
/// # Errors
///
/// `Internal` on persistence failures; a failure on one account leaves that
/// account's prior state intact.
pub async fn sweep_expired(db: &DatabaseConnection, now: DateTime<Utc>) -> Result<u64, AppError> {
    let expired = subscription::Entity::find()
        .filter(subscription::Column::Status.eq(SubscriptionStatus::Active.as_str()))
        .filter(subscription::Column::NextBillingDate.lt(now.fixed_offset()))
        .all(db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let mut deactivated = 0u64;
    for sub in expired {
        expire(db, sub, now).await?;
        deactivated += 1;
    }

    tracing::info!(deactivated, "Expiry sweep completed");
    Ok(deactivated)
}

/// Login-time lazy expiry check. If the subscription is expired, apply the
/// same transition the sweep would, inline, so the login decision is made
/// against the corrected state. The write is best-effort: on persistence
/// failure the corrected state is carried in memory and login proceeds.
pub async fn lazy_expire_on_login(
    db: &DatabaseConnection,
    mut user_model: user::Model,
    mut sub: subscription::Model,
    now: DateTime<Utc>,
) -> (user::Model, subscription::Model) {
    if !is_expired(&sub, now) {
        return (user_model, sub);
    }

    if let Err(e) = expire(db, sub.clone(), now).await {
        tracing::warn!(
            user_id = %user_model.id,
            error = %e,
            "Failed to persist lazy expiry, continuing with corrected in-memory state"
        );
    }

    user_model.is_active = false;
    sub.status = SubscriptionStatus::Inactive.as_str().to_string();
    (user_model, sub)
}

/// Count one analysis against the quota. Rejected without a write once the
/// count has reached the plan limit; the caller redirects to the upgrade
/// flow.
///
/// # Errors
///
/// `Forbidden` when the quota is exhausted; `NotFound` if the account has no
/// subscription; `Internal` on persistence failures.
pub async fn increment_analysis(
    db: &DatabaseConnection,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<subscription::Model, AppError> {
    let sub = find_for_user(db, user_id).await?;

    if sub.analysis_count >= sub.analysis_limit {
        return Err(AppError::Forbidden(
            "Analysis limit reached for the current plan. Upgrade to continue.".to_string(),
        ));
    }

    let count = sub.analysis_count + 1;
    let mut active_sub: subscription::ActiveModel = sub.into();
    active_sub.analysis_count = Set(count);
    active_sub.updated_at = Set(now.fixed_offset());
    active_sub
        .update(db)
        .await
        .map_err(|e| AppError::Internal(e.into()))
}

/// A subscription nearing its billing date, paired with the owning account.
#[derive(Debug)]
pub struct ExpiringSubscription {
    pub user: user::Model,
    pub subscription: subscription::Model,
    pub days_remaining: i64,
}

/// Find active subscriptions whose billing date falls within the next
/// `days_before` days, for payment-reminder dispatch.
///
/// # Errors
///
/// `Internal` on persistence failures.
pub async fn find_expiring(
    db: &DatabaseConnection,
    days_before: i64,
    now: DateTime<Utc>,
) -> Result<Vec<ExpiringSubscription>, AppError> {
    let window_end = now + Duration::days(days_before);

    let rows = subscription::Entity::find()
        .filter(subscription::Column::Status.eq(SubscriptionStatus::Active.as_str()))
        .filter(subscription::Column::NextBillingDate.gte(now.fixed_offset()))
        .filter(subscription::Column::NextBillingDate.lte(window_end.fixed_offset()))
        .find_also_related(user::Entity)
        .all(db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok(rows
        .into_iter()
        .filter_map(|(sub, user_model)| {
            let user_model = user_model?;
            let days = sub
                .next_billing_date
                .map_or(0, |next| billing::days_remaining(next.to_utc(), now));
            Some(ExpiringSubscription {
                user: user_model,
                subscription: sub,
                days_remaining: days,
            })
        })
        .collect())
}
