use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::classifier;
use crate::entities::frame;
use crate::error::{AppError, FieldError};
use crate::state::AppState;

// ============================================================================
// Router
// ============================================================================

/// Frame catalog router. Every route is scoped to the authenticated owner.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_frames).post(create_frame))
        .route("/search", get(search_frames))
        .route("/stats", get(frame_stats))
        .route(
            "/{id}",
            get(get_frame).put(update_frame).delete(delete_frame),
        )
        .route("/{id}/toggle", post(toggle_frame))
}

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateFrameRequest {
    #[serde(default)]
    name: String,
    style: Option<String>,
    description: Option<String>,
    price: Option<String>,
    image_url: Option<String>,
    purchase_link: Option<String>,
    is_active: Option<bool>,
    width_mm: Option<serde_json::Value>,
    height_mm: Option<serde_json::Value>,
    bridge_mm: Option<serde_json::Value>,
    temple_mm: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateFrameRequest {
    name: Option<String>,
    style: Option<String>,
    description: Option<String>,
    price: Option<String>,
    image_url: Option<String>,
    purchase_link: Option<String>,
    is_active: Option<bool>,
    width_mm: Option<serde_json::Value>,
    height_mm: Option<serde_json::Value>,
    bridge_mm: Option<serde_json::Value>,
    temple_mm: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ListQuery {
    active: Option<bool>,
}

#[derive(Deserialize)]
struct SearchQuery {
    q: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FrameResponse {
    id: Uuid,
    user_id: Uuid,
    name: String,
    style: String,
    description: Option<String>,
    price: Option<String>,
    image_url: Option<String>,
    purchase_link: Option<String>,
    is_active: bool,
    measurements: Measurements,
    created_at: String,
    updated_at: String,
}

#[derive(Serialize)]
struct Measurements {
    width: Option<f64>,
    height: Option<f64>,
    bridge: Option<f64>,
    temple: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FrameStatsResponse {
    total: u64,
    active: u64,
    inactive: u64,
}

// ============================================================================
// Helpers
// ============================================================================

/// Normalize a raw measurement value to millimeters.
///
/// Accepts numbers and numeric strings; empty strings and anything that
/// fails to parse become `None` (stored as NULL), never an error.
fn parse_measurement(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    }
}

fn frame_response(f: &frame::Model) -> FrameResponse {
    FrameResponse {
        id: f.id,
        user_id: f.user_id,
        name: f.name.clone(),
        style: f.style.clone(),
        description: f.description.clone(),
        price: f.price.clone(),
        image_url: f.image_url.clone(),
        purchase_link: f.purchase_link.clone(),
        is_active: f.is_active,
        measurements: Measurements {
            width: f.width_mm,
            height: f.height_mm,
            bridge: f.bridge_mm,
            temple: f.temple_mm,
        },
        created_at: f.created_at.to_rfc3339(),
        updated_at: f.updated_at.to_rfc3339(),
    }
}

/// Load a frame only if it belongs to `owner_id`. A frame owned by another
/// account is reported as missing, not forbidden.
async fn find_owned(
    db: &sea_orm::DatabaseConnection,
    frame_id: Uuid,
    owner_id: Uuid,
) -> Result<frame::Model, AppError> {
    frame::Entity::find_by_id(frame_id)
        .filter(frame::Column::UserId.eq(owner_id))
        .one(db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .ok_or_else(|| AppError::NotFound("Frame not found.".to_string()))
}

/// Treat whitespace-only optional strings as absent.
fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let trimmed = s.trim().to_string();
        if trimmed.is_empty() { None } else { Some(trimmed) }
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// `GET /api/v1/frames` — list the caller's frames, newest first.
async fn list_frames(
    State(state): State<AppState>,
    AuthUser(user_model): AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<FrameResponse>>, AppError> {
    let mut select = frame::Entity::find()
        .filter(frame::Column::UserId.eq(user_model.id))
        .order_by_desc(frame::Column::CreatedAt);

    if let Some(active) = query.active {
        select = select.filter(frame::Column::IsActive.eq(active));
    }

    let frames = select
        .all(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok(Json(frames.iter().map(frame_response).collect()))
}

/// `POST /api/v1/frames`
async fn create_frame(
    State(state): State<AppState>,
    AuthUser(user_model): AuthUser,
    Json(body): Json<CreateFrameRequest>,
) -> Result<impl IntoResponse, AppError> {
    let width = body.width_mm.as_ref().and_then(parse_measurement);
    let height = body.height_mm.as_ref().and_then(parse_measurement);
    let bridge = body.bridge_mm.as_ref().and_then(parse_measurement);
    let temple = body.temple_mm.as_ref().and_then(parse_measurement);

    let name = body.name.trim().to_string();
    let style = non_empty(body.style);

    let mut errors = Vec::new();
    if name.is_empty() {
        errors.push(FieldError::new("name", "Name is required."));
    }

    // The style label may be supplied by the user or derived from complete
    // measurements; with neither, the request is invalid.
    let style = style.or_else(|| {
        classifier::classify_optional(width, height, bridge, temple)
            .map(|shape| shape.as_str().to_string())
    });
    let Some(style) = style else {
        errors.push(FieldError::new(
            "style",
            "Style is required when measurements are incomplete.",
        ));
        return Err(AppError::Validation(errors));
    };

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let now = Utc::now().fixed_offset();
    let new_frame = frame::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_model.id),
        name: Set(name),
        style: Set(style),
        description: Set(non_empty(body.description)),
        price: Set(non_empty(body.price)),
        image_url: Set(non_empty(body.image_url)),
        purchase_link: Set(non_empty(body.purchase_link)),
        is_active: Set(body.is_active.unwrap_or(true)),
        width_mm: Set(width),
        height_mm: Set(height),
        bridge_mm: Set(bridge),
        temple_mm: Set(temple),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let created = new_frame
        .insert(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok((StatusCode::CREATED, Json(frame_response(&created))))
}

/// `GET /api/v1/frames/{id}`
async fn get_frame(
    State(state): State<AppState>,
    AuthUser(user_model): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<FrameResponse>, AppError> {
    let found = find_owned(&state.db, id, user_model.id).await?;
    Ok(Json(frame_response(&found)))
}

/// `PUT /api/v1/frames/{id}` — partial update; absent fields stay untouched.
async fn update_frame(
    State(state): State<AppState>,
    AuthUser(user_model): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateFrameRequest>,
) -> Result<Json<FrameResponse>, AppError> {
    let existing = find_owned(&state.db, id, user_model.id).await?;

    let mut active: frame::ActiveModel = existing.clone().into();

    if let Some(ref name) = body.name {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(vec![FieldError::new(
                "name",
                "Name cannot be empty.",
            )]));
        }
        active.name = Set(trimmed.to_string());
    }

    let explicit_style = non_empty(body.style.clone());
    if body.style.is_some() && explicit_style.is_none() {
        return Err(AppError::Validation(vec![FieldError::new(
            "style",
            "Style cannot be empty.",
        )]));
    }
    if let Some(ref style) = explicit_style {
        active.style = Set(style.clone());
    }

    if let Some(description) = body.description {
        active.description = Set(non_empty(Some(description)));
    }
    if let Some(price) = body.price {
        active.price = Set(non_empty(Some(price)));
    }
    if let Some(image_url) = body.image_url {
        active.image_url = Set(non_empty(Some(image_url)));
    }
    if let Some(purchase_link) = body.purchase_link {
        active.purchase_link = Set(non_empty(Some(purchase_link)));
    }
    if let Some(is_active) = body.is_active {
        active.is_active = Set(is_active);
    }

    // Measurements: present fields are normalized (invalid input → NULL),
    // absent ones keep their stored value
    let mut measurements_changed = false;
    let mut width = existing.width_mm;
    let mut height = existing.height_mm;
    let mut bridge = existing.bridge_mm;
    let mut temple = existing.temple_mm;

    if let Some(ref raw) = body.width_mm {
        width = parse_measurement(raw);
        active.width_mm = Set(width);
        measurements_changed = true;
    }
    if let Some(ref raw) = body.height_mm {
        height = parse_measurement(raw);
        active.height_mm = Set(height);
        measurements_changed = true;
    }
    if let Some(ref raw) = body.bridge_mm {
        bridge = parse_measurement(raw);
        active.bridge_mm = Set(bridge);
        measurements_changed = true;
    }
    if let Some(ref raw) = body.temple_mm {
        temple = parse_measurement(raw);
        active.temple_mm = Set(temple);
        measurements_changed = true;
    }

    // Changed measurements retag the frame unless the caller set the label
    // explicitly in the same request
    if measurements_changed
        && explicit_style.is_none()
        && let Some(shape) = classifier::classify_optional(width, height, bridge, temple)
    {
        active.style = Set(shape.as_str().to_string());
    }

    active.updated_at = Set(Utc::now().fixed_offset());
    let updated = active
        .update(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok(Json(frame_response(&updated)))
}

/// `DELETE /api/v1/frames/{id}` — hard delete.
async fn delete_frame(
    State(state): State<AppState>,
    AuthUser(user_model): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let found = find_owned(&state.db, id, user_model.id).await?;

    found
        .delete(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/v1/frames/{id}/toggle`
async fn toggle_frame(
    State(state): State<AppState>,
    AuthUser(user_model): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<FrameResponse>, AppError> {
    let found = find_owned(&state.db, id, user_model.id).await?;

    let is_active = !found.is_active;
    let mut active: frame::ActiveModel = found.into();
    active.is_active = Set(is_active);
    active.updated_at = Set(Utc::now().fixed_offset());

    let updated = active
        .update(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok(Json(frame_response(&updated)))
}

/// `GET /api/v1/frames/search?q=` — match name, style, or description.
async fn search_frames(
    State(state): State<AppState>,
    AuthUser(user_model): AuthUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<FrameResponse>>, AppError> {
    let term = query.q.trim();
    if term.is_empty() {
        return Err(AppError::BadRequest(
            "Search term must not be empty.".to_string(),
        ));
    }

    let frames = frame::Entity::find()
        .filter(frame::Column::UserId.eq(user_model.id))
        .filter(
            Condition::any()
                .add(frame::Column::Name.contains(term))
                .add(frame::Column::Style.contains(term))
                .add(frame::Column::Description.contains(term)),
        )
        .order_by_desc(frame::Column::CreatedAt)
        .all(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok(Json(frames.iter().map(frame_response).collect()))
}

/// `GET /api/v1/frames/stats`
async fn frame_stats(
    State(state): State<AppState>,
    AuthUser(user_model): AuthUser,
) -> Result<Json<FrameStatsResponse>, AppError> {
    let total = frame::Entity::find()
        .filter(frame::Column::UserId.eq(user_model.id))
        .count(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let active = frame::Entity::find()
        .filter(frame::Column::UserId.eq(user_model.id))
        .filter(frame::Column::IsActive.eq(true))
        .count(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok(Json(FrameStatsResponse {
        total,
        active,
        inactive: total - active,
    }))
}
