mod auth;
mod frames;
mod health;
mod subscriptions;
mod users;

use axum::Router;

use crate::state::AppState;

/// Build the complete application router.
///
/// Structure:
/// - `GET /health` — lightweight liveness check
/// - `/api/v1/health` — detailed health check with database connectivity
/// - `/api/v1/auth/...` — registration, login, session verification, quota
/// - `/api/v1/frames/...` — owner-scoped frame catalog
/// - `/api/v1/admin/...` — admin-only user and subscription management
pub fn router() -> Router<AppState> {
    let admin = Router::new()
        .nest("/users", users::router())
        .nest("/subscriptions", subscriptions::router());

    let api_v1 = Router::new()
        .merge(health::api_router())
        .nest("/auth", auth::router())
        .nest("/frames", frames::router())
        .nest("/admin", admin);

    Router::new()
        .merge(health::root_router())
        .nest("/api/v1", api_v1)
}
