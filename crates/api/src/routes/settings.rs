//! Route definitions for the `/settings` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::settings;
use crate::state::AppState;

/// Routes mounted at `/settings`.
///
/// ```text
/// GET    /    -> get_settings   (keys masked)
/// POST   /    -> save_settings  (merge provided fields)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(settings::get_settings).post(settings::save_settings))
}
