pub mod admin;
pub mod streamers;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::auth::require_admin;
use crate::state::AppState;

/// Routes mounted under `/api`. The admin routes sit behind Basic auth.
pub fn router(state: &AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/config", get(admin::get_config).post(admin::update_config))
        .route("/refresh", post(admin::refresh))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/streamers", get(streamers::list_streamers))
        .merge(admin)
}
