//! Axum router wiring.
//!
//! Ops endpoints are mounted outside the capture layer; every route in `api`
//! runs under it.

use axum::{middleware, routing::get, Router};

use crate::{app_state::AppState, capture, ops};

pub fn build_router(state: AppState, api: Router<AppState>) -> Router {
    let filtered = api.layer(middleware::from_fn_with_state(
        state.clone(),
        capture::capture_middleware,
    ));

    Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/metrics", get(ops::metrics))
        .merge(filtered)
        .with_state(state)
}
