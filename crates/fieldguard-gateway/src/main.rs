//! fieldguard gateway (demo server)
//!
//! - Loads `fieldguard.yaml` (or the path given as the first argument)
//! - Loads the filter policy named there; a bad policy aborts startup
//! - Serves the demo API under the capture middleware, behind `dev_auth`
//!
//! Try: `/school/list?username=alice` vs `/school/list?username=bob`.

use axum::middleware;
use tracing_subscriber::{fmt, EnvFilter};

use fieldguard_core::error::{FilterError, Result};
use fieldguard_gateway::{app_state, config, context, router, services};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "fieldguard-gateway failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "fieldguard.yaml".into());
    let cfg = config::load_from_file(&path)?;
    let listen = cfg.gateway.listen_addr()?;

    let state = app_state::AppState::new(cfg)?;
    services::register_transforms(state.engine());
    state.engine().validate();

    let app = router::build_router(state, services::routes())
        .layer(middleware::from_fn(context::dev_auth));

    tracing::info!(%listen, "fieldguard-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| FilterError::Internal(format!("bind {listen} failed: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| FilterError::Internal(format!("server failed: {e}")))
}
