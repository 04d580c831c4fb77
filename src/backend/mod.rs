//! Local stand-in for the verification backend, used by `--dev` runs and tests.

pub mod risk;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::{BackendState, VerifyRejection};

use crate::common::{Config, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// Binds `addr` and serves the dev backend until the process exits.
pub async fn serve(config: &Config, addr: &str, feedback_dir: PathBuf) -> Result<()> {
    let state = Arc::new(
        BackendState::new(&config.dev_backend, feedback_dir)
            .with_alert_threshold(config.alerts.risk_threshold),
    );
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Dev backend listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
