use crate::common::{DeepGuardError, DevMode, Result};
use crate::service::client::SessionClient;
use std::process::{Command, Stdio};
use std::time::Duration;

const DEV_BACKEND_BINARY: &str = "deepguard-dev-backend";

/// Makes sure a backend answers health checks, auto-starting the local dev
/// backend when running in dev mode.
pub async fn ensure_backend_running(client: &SessionClient, dev_mode: &DevMode, config_path: Option<&std::path::Path>) -> Result<()> {
    // Try the health endpoint first
    if client.health().await.is_ok() {
        return Ok(());
    }

    // Only auto-start in dev mode
    if !dev_mode.is_enabled() {
        return Err(DeepGuardError::Other(anyhow::anyhow!(
            "Backend at {} is not reachable. Start it or run with --dev to use the local dev backend.",
            client.base_url()
        )));
    }

    tracing::info!("Starting dev backend...");

    let backend_binary = std::env::current_exe()?
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Failed to get binary directory"))?
        .join(DEV_BACKEND_BINARY);

    if !backend_binary.exists() {
        return Err(DeepGuardError::Other(anyhow::anyhow!(
            "Dev backend binary not found at {:?}. Please build the project first.", backend_binary
        )));
    }

    // Spawn backend in background
    let mut command = Command::new(&backend_binary);
    command.arg("--dev");
    if let Some(path) = config_path {
        command.arg("--config").arg(path);
    }
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())  // Keep the terminal page clean
        .spawn()
        .map_err(|e| DeepGuardError::Other(anyhow::anyhow!("Failed to start dev backend: {}", e)))?;

    // Wait for backend to be ready
    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(500)).await;
        if client.health().await.is_ok() {
            tracing::info!("Dev backend started successfully");
            return Ok(());
        }
    }

    Err(DeepGuardError::Other(anyhow::anyhow!("Dev backend failed to start within timeout")))
}
