use anyhow::{Context, Result};
use bollard::Docker;

/// Check that the docker CLI is installed and the local daemon answers.
pub async fn ensure_available() -> Result<()> {
    let cli = which::which("docker").context("`docker` was not found on PATH. Is Docker installed?")?;
    tracing::debug!("Using docker CLI at {}", cli.display());

    let docker = Docker::connect_with_local_defaults()
        .context("Failed to connect to Docker daemon. Is Docker running?")?;

    docker
        .ping()
        .await
        .context("Failed to ping Docker daemon")?;

    Ok(())
}
