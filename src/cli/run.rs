use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use crate::config::{RunSpec, Settings, Variant};
use crate::docker::{daemon, ShellGateway};
use crate::lifecycle::Orchestrator;
use crate::utils::paths;

#[derive(Args, Debug, Clone)]
pub struct LaunchArgs {
    /// Mount a local directory as a repo (defaults to the current directory)
    #[arg(short, long, default_value = ".")]
    pub repo: PathBuf,

    /// Mount a local directory as a docker volume at /mnt
    #[arg(short, long)]
    pub mnt_dir: Option<PathBuf>,

    /// Start a jupyterlab session
    #[arg(short, long)]
    pub jupyterlab: bool,

    /// Mount ~/.ssh into the container
    #[arg(short, long)]
    pub ssh: bool,

    /// Docker image to run (defaults to `default_image` from the settings file)
    #[arg(short, long)]
    pub image: Option<String>,

    /// Image tag to run
    #[arg(short, long, default_value = "latest")]
    pub tag: String,
}

impl LaunchArgs {
    pub async fn execute(self, variant: Variant, settings_file: Option<PathBuf>) -> Result<()> {
        let settings_file = match settings_file {
            Some(path) => path,
            None => paths::get_settings_file()?,
        };
        let settings = Settings::load_or_create(&settings_file)?;

        let spec = self.into_spec(variant, &settings)?;

        let mut orchestrator = Orchestrator::new(ShellGateway);
        orchestrator.validate(&spec)?;
        daemon::ensure_available().await?;

        let report = orchestrator.launch(&spec).await?;
        tracing::debug!(
            "Session for {} ({}) ended with {} warning(s)",
            report.container_name,
            report.handle.short(),
            report.warnings.len()
        );

        Ok(())
    }

    pub fn into_spec(self, variant: Variant, settings: &Settings) -> Result<RunSpec> {
        let repo_dir = resolve_dir(&self.repo)?;
        let mnt_dir = match &self.mnt_dir {
            Some(dir) => Some(
                dir.canonicalize()
                    .with_context(|| format!("Mount directory does not exist: {}", dir.display()))?,
            ),
            None => None,
        };
        let image = self.image.unwrap_or_else(|| settings.default_image.clone());

        Ok(RunSpec::new(variant, image, &repo_dir)?
            .with_tag(self.tag)
            .with_mnt_dir(mnt_dir)
            .with_jupyterlab(self.jupyterlab)
            .with_ssh(self.ssh)
            .with_runtime(settings.runtime()))
    }
}

/// Canonical path when it exists, otherwise made absolute as given.
fn resolve_dir(path: &Path) -> Result<PathBuf> {
    match path.canonicalize() {
        Ok(p) => Ok(p),
        Err(_) => paths::absolute(path)
            .with_context(|| format!("Failed to resolve path: {}", path.display())),
    }
}
