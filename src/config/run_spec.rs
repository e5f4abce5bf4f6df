use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::utils::{paths, shell};

/// Ports, volumes and environment variables added to every `docker run`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// host port -> container port
    pub ports: BTreeMap<u16, u16>,
    /// host path -> container path
    pub volumes: BTreeMap<String, String>,
    /// name -> literal value, or the name of a host variable to forward
    pub envs: BTreeMap<String, String>,
}

/// Which flavour of container is being launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Poetry-managed repository: install it and register a kernel.
    Poet,
    /// Any directory: mount it and drop into a shell.
    Explorer,
}

/// What a variant does during a launch.
#[derive(Clone, Copy)]
pub struct Capabilities {
    /// File that must exist at the repository root before anything starts.
    pub project_descriptor: Option<&'static str>,
    /// Run inside the repository to install its dependencies.
    pub install_command: Option<&'static str>,
    /// Run inside the repository; non-empty output means the notebook stack is available.
    pub service_probe: &'static str,
    /// Builds the kernel registration command for a repository name.
    pub kernel_command: Option<fn(&str) -> String>,
    /// Shown when the probe finds nothing and JupyterLab is skipped.
    pub service_missing_hint: &'static str,
}

fn poetry_kernel_command(repo_name: &str) -> String {
    format!(
        "poetry run python -m ipykernel install --user --name={}",
        shell::quote_word(repo_name)
    )
}

impl Variant {
    pub fn capabilities(self) -> Capabilities {
        match self {
            Variant::Poet => Capabilities {
                project_descriptor: Some("pyproject.toml"),
                install_command: Some("poetry install"),
                service_probe: "poetry show | grep ipykernel",
                kernel_command: Some(poetry_kernel_command),
                service_missing_hint: "ipykernel is not one of your poetry dependencies. No \
                    jupyterlab for you until you add it as a poetry dev dependency.",
            },
            Variant::Explorer => Capabilities {
                project_descriptor: None,
                install_command: None,
                service_probe: "command -v jupyter",
                kernel_command: None,
                service_missing_hint: "jupyter is not installed in this image. Skipping jupyterlab.",
            },
        }
    }

    pub fn header_art(self) -> &'static str {
        match self {
            Variant::Poet => "\n~@ vogon poet @~\n",
            Variant::Explorer => "\n~@ vogon explorer @~\n",
        }
    }
}

/// Everything needed to launch one container. Immutable once built.
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub variant: Variant,
    pub image: String,
    pub tag: String,
    pub repo_dir: PathBuf,
    pub repo_name: String,
    pub mnt_dir: Option<PathBuf>,
    pub jupyterlab: bool,
    pub mount_ssh: bool,
    pub runtime: RuntimeConfig,
}

impl RunSpec {
    /// `repo_dir` must be absolute; its last segment becomes the repository name.
    pub fn new(variant: Variant, image: impl Into<String>, repo_dir: &Path) -> Result<Self> {
        let repo_name = paths::last_segment(repo_dir)
            .with_context(|| format!("Cannot derive a repo name from {}", repo_dir.display()))?;

        Ok(Self {
            variant,
            image: image.into(),
            tag: String::new(),
            repo_dir: repo_dir.to_path_buf(),
            repo_name,
            mnt_dir: None,
            jupyterlab: false,
            mount_ssh: false,
            runtime: RuntimeConfig::default(),
        })
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_mnt_dir(mut self, mnt_dir: Option<PathBuf>) -> Self {
        self.mnt_dir = mnt_dir;
        self
    }

    pub fn with_jupyterlab(mut self, jupyterlab: bool) -> Self {
        self.jupyterlab = jupyterlab;
        self
    }

    pub fn with_ssh(mut self, mount_ssh: bool) -> Self {
        self.mount_ssh = mount_ssh;
        self
    }

    pub fn with_runtime(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn capabilities(&self) -> Capabilities {
        self.variant.capabilities()
    }

    /// `image:tag`, unless the image already names a tag or no tag was given.
    pub fn image_reference(&self) -> String {
        let last = self.image.rsplit('/').next().unwrap_or(&self.image);
        if self.tag.is_empty() || last.contains(':') {
            self.image.clone()
        } else {
            format!("{}:{}", self.image, self.tag)
        }
    }

    /// Where the repository is mounted inside the container.
    pub fn container_repo_dir(&self) -> String {
        format!("{}/{}", super::REPOS_MOUNT_POINT, self.repo_name)
    }
}
