use colored::Colorize;
use std::path::PathBuf;

use crate::config::RunSpec;
use crate::docker::{
    CaptureMode, CommandGateway, ContainerController, ContainerHandle, RunCommand, StartRequest,
};
use crate::error::VogonError;
use crate::utils::names::NameGenerator;

use super::discovery::{DiscoveryPoller, DiscoveryPolicy, ServiceEndpoint};

/// Fresh names tried when the runtime reports a name collision.
const START_ATTEMPTS: u32 = 3;

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// What a finished launch produced.
#[derive(Debug, Clone)]
pub struct LaunchReport {
    pub container_name: String,
    pub handle: ContainerHandle,
    pub endpoint: Option<ServiceEndpoint>,
    pub warnings: Vec<String>,
}

/// Runs one container through its whole life: start, install, optional
/// JupyterLab, attach.
pub struct Orchestrator<G> {
    controller: ContainerController<G>,
    names: NameGenerator,
    policy: DiscoveryPolicy,
    ssh_dir: Option<PathBuf>,
    host_env: EnvLookup,
}

impl<G: CommandGateway> Orchestrator<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            controller: ContainerController::new(gateway),
            names: NameGenerator::from_clock(),
            policy: DiscoveryPolicy::default(),
            ssh_dir: crate::utils::paths::get_ssh_dir().ok(),
            host_env: Box::new(|name| std::env::var(name).ok()),
        }
    }

    pub fn with_names(mut self, names: NameGenerator) -> Self {
        self.names = names;
        self
    }

    pub fn with_policy(mut self, policy: DiscoveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Host directory bound to /root/.ssh when `--ssh` is given.
    pub fn with_ssh_dir(mut self, ssh_dir: Option<PathBuf>) -> Self {
        self.ssh_dir = ssh_dir;
        self
    }

    pub fn with_host_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.host_env = Box::new(lookup);
        self
    }

    /// Fails before anything is started if the repository lacks its descriptor.
    pub fn validate(&self, spec: &RunSpec) -> Result<(), VogonError> {
        if let Some(descriptor) = spec.capabilities().project_descriptor {
            if !spec.repo_dir.join(descriptor).is_file() {
                return Err(VogonError::MissingProjectDescriptor {
                    repo: spec.repo_dir.clone(),
                    descriptor: descriptor.to_string(),
                });
            }
        }
        Ok(())
    }

    pub async fn launch(&mut self, spec: &RunSpec) -> Result<LaunchReport, VogonError> {
        self.validate(spec)?;

        println!("{}", spec.variant.header_art().green());
        print_summary(spec);

        let mut warnings = Vec::new();
        let (container_name, handle) = self.start(spec, &mut warnings).await?;
        println!("{} Container id: {}", "✓".green().bold(), handle.short().cyan());

        let caps = spec.capabilities();
        let repo_dir = spec.container_repo_dir();

        if let Some(install) = caps.install_command {
            println!("{} Running `{}` for {}.", "=>".blue().bold(), install, spec.repo_name.cyan());
            let result = self
                .controller
                .exec_in_dir(&handle, &repo_dir, install, CaptureMode::Wait)
                .await;
            if !result.success() {
                warn(
                    &mut warnings,
                    format!("`{}` exited with {:?}; continuing.", install, result.exit_code),
                );
            }
        }

        let mut endpoint = None;
        if spec.jupyterlab {
            if self.service_available(spec, &handle).await {
                if let Some(kernel_command) = caps.kernel_command {
                    println!(
                        "{} Creating ipykernel for installed poetry environment.",
                        "=>".blue().bold()
                    );
                    let register = kernel_command(&spec.repo_name);
                    let result = self
                        .controller
                        .exec_in_dir(&handle, &repo_dir, &register, CaptureMode::Wait)
                        .await;
                    if !result.success() {
                        warn(
                            &mut warnings,
                            format!("`{}` exited with {:?}; continuing.", register, result.exit_code),
                        );
                    }
                }

                println!("{} Starting jupyterlab.", "=>".blue().bold());
                let found = DiscoveryPoller::new(&self.controller, self.policy.clone())
                    .launch(&handle)
                    .await?;
                println!(
                    "{} JupyterLab launched from {}:\n{}",
                    "✓".green().bold(),
                    found.directory,
                    found.url.cyan().bold()
                );
                endpoint = Some(found);
            } else {
                warn(&mut warnings, caps.service_missing_hint.to_string());
            }
        }

        println!("\n {} \n", ".~@ | @~".repeat(5).green());
        self.controller.attach(&handle).await;

        println!("{}", "\n** vogon destruct **".yellow());

        Ok(LaunchReport {
            container_name,
            handle,
            endpoint,
            warnings,
        })
    }

    async fn start(
        &mut self,
        spec: &RunSpec,
        warnings: &mut Vec<String>,
    ) -> Result<(String, ContainerHandle), VogonError> {
        let image = spec.image_reference();
        let ssh_dir = match (&self.ssh_dir, spec.mount_ssh) {
            (Some(dir), true) => Some(dir.clone()),
            (None, true) => {
                warn(warnings, "Could not locate ~/.ssh; skipping ssh mount.".to_string());
                None
            }
            (_, false) => None,
        };

        let mut attempt = 1;
        loop {
            let container_name = self.names.next_name();
            let request = StartRequest {
                image: &image,
                container_name: &container_name,
                repo: Some((spec.repo_dir.as_path(), spec.repo_name.as_str())),
                mnt_dir: spec.mnt_dir.as_deref(),
                ssh_dir: ssh_dir.as_deref(),
                runtime: &spec.runtime,
            };
            let run = RunCommand::compose(&request, &self.host_env);

            if attempt == 1 {
                for warning in &run.warnings {
                    warn(warnings, warning.clone());
                }
            }

            println!(
                "{} Starting docker container {}.",
                "=>".blue().bold(),
                container_name.bold()
            );
            tracing::debug!("{}", run.command);

            match self.controller.start(&run).await {
                Ok(handle) => return Ok((container_name, handle)),
                Err(VogonError::ContainerStart { reason })
                    if reason.contains("is already in use") && attempt < START_ATTEMPTS =>
                {
                    warn(
                        warnings,
                        format!("Container name {} is taken; drawing another.", container_name),
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Probe for the notebook stack inside the container.
    async fn service_available(&self, spec: &RunSpec, handle: &ContainerHandle) -> bool {
        let probe = spec.capabilities().service_probe;
        let result = self
            .controller
            .exec_in_dir(handle, &spec.container_repo_dir(), probe, CaptureMode::Single)
            .await;
        result.success() && !result.text().trim().is_empty()
    }
}

fn warn(warnings: &mut Vec<String>, message: String) {
    println!("{} {}", "!".yellow().bold(), message.yellow());
    tracing::debug!("warning: {}", message);
    warnings.push(message);
}

fn print_summary(spec: &RunSpec) {
    println!("Image:\t\t{}", spec.image_reference().cyan());
    println!("Repo directory:\t{}", spec.repo_dir.display());
    println!("Repo name is:\t{}", spec.repo_name.cyan());
    if let Some(mnt_dir) = &spec.mnt_dir {
        println!("Mnt directory:\t{}", mnt_dir.display());
    }
    println!("Jupyterlab:\t{}", if spec.jupyterlab { "yes" } else { "no" });
    println!();
}
