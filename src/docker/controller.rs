use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::{RuntimeConfig, JUPYTER_PORT, MNT_MOUNT_POINT, REPOS_MOUNT_POINT, SSH_MOUNT_POINT};
use crate::error::VogonError;
use crate::utils::shell::{quote_word, single_quote};

use super::gateway::{CaptureMode, CommandGateway, ExecutionResult};

/// Runtime-assigned container id. Valid until the attached session ends; the
/// container runs with `--rm`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle(String);

impl ContainerHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form for display, like `docker ps`.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

fn container_id_regex() -> &'static Regex {
    static CONTAINER_ID_RE: OnceLock<Regex> = OnceLock::new();
    CONTAINER_ID_RE
        .get_or_init(|| Regex::new(r"^[0-9a-f]{12,64}$").expect("CONTAINER_ID_RE regex must compile"))
}

impl fmt::Display for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameters for one `docker run`.
pub struct StartRequest<'a> {
    pub image: &'a str,
    pub container_name: &'a str,
    /// Host repository directory and the name it is mounted under.
    pub repo: Option<(&'a Path, &'a str)>,
    pub mnt_dir: Option<&'a Path>,
    /// Host credential directory, when its mount was requested.
    pub ssh_dir: Option<&'a Path>,
    pub runtime: &'a RuntimeConfig,
}

/// A composed `docker run` line plus the optional mounts that were dropped.
#[derive(Debug, Clone)]
pub struct RunCommand {
    pub command: String,
    pub warnings: Vec<String>,
}

impl RunCommand {
    /// Compose the start command. `host_env` resolves host environment variables
    /// for forwarded `envs` entries.
    pub fn compose<F>(request: &StartRequest<'_>, host_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = quote_word(request.container_name);
        let mut warnings = Vec::new();

        let mut parts = vec![
            "docker run -it -d --rm".to_string(),
            format!("--name {}", name),
            format!("--env CONTAINER_NAME={}", name),
            format!("-p {}:{}", JUPYTER_PORT, JUPYTER_PORT),
        ];

        for (host_port, container_port) in &request.runtime.ports {
            parts.push(format!("-p {}:{}", host_port, container_port));
        }

        if let Some((repo_dir, repo_name)) = request.repo {
            parts.push(format!(
                "-v {}:{}",
                quote_word(&repo_dir.to_string_lossy()),
                quote_word(&format!("{}/{}", REPOS_MOUNT_POINT, repo_name))
            ));
        }

        if let Some(mnt_dir) = request.mnt_dir {
            parts.push(format!(
                "-v {}:{}",
                quote_word(&mnt_dir.to_string_lossy()),
                MNT_MOUNT_POINT
            ));
        }

        if let Some(ssh_dir) = request.ssh_dir {
            if ssh_dir.is_dir() {
                parts.push(format!(
                    "-v {}:{}",
                    quote_word(&ssh_dir.to_string_lossy()),
                    SSH_MOUNT_POINT
                ));
            } else {
                warnings.push(format!(
                    "No credential directory at {}; skipping ssh mount.",
                    ssh_dir.display()
                ));
            }
        }

        for (host_path, container_path) in &request.runtime.volumes {
            parts.push(format!(
                "-v {}:{}",
                quote_word(host_path),
                quote_word(container_path)
            ));
        }

        for (env_name, env_value) in &request.runtime.envs {
            match host_env(env_value) {
                Some(forwarded) => {
                    parts.push(format!("--env {}={}", env_name, single_quote(forwarded.trim())))
                }
                None => parts.push(format!("--env {}={}", env_name, env_value)),
            }
        }

        parts.push(quote_word(request.image));
        parts.push("bash".to_string());

        Self {
            command: parts.join(" "),
            warnings,
        }
    }
}

/// Issues `docker run`, `docker exec` and `docker container attach` through a gateway.
pub struct ContainerController<G> {
    gateway: G,
}

impl<G: CommandGateway> ContainerController<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    /// Start a container from a composed run command and return its handle.
    ///
    /// The id is read from stdout only; pull progress and warnings arrive on
    /// stderr and never become the handle.
    pub async fn start(&self, run: &RunCommand) -> Result<ContainerHandle, VogonError> {
        let result = self.gateway.run(&run.command, CaptureMode::Single).await;
        let id = result
            .stdout()
            .lines()
            .map(str::trim)
            .filter(|line| container_id_regex().is_match(line))
            .last();

        match id {
            Some(id) if result.success() => Ok(ContainerHandle::new(id)),
            _ => {
                let output = result.text().trim();
                let reason = if !output.is_empty() {
                    output.to_string()
                } else {
                    match result.exit_code {
                        Some(0) => "docker run printed no container id".to_string(),
                        Some(code) => format!("docker run exited with code {}", code),
                        None => "docker run could not be executed".to_string(),
                    }
                };
                Err(VogonError::ContainerStart { reason })
            }
        }
    }

    /// Attach the terminal to the container. Returns when the session ends.
    pub async fn attach(&self, handle: &ContainerHandle) -> ExecutionResult {
        let command = format!("docker container attach {}", quote_word(handle.as_str()));
        self.gateway.run(&command, CaptureMode::Wait).await
    }

    /// Run `script` with bash inside the container.
    pub async fn exec(
        &self,
        handle: &ContainerHandle,
        script: &str,
        mode: CaptureMode,
    ) -> ExecutionResult {
        let command = format!(
            "docker exec {} bash -c {}",
            quote_word(handle.as_str()),
            single_quote(script)
        );
        self.gateway.run(&command, mode).await
    }

    /// Start `script` in the background inside the container. Returns once the
    /// runtime has accepted it.
    pub async fn exec_detached(&self, handle: &ContainerHandle, script: &str) -> ExecutionResult {
        let command = format!(
            "docker exec -d {} bash -c {}",
            quote_word(handle.as_str()),
            single_quote(script)
        );
        self.gateway.run(&command, CaptureMode::Wait).await
    }

    /// Run `command` from the mounted repository directory.
    pub async fn exec_in_dir(
        &self,
        handle: &ContainerHandle,
        dir: &str,
        command: &str,
        mode: CaptureMode,
    ) -> ExecutionResult {
        let script = format!("cd {} && {}", quote_word(dir), command);
        self.exec(handle, &script, mode).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docker::gateway::fake::ScriptedGateway;
    use crate::docker::gateway::ShellGateway;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn request<'a>(runtime: &'a RuntimeConfig) -> StartRequest<'a> {
        StartRequest {
            image: "vogon:latest",
            container_name: "rancid_jeltz",
            repo: Some((Path::new("/home/arthur/heart-of-gold"), "heart-of-gold")),
            mnt_dir: None,
            ssh_dir: None,
            runtime,
        }
    }

    #[test]
    fn base_command_layout() {
        let runtime = RuntimeConfig::default();
        let run = RunCommand::compose(&request(&runtime), no_env);
        assert_eq!(
            run.command,
            "docker run -it -d --rm --name rancid_jeltz --env CONTAINER_NAME=rancid_jeltz \
             -p 8888:8888 -v /home/arthur/heart-of-gold:/repos/heart-of-gold vogon:latest bash"
        );
        assert!(run.warnings.is_empty());
    }

    #[test]
    fn name_appears_once_per_clause() {
        let runtime = RuntimeConfig::default();
        let run = RunCommand::compose(&request(&runtime), no_env);
        assert_eq!(run.command.matches("rancid_jeltz").count(), 2);
        assert_eq!(run.command.matches("--name rancid_jeltz").count(), 1);
        assert_eq!(run.command.matches("CONTAINER_NAME=rancid_jeltz").count(), 1);
    }

    #[test]
    fn runtime_config_is_appended_in_order() {
        let runtime = RuntimeConfig {
            ports: BTreeMap::from([(8050, 8050), (5432, 5433)]),
            volumes: BTreeMap::from([("/data".to_string(), "/srv/data".to_string())]),
            envs: BTreeMap::from([("STAGE".to_string(), "dev".to_string())]),
        };
        let mut req = request(&runtime);
        req.mnt_dir = Some(Path::new("/scratch"));
        let run = RunCommand::compose(&req, no_env);

        let p_default = run.command.find("-p 8888:8888").unwrap();
        let p_extra = run.command.find("-p 5432:5433").unwrap();
        let v_repo = run.command.find("-v /home/arthur/heart-of-gold").unwrap();
        let v_mnt = run.command.find("-v /scratch:/mnt").unwrap();
        let v_extra = run.command.find("-v /data:/srv/data").unwrap();
        let env = run.command.find("--env STAGE=dev").unwrap();
        let image = run.command.find("vogon:latest bash").unwrap();
        assert!(p_default < p_extra && p_extra < v_repo);
        assert!(v_repo < v_mnt && v_mnt < v_extra && v_extra < env && env < image);
        assert!(run.command.contains("-p 8050:8050"));
    }

    #[test]
    fn forwarded_env_is_quoted_literal_is_not() {
        let runtime = RuntimeConfig {
            envs: BTreeMap::from([
                ("AWS_PROFILE".to_string(), "HOST_PROFILE".to_string()),
                ("STAGE".to_string(), "dev".to_string()),
            ]),
            ..Default::default()
        };
        let host_env = |name: &str| (name == "HOST_PROFILE").then(|| "  deep-thought \n".to_string());
        let run = RunCommand::compose(&request(&runtime), host_env);

        assert!(run.command.contains("--env AWS_PROFILE='deep-thought'"));
        assert!(run.command.contains("--env STAGE=dev "));
    }

    #[test]
    fn forwarded_env_cannot_break_out_of_quotes() {
        let runtime = RuntimeConfig {
            envs: BTreeMap::from([("TOKEN".to_string(), "HOST_TOKEN".to_string())]),
            ..Default::default()
        };
        let host_env = |_: &str| Some("a'; rm -rf / #".to_string());
        let run = RunCommand::compose(&request(&runtime), host_env);

        let words = shell_words::split(&run.command).unwrap();
        assert!(words.contains(&"TOKEN=a'; rm -rf / #".to_string()));
        assert_eq!(words.last().map(String::as_str), Some("bash"));
    }

    #[test]
    fn paths_with_spaces_are_quoted() {
        let runtime = RuntimeConfig::default();
        let mut req = request(&runtime);
        req.repo = Some((Path::new("/home/arthur/my repo"), "my repo"));
        let run = RunCommand::compose(&req, no_env);

        let words = shell_words::split(&run.command).unwrap();
        assert!(words.contains(&"/home/arthur/my repo:/repos/my repo".to_string()));
    }

    #[test]
    fn missing_ssh_dir_is_skipped_with_warning() {
        let runtime = RuntimeConfig::default();
        let mut req = request(&runtime);
        let missing = PathBuf::from("/nonexistent/vogon/.ssh");
        req.ssh_dir = Some(missing.as_path());
        let run = RunCommand::compose(&req, no_env);

        assert!(!run.command.contains(SSH_MOUNT_POINT));
        assert_eq!(run.warnings.len(), 1);
        assert!(run.warnings[0].contains("/nonexistent/vogon/.ssh"));
    }

    #[test]
    fn existing_ssh_dir_is_mounted() {
        let home = tempfile::tempdir().unwrap();
        let ssh = home.path().join(".ssh");
        std::fs::create_dir(&ssh).unwrap();

        let runtime = RuntimeConfig::default();
        let mut req = request(&runtime);
        req.ssh_dir = Some(ssh.as_path());
        let run = RunCommand::compose(&req, no_env);

        assert!(run.command.contains(&format!("{}:{}", ssh.display(), SSH_MOUNT_POINT)));
        assert!(run.warnings.is_empty());
    }

    fn run_of(command: &str) -> RunCommand {
        RunCommand {
            command: command.to_string(),
            warnings: vec![],
        }
    }

    #[tokio::test]
    async fn start_takes_handle_from_stdout_not_pull_progress() {
        let gateway = ScriptedGateway::default().on(
            "docker run",
            vec![ExecutionResult::streams(
                "4f2a9c81d0e7b3\n",
                "Unable to find image 'vogon:latest' locally\nStatus: Downloaded newer image for vogon:latest\n",
                0,
            )],
        );
        let controller = ContainerController::new(gateway);

        let handle = controller.start(&run_of("docker run -it -d --rm vogon bash")).await.unwrap();
        assert_eq!(handle.as_str(), "4f2a9c81d0e7b3");
        assert_eq!(handle.short(), "4f2a9c81d0e7");
    }

    #[tokio::test]
    async fn start_through_shell_ignores_stderr_after_id() {
        let controller = ContainerController::new(ShellGateway);
        let run = run_of(
            "echo 'Unable to find image locally' >&2; echo 4f2a9c81d0e7b3; \
             echo 'Status: Downloaded newer image for vogon:latest' >&2",
        );

        let handle = controller.start(&run).await.unwrap();
        assert_eq!(handle.as_str(), "4f2a9c81d0e7b3");
    }

    #[tokio::test]
    async fn start_rejects_output_that_is_not_a_container_id() {
        let gateway = ScriptedGateway::default().on(
            "docker run",
            vec![ExecutionResult::captured("WARNING: platform mismatch\n", 0)],
        );
        let controller = ContainerController::new(gateway);

        match controller.start(&run_of("docker run vogon bash")).await {
            Err(VogonError::ContainerStart { reason }) => assert!(reason.contains("platform mismatch")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn start_failure_surfaces_runtime_message() {
        let gateway = ScriptedGateway::default().on(
            "docker run",
            vec![ExecutionResult::captured(
                "docker: Error response from daemon: Conflict. The container name \"/rancid_jeltz\" is already in use",
                125,
            )],
        );
        let controller = ContainerController::new(gateway);
        let run = RunCommand {
            command: "docker run --name rancid_jeltz vogon bash".to_string(),
            warnings: vec![],
        };

        match controller.start(&run).await {
            Err(VogonError::ContainerStart { reason }) => assert!(reason.contains("already in use")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn exec_wraps_script_for_bash() {
        let gateway = ScriptedGateway::default();
        let controller = ContainerController::new(gateway.clone());
        let handle = ContainerHandle::new("abc123");

        controller
            .exec_in_dir(&handle, "/repos/heart-of-gold", "poetry install", CaptureMode::Wait)
            .await;
        controller.exec_detached(&handle, "jupyter lab").await;
        controller.attach(&handle).await;

        assert_eq!(
            gateway.commands(),
            vec![
                "docker exec abc123 bash -c 'cd /repos/heart-of-gold && poetry install'",
                "docker exec -d abc123 bash -c 'jupyter lab'",
                "docker container attach abc123",
            ]
        );
    }
}
