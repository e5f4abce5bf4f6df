//! Finds the URL of a JupyterLab server started in the background inside a
//! container by polling `jupyter server list`.

use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

use crate::config::JUPYTER_PORT;
use crate::docker::{CaptureMode, CommandGateway, ContainerController, ContainerHandle, ExecutionResult};
use crate::error::VogonError;

pub const START_JUPYTERLAB: &str = "jupyter lab --ip=0.0.0.0 --no-browser --allow-root";
pub const LIST_SERVERS: &str = "jupyter server list";

/// A running JupyterLab: loopback URL with its token, and the directory it serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    pub url: String,
    pub directory: String,
}

/// Result of a single discovery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    Ready(T),
    /// Counts against the retry budget.
    Retriable(String),
    /// Stops polling immediately.
    Fatal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryState {
    NotStarted,
    Polling { attempt: u32 },
    Found(ServiceEndpoint),
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct DiscoveryPolicy {
    pub attempts: u32,
    pub interval: Duration,
    /// Host port the server is published on.
    pub published_port: u16,
}

impl Default for DiscoveryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            interval: Duration::from_secs(2),
            published_port: JUPYTER_PORT,
        }
    }
}

fn token_regex() -> &'static Regex {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    TOKEN_RE.get_or_init(|| Regex::new(r"token=([^&#\s]+)").expect("TOKEN_RE regex must compile"))
}

/// Parse `jupyter server list` output.
///
/// Expected shape:
/// ```text
/// Currently running servers:
/// http://827c20250b6c:8888/?token=efd4e885 :: /mnt
/// ```
pub fn parse_listing(listing: &str, published_port: u16) -> Attempt<ServiceEndpoint> {
    let line = match listing.split('\n').nth(1).map(str::trim) {
        Some(line) if !line.is_empty() => line,
        _ => return Attempt::Retriable("no running servers listed yet".to_string()),
    };

    let Some((raw_url, directory)) = line.split_once(" :: ") else {
        return Attempt::Retriable(format!("unexpected listing line: {}", line));
    };

    let Some(token) = token_regex()
        .captures_iter(raw_url)
        .last()
        .and_then(|c| c.get(1))
    else {
        return Attempt::Retriable(format!("no token in server url: {}", raw_url));
    };

    Attempt::Ready(ServiceEndpoint {
        url: format!(
            "http://127.0.0.1:{}/lab?token={}",
            published_port,
            token.as_str()
        ),
        directory: directory.trim().to_string(),
    })
}

/// Classify one listing result. Runtime-level failures end discovery.
pub fn classify(result: &ExecutionResult, published_port: u16) -> Attempt<ServiceEndpoint> {
    if result.exit_code.is_none() {
        return Attempt::Fatal("listing command could not be executed".to_string());
    }

    let text = result.text();
    if text.contains("No such container") || text.contains("is not running") {
        return Attempt::Fatal(text.trim().to_string());
    }

    parse_listing(text, published_port)
}

/// Polls a container until the server reports a URL or the budget runs out.
pub struct DiscoveryPoller<'a, G> {
    controller: &'a ContainerController<G>,
    policy: DiscoveryPolicy,
    state: DiscoveryState,
}

impl<'a, G: CommandGateway> DiscoveryPoller<'a, G> {
    pub fn new(controller: &'a ContainerController<G>, policy: DiscoveryPolicy) -> Self {
        Self {
            controller,
            policy,
            state: DiscoveryState::NotStarted,
        }
    }

    pub fn state(&self) -> &DiscoveryState {
        &self.state
    }

    /// Start JupyterLab in the background and poll for its URL.
    pub async fn launch(&mut self, handle: &ContainerHandle) -> Result<ServiceEndpoint, VogonError> {
        let started = self.controller.exec_detached(handle, START_JUPYTERLAB).await;
        if !started.success() {
            tracing::warn!("Starting jupyterlab returned {:?}", started.exit_code);
        }
        self.poll(handle).await
    }

    pub async fn poll(&mut self, handle: &ContainerHandle) -> Result<ServiceEndpoint, VogonError> {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));

        let mut last_reason = String::from("no attempts made");

        for attempt in 1..=self.policy.attempts {
            self.state = DiscoveryState::Polling { attempt };
            pb.set_message(format!(
                "Waiting for jupyterlab (attempt {}/{})...",
                attempt, self.policy.attempts
            ));

            let listing = self
                .controller
                .exec(handle, LIST_SERVERS, CaptureMode::Multiline)
                .await;

            match classify(&listing, self.policy.published_port) {
                Attempt::Ready(endpoint) => {
                    pb.finish_and_clear();
                    self.state = DiscoveryState::Found(endpoint.clone());
                    return Ok(endpoint);
                }
                Attempt::Retriable(reason) => {
                    pb.suspend(|| tracing::warn!("Problem launching jupyterlab: {}", reason));
                    last_reason = reason;
                }
                Attempt::Fatal(reason) => {
                    pb.finish_and_clear();
                    self.state = DiscoveryState::Exhausted;
                    return Err(VogonError::DiscoveryFatal(reason));
                }
            }

            if attempt < self.policy.attempts && !self.policy.interval.is_zero() {
                tokio::time::sleep(self.policy.interval).await;
            }
        }

        pb.finish_and_clear();
        self.state = DiscoveryState::Exhausted;
        Err(VogonError::DiscoveryExhausted {
            attempts: self.policy.attempts,
            last_reason,
        })
    }
}
