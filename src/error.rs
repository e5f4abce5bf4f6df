use std::path::PathBuf;

use thiserror::Error;

/// Fatal conditions that stop a launch.
#[derive(Debug, Error)]
pub enum VogonError {
    #[error(
        "No {descriptor} file found in repo dir: {}. `vogon poet` only supports poetry-managed libraries.",
        .repo.display()
    )]
    MissingProjectDescriptor { repo: PathBuf, descriptor: String },

    #[error("Failed to start container: {reason}")]
    ContainerStart { reason: String },

    #[error("Unable to launch jupyterlab after {attempts} tries: {last_reason}")]
    DiscoveryExhausted { attempts: u32, last_reason: String },

    #[error("Discovery aborted: {0}")]
    DiscoveryFatal(String),

    #[error("Could not find home directory")]
    MissingHomeDirectory,
}
