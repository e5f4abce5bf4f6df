pub mod run_spec;
pub mod settings;

/// In-container directory holding mounted repositories.
pub const REPOS_MOUNT_POINT: &str = "/repos";

/// In-container mount point for `--mnt-dir`.
pub const MNT_MOUNT_POINT: &str = "/mnt";

/// In-container mount point for the host's ~/.ssh.
pub const SSH_MOUNT_POINT: &str = "/root/.ssh";

/// Port JupyterLab listens on, published unchanged on the host.
pub const JUPYTER_PORT: u16 = 8888;

pub use run_spec::{Capabilities, RunSpec, RuntimeConfig, Variant};
pub use settings::Settings;
