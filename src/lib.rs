//! Launches throwaway Docker containers for a repository: start, install,
//! optionally bring up JupyterLab, then attach the terminal.

pub mod cli;
pub mod config;
pub mod docker;
pub mod error;
pub mod lifecycle;
pub mod utils;

pub use error::VogonError;
