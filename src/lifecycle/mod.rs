pub mod discovery;
pub mod orchestrator;

pub use discovery::{DiscoveryPolicy, DiscoveryPoller, DiscoveryState, ServiceEndpoint};
pub use orchestrator::{LaunchReport, Orchestrator};
