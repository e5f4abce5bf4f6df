pub mod controller;
pub mod daemon;
pub mod gateway;

pub use controller::{ContainerController, ContainerHandle, RunCommand, StartRequest};
pub use gateway::{CaptureMode, CommandGateway, ExecutionResult, ShellGateway};
