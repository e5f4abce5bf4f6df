pub mod logger;
pub mod names;
pub mod paths;
pub mod shell;
