//! CLI command handlers, one per file.

mod config;
mod get;
mod probe;
mod report;

pub use config::run_config;
pub use get::run_get;
pub use probe::run_probe;
