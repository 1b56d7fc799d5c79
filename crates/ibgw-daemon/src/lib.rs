//! Gateway pool daemon.
//!
//! Wires the pool manager to its production collaborators: the Docker
//! CLI runtime, the gateway REST bridge client, the Vault-backed
//! credential resolver and a TOML file roster source, plus the status
//! HTTP endpoint health probes scrape.

pub mod app;
pub mod config;
pub mod error;
pub mod roster;
pub mod server;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use roster::FileRoster;
