// ABOUTME: Container runtime integration: compose-based boot, exec and shared network management

pub mod runtime;

pub use runtime::DockerRuntime;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Docker connection error: {0}")]
    Connection(#[from] bollard::errors::Error),
    #[error("Error running docker compose up -d --build in {}: {output}", .path.display())]
    ComposeFailed { path: PathBuf, output: String },
    #[error("Command '{command}' failed in {service} (exit code {exit_code}): {output}")]
    ExecFailed {
        service: String,
        command: String,
        exit_code: i64,
        output: String,
    },
    #[error("Failed to launch docker: {0}")]
    Io(#[from] std::io::Error),
}

/// Operations the provisioning core needs from a container engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Build and start the compose project at `path`. Safe to repeat.
    async fn ensure_running(&self, path: &Path) -> Result<(), RuntimeError>;

    /// Run `command args...` inside the running `service` container and return its output.
    async fn exec(&self, service: &str, command: &str, args: &[String]) -> Result<String, RuntimeError>;

    async fn network_exists(&self, name: &str) -> Result<bool, RuntimeError>;

    async fn create_network(&self, name: &str) -> Result<(), RuntimeError>;
}
