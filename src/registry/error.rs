// ABOUTME: Error types for the registry store

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry file does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("project name '{0}' is already in use")]
    ProjectExists(String),

    #[error("proxy hostname '{proxy}' is already in use by project '{owner}'")]
    ProxyInUse { proxy: String, owner: String },

    #[error("module '{0}' already exists")]
    ModuleExists(String),

    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("module not found: {0}")]
    ModuleNotFound(String),

    #[error("registry IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("registry file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl RegistryError {
    /// True for the duplicate-key failures raised at insert time.
    pub fn is_already_exists(&self) -> bool {
        matches!(
            self,
            RegistryError::ProjectExists(_)
                | RegistryError::ProxyInUse { .. }
                | RegistryError::ModuleExists(_)
        )
    }
}
