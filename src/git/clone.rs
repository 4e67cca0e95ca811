// ABOUTME: Repository cloning through git2, behind a narrow trait so pipelines can use test doubles

use async_trait::async_trait;
use git2::build::RepoBuilder;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum CloneError {
    #[error("Clone destination already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
    #[error("error cloning repository {url}: {source}")]
    Git {
        url: String,
        #[source]
        source: git2::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Clone task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Fetches repositories into the workspace.
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Clone `url` into `dest`. Fails when `dest` already exists.
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), CloneError>;
}

/// Clones over the network with libgit2.
#[derive(Debug, Default, Clone)]
pub struct GitSourceControl;

impl GitSourceControl {
    pub fn new() -> Self {
        Self
    }

    fn clone_blocking(url: &str, dest: &Path) -> Result<(), CloneError> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        RepoBuilder::new()
            .clone(url, dest)
            .map_err(|source| CloneError::Git {
                url: url.to_string(),
                source,
            })?;
        Ok(())
    }
}

#[async_trait]
impl SourceControl for GitSourceControl {
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), CloneError> {
        if dest.exists() {
            return Err(CloneError::AlreadyExists(dest.to_path_buf()));
        }

        info!("Cloning {} into {}", url, dest.display());
        let url = url.to_string();
        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || Self::clone_blocking(&url, &dest)).await??;
        Ok(())
    }
}
