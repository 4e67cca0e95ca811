// ABOUTME: Advisory input checks run against a registry snapshot before any pipeline starts
// The registry insert remains the real uniqueness guarantee; these only fail early for the user

use crate::models::RegistryDocument;
use crate::registry::{RegistryError, RegistryStore};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Hostnames must live under this suffix so the local proxy can route them.
pub const PROXY_SUFFIX: &str = ".localhost";

pub const MIN_PORT: u16 = 1024;

lazy_static! {
    // Docker's own container name rule
    static ref NAME_PATTERN: Regex = Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]*$").expect("valid name pattern");
    static ref GIT_URL_PATTERN: Regex =
        Regex::new(r"^https://[^/\s]+/\S+\.git$").expect("valid git url pattern");
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("project name must start with a letter or digit and contain only letters, digits, '_', '.' and '-'")]
    ContainerName,
    #[error("project name is already in use")]
    NameInUse,
    #[error("proxy must end with .localhost")]
    ProxySuffix,
    #[error("invalid proxy format")]
    ProxyLabel,
    #[error("proxy is already in use")]
    ProxyInUse,
    #[error("port must be between 1024 and 65535")]
    PortReserved,
    #[error("port is already in use")]
    PortInUse,
    #[error("directory {} already exists", .0.display())]
    PathExists(PathBuf),
    #[error("invalid git repository URL: must start with https://")]
    UrlScheme,
    #[error("invalid git repository URL: must end with .git")]
    UrlSuffix,
    #[error("invalid git repository URL")]
    UrlShape,
}

/// Checks user input against a snapshot of the registry.
pub struct Validator {
    snapshot: RegistryDocument,
    dev_root: PathBuf,
}

impl Validator {
    pub fn new(snapshot: RegistryDocument, dev_root: impl Into<PathBuf>) -> Self {
        Self {
            snapshot,
            dev_root: dev_root.into(),
        }
    }

    /// Take a snapshot of the registry as it is right now.
    pub fn from_store(store: &RegistryStore, dev_root: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        Ok(Self::new(store.load()?, dev_root))
    }

    /// The name becomes both the container name and the target directory.
    pub fn project_name(&self, name: &str) -> Result<(), ValidationError> {
        if !NAME_PATTERN.is_match(name) {
            return Err(ValidationError::ContainerName);
        }
        if self.snapshot.projects.contains_key(name) {
            return Err(ValidationError::NameInUse);
        }
        Ok(())
    }

    /// Hostname must end in `.localhost` and be unused.
    pub fn proxy(&self, proxy: &str) -> Result<(), ValidationError> {
        let label = proxy
            .strip_suffix(PROXY_SUFFIX)
            .ok_or(ValidationError::ProxySuffix)?;

        if label.is_empty() {
            return Err(ValidationError::ProxyLabel);
        }
        if self.snapshot.proxy_owner(proxy).is_some() {
            return Err(ValidationError::ProxyInUse);
        }
        Ok(())
    }

    pub fn port(&self, port: u16) -> Result<(), ValidationError> {
        if port < MIN_PORT {
            return Err(ValidationError::PortReserved);
        }
        if self.snapshot.used_ports().contains(&port) {
            return Err(ValidationError::PortInUse);
        }
        Ok(())
    }

    /// Where a project called `name` would live.
    pub fn target_path(&self, name: &str) -> PathBuf {
        self.dev_root.join(name)
    }

    /// The target directory must not exist yet.
    pub fn target_absent(&self, name: &str) -> Result<PathBuf, ValidationError> {
        let target = self.target_path(name);
        check_absent(&target)?;
        Ok(target)
    }

    pub fn git_url(&self, url: &str) -> Result<(), ValidationError> {
        validate_git_url(url)
    }
}

pub fn check_absent(path: &Path) -> Result<(), ValidationError> {
    if path.exists() {
        return Err(ValidationError::PathExists(path.to_path_buf()));
    }
    Ok(())
}

/// `https://` URL ending in `.git`.
pub fn validate_git_url(url: &str) -> Result<(), ValidationError> {
    if !url.starts_with("https://") {
        return Err(ValidationError::UrlScheme);
    }
    if !url.ends_with(".git") {
        return Err(ValidationError::UrlSuffix);
    }
    if !GIT_URL_PATTERN.is_match(url) {
        return Err(ValidationError::UrlShape);
    }
    Ok(())
}

/// Last path segment of a repository URL, without the `.git` suffix.
pub fn repo_name(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    trimmed
        .rsplit('/')
        .next()
        .unwrap_or(trimmed)
        .to_string()
}
