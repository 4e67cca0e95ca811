// ABOUTME: Filesystem templating for scaffolds: .env materialization, file copies and literal placeholder substitution

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const ENV_FILE: &str = ".env";
pub const ENV_EXAMPLE_FILE: &str = ".env.example";

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("{} file does not exist: {}", .name, .path.display())]
    MissingTemplate { name: String, path: PathBuf },
    #[error("source file {} does not exist", .0.display())]
    MissingSource(PathBuf),
    #[error("destination file {} already exists", .0.display())]
    DestinationExists(PathBuf),
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TemplateError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        TemplateError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What `materialize_env` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvOutcome {
    Created,
    AlreadyPresent,
}

/// Ordered literal replacements; applied in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replacements {
    pairs: Vec<(String, String)>,
}

impl Replacements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every occurrence of `placeholder`.
    pub fn literal(mut self, placeholder: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.pairs.push((placeholder.into(), replacement.into()));
        self
    }

    /// Fill an empty `KEY=` line with `KEY=value`.
    pub fn env(self, key: &str, value: impl AsRef<str>) -> Self {
        self.literal(format!("{key}="), format!("{key}={}", value.as_ref()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Copy `.env.example` to `.env` unless `.env` already exists.
pub fn materialize_env(project_path: &Path) -> Result<EnvOutcome, TemplateError> {
    let example = project_path.join(ENV_EXAMPLE_FILE);
    let env = project_path.join(ENV_FILE);

    if env.exists() {
        debug!(".env already present in {}, skipping copy", project_path.display());
        return Ok(EnvOutcome::AlreadyPresent);
    }

    if !example.is_file() {
        return Err(TemplateError::MissingTemplate {
            name: ENV_EXAMPLE_FILE.to_string(),
            path: example,
        });
    }

    fs::copy(&example, &env).map_err(|e| TemplateError::io(&env, e))?;
    info!("Created {}", env.display());
    Ok(EnvOutcome::Created)
}

/// Copy `src` to `dst`, creating parent directories.
pub fn copy_file(src: &Path, dst: &Path) -> Result<(), TemplateError> {
    if !src.is_file() {
        return Err(TemplateError::MissingSource(src.to_path_buf()));
    }
    if dst.exists() {
        return Err(TemplateError::DestinationExists(dst.to_path_buf()));
    }

    fs::copy(src, dst).map_err(|e| TemplateError::io(dst, e))?;
    Ok(())
}

/// Literal substring replacement per placeholder. Placeholders missing from
/// `content` are skipped without error.
pub fn substitute(content: &str, replacements: &Replacements) -> String {
    let mut out = content.to_string();
    for (placeholder, replacement) in replacements.iter() {
        if out.contains(placeholder) {
            out = out.replace(placeholder, replacement);
        } else {
            debug!("Placeholder {:?} not found, leaving content unchanged", placeholder);
        }
    }
    out
}

/// Apply `replacements` to the file in place. Returns whether the content changed.
pub fn rewrite_file(path: &Path, replacements: &Replacements) -> Result<bool, TemplateError> {
    let content = fs::read_to_string(path).map_err(|e| TemplateError::io(path, e))?;
    let updated = substitute(&content, replacements);

    if updated == content {
        return Ok(false);
    }

    fs::write(path, updated).map_err(|e| TemplateError::io(path, e))?;
    Ok(true)
}
