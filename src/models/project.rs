// ABOUTME: Project and module records persisted in the registry document

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Option key recording how a project was provisioned.
pub const OPTION_TYPE: &str = "type";
/// Option key holding the external source repository of a cloned project.
pub const OPTION_REPO: &str = "repo";
/// Option key holding the host port of a project, when one was requested.
pub const OPTION_PORT: &str = "port";

/// Whether a project started from a scaffold or an existing repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisionMode {
    New,    // Scaffold generated inside the container
    Clone,  // Existing source cloned into the scaffold
}

impl ProvisionMode {
    /// Value stored under the `type` option.
    pub fn as_str(self) -> &'static str {
        match self {
            ProvisionMode::New => "new",
            ProvisionMode::Clone => "clone",
        }
    }
}

/// A user-provisioned application environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub container_name: String,
    pub container_proxy: String,
    pub path: PathBuf,
    pub lang: String,
    pub framework: String,
    #[serde(default)]
    pub options: HashMap<String, String>,
    #[serde(default)]
    pub modules: Vec<String>,
}

impl Project {
    pub fn new(
        container_name: impl Into<String>,
        container_proxy: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            container_name: container_name.into(),
            container_proxy: container_proxy.into(),
            path: path.into(),
            lang: String::new(),
            framework: String::new(),
            options: HashMap::new(),
            modules: Vec::new(),
        }
    }

    pub fn with_stack(mut self, lang: impl Into<String>, framework: impl Into<String>) -> Self {
        self.lang = lang.into();
        self.framework = framework.into();
        self
    }

    /// Record the modules the project depends on, in boot order.
    pub fn with_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules = modules.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// `None` when the `type` option is absent or unknown.
    pub fn mode(&self) -> Option<ProvisionMode> {
        match self.options.get(OPTION_TYPE).map(String::as_str) {
            Some("new") => Some(ProvisionMode::New),
            Some("clone") => Some(ProvisionMode::Clone),
            _ => None,
        }
    }

    pub fn port(&self) -> Option<u16> {
        self.options.get(OPTION_PORT).and_then(|p| p.parse().ok())
    }

    /// Browser URL through the local proxy.
    pub fn url(&self) -> String {
        format!("http://{}", self.container_proxy)
    }
}

/// A shared, long-lived infrastructure service reused across projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub path: PathBuf,
}

impl Module {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// The whole registry, read and written as one JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryDocument {
    pub language: String,
    pub container_runtime: String,
    #[serde(default)]
    pub projects: BTreeMap<String, Project>,
    #[serde(default)]
    pub modules: BTreeMap<String, Module>,
}

impl RegistryDocument {
    /// Empty registry.
    pub fn new(language: impl Into<String>, container_runtime: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            container_runtime: container_runtime.into(),
            projects: BTreeMap::new(),
            modules: BTreeMap::new(),
        }
    }

    /// Project that already uses `proxy` as its hostname.
    pub fn proxy_owner(&self, proxy: &str) -> Option<&Project> {
        self.projects.values().find(|p| p.container_proxy == proxy)
    }

    /// Ports claimed by registered projects, sorted.
    pub fn used_ports(&self) -> Vec<u16> {
        self.projects.values().filter_map(Project::port).collect()
    }
}
