// ABOUTME: Shared fakes and harness for provisioning integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use envbox::config::Settings;
use envbox::docker::{ContainerRuntime, RuntimeError};
use envbox::events::{EventBus, EventEmitter, RecordingSink};
use envbox::git::{CloneError, SourceControl};
use envbox::models::{Module, Project};
use envbox::provision::{Context, ProbePolicy, ProvisionFailure, ProvisionRequest, Provisioner};
use envbox::registry::RegistryStore;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

pub const ENV_EXAMPLE: &str = "\
CONTAINER_NAME=
REPOSITORY=
REPOSITORY_PATH=
DOCKER_PATH=
VIRTUAL_HOST=
VIRTUAL_PORT=
MY_WORDPRESS_DB=
TZ=
MYSQL_HOST=
MYSQL_USER=
MYSQL_PASSWORD=
MYSQL_ROOT_PASSWORD=
DB_PORT=
MP_DATABASE=
MP_MAX_MESSAGES=
MP_SMTP_UAUTH_ACCEPT_ANY=
MP_SMTP_AUTH_ALLOW_INSECURE=
";

pub const DESCRIPTOR_EXAMPLE: &str = r#"{
  "name": "project_repository",
  "name": "my wordpress",
  "name": "my php",
  "name": "nodejs project",
  "service": "app"
}
"#;

/// Records every call; failures are injected per path or command.
#[derive(Default)]
pub struct FakeRuntime {
    pub calls: Mutex<Vec<String>>,
    pub networks: Mutex<HashSet<String>>,
    pub fail_boot_at: Mutex<Option<PathBuf>>,
    pub fail_command: Mutex<Option<String>>,
}

impl FakeRuntime {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_boot_at(&self, path: impl Into<PathBuf>) {
        *self.fail_boot_at.lock().unwrap() = Some(path.into());
    }

    pub fn fail_command(&self, command: &str) {
        *self.fail_command.lock().unwrap() = Some(command.to_string());
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn ensure_running(&self, path: &Path) -> Result<(), RuntimeError> {
        self.calls.lock().unwrap().push(format!("up {}", path.display()));
        if self.fail_boot_at.lock().unwrap().as_deref() == Some(path) {
            return Err(RuntimeError::ComposeFailed {
                path: path.to_path_buf(),
                output: "Bind for 0.0.0.0:80 failed: port is already allocated".to_string(),
            });
        }
        Ok(())
    }

    async fn exec(&self, service: &str, command: &str, args: &[String]) -> Result<String, RuntimeError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("exec {} {} {}", service, command, args.join(" ")));
        if self.fail_command.lock().unwrap().as_deref() == Some(command) {
            return Err(RuntimeError::ExecFailed {
                service: service.to_string(),
                command: command.to_string(),
                exit_code: 1,
                output: "boom".to_string(),
            });
        }
        Ok(String::new())
    }

    async fn network_exists(&self, name: &str) -> Result<bool, RuntimeError> {
        Ok(self.networks.lock().unwrap().contains(name))
    }

    async fn create_network(&self, name: &str) -> Result<(), RuntimeError> {
        self.calls.lock().unwrap().push(format!("network {name}"));
        self.networks.lock().unwrap().insert(name.to_string());
        Ok(())
    }
}

/// Materializes a scaffold on clone instead of talking to a remote.
#[derive(Default)]
pub struct FakeSourceControl {
    pub cloned: Mutex<Vec<String>>,
    pub fail_url: Mutex<Option<String>>,
    pub omit_env_example: Mutex<bool>,
    pub omit_descriptor: Mutex<bool>,
    pub corrupt_after_clone: Mutex<Option<PathBuf>>,
}

impl FakeSourceControl {
    pub fn fail_url_containing(&self, needle: &str) {
        *self.fail_url.lock().unwrap() = Some(needle.to_string());
    }

    /// Overwrite `registry` with garbage once the next clone finishes.
    pub fn corrupt_registry_after_clone(&self, registry: impl Into<PathBuf>) {
        *self.corrupt_after_clone.lock().unwrap() = Some(registry.into());
    }

    pub fn cloned(&self) -> Vec<String> {
        self.cloned.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceControl for FakeSourceControl {
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), CloneError> {
        if dest.exists() {
            return Err(CloneError::AlreadyExists(dest.to_path_buf()));
        }
        if let Some(needle) = self.fail_url.lock().unwrap().as_deref() {
            if url.contains(needle) {
                return Err(CloneError::Git {
                    url: url.to_string(),
                    source: git2::Error::from_str("remote: Repository not found."),
                });
            }
        }

        self.cloned.lock().unwrap().push(url.to_string());
        std::fs::create_dir_all(dest)?;

        if url.contains("/docker_") {
            if !*self.omit_env_example.lock().unwrap() {
                std::fs::write(dest.join(".env.example"), ENV_EXAMPLE)?;
            }
            if !*self.omit_descriptor.lock().unwrap() {
                std::fs::create_dir_all(dest.join(".devcontainer"))?;
                std::fs::write(dest.join(".devcontainer/devcontainer.json.example"), DESCRIPTOR_EXAMPLE)?;
            }
        } else {
            std::fs::write(dest.join("composer.json"), "{}")?;
        }

        if let Some(registry) = self.corrupt_after_clone.lock().unwrap().take() {
            std::fs::write(registry, "{ not json")?;
        }
        Ok(())
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub settings: Settings,
    pub store: RegistryStore,
    pub runtime: FakeRuntime,
    pub source: FakeSourceControl,
}

impl Harness {
    /// Registry with the given modules already installed.
    pub fn with_modules(modules: &[&str]) -> Self {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            registry_path: dir.path().join("config.json"),
            dev_root: dir.path().join("dev"),
            timezone: "Asia/Tokyo".to_string(),
            scaffold_base_url: "https://example.com/boilerplates".to_string(),
            ..Settings::default()
        };
        let store = RegistryStore::new(&settings.registry_path);
        store.create("en", "docker").unwrap();
        for name in modules {
            store
                .add_module(Module::new(*name, dir.path().join("modules").join(name)))
                .unwrap();
        }

        Self {
            dir,
            settings,
            store,
            runtime: FakeRuntime::default(),
            source: FakeSourceControl::default(),
        }
    }

    pub fn new() -> Self {
        Self::with_modules(&["proxy", "mysql", "mailpit"])
    }

    pub fn module_path(&self, name: &str) -> PathBuf {
        self.dir.path().join("modules").join(name)
    }

    pub fn target(&self, name: &str) -> PathBuf {
        self.settings.dev_root.join(name)
    }

    pub fn context<'a>(&'a self, events: &'a EventEmitter) -> Context<'a> {
        Context {
            store: &self.store,
            runtime: &self.runtime,
            source: &self.source,
            settings: &self.settings,
            events,
        }
    }

    pub async fn provision(&self, request: &ProvisionRequest) -> (Result<Project, ProvisionFailure>, RecordingSink) {
        let (events, drain) = EventBus::start(RecordingSink::default());
        let result = Provisioner::new(self.context(&events))
            .with_probe_policy(ProbePolicy {
                attempts: 2,
                interval: Duration::ZERO,
            })
            .provision(request)
            .await;
        events.close();
        (result, drain.wait().await.unwrap())
    }

    pub fn project_registered(&self, name: &str) -> bool {
        self.store.load().unwrap().projects.contains_key(name)
    }
}
