// ABOUTME: One-time provisioning of shared modules (proxy, mysql, mailpit) and installation init

use super::frameworks::{MAILPIT_MODULE, MYSQL_MODULE, PROXY_MODULE};
use super::rollback::{remove_workspace, RollbackReport};
use super::{Context, ProvisionError, ProvisionFailure, StepFailure};
use crate::events::Step;
use crate::models::Module;
use crate::registry::RegistryError;
use crate::template::{self, Replacements, ENV_FILE};
use crate::validation;
use clap::ValueEnum;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CHECK_MODULE: Step = Step::new("check_module", "Check Module");
pub const CLONE_MODULE: Step = Step::new("clone_module_repository", "Clone Module Repository");
pub const CONFIGURE_MODULE: Step = Step::new("configure_module", "Configure Module");
pub const BOOT_MODULE: Step = Step::new("boot_module", "Boot Module");
pub const REGISTER_MODULE: Step = Step::new("register_module", "Register Module");
pub const MODULE_READY: Step = Step::new("module_ready", "Module Ready");
pub const CREATE_REGISTRY: Step = Step::new("create_registry", "Create Registry");
pub const ENSURE_NETWORKS: Step = Step::new("ensure_networks", "Ensure Networks");
pub const INIT_COMPLETE: Step = Step::new("init_complete", "Init Complete");

/// Shared modules that projects depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModuleKind {
    Proxy,
    Mysql,
    Mailpit,
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl ModuleKind {
    pub const ALL: [ModuleKind; 3] = [ModuleKind::Proxy, ModuleKind::Mysql, ModuleKind::Mailpit];

    pub fn name(self) -> &'static str {
        match self {
            ModuleKind::Proxy => PROXY_MODULE,
            ModuleKind::Mysql => MYSQL_MODULE,
            ModuleKind::Mailpit => MAILPIT_MODULE,
        }
    }

    /// Repository cloned for the module.
    pub fn repo(self) -> &'static str {
        match self {
            ModuleKind::Proxy => "docker_proxy_network",
            ModuleKind::Mysql => "docker_mysql",
            ModuleKind::Mailpit => "docker_mailpit",
        }
    }

    /// `.env` values of the module; the proxy has no environment file.
    pub fn env_replacements(self, timezone: &str) -> Option<Replacements> {
        match self {
            ModuleKind::Proxy => None,
            ModuleKind::Mysql => Some(
                Replacements::new()
                    .env("MYSQL_HOST", "my_database")
                    .env("MYSQL_USER", "myenv")
                    .env("MYSQL_PASSWORD", "myenv")
                    .env("MYSQL_ROOT_PASSWORD", "rootpw")
                    .env("DB_PORT", "3306"),
            ),
            ModuleKind::Mailpit => Some(
                Replacements::new()
                    .env("MP_DATABASE", "/data/mailpit.db")
                    .env("MP_MAX_MESSAGES", "5000")
                    .env("MP_SMTP_UAUTH_ACCEPT_ANY", "1")
                    .env("MP_SMTP_AUTH_ALLOW_INSECURE", "1")
                    .env("VIRTUAL_HOST", "mailpit.localhost")
                    .env("VIRTUAL_PORT", "8025")
                    .env("TZ", timezone),
            ),
        }
    }
}

/// Installs shared modules: clone, configure, boot, register.
pub struct ModuleProvisioner<'a> {
    ctx: Context<'a>,
}

impl<'a> ModuleProvisioner<'a> {
    pub fn new(ctx: Context<'a>) -> Self {
        Self { ctx }
    }

    /// Where `kind` is cloned under the dev root.
    pub fn module_path(&self, kind: ModuleKind) -> PathBuf {
        self.ctx.settings.dev_root.join(kind.repo())
    }

    /// Clone, configure and boot `kind`, registering it once it runs.
    pub async fn provision(&self, kind: ModuleKind) -> Result<Module, ProvisionFailure> {
        let path = self.module_path(kind);
        info!("Provisioning module {} at {}", kind, path.display());

        if let Err(failure) = self.check_preconditions(kind, &path).await {
            return Err(self.ctx.fail(failure).await);
        }

        match self.build(kind, &path).await {
            Ok(module) => {
                self.ctx
                    .events
                    .success(MODULE_READY, format!("Module {kind} is ready"))
                    .await;
                Ok(module)
            }
            Err(failure) => {
                // Only the clone is ours to remove; registry entries are left alone
                let hint = self.ctx.hint_for(&failure).await;
                let mut report = RollbackReport::default();
                remove_workspace(&self.ctx, &path, &mut report).await;
                Err(ProvisionFailure {
                    error: failure.error,
                    step: failure.step.key,
                    hint,
                    rollback: Some(report),
                })
            }
        }
    }

    async fn check_preconditions(&self, kind: ModuleKind, path: &Path) -> Result<(), StepFailure> {
        let ctx = &self.ctx;
        ctx.events
            .running(CHECK_MODULE, format!("Checking module {kind}..."))
            .await;

        let result = match ctx.store.load() {
            Ok(doc) if doc.modules.contains_key(kind.name()) => {
                Err(ProvisionError::from(RegistryError::ModuleExists(kind.name().to_string())))
            }
            Ok(_) => validation::check_absent(path).map_err(ProvisionError::from),
            Err(e) => Err(e.into()),
        };
        ctx.check(CHECK_MODULE, result).await?;

        ctx.events
            .success(CHECK_MODULE, format!("Module {kind} can be installed"))
            .await;
        Ok(())
    }

    async fn build(&self, kind: ModuleKind, path: &Path) -> Result<Module, StepFailure> {
        let ctx = &self.ctx;
        let events = ctx.events;

        events
            .running(CLONE_MODULE, format!("Cloning {} repository...", kind.repo()))
            .await;
        let url = ctx.settings.scaffold_url(kind.repo());
        let result = ctx.source.clone_repo(&url, path).await;
        ctx.check(CLONE_MODULE, result).await?;
        events.success(CLONE_MODULE, "Module repository cloned").await;

        match kind.env_replacements(&ctx.settings.timezone) {
            Some(replacements) => {
                events
                    .running(CONFIGURE_MODULE, "Setting up environment variables...")
                    .await;
                let result = template::materialize_env(path)
                    .and_then(|_| template::rewrite_file(&path.join(ENV_FILE), &replacements));
                ctx.check(CONFIGURE_MODULE, result).await?;
                events
                    .success(CONFIGURE_MODULE, "Environment variables set up")
                    .await;
            }
            None => {
                events
                    .skipped(CONFIGURE_MODULE, format!("Module {kind} needs no environment file"))
                    .await;
            }
        }

        events
            .running(BOOT_MODULE, format!("Starting {kind} containers..."))
            .await;
        let result = ctx.runtime.ensure_running(path).await;
        ctx.check(BOOT_MODULE, result).await?;
        events
            .success(BOOT_MODULE, format!("{kind} containers started"))
            .await;

        events
            .running(REGISTER_MODULE, format!("Registering module {kind}..."))
            .await;
        let module = Module::new(kind.name(), path);
        let result = ctx.store.add_module(module.clone());
        ctx.check(REGISTER_MODULE, result).await?;
        events
            .success(REGISTER_MODULE, format!("Module {kind} registered"))
            .await;

        Ok(module)
    }
}

/// Create the registry and shared networks; with `quick`, also provision
/// every module not registered yet.
pub async fn initialize(ctx: Context<'_>, quick: bool) -> Result<(), ProvisionFailure> {
    if let Err(failure) = prepare(&ctx).await {
        return Err(ctx.fail(failure).await);
    }

    if quick {
        let provisioner = ModuleProvisioner::new(ctx);
        for kind in ModuleKind::ALL {
            let registered = match ctx.store.load() {
                Ok(doc) => doc.modules.contains_key(kind.name()),
                Err(e) => {
                    let failure = StepFailure {
                        step: CHECK_MODULE,
                        error: e.into(),
                    };
                    return Err(ctx.fail(failure).await);
                }
            };

            if registered {
                ctx.events
                    .skipped(CHECK_MODULE, format!("Module {kind} is already registered"))
                    .await;
                continue;
            }
            provisioner.provision(kind).await?;
        }
    }

    ctx.events
        .success(INIT_COMPLETE, "Initialization completed successfully")
        .await;
    Ok(())
}

async fn prepare(ctx: &Context<'_>) -> Result<(), StepFailure> {
    let settings = ctx.settings;

    ctx.events.running(CREATE_REGISTRY, "Creating registry...").await;
    let result = ctx.store.create(&settings.language, &settings.container_runtime);
    ctx.check(CREATE_REGISTRY, result).await?;
    ctx.events
        .success(CREATE_REGISTRY, format!("Registry ready at {}", ctx.store.path().display()))
        .await;

    ctx.events
        .running(ENSURE_NETWORKS, "Checking shared docker networks...")
        .await;
    for network in [&settings.proxy_network, &settings.infra_network] {
        let exists = ctx.check(ENSURE_NETWORKS, ctx.runtime.network_exists(network).await).await?;
        if !exists {
            info!("Creating docker network {}", network);
            let result = ctx.runtime.create_network(network).await;
            ctx.check(ENSURE_NETWORKS, result).await?;
        }
    }
    ctx.events
        .success(ENSURE_NETWORKS, "Shared docker networks are available")
        .await;

    Ok(())
}
