// ABOUTME: Command-line surface: argument parsing and dispatch of each subcommand to its workflow

pub mod report;

use crate::config::Settings;
use crate::docker::DockerRuntime;
use crate::events::{EventBus, EventEmitter, TerminalSink};
use crate::git::GitSourceControl;
use crate::models::Project;
use crate::provision::{self, Context, Framework, ModuleKind, ModuleProvisioner, ProvisionFailure, ProvisionRequest, Provisioner};
use crate::registry::RegistryStore;
use crate::validation::{self, Validator};
use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

/// Top-level arguments.
#[derive(Parser, Debug)]
#[command(name = "envbox", version)]
#[command(about = "Scaffold containerized development environments", long_about = None)]
pub struct Cli {
    /// Registry file to use instead of the configured one
    #[arg(long, global = true)]
    pub registry: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the registry and shared docker networks
    Init {
        /// Also install the proxy, mysql and mailpit modules
        #[arg(long)]
        quick: bool,
    },
    /// Create a project from a framework scaffold
    New {
        framework: Framework,
        #[arg(long)]
        name: String,
        /// Proxy hostname, e.g. blog.localhost
        #[arg(long)]
        proxy: String,
        #[arg(long)]
        port: Option<u16>,
        /// Extra module (php and nuxt only); repeatable
        #[arg(long = "module", value_enum)]
        modules: Vec<ModuleKind>,
    },
    /// Create a project around an existing git repository
    Clone {
        framework: Framework,
        repo_url: String,
        #[arg(long)]
        proxy: String,
        /// Defaults to the repository name
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long = "module", value_enum)]
        modules: Vec<ModuleKind>,
    },
    /// Manage shared modules
    Module {
        #[command(subcommand)]
        command: ModuleCommand,
    },
    /// Start a registered project and its modules
    Up { name: String },
    /// List registered projects
    List,
    /// Forget a project
    Remove {
        name: String,
        /// Also delete the project directory
        #[arg(long)]
        purge: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ModuleCommand {
    /// Install a shared module
    Add { module: ModuleKind },
}

/// Everything one invocation works with.
struct Services {
    settings: Settings,
    store: RegistryStore,
    runtime: DockerRuntime,
    source: GitSourceControl,
}

impl Services {
    async fn load(registry: Option<PathBuf>) -> Result<Self> {
        let settings = Settings::load()?.with_registry_path(registry);
        let store = RegistryStore::new(&settings.registry_path);
        let runtime = DockerRuntime::new()
            .await
            .context("Failed to connect to Docker; is the daemon running?")?;

        Ok(Self {
            settings,
            store,
            runtime,
            source: GitSourceControl::new(),
        })
    }

    fn context<'a>(&'a self, events: &'a EventEmitter) -> Context<'a> {
        Context {
            store: &self.store,
            runtime: &self.runtime,
            source: &self.source,
            settings: &self.settings,
            events,
        }
    }

    /// Lazily create the registry on first use.
    fn ensure_registry(&self) -> Result<()> {
        self.store
            .create(&self.settings.language, &self.settings.container_runtime)
            .context("Failed to create registry")?;
        Ok(())
    }
}

/// Run one command. `Ok(false)` means a failure that has already been reported.
pub async fn run(cli: Cli) -> Result<bool> {
    let registry = cli.registry;

    match cli.command {
        Command::Init { quick } => {
            let services = Services::load(registry).await?;
            let (events, drain) = EventBus::start(TerminalSink::new());
            let result = provision::initialize(services.context(&events), quick).await;
            events.close();
            drain.wait().await?;
            Ok(finish(result.map(|()| report::initialized(&services.store))))
        }
        Command::New {
            framework,
            name,
            proxy,
            port,
            modules,
        } => {
            let request = ProvisionRequest::new(framework, name, proxy)
                .with_port(port)
                .with_modules(module_names(&modules));
            provision_project(registry, request).await
        }
        Command::Clone {
            framework,
            repo_url,
            proxy,
            name,
            port,
            modules,
        } => {
            let name = name.unwrap_or_else(|| validation::repo_name(&repo_url));
            let request = ProvisionRequest::new(framework, name, proxy)
                .with_port(port)
                .with_modules(module_names(&modules))
                .cloning(repo_url);
            provision_project(registry, request).await
        }
        Command::Module {
            command: ModuleCommand::Add { module },
        } => {
            let services = Services::load(registry).await?;
            services.ensure_registry()?;

            let (events, drain) = EventBus::start(TerminalSink::new());
            let result = ModuleProvisioner::new(services.context(&events))
                .provision(module)
                .await;
            events.close();
            drain.wait().await?;
            Ok(finish(result.map(|m| report::module_added(&m))))
        }
        Command::Up { name } => {
            let services = Services::load(registry).await?;
            let (events, drain) = EventBus::start(TerminalSink::new());
            let result = provision::up(services.context(&events), &name).await;
            events.close();
            drain.wait().await?;
            Ok(finish(result.map(|p| report::project_running(&p))))
        }
        Command::List => {
            let settings = Settings::load()?.with_registry_path(registry);
            let store = RegistryStore::new(&settings.registry_path);
            let projects = if store.exists() {
                store.list_projects()?
            } else {
                Vec::new()
            };
            report::projects(&projects);
            Ok(true)
        }
        Command::Remove { name, purge } => {
            let settings = Settings::load()?.with_registry_path(registry);
            let store = RegistryStore::new(&settings.registry_path);
            let project = store.get_project(&name)?;
            remove_project(&store, &project, purge)?;
            report::project_removed(&project, purge);
            Ok(true)
        }
    }
}

async fn provision_project(registry: Option<PathBuf>, request: ProvisionRequest) -> Result<bool> {
    let services = Services::load(registry).await?;
    services.ensure_registry()?;

    // Advisory checks; the registry insert is what actually guarantees uniqueness
    let validator = Validator::from_store(&services.store, &services.settings.dev_root)?;
    validator.project_name(&request.name)?;
    validator.proxy(&request.proxy)?;
    if let Some(port) = request.port {
        validator.port(port)?;
    }
    if let Some(url) = &request.source {
        validator.git_url(url)?;
    }
    validator.target_absent(&request.name)?;

    let (events, drain) = EventBus::start(TerminalSink::new());
    let result = Provisioner::new(services.context(&events))
        .provision(&request)
        .await;
    events.close();
    drain.wait().await?;

    Ok(finish(result.map(|p| report::project_created(&p))))
}

fn remove_project(store: &RegistryStore, project: &Project, purge: bool) -> Result<()> {
    store.delete_project(&project.container_name)?;
    info!("Removed project {}", project.container_name);

    if purge && project.path.exists() {
        std::fs::remove_dir_all(&project.path)
            .with_context(|| format!("Failed to delete {}", project.path.display()))?;
    }
    Ok(())
}

fn module_names(modules: &[ModuleKind]) -> Vec<String> {
    modules.iter().map(|m| m.name().to_string()).collect()
}

fn finish(result: Result<(), ProvisionFailure>) -> bool {
    match result {
        Ok(()) => true,
        Err(failure) => {
            report::failure(&failure);
            false
        }
    }
}
