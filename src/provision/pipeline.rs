// ABOUTME: Project provisioning pipeline: precondition, register, clone, configure, resolve, boot, bootstrap, finalize
// Any failure after registration rolls back the registry entry and the target directory

use super::frameworks::{self, BootstrapAction, EnvContext, Framework, Service, DATABASE_SERVICE};
use super::rollback::rollback_project;
use super::{
    Context, ProvisionError, ProvisionFailure, StepFailure, BOOT, BOOTSTRAP, CHECK_TARGET, CLONE_SCAFFOLD,
    CLONE_SOURCE, CONFIGURE, DESCRIPTOR, REGISTER_PROJECT, RESOLVE_DEPENDENCIES, SETUP_COMPLETE,
};
use crate::models::{Project, ProvisionMode, OPTION_PORT, OPTION_REPO, OPTION_TYPE};
use crate::resolver::DependencyResolver;
use crate::template::{self, Replacements, TemplateError, ENV_FILE};
use crate::validation;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const DEVCONTAINER_DIR: &str = ".devcontainer";
const DESCRIPTOR_FILE: &str = "devcontainer.json";
const DESCRIPTOR_EXAMPLE_FILE: &str = "devcontainer.json.example";
const COMPOSER_MANIFEST: &str = "composer.json";

/// Readiness probing of the shared database before WordPress bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            attempts: 15,
            interval: Duration::from_secs(2),
        }
    }
}

/// Everything needed to provision one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    pub framework: Framework,
    pub name: String,
    pub proxy: String,
    pub port: Option<u16>,
    /// Extra modules; ignored by frameworks with a fixed module set
    pub modules: Vec<String>,
    /// External repository cloned into the scaffold (clone variant)
    pub source: Option<String>,
}

impl ProvisionRequest {
    pub fn new(framework: Framework, name: impl Into<String>, proxy: impl Into<String>) -> Self {
        Self {
            framework,
            name: name.into(),
            proxy: proxy.into(),
            port: None,
            modules: Vec::new(),
            source: None,
        }
    }

    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    /// Extra modules for php and nuxt; ignored by the other frameworks.
    pub fn with_modules(mut self, modules: Vec<String>) -> Self {
        self.modules = modules;
        self
    }

    /// Build around an existing repository instead of a fresh scaffold.
    pub fn cloning(mut self, url: impl Into<String>) -> Self {
        self.source = Some(url.into());
        self
    }

    pub fn mode(&self) -> ProvisionMode {
        if self.source.is_some() {
            ProvisionMode::Clone
        } else {
            ProvisionMode::New
        }
    }

    fn project(&self, path: PathBuf) -> Project {
        let mut project = Project::new(&self.name, &self.proxy, path)
            .with_stack(self.framework.lang(), self.framework.name())
            .with_modules(self.framework.modules(&self.modules))
            .with_option(OPTION_TYPE, self.mode().as_str());

        if let Some(url) = &self.source {
            project = project.with_option(OPTION_REPO, url);
        }
        if let Some(port) = self.port {
            project = project.with_option(OPTION_PORT, port.to_string());
        }
        project
    }
}

/// Runs the project pipeline and rolls back on failure.
pub struct Provisioner<'a> {
    ctx: Context<'a>,
    probe: ProbePolicy,
}

impl<'a> Provisioner<'a> {
    pub fn new(ctx: Context<'a>) -> Self {
        Self {
            ctx,
            probe: ProbePolicy::default(),
        }
    }

    /// Override how long to wait for the database to answer.
    pub fn with_probe_policy(mut self, probe: ProbePolicy) -> Self {
        self.probe = probe;
        self
    }

    /// Run the whole pipeline for `request`, returning the registered project.
    pub async fn provision(&self, request: &ProvisionRequest) -> Result<Project, ProvisionFailure> {
        let target = self.ctx.settings.dev_root.join(&request.name);
        info!(
            "Provisioning {} project {} ({}) at {}",
            request.framework,
            request.name,
            request.mode().as_str(),
            target.display()
        );

        if let Err(failure) = self.check_preconditions(request, &target).await {
            return Err(self.ctx.fail(failure).await);
        }

        let project = request.project(target);

        // A failed insert leaves nothing of ours to undo
        if let Err(failure) = self.register(&project).await {
            return Err(self.ctx.fail(failure).await);
        }

        if let Err(failure) = self.build(request, &project).await {
            let hint = self.ctx.hint_for(&failure).await;
            let report = rollback_project(&self.ctx, &project.container_name, &project.path).await;
            return Err(ProvisionFailure {
                error: failure.error,
                step: failure.step.key,
                hint,
                rollback: Some(report),
            });
        }

        self.ctx
            .events
            .success(
                SETUP_COMPLETE,
                format!("{} setup completed successfully", request.framework.display_name()),
            )
            .await;
        info!("Project {} provisioned", project.container_name);
        Ok(project)
    }

    async fn check_preconditions(&self, request: &ProvisionRequest, target: &Path) -> Result<(), StepFailure> {
        let events = self.ctx.events;
        events.running(CHECK_TARGET, "Checking target path...").await;

        let result = if request.mode() == ProvisionMode::Clone && !request.framework.supports_clone() {
            Err(ProvisionError::CloneUnsupported(request.framework))
        } else if request.framework == Framework::Wordpress && frameworks::database_name(&request.name).is_none() {
            Err(ProvisionError::InvalidDatabaseName(request.name.clone()))
        } else {
            validation::check_absent(target).map_err(ProvisionError::from)
        };
        self.ctx.check(CHECK_TARGET, result).await?;

        events
            .success(CHECK_TARGET, format!("{} is available", target.display()))
            .await;
        Ok(())
    }

    async fn register(&self, project: &Project) -> Result<(), StepFailure> {
        let events = self.ctx.events;
        events
            .running(REGISTER_PROJECT, format!("Registering project {}...", project.container_name))
            .await;

        let result = self.ctx.store.add_project(project.clone());
        self.ctx.check(REGISTER_PROJECT, result).await?;

        events
            .success(REGISTER_PROJECT, format!("Project {} registered", project.container_name))
            .await;
        Ok(())
    }

    /// Steps 3 to 8. Every failure here is rolled back by the caller.
    async fn build(&self, request: &ProvisionRequest, project: &Project) -> Result<(), StepFailure> {
        let ctx = &self.ctx;
        let events = ctx.events;
        let framework = request.framework;
        let mode = request.mode();
        let name = project.container_name.as_str();
        let target = project.path.as_path();

        // Clone scaffold
        events
            .running(CLONE_SCAFFOLD, format!("Cloning {} repository...", framework.display_name()))
            .await;
        let url = ctx.settings.scaffold_url(framework.scaffold_repo());
        let result = ctx.source.clone_repo(&url, target).await;
        ctx.check(CLONE_SCAFFOLD, result).await?;
        events
            .success(CLONE_SCAFFOLD, format!("{} repository cloned successfully", framework.display_name()))
            .await;

        // Configure
        events.running(CONFIGURE, "Setting up environment variables...").await;
        let env = EnvContext {
            name,
            proxy: &project.container_proxy,
            timezone: &ctx.settings.timezone,
            mode,
        };
        let result = configure(target, &framework.env_replacements(&env));
        ctx.check(CONFIGURE, result).await?;
        events.success(CONFIGURE, "Environment variables set up successfully").await;

        // Resolve dependencies
        events
            .running(RESOLVE_DEPENDENCIES, "Resolving dependencies and booting modules...")
            .await;
        let result = DependencyResolver::new(ctx.store, ctx.runtime)
            .resolve(&project.modules)
            .await;
        let started = ctx.check(RESOLVE_DEPENDENCIES, result).await?;
        let started: Vec<&str> = started.iter().map(|m| m.name.as_str()).collect();
        events
            .success(RESOLVE_DEPENDENCIES, format!("Modules running: {}", started.join(", ")))
            .await;

        // Clone the user's repository into the scaffold
        let source_dir = target.join(frameworks::source_subpath(name));
        if let Some(url) = &request.source {
            events
                .running(CLONE_SOURCE, format!("Cloning {url}..."))
                .await;
            let result = ctx.source.clone_repo(url, &source_dir).await;
            ctx.check(CLONE_SOURCE, result).await?;
            events
                .success(CLONE_SOURCE, "Project repository cloned successfully")
                .await;
        }

        // Boot
        events
            .running(BOOT, format!("Starting {name} container..."))
            .await;
        let result = ctx.runtime.ensure_running(target).await;
        ctx.check(BOOT, result).await?;
        events.success(BOOT, format!("{name} container started")).await;

        // Bootstrap
        let has_manifest = source_dir.join(COMPOSER_MANIFEST).is_file();
        let actions = framework.bootstrap(mode, name, has_manifest);
        if actions.is_empty() {
            events
                .skipped(BOOTSTRAP, format!("No bootstrap needed for {}", framework.display_name()))
                .await;
        } else {
            events.running(BOOTSTRAP, framework.bootstrap_message(mode)).await;
            for action in &actions {
                let result = self.run_action(project, action).await;
                ctx.check(BOOTSTRAP, result).await?;
            }
            events
                .success(BOOTSTRAP, format!("{} application ready", framework.display_name()))
                .await;
        }

        // Finalize workspace descriptor
        events
            .running(DESCRIPTOR, "Creating devcontainer settings...")
            .await;
        let result = write_descriptor(target, framework.descriptor_placeholder(), name);
        ctx.check(DESCRIPTOR, result).await?;
        events
            .success(DESCRIPTOR, "Devcontainer settings created successfully")
            .await;

        Ok(())
    }

    async fn run_action(&self, project: &Project, action: &BootstrapAction) -> Result<(), ProvisionError> {
        let runtime = self.ctx.runtime;

        match action {
            BootstrapAction::Exec { service, command, args } => {
                let service = match service {
                    Service::Project => project.container_name.as_str(),
                    Service::Database => DATABASE_SERVICE,
                };
                info!("Running {} {} in {}", command, args.join(" "), service);
                let output = runtime.exec(service, command, args).await?;
                debug!("{} output: {}", command, output.trim());
            }
            BootstrapAction::RewriteEnv(replacements) => {
                template::rewrite_file(&project.path.join(ENV_FILE), replacements)?;
            }
            BootstrapAction::Reboot => {
                runtime.ensure_running(&project.path).await?;
            }
            BootstrapAction::WaitForDatabase => self.wait_for_database().await,
        }
        Ok(())
    }

    /// Probe until the database answers or attempts run out. An unready
    /// database surfaces as the failure of the next command.
    async fn wait_for_database(&self) {
        let args = frameworks::database_probe_args();

        for attempt in 1..=self.probe.attempts {
            match self.ctx.runtime.exec(DATABASE_SERVICE, "mysqladmin", &args).await {
                Ok(_) => {
                    debug!("Database ready after {} attempt(s)", attempt);
                    return;
                }
                Err(e) => debug!("Database not ready (attempt {}): {}", attempt, e),
            }
            tokio::time::sleep(self.probe.interval).await;
        }

        warn!("Database did not answer after {} attempts", self.probe.attempts);
    }
}

fn configure(target: &Path, replacements: &Replacements) -> Result<(), TemplateError> {
    template::materialize_env(target)?;
    template::rewrite_file(&target.join(ENV_FILE), replacements)?;
    Ok(())
}

fn write_descriptor(target: &Path, placeholder: &str, name: &str) -> Result<(), TemplateError> {
    let dir = target.join(DEVCONTAINER_DIR);
    let descriptor = dir.join(DESCRIPTOR_FILE);
    template::copy_file(&dir.join(DESCRIPTOR_EXAMPLE_FILE), &descriptor)?;

    let replacements = Replacements::new().literal(placeholder, format!(r#""name": "{name}","#));
    if !template::rewrite_file(&descriptor, &replacements)? {
        debug!("Placeholder {} not found in {}, descriptor left as copied", placeholder, descriptor.display());
    }
    Ok(())
}
