// ABOUTME: Boots an already registered project together with the modules it depends on

use super::{Context, ProvisionFailure, StepFailure, BOOT, RESOLVE_DEPENDENCIES};
use crate::events::Step;
use crate::models::Project;
use crate::resolver::DependencyResolver;
use tracing::info;

pub const LOAD_PROJECT: Step = Step::new("load_project", "Load Project");
pub const PROJECT_RUNNING: Step = Step::new("project_running", "Project Running");

/// Boot a registered project after the modules it depends on.
pub async fn up(ctx: Context<'_>, name: &str) -> Result<Project, ProvisionFailure> {
    match start(&ctx, name).await {
        Ok(project) => {
            ctx.events
                .success(PROJECT_RUNNING, format!("{} is running at {}", project.container_name, project.url()))
                .await;
            Ok(project)
        }
        Err(failure) => Err(ctx.fail(failure).await),
    }
}

async fn start(ctx: &Context<'_>, name: &str) -> Result<Project, StepFailure> {
    let events = ctx.events;

    events
        .running(LOAD_PROJECT, format!("Loading project {name}..."))
        .await;
    let project = ctx.check(LOAD_PROJECT, ctx.store.get_project(name)).await?;
    events
        .success(LOAD_PROJECT, format!("Found {} at {}", name, project.path.display()))
        .await;

    events
        .running(RESOLVE_DEPENDENCIES, "Starting modules...")
        .await;
    let result = DependencyResolver::new(ctx.store, ctx.runtime)
        .resolve(&project.modules)
        .await;
    let started = ctx.check(RESOLVE_DEPENDENCIES, result).await?;
    events
        .success(RESOLVE_DEPENDENCIES, format!("{} module(s) running", started.len()))
        .await;

    events
        .running(BOOT, format!("Starting {name} container..."))
        .await;
    let result = ctx.runtime.ensure_running(&project.path).await;
    ctx.check(BOOT, result).await?;
    events.success(BOOT, format!("{name} container started")).await;

    info!("Project {} is up", name);
    Ok(project)
}
