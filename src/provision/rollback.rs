// ABOUTME: Undo of a partially provisioned project: registry entry first, then the target directory
// Cleanup problems are collected as warnings and never replace the original error

use super::Context;
use crate::events::Step;
use std::path::Path;
use tracing::{info, warn};

pub const ROLLBACK_REGISTRY: Step = Step::new("rollback_registry", "Remove Project Entry");
pub const ROLLBACK_WORKSPACE: Step = Step::new("rollback_workspace", "Remove Project Directory");

/// Outcome of cleanup after a failed pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackReport {
    pub warnings: Vec<String>,
}

impl RollbackReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

pub(crate) async fn rollback_project(ctx: &Context<'_>, name: &str, path: &Path) -> RollbackReport {
    let mut report = RollbackReport::default();

    ctx.events
        .running(ROLLBACK_REGISTRY, format!("Removing project {name} from registry..."))
        .await;
    match ctx.store.delete_project(name) {
        Ok(()) => {
            ctx.events
                .success(ROLLBACK_REGISTRY, format!("Project {name} removed from registry"))
                .await;
        }
        Err(e) => {
            let warning = format!("failed to remove project {name} from registry: {e}");
            warn!("{}", warning);
            ctx.events.error(ROLLBACK_REGISTRY, warning.clone()).await;
            report.warnings.push(warning);
        }
    }

    remove_workspace(ctx, path, &mut report).await;
    report
}

pub(crate) async fn remove_workspace(ctx: &Context<'_>, path: &Path, report: &mut RollbackReport) {
    ctx.events
        .running(ROLLBACK_WORKSPACE, format!("Removing {}...", path.display()))
        .await;

    if !path.exists() {
        ctx.events
            .success(ROLLBACK_WORKSPACE, "Nothing to remove")
            .await;
        return;
    }

    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {
            info!("Removed {}", path.display());
            ctx.events
                .success(ROLLBACK_WORKSPACE, format!("Removed {}", path.display()))
                .await;
        }
        Err(e) => {
            let warning = format!("failed to remove {}: {e}", path.display());
            warn!("{}", warning);
            ctx.events.error(ROLLBACK_WORKSPACE, warning.clone()).await;
            report.warnings.push(warning);
        }
    }
}
