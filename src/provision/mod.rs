// ABOUTME: Provisioning workflows: project pipeline with rollback, shared module setup, init and up
// Every step reports a running event followed by exactly one terminal event on the bus

pub mod frameworks;
pub mod hints;
pub mod modules;
pub mod pipeline;
pub mod rollback;
pub mod up;

pub use frameworks::Framework;
pub use hints::{classify, Hint, HintKind};
pub use modules::{initialize, ModuleKind, ModuleProvisioner};
pub use pipeline::{ProbePolicy, ProvisionRequest, Provisioner};
pub use rollback::RollbackReport;
pub use up::up;

use crate::config::Settings;
use crate::docker::{ContainerRuntime, RuntimeError};
use crate::events::{EventEmitter, Step};
use crate::git::{CloneError, SourceControl};
use crate::registry::{RegistryError, RegistryStore};
use crate::resolver::ResolveError;
use crate::template::TemplateError;
use crate::validation::ValidationError;
use thiserror::Error;
use tracing::error;

pub const CHECK_TARGET: Step = Step::new("check_target_path", "Check Target Path");
pub const REGISTER_PROJECT: Step = Step::new("register_project", "Register Project");
pub const CLONE_SCAFFOLD: Step = Step::new("clone_scaffold_repository", "Clone Scaffold Repository");
pub const CONFIGURE: Step = Step::new("set_up_environment_variables", "Set Up Environment Variables");
pub const RESOLVE_DEPENDENCIES: Step = Step::new("resolve_dependencies", "Resolve Dependencies");
pub const CLONE_SOURCE: Step = Step::new("clone_project_repository", "Clone Project Repository");
pub const BOOT: Step = Step::new("boot_container", "Boot Container");
pub const BOOTSTRAP: Step = Step::new("bootstrap_application", "Bootstrap Application");
pub const DESCRIPTOR: Step = Step::new("create_devcontainer_settings", "Create Devcontainer Settings");
pub const SETUP_COMPLETE: Step = Step::new("setup_complete", "Setup Complete");
pub const FAILURE_HINT: Step = Step::new("failure_hint", "Failure Hint");

/// Every way a workflow step can fail.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Clone(#[from] CloneError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("{0} does not support cloning an existing repository")]
    CloneUnsupported(Framework),
    #[error("cannot derive a database name from '{0}'")]
    InvalidDatabaseName(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a failed workflow: the original error, where it happened, what
/// to try next, and what cleanup achieved.
#[derive(Error, Debug)]
#[error("{step} failed: {error}")]
pub struct ProvisionFailure {
    pub error: ProvisionError,
    pub step: &'static str,
    pub hint: Hint,
    /// `None` when the failure happened before anything needed undoing
    pub rollback: Option<RollbackReport>,
}

/// Collaborators shared by every workflow of one invocation.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub store: &'a RegistryStore,
    pub runtime: &'a dyn ContainerRuntime,
    pub source: &'a dyn SourceControl,
    pub settings: &'a Settings,
    pub events: &'a EventEmitter,
}

pub(crate) struct StepFailure {
    pub step: Step,
    pub error: ProvisionError,
}

impl Context<'_> {
    /// Emit the step's error event when `result` failed.
    pub(crate) async fn check<T, E>(&self, step: Step, result: Result<T, E>) -> Result<T, StepFailure>
    where
        E: Into<ProvisionError>,
    {
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                let error = e.into();
                self.events.error(step, error.to_string()).await;
                Err(StepFailure { step, error })
            }
        }
    }

    /// Classify the failure and report the hint on the bus.
    pub(crate) async fn hint_for(&self, failure: &StepFailure) -> Hint {
        error!("{} failed: {}", failure.step.key, failure.error);
        let hint = classify(&failure.error.to_string());
        self.events.info(FAILURE_HINT, hint.headline).await;
        hint
    }

    pub(crate) async fn fail(&self, failure: StepFailure) -> ProvisionFailure {
        let hint = self.hint_for(&failure).await;
        ProvisionFailure {
            error: failure.error,
            step: failure.step.key,
            hint,
            rollback: None,
        }
    }
}
