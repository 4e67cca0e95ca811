// ABOUTME: Core data models for envbox: the registry document, projects, modules and progress events

pub mod event;
pub mod project;

pub use event::{Event, EventStatus};
pub use project::{Module, Project, ProvisionMode, RegistryDocument, OPTION_PORT, OPTION_REPO, OPTION_TYPE};
