// ABOUTME: Library crate for envbox exposing the provisioning core for the binary and tests

//! Scaffolds containerized development environments and tracks them in a
//! JSON registry.

pub mod cli;
pub mod config;
pub mod docker;
pub mod events;
pub mod git;
pub mod models;
/// Project, module, init and up workflows.
pub mod provision;
pub mod registry;
/// Boots the modules a project depends on.
pub mod resolver;
/// `.env` materialization and literal file substitution.
pub mod template;
pub mod validation;
