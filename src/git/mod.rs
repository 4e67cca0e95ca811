// ABOUTME: Source control integration for cloning scaffold templates and project sources

pub mod clone;

pub use clone::{CloneError, GitSourceControl, SourceControl};
