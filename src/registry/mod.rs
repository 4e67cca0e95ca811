// ABOUTME: Registry of projects and shared modules persisted as a single JSON document
// Owns the uniqueness rules for project names, proxy hostnames and module names

pub mod error;
pub mod store;

pub use error::RegistryError;
pub use store::RegistryStore;
