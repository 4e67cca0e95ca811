// ABOUTME: Boots a project's shared modules, in declared order, before the project container starts

use crate::docker::{ContainerRuntime, RuntimeError};
use crate::models::Module;
use crate::registry::{RegistryError, RegistryStore};
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("module '{0}' is not registered; run `envbox module add {0}` first")]
    ModuleNotFound(String),
    #[error(transparent)]
    Registry(RegistryError),
    #[error("failed to start module '{module}': {source}")]
    Runtime {
        module: String,
        #[source]
        source: RuntimeError,
    },
}

impl From<RegistryError> for ResolveError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::ModuleNotFound(name) => ResolveError::ModuleNotFound(name),
            other => ResolveError::Registry(other),
        }
    }
}

/// Starts the modules a project depends on.
pub struct DependencyResolver<'a> {
    store: &'a RegistryStore,
    runtime: &'a dyn ContainerRuntime,
}

impl<'a> DependencyResolver<'a> {
    /// Borrow the registry for lookups and the runtime for boots.
    pub fn new(store: &'a RegistryStore, runtime: &'a dyn ContainerRuntime) -> Self {
        Self { store, runtime }
    }

    /// Start each module in order, stopping at the first failure.
    ///
    /// Modules started before a failure keep running. Returns the modules started.
    pub async fn resolve(&self, modules: &[String]) -> Result<Vec<Module>, ResolveError> {
        let mut started = Vec::with_capacity(modules.len());

        for name in modules {
            let module = self.store.get_module(name)?;

            info!("Starting module {} at {}", module.name, module.path.display());
            if let Err(source) = self.runtime.ensure_running(&module.path).await {
                error!("Module {} failed to start: {}", module.name, source);
                return Err(ResolveError::Runtime {
                    module: module.name,
                    source,
                });
            }

            started.push(module);
        }

        Ok(started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docker::MockContainerRuntime;
    use mockall::Sequence;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn store_with_modules(dir: &TempDir, names: &[&str]) -> RegistryStore {
        let store = RegistryStore::new(dir.path().join("config.json"));
        store.create("en", "docker").unwrap();
        for name in names {
            store
                .add_module(Module::new(*name, PathBuf::from("/srv").join(name)))
                .unwrap();
        }
        store
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_modules_start_in_declared_order() {
        let dir = TempDir::new().unwrap();
        let store = store_with_modules(&dir, &["a", "b", "c"]);

        let mut runtime = MockContainerRuntime::new();
        let mut seq = Sequence::new();
        for name in ["a", "b", "c"] {
            let expected = PathBuf::from("/srv").join(name);
            runtime
                .expect_ensure_running()
                .withf(move |path: &Path| path == expected.as_path())
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(()));
        }

        let resolver = DependencyResolver::new(&store, &runtime);
        let started = resolver.resolve(&names(&["a", "b", "c"])).await.unwrap();

        let started: Vec<&str> = started.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(started, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_missing_module_stops_before_later_modules() {
        let dir = TempDir::new().unwrap();
        let store = store_with_modules(&dir, &["a", "c"]);

        let mut runtime = MockContainerRuntime::new();
        runtime
            .expect_ensure_running()
            .withf(|path: &Path| path == Path::new("/srv/a"))
            .times(1)
            .returning(|_| Ok(()));
        runtime
            .expect_ensure_running()
            .withf(|path: &Path| path == Path::new("/srv/c"))
            .never();

        let resolver = DependencyResolver::new(&store, &runtime);
        let err = resolver.resolve(&names(&["a", "b", "c"])).await.unwrap_err();

        assert!(matches!(err, ResolveError::ModuleNotFound(ref name) if name == "b"));
    }

    #[tokio::test]
    async fn test_runtime_failure_aborts_resolution() {
        let dir = TempDir::new().unwrap();
        let store = store_with_modules(&dir, &["proxy", "mysql"]);

        let mut runtime = MockContainerRuntime::new();
        runtime
            .expect_ensure_running()
            .withf(|path: &Path| path == Path::new("/srv/proxy"))
            .times(1)
            .returning(|path| {
                Err(RuntimeError::ComposeFailed {
                    path: path.to_path_buf(),
                    output: "port is already allocated".to_string(),
                })
            });
        runtime
            .expect_ensure_running()
            .withf(|path: &Path| path == Path::new("/srv/mysql"))
            .never();

        let resolver = DependencyResolver::new(&store, &runtime);
        let err = resolver.resolve(&names(&["proxy", "mysql"])).await.unwrap_err();

        assert!(matches!(err, ResolveError::Runtime { ref module, .. } if module == "proxy"));
    }

    #[tokio::test]
    async fn test_empty_module_list_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let store = store_with_modules(&dir, &[]);
        let runtime = MockContainerRuntime::new();

        let resolver = DependencyResolver::new(&store, &runtime);

        assert!(resolver.resolve(&[]).await.unwrap().is_empty());
    }
}
