// ABOUTME: JSON-file registry store with whole-document load/mutate/overwrite semantics
// No locking: concurrent writers race and the last save wins

use super::RegistryError;
use crate::models::{Module, Project, RegistryDocument};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

static SAVE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Handle on the JSON registry file. Every call reads or writes the whole document.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    /// No I/O happens until the first call.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Create an empty registry if none exists yet, returning the current document.
    pub fn create(
        &self,
        language: &str,
        container_runtime: &str,
    ) -> Result<RegistryDocument, RegistryError> {
        if self.exists() {
            return self.load();
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let doc = RegistryDocument::new(language, container_runtime);
        self.save(&doc)?;
        info!("Created registry at {}", self.path.display());
        Ok(doc)
    }

    /// Read and parse the registry. `NotFound` if it was never created.
    pub fn load(&self) -> Result<RegistryDocument, RegistryError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RegistryError::NotFound(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(serde_json::from_str(&content)?)
    }

    /// Rewrite the whole document. The JSON goes to a sibling temp file that
    /// is renamed over the registry, so a failed write never truncates it.
    pub fn save(&self, doc: &RegistryDocument) -> Result<(), RegistryError> {
        let json = serde_json::to_string_pretty(doc)?;
        let tmp = self.temp_path();

        if let Err(e) = fs::write(&tmp, json).and_then(|()| fs::rename(&tmp, &self.path)) {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove {}: {}", tmp.display(), cleanup);
                }
            }
            return Err(e.into());
        }

        debug!("Saved registry with {} projects and {} modules", doc.projects.len(), doc.modules.len());
        Ok(())
    }

    // Unique per process and per call
    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map_or_else(|| "registry".into(), |n| n.to_string_lossy().into_owned());
        let n = SAVE_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.path
            .with_file_name(format!(".{file_name}.{}.{n}.tmp", std::process::id()))
    }

    /// Insert `project`, rejecting a taken name or proxy hostname.
    pub fn add_project(&self, project: Project) -> Result<(), RegistryError> {
        let mut doc = self.load()?;

        if doc.projects.contains_key(&project.container_name) {
            return Err(RegistryError::ProjectExists(project.container_name));
        }

        if let Some(owner) = doc.proxy_owner(&project.container_proxy) {
            return Err(RegistryError::ProxyInUse {
                proxy: project.container_proxy.clone(),
                owner: owner.container_name.clone(),
            });
        }

        info!("Registering project {}", project.container_name);
        doc.projects.insert(project.container_name.clone(), project);
        self.save(&doc)
    }

    pub fn add_module(&self, module: Module) -> Result<(), RegistryError> {
        let mut doc = self.load()?;

        if doc.modules.contains_key(&module.name) {
            return Err(RegistryError::ModuleExists(module.name));
        }

        info!("Registering module {}", module.name);
        doc.modules.insert(module.name.clone(), module);
        self.save(&doc)
    }

    pub fn get_project(&self, name: &str) -> Result<Project, RegistryError> {
        self.load()?
            .projects
            .remove(name)
            .ok_or_else(|| RegistryError::ProjectNotFound(name.to_string()))
    }

    pub fn get_module(&self, name: &str) -> Result<Module, RegistryError> {
        self.load()?
            .modules
            .remove(name)
            .ok_or_else(|| RegistryError::ModuleNotFound(name.to_string()))
    }

    /// Projects ordered by name.
    pub fn list_projects(&self) -> Result<Vec<Project>, RegistryError> {
        Ok(self.load()?.projects.into_values().collect())
    }

    /// Removing an absent project is a no-op.
    pub fn delete_project(&self, name: &str) -> Result<(), RegistryError> {
        let mut doc = self.load()?;
        if doc.projects.remove(name).is_some() {
            info!("Removed project {} from registry", name);
            self.save(&doc)?;
        }
        Ok(())
    }

    pub fn delete_module(&self, name: &str) -> Result<(), RegistryError> {
        let mut doc = self.load()?;
        if doc.modules.remove(name).is_some() {
            info!("Removed module {} from registry", name);
            self.save(&doc)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> RegistryStore {
        let store = RegistryStore::new(dir.path().join("envbox").join("config.json"));
        store.create("en", "docker").unwrap();
        store
    }

    #[test]
    fn test_load_missing_registry_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = RegistryStore::new(dir.path().join("config.json"));

        assert!(matches!(store.load(), Err(RegistryError::NotFound(_))));
    }

    #[test]
    fn test_save_leaves_only_the_registry_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.add_project(Project::new("blog", "blog.localhost", "/srv/blog")).unwrap();
        store.add_module(Module::new("proxy", "/srv/proxy")).unwrap();

        let entries: Vec<String> = fs::read_dir(dir.path().join("envbox"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();

        assert_eq!(entries, vec!["config.json"]);
        assert!(store.get_project("blog").is_ok());
    }

    #[test]
    fn test_failed_save_cleans_up_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();
        let store = RegistryStore::new(&path);

        let result = store.save(&RegistryDocument::new("en", "docker"));

        assert!(matches!(result, Err(RegistryError::Io(_))));
        let entries: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec!["config.json"]);
        assert!(path.join("keep").is_file());
    }

    #[test]
    fn test_create_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.add_module(Module::new("proxy", "/srv/proxy")).unwrap();

        let doc = store.create("ja", "podman").unwrap();

        assert_eq!(doc.language, "en");
        assert!(doc.modules.contains_key("proxy"));
    }

    #[test]
    fn test_add_project_rejects_duplicate_name() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.add_project(Project::new("blog", "blog.localhost", "/a")).unwrap();

        let err = store
            .add_project(Project::new("blog", "other.localhost", "/b"))
            .unwrap_err();

        assert!(matches!(err, RegistryError::ProjectExists(ref n) if n == "blog"));
        assert!(err.is_already_exists());
    }

    #[test]
    fn test_add_module_rejects_duplicate_name() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.add_module(Module::new("mysql", "/srv/mysql")).unwrap();

        let err = store.add_module(Module::new("mysql", "/elsewhere")).unwrap_err();

        assert!(matches!(err, RegistryError::ModuleExists(_)));
        assert_eq!(store.get_module("mysql").unwrap().path, PathBuf::from("/srv/mysql"));
    }

    #[test]
    fn test_get_missing_entries_fail() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(matches!(store.get_project("nope"), Err(RegistryError::ProjectNotFound(_))));
        assert!(matches!(store.get_module("nope"), Err(RegistryError::ModuleNotFound(_))));
    }

    #[test]
    fn test_delete_absent_entries_is_noop() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(store.delete_project("ghost").is_ok());
        assert!(store.delete_module("ghost").is_ok());
    }

    #[test]
    fn test_delete_project_keeps_modules() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.add_module(Module::new("proxy", "/srv/proxy")).unwrap();
        store
            .add_project(Project::new("blog", "blog.localhost", "/a").with_modules(["proxy"]))
            .unwrap();

        store.delete_project("blog").unwrap();

        let doc = store.load().unwrap();
        assert!(doc.projects.is_empty());
        assert_eq!(doc.modules.len(), 1);
    }

    #[test]
    fn test_list_projects_sorted_by_name() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.add_project(Project::new("zeta", "zeta.localhost", "/z")).unwrap();
        store.add_project(Project::new("alpha", "alpha.localhost", "/a")).unwrap();

        let names: Vec<String> = store
            .list_projects()
            .unwrap()
            .into_iter()
            .map(|p| p.container_name)
            .collect();

        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
