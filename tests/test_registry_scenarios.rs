// ABOUTME: Integration tests for registry uniqueness, last-write-wins persistence and env materialization

use envbox::models::{Module, Project, RegistryDocument};
use envbox::registry::{RegistryError, RegistryStore};
use envbox::template::{self, EnvOutcome, Replacements};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn store(dir: &TempDir) -> RegistryStore {
    let store = RegistryStore::new(dir.path().join("envbox").join("config.json"));
    store.create("en", "docker").unwrap();
    store
}

fn project(name: &str, proxy: &str) -> Project {
    Project::new(name, proxy, format!("/dev/{name}")).with_stack("php", "laravel")
}

#[test]
fn test_proxy_collision_keeps_single_project() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);

    store.add_project(project("blog", "blog.localhost")).unwrap();
    let err = store.add_project(project("blog2", "blog.localhost")).unwrap_err();

    assert!(err.to_string().contains("already in use"));
    assert!(err.is_already_exists());
    assert_eq!(store.list_projects().unwrap().len(), 1);
}

#[test]
fn test_names_and_proxies_stay_unique() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);

    let attempts = [
        ("alpha", "alpha.localhost"),
        ("beta", "beta.localhost"),
        ("alpha", "gamma.localhost"),
        ("delta", "beta.localhost"),
        ("gamma", "gamma.localhost"),
    ];
    for (name, proxy) in attempts {
        let _ = store.add_project(project(name, proxy));
    }

    let doc = store.load().unwrap();
    let names: Vec<&str> = doc.projects.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["alpha", "beta", "gamma"]);

    let mut proxies: Vec<&str> = doc.projects.values().map(|p| p.container_proxy.as_str()).collect();
    proxies.sort_unstable();
    proxies.dedup();
    assert_eq!(proxies.len(), doc.projects.len());
}

#[test]
fn test_concurrent_handles_lose_updates() {
    let dir = TempDir::new().unwrap();
    let first = store(&dir);
    let second = RegistryStore::new(first.path());

    let mut doc_a = first.load().unwrap();
    let mut doc_b = second.load().unwrap();

    doc_a.projects.insert("a".into(), project("a", "a.localhost"));
    doc_b.projects.insert("b".into(), project("b", "b.localhost"));

    first.save(&doc_a).unwrap();
    second.save(&doc_b).unwrap();

    let names: Vec<String> = first.list_projects().unwrap().into_iter().map(|p| p.container_name).collect();
    assert_eq!(names, vec!["b"]);
}

#[test]
fn test_document_uses_camel_case_keys() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    store.add_project(project("blog", "blog.localhost")).unwrap();
    store.add_module(Module::new("proxy", "/dev/docker_proxy_network")).unwrap();

    let raw = std::fs::read_to_string(store.path()).unwrap();

    assert!(raw.contains("\"containerName\": \"blog\""));
    assert!(raw.contains("\"containerProxy\": \"blog.localhost\""));
    assert!(raw.contains("\"containerRuntime\": \"docker\""));
}

#[test]
fn test_missing_maps_load_as_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "language": "en", "containerRuntime": "docker" }"#).unwrap();

    let doc = RegistryStore::new(&path).load().unwrap();

    assert_eq!(doc, RegistryDocument::new("en", "docker"));
}

#[test]
fn test_module_lookup_errors() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);

    assert!(matches!(store.get_module("mysql"), Err(RegistryError::ModuleNotFound(_))));
    store.add_module(Module::new("mysql", "/dev/docker_mysql")).unwrap();
    assert!(matches!(
        store.add_module(Module::new("mysql", "/elsewhere")),
        Err(RegistryError::ModuleExists(_))
    ));
}

#[test]
fn test_configure_twice_copies_once() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(".env.example"), "CONTAINER_NAME=\n").unwrap();

    assert_eq!(template::materialize_env(dir.path()).unwrap(), EnvOutcome::Created);
    let env = dir.path().join(".env");
    template::rewrite_file(&env, &Replacements::new().env("CONTAINER_NAME", "blog")).unwrap();

    assert_eq!(template::materialize_env(dir.path()).unwrap(), EnvOutcome::AlreadyPresent);
    assert_eq!(std::fs::read_to_string(env).unwrap(), "CONTAINER_NAME=blog\n");
}
