// ABOUTME: Catalog of supported frameworks: scaffold repositories, modules, env values and bootstrap commands

use crate::models::ProvisionMode;
use crate::template::Replacements;
use clap::ValueEnum;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

pub const PROXY_MODULE: &str = "proxy";
pub const MYSQL_MODULE: &str = "mysql";
pub const MAILPIT_MODULE: &str = "mailpit";

/// Compose service of the shared database module.
pub const DATABASE_SERVICE: &str = "my_database";
const DATABASE_ROOT_FLAGS: [&str; 2] = ["-uroot", "-prootpw"];

lazy_static! {
    static ref DATABASE_NAME: Regex = Regex::new(r"^[A-Za-z0-9_]+$").expect("valid database name pattern");
}

/// Supported project stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Framework {
    Laravel,
    Wordpress,
    Php,
    Nuxt,
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which container a bootstrap command runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Project,
    Database,
}

/// One unit of framework bootstrap work, interpreted by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapAction {
    Exec {
        service: Service,
        command: &'static str,
        args: Vec<String>,
    },
    /// Re-apply `.env` substitutions after the source layout changed
    RewriteEnv(Replacements),
    Reboot,
    WaitForDatabase,
}

fn exec(service: Service, command: &'static str, args: &[&str]) -> BootstrapAction {
    BootstrapAction::Exec {
        service,
        command,
        args: args.iter().map(|a| (*a).to_string()).collect(),
    }
}

/// Values substituted into a project's `.env`.
#[derive(Debug, Clone)]
pub struct EnvContext<'a> {
    pub name: &'a str,
    pub proxy: &'a str,
    pub timezone: &'a str,
    pub mode: ProvisionMode,
}

impl Framework {
    /// Identifier stored in the registry.
    pub fn name(self) -> &'static str {
        match self {
            Framework::Laravel => "laravel",
            Framework::Wordpress => "wordpress",
            Framework::Php => "php",
            Framework::Nuxt => "nuxt",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Framework::Laravel => "Laravel",
            Framework::Wordpress => "WordPress",
            Framework::Php => "PHP",
            Framework::Nuxt => "Nuxt",
        }
    }

    /// Language recorded next to the framework.
    pub fn lang(self) -> &'static str {
        match self {
            Framework::Laravel | Framework::Wordpress | Framework::Php => "php",
            Framework::Nuxt => "node",
        }
    }

    /// Boilerplate repository cloned into the target path.
    pub fn scaffold_repo(self) -> &'static str {
        match self {
            Framework::Laravel => "docker_laravel",
            Framework::Wordpress => "docker_wordpress",
            Framework::Php => "docker_php",
            Framework::Nuxt => "docker_nodejs",
        }
    }

    /// Exact string in `devcontainer.json.example` replaced by the project name.
    pub fn descriptor_placeholder(self) -> &'static str {
        match self {
            Framework::Laravel => r#""name": "project_repository","#,
            Framework::Wordpress => r#""name": "my wordpress","#,
            Framework::Php => r#""name": "my php","#,
            Framework::Nuxt => r#""name": "nodejs project","#,
        }
    }

    /// WordPress only supports fresh scaffolds.
    pub fn supports_clone(self) -> bool {
        !matches!(self, Framework::Wordpress)
    }

    /// Module list recorded on the project. Laravel and WordPress use a fixed
    /// set; the others get the proxy plus whatever the user selected.
    pub fn modules(self, selected: &[String]) -> Vec<String> {
        match self {
            Framework::Laravel | Framework::Wordpress => {
                vec![PROXY_MODULE.into(), MYSQL_MODULE.into(), MAILPIT_MODULE.into()]
            }
            Framework::Php | Framework::Nuxt => {
                let mut modules = vec![PROXY_MODULE.to_string()];
                for module in selected {
                    if !modules.contains(module) {
                        modules.push(module.clone());
                    }
                }
                modules
            }
        }
    }

    /// Values written into the project `.env`, in substitution order.
    pub fn env_replacements(self, ctx: &EnvContext<'_>) -> Replacements {
        let source = match ctx.mode {
            ProvisionMode::New => "src".to_string(),
            ProvisionMode::Clone => source_subpath(ctx.name),
        };

        match self {
            Framework::Laravel => Replacements::new()
                .env("CONTAINER_NAME", ctx.name)
                .env("REPOSITORY", &source)
                .env("DOCKER_PATH", "Infra/php")
                .env("VIRTUAL_HOST", ctx.proxy)
                .env("TZ", ctx.timezone),
            Framework::Wordpress => Replacements::new()
                .env("MY_WORDPRESS_DB", database_name(ctx.name).unwrap_or_default())
                .env("CONTAINER_NAME", ctx.name)
                .env("VIRTUAL_HOST", ctx.proxy),
            Framework::Php => Replacements::new()
                .env("REPOSITORY_PATH", &source)
                .env("CONTAINER_NAME", ctx.name)
                .env("VIRTUAL_HOST", ctx.proxy)
                .env("TZ", ctx.timezone),
            Framework::Nuxt => Replacements::new()
                .env("CONTAINER_NAME", ctx.name)
                .env("REPOSITORY", &source)
                .env("DOCKER_PATH", "Infra")
                .env("VIRTUAL_HOST", ctx.proxy)
                .env("VIRTUAL_PORT", "3000"),
        }
    }

    /// Commands run inside the booted containers. Empty means the step is skipped.
    pub fn bootstrap(self, mode: ProvisionMode, name: &str, has_composer_manifest: bool) -> Vec<BootstrapAction> {
        use Service::{Database, Project};

        match (self, mode) {
            (Framework::Laravel, ProvisionMode::New) => vec![
                exec(Project, "laravel", &["new", name, "--no-interaction", "--phpunit", "--database=sqlite"]),
                BootstrapAction::RewriteEnv(repository_rewrite(name)),
                BootstrapAction::Reboot,
                exec(Project, "composer", &["install"]),
            ],
            (Framework::Laravel, ProvisionMode::Clone) => vec![
                exec(Project, "composer", &["install"]),
                exec(Project, "php", &["-r", "file_exists('.env') || copy('.env.example', '.env');"]),
                exec(Project, "php", &["artisan", "key:generate"]),
            ],
            (Framework::Nuxt, ProvisionMode::New) => vec![
                exec(
                    Project,
                    "npm",
                    &["create", "nuxt@latest", name, "--", "--packageManager", "npm", "--no-gitInit", "--no-modules"],
                ),
                BootstrapAction::RewriteEnv(repository_rewrite(name)),
                BootstrapAction::Reboot,
            ],
            (Framework::Nuxt, ProvisionMode::Clone) => vec![exec(Project, "npm", &["install"])],
            (Framework::Php, ProvisionMode::Clone) if has_composer_manifest => {
                vec![exec(Project, "composer", &["install"])]
            }
            (Framework::Php, _) => Vec::new(),
            (Framework::Wordpress, _) => {
                let Some(db) = database_name(name) else {
                    return Vec::new();
                };
                let statement = format!("CREATE DATABASE IF NOT EXISTS `{db}`");
                let mut args: Vec<&str> = DATABASE_ROOT_FLAGS.to_vec();
                args.extend(["-e", statement.as_str()]);
                vec![BootstrapAction::WaitForDatabase, exec(Database, "mysql", &args)]
            }
        }
    }

    pub fn bootstrap_message(self, mode: ProvisionMode) -> &'static str {
        match (self, mode) {
            (Framework::Wordpress, _) => "Creating WordPress database...",
            (_, ProvisionMode::New) => "Generating application...",
            (_, ProvisionMode::Clone) => "Installing dependencies...",
        }
    }
}

/// Where a project's source lives inside its scaffold.
pub fn source_subpath(name: &str) -> String {
    format!("src/{name}")
}

fn repository_rewrite(name: &str) -> Replacements {
    Replacements::new().literal("REPOSITORY=src", format!("REPOSITORY={}", source_subpath(name)))
}

/// Arguments of the readiness probe against the shared database.
pub fn database_probe_args() -> Vec<String> {
    ["ping", "-h", "localhost"]
        .into_iter()
        .chain(DATABASE_ROOT_FLAGS)
        .map(str::to_string)
        .collect()
}

/// Database name derived from a project name: `-` becomes `_`, backticks are
/// dropped, and anything outside `[A-Za-z0-9_]` is rejected.
pub fn database_name(name: &str) -> Option<String> {
    let db = name.replace('-', "_").replace('`', "");
    DATABASE_NAME.is_match(&db).then_some(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ctx(mode: ProvisionMode) -> EnvContext<'static> {
        EnvContext {
            name: "blog",
            proxy: "blog.localhost",
            timezone: "Asia/Tokyo",
            mode,
        }
    }

    fn pairs(r: &Replacements) -> Vec<(String, String)> {
        r.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_fixed_and_selected_modules() {
        let selected = vec!["mysql".to_string(), "proxy".to_string()];

        assert_eq!(Framework::Laravel.modules(&selected), vec!["proxy", "mysql", "mailpit"]);
        assert_eq!(Framework::Php.modules(&selected), vec!["proxy", "mysql"]);
        assert_eq!(Framework::Nuxt.modules(&[]), vec!["proxy"]);
    }

    #[test]
    fn test_laravel_env_depends_on_mode() {
        let new = pairs(&Framework::Laravel.env_replacements(&ctx(ProvisionMode::New)));
        let clone = pairs(&Framework::Laravel.env_replacements(&ctx(ProvisionMode::Clone)));

        assert!(new.contains(&("REPOSITORY=".into(), "REPOSITORY=src".into())));
        assert!(clone.contains(&("REPOSITORY=".into(), "REPOSITORY=src/blog".into())));
        assert!(new.contains(&("TZ=".into(), "TZ=Asia/Tokyo".into())));
    }

    #[test]
    fn test_wordpress_env_carries_database_name() {
        let env = Framework::Wordpress.env_replacements(&EnvContext {
            name: "my-site",
            ..ctx(ProvisionMode::New)
        });

        assert!(pairs(&env).contains(&("MY_WORDPRESS_DB=".into(), "MY_WORDPRESS_DB=my_site".into())));
    }

    #[test]
    fn test_laravel_new_bootstrap_rewrites_and_reboots() {
        let actions = Framework::Laravel.bootstrap(ProvisionMode::New, "blog", false);

        assert_eq!(actions.len(), 4);
        assert_eq!(actions[2], BootstrapAction::Reboot);
        match &actions[1] {
            BootstrapAction::RewriteEnv(r) => {
                assert_eq!(pairs(r), vec![("REPOSITORY=src".into(), "REPOSITORY=src/blog".into())]);
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_php_bootstrap_depends_on_manifest() {
        assert!(Framework::Php.bootstrap(ProvisionMode::New, "shop", true).is_empty());
        assert!(Framework::Php.bootstrap(ProvisionMode::Clone, "shop", false).is_empty());
        assert_eq!(Framework::Php.bootstrap(ProvisionMode::Clone, "shop", true).len(), 1);
    }

    #[test]
    fn test_wordpress_bootstrap_creates_database() {
        let actions = Framework::Wordpress.bootstrap(ProvisionMode::New, "my-site", false);

        assert_eq!(actions[0], BootstrapAction::WaitForDatabase);
        match &actions[1] {
            BootstrapAction::Exec { service, command, args } => {
                assert_eq!(*service, Service::Database);
                assert_eq!(*command, "mysql");
                assert_eq!(args.last().unwrap(), "CREATE DATABASE IF NOT EXISTS `my_site`");
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_database_name_sanitizing() {
        assert_eq!(database_name("my-blog").as_deref(), Some("my_blog"));
        assert_eq!(database_name("a`b").as_deref(), Some("ab"));
        assert_eq!(database_name("bad name"), None);
        assert_eq!(database_name(""), None);
    }

    #[test]
    fn test_wordpress_cannot_clone() {
        assert!(!Framework::Wordpress.supports_clone());
        assert!(Framework::Nuxt.supports_clone());
    }
}
