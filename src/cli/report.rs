// ABOUTME: Final summaries printed after the event bus has drained

use crate::models::{Module, Project};
use crate::provision::ProvisionFailure;
use crate::registry::RegistryStore;
use colored::Colorize;

/// Summary printed after a project is provisioned.
pub fn project_created(project: &Project) {
    println!();
    println!("{}", format!("✓ {} is ready!", project.container_name).green().bold());
    println!();
    println!("{}", "Next steps:".bold());
    println!("  • Open {} in your editor and reopen it in the container", project.path.display());
    println!("  • Visit {}", project.url().cyan());
}

pub fn project_running(project: &Project) {
    println!();
    println!("{}", format!("✓ {} is running", project.container_name).green().bold());
    println!("  • Visit {}", project.url().cyan());
}

pub fn module_added(module: &Module) {
    println!();
    println!("{}", format!("✓ Module {} installed", module.name).green().bold());
    println!("  • Location: {}", module.path.display());
}

/// Registry location and installed modules after `init`.
pub fn initialized(store: &RegistryStore) {
    println!();
    println!("{}", "✓ envbox is initialized".green().bold());
    println!("  • Registry: {}", store.path().display());
}

pub fn project_removed(project: &Project, purged: bool) {
    println!("{}", format!("✓ Removed {}", project.container_name).green());
    if !purged {
        println!("  • Files kept at {}", project.path.display());
    }
}

/// Table of registered projects, or a hint when there are none.
pub fn projects(projects: &[Project]) {
    if projects.is_empty() {
        println!("No projects registered yet. Create one with `envbox new`.");
        return;
    }

    println!(
        "{}",
        format!("{:<20} {:<10} {:<28} {}", "NAME", "FRAMEWORK", "URL", "PATH").bold()
    );
    for project in projects {
        println!(
            "{:<20} {:<10} {:<28} {}",
            project.container_name,
            project.framework,
            project.url(),
            project.path.display()
        );
    }
}

/// Error block with the failed step, hint actions and rollback warnings.
pub fn failure(failure: &ProvisionFailure) {
    eprintln!();
    eprintln!("{} {}", "✗ Error:".red().bold(), failure.error);
    eprintln!();
    eprintln!("{}", format!("💡 {}", failure.hint.headline).yellow());
    for action in failure.hint.actions {
        eprintln!("   • {action}");
    }
    eprintln!();

    match &failure.rollback {
        Some(report) => {
            for warning in &report.warnings {
                eprintln!("{} {}", "⚠ Cleanup warning:".yellow(), warning);
            }
            if report.is_clean() {
                eprintln!("{}", "Cleanup complete. You can safely run this command again.".cyan());
            } else {
                eprintln!("{}", "Cleanup was incomplete; remove the leftovers above before retrying.".cyan());
            }
        }
        None => eprintln!("{}", "No changes were made. Fix the issue above and try again.".cyan()),
    }
}
