// ABOUTME: Docker-backed container runtime using Bollard for exec/network calls and the compose CLI for boots

use super::{ContainerRuntime, RuntimeError};
use async_trait::async_trait;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::network::{CreateNetworkOptions, InspectNetworkOptions};
use bollard::container::LogOutput;
use bollard::Docker;
use futures_util::stream::StreamExt;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Container runtime backed by the local Docker daemon.
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect and ping the daemon, so a stopped Docker is reported before
    /// any command touches the registry or the filesystem.
    pub async fn new() -> Result<Self, RuntimeError> {
        let docker = Self::connect_to_docker()?;

        // Test the connection
        docker.ping().await?;

        info!("Successfully connected to Docker daemon");
        Ok(Self { docker })
    }

    fn connect_to_docker() -> Result<Docker, bollard::errors::Error> {
        if let Ok(docker_host) = std::env::var("DOCKER_HOST") {
            info!("Using DOCKER_HOST: {}", docker_host);
            return Docker::connect_with_local_defaults();
        }

        #[cfg(unix)]
        for socket_path in Self::get_docker_socket_paths() {
            if !Path::new(&socket_path).exists() {
                continue;
            }

            debug!("Found Docker socket at: {}", socket_path);
            match Docker::connect_with_unix(&socket_path, 120, bollard::API_DEFAULT_VERSION) {
                Ok(docker) => return Ok(docker),
                Err(e) => {
                    warn!("Failed to connect to Docker socket {}: {}", socket_path, e);
                }
            }
        }

        warn!("No Docker socket found, trying default connection");
        Docker::connect_with_local_defaults()
    }

    #[cfg(unix)]
    fn get_docker_socket_paths() -> Vec<String> {
        let mut paths = Vec::new();

        if cfg!(target_os = "macos") {
            if let Some(home) = dirs::home_dir() {
                // Docker Desktop, then Colima
                paths.push(home.join(".docker/run/docker.sock").to_string_lossy().to_string());
                paths.push(home.join(".colima/default/docker.sock").to_string_lossy().to_string());
            }
        }

        paths.push("/var/run/docker.sock".to_string());

        // Rootless Docker
        if let Ok(xdg_runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
            paths.push(format!("{}/docker.sock", xdg_runtime_dir));
        }

        paths
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn ensure_running(&self, path: &Path) -> Result<(), RuntimeError> {
        info!("Running docker compose up in {}", path.display());

        let output = Command::new("docker")
            .args(["compose", "up", "-d", "--build"])
            .current_dir(path)
            .output()
            .await?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(RuntimeError::ComposeFailed {
                path: path.to_path_buf(),
                output: combined.trim().to_string(),
            });
        }

        Ok(())
    }

    async fn exec(&self, service: &str, command: &str, args: &[String]) -> Result<String, RuntimeError> {
        let mut cmd = vec![command.to_string()];
        cmd.extend(args.iter().cloned());
        let command_line = cmd.join(" ");
        info!("Executing '{}' in {}", command_line, service);

        let exec = self
            .docker
            .create_exec(
                service,
                CreateExecOptions {
                    cmd: Some(cmd),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        let mut collected = String::new();
        if let StartExecResults::Attached { mut output, .. } = self.docker.start_exec(&exec.id, None).await? {
            while let Some(chunk) = output.next().await {
                match chunk {
                    Ok(LogOutput::StdOut { message }) | Ok(LogOutput::StdErr { message }) => {
                        collected.push_str(&String::from_utf8_lossy(&message));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Error reading exec output: {}", e);
                        break;
                    }
                }
            }
        }

        let exit_code = self
            .docker
            .inspect_exec(&exec.id)
            .await?
            .exit_code
            .unwrap_or(0);

        if exit_code != 0 {
            return Err(RuntimeError::ExecFailed {
                service: service.to_string(),
                command: command_line,
                exit_code,
                output: collected.trim().to_string(),
            });
        }

        Ok(collected)
    }

    async fn network_exists(&self, name: &str) -> Result<bool, RuntimeError> {
        match self
            .docker
            .inspect_network(name, None::<InspectNetworkOptions<String>>)
            .await
        {
            Ok(_) => Ok(true),
            Err(bollard::errors::Error::DockerResponseServerError { status_code: 404, .. }) => Ok(false),
            Err(e) => Err(RuntimeError::Connection(e)),
        }
    }

    async fn create_network(&self, name: &str) -> Result<(), RuntimeError> {
        info!("Creating docker network {}", name);
        self.docker
            .create_network(CreateNetworkOptions {
                name: name.to_string(),
                driver: "bridge".to_string(),
                ..Default::default()
            })
            .await?;
        Ok(())
    }
}
