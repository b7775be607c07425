//! Execution backend installers delegate to.
//!
//! A [`Deployment`] knows how to reach a running service: run commands in
//! it, copy files into it, read its logs. Installers never manage the
//! deployment's lifecycle; they only call into it.

use std::path::{Path, PathBuf};
use std::process::Command;

use op_common::error::{OpError, Result};
use op_common::types::compose_project_name;
use serde::{Deserialize, Serialize};

/// A member of a composed environment that an installer targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRequest {
    /// Service name inside the composition file.
    pub name: String,
    /// Project (primary name) the service was composed under.
    pub project: String,
    /// Replica index, starting at 1.
    pub index: u32,
}

impl ServiceRequest {
    /// Targets the first replica of `name` in `project`.
    pub fn new(project: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            project: project.into(),
            index: 1,
        }
    }

    /// Container name compose gives this replica. The project part is
    /// normalized the same way compose normalizes `-p`.
    #[must_use]
    pub fn container_name(&self) -> String {
        format!(
            "{}_{}_{}",
            compose_project_name(&self.project),
            self.name,
            self.index
        )
    }
}

/// Live execution backend for a composed environment.
pub trait Deployment: Send + Sync {
    /// Copies local `files` into the service's filesystem root.
    ///
    /// # Errors
    ///
    /// Returns an error if any copy fails.
    fn add_files(&self, service: &ServiceRequest, files: &[PathBuf]) -> Result<()>;

    /// Runs `args` inside the service and returns its standard output.
    ///
    /// # Errors
    ///
    /// Returns `OpError::CommandFailed` if the command exits unsuccessfully.
    fn exec_in(&self, service: &ServiceRequest, args: &[String]) -> Result<String>;

    /// Emits the service's logs.
    ///
    /// # Errors
    ///
    /// Returns an error if the logs cannot be retrieved.
    fn logs(&self, service: &ServiceRequest) -> Result<()>;

    /// Starts the service's container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be started.
    fn start(&self, service: &ServiceRequest) -> Result<()>;

    /// Stops the service's container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be stopped.
    fn stop(&self, service: &ServiceRequest) -> Result<()>;

    /// Loads a container image archive into the engine backing this
    /// deployment.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be loaded.
    fn load_image(&self, archive: &Path) -> Result<()>;
}

/// Deployment backed by the local docker engine.
#[derive(Debug, Clone)]
pub struct DockerDeployment {
    binary: String,
}

impl DockerDeployment {
    /// Creates a deployment that runs `binary` (normally `docker`).
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, args: &[String]) -> Result<String> {
        let command_line = format!("{} {}", self.binary, args.join(" "));
        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .map_err(|e| OpError::CommandFailed {
                command: command_line.clone(),
                status: "not started".into(),
                stderr: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(OpError::CommandFailed {
                command: command_line,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for DockerDeployment {
    fn default() -> Self {
        Self::new(op_common::constants::DOCKER_BIN)
    }
}

impl Deployment for DockerDeployment {
    fn add_files(&self, service: &ServiceRequest, files: &[PathBuf]) -> Result<()> {
        for file in files {
            tracing::debug!(container = %service.container_name(), file = %file.display(), "copying file");
            let _ = self.run(&copy_args(service, file))?;
        }
        Ok(())
    }

    fn exec_in(&self, service: &ServiceRequest, args: &[String]) -> Result<String> {
        tracing::debug!(container = %service.container_name(), cmd = ?args, "exec in service");
        let output = self.run(&exec_args(service, args))?;
        tracing::trace!(output = %output, "exec output");
        Ok(output)
    }

    fn logs(&self, service: &ServiceRequest) -> Result<()> {
        let logs = self.run(&["logs".into(), service.container_name()])?;
        tracing::info!(service = %service.name, logs = %logs, "service logs");
        Ok(())
    }

    fn start(&self, service: &ServiceRequest) -> Result<()> {
        self.run(&["start".into(), service.container_name()])
            .map(drop)
    }

    fn stop(&self, service: &ServiceRequest) -> Result<()> {
        self.run(&["stop".into(), service.container_name()])
            .map(drop)
    }

    fn load_image(&self, archive: &Path) -> Result<()> {
        tracing::debug!(archive = %archive.display(), "loading image");
        self.run(&["load".into(), "-i".into(), archive.to_string_lossy().into_owned()])
            .map(drop)
    }
}

fn copy_args(service: &ServiceRequest, file: &Path) -> Vec<String> {
    vec![
        "cp".into(),
        file.to_string_lossy().into_owned(),
        format!("{}:/", service.container_name()),
    ]
}

fn exec_args(service: &ServiceRequest, args: &[String]) -> Vec<String> {
    let mut full = vec!["exec".to_string(), service.container_name()];
    full.extend(args.iter().cloned());
    full
}

#[cfg(test)]
mod tests {
    use super::*;

    fn centos() -> ServiceRequest {
        ServiceRequest::new("fleet-server", "centos-systemd")
    }

    #[test]
    fn container_name_follows_compose_convention() {
        assert_eq!(centos().container_name(), "fleet-server_centos-systemd_1");
    }

    #[test]
    fn container_name_uses_normalized_project() {
        let request = ServiceRequest::new("Fleet Server", "debian-systemd");
        assert_eq!(request.container_name(), "fleetserver_debian-systemd_1");
    }

    #[test]
    fn exec_args_target_container() {
        let args = exec_args(&centos(), &["systemctl".into(), "start".into(), "elastic-agent".into()]);
        assert_eq!(
            args,
            vec!["exec", "fleet-server_centos-systemd_1", "systemctl", "start", "elastic-agent"]
        );
    }

    #[test]
    fn copy_args_target_container_root() {
        let args = copy_args(&centos(), Path::new("/tmp/elastic-agent.rpm"));
        assert_eq!(
            args,
            vec!["cp", "/tmp/elastic-agent.rpm", "fleet-server_centos-systemd_1:/"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_reports_status() {
        let deployment = DockerDeployment::new("false");
        let err = deployment
            .exec_in(&centos(), &["true".into()])
            .expect_err("false always fails");
        assert!(matches!(err, OpError::CommandFailed { ref command, .. } if command.starts_with("false exec")));
    }

    #[test]
    fn missing_binary_is_command_failure() {
        let deployment = DockerDeployment::new("definitely-not-docker");
        assert!(matches!(
            deployment.start(&centos()),
            Err(OpError::CommandFailed { .. })
        ));
    }
}
