//! Composition engine seam.
//!
//! The orchestrator builds a [`ComposeInvocation`] per call and hands it to
//! a [`ComposeEngine`], which is the only thing that talks to the external
//! compose tool.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;

use op_common::error::{OpError, Result};
use op_common::types::compose_project_name;

/// Environment variables passed to a composition.
pub type ComposeEnv = BTreeMap<String, String>;

/// One call to the composition engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeInvocation {
    /// Composition files, base file first, overlays after.
    pub spec_paths: Vec<PathBuf>,
    /// Identity used to label the composed environment.
    pub primary_name: String,
    /// Engine subcommand and its arguments, e.g. `["up", "-d"]`.
    pub command: Vec<String>,
    /// Variables visible to variable substitution in the files.
    pub env: ComposeEnv,
}

impl ComposeInvocation {
    /// Project name derived from the primary name.
    #[must_use]
    pub fn project_name(&self) -> String {
        compose_project_name(&self.primary_name)
    }

    /// Full argument list: `-f <file>... -p <project> <command>...`.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.spec_paths.len() * 2 + 2 + self.command.len());
        for path in &self.spec_paths {
            args.push("-f".into());
            args.push(path.to_string_lossy().into_owned());
        }
        args.push("-p".into());
        args.push(self.project_name());
        args.extend(self.command.iter().cloned());
        args
    }
}

/// Something that can bring compositions up and down.
pub trait ComposeEngine: Send + Sync {
    /// Runs the invocation to completion.
    ///
    /// # Errors
    ///
    /// Returns `OpError::CommandFailed` if the engine reports a failure.
    fn invoke(&self, invocation: &ComposeInvocation) -> Result<()>;
}

/// Runs the `docker-compose` binary (or a compatible one).
#[derive(Debug, Clone)]
pub struct DockerComposeEngine {
    binary: String,
}

impl DockerComposeEngine {
    /// Creates an engine that runs `binary`.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for DockerComposeEngine {
    fn default() -> Self {
        Self::new(op_common::constants::DEFAULT_COMPOSE_BIN)
    }
}

impl ComposeEngine for DockerComposeEngine {
    fn invoke(&self, invocation: &ComposeInvocation) -> Result<()> {
        let args = invocation.args();
        let command_line = format!("{} {}", self.binary, args.join(" "));
        tracing::debug!(cmd = %command_line, "invoking compose");

        let output = Command::new(&self.binary)
            .args(&args)
            .envs(&invocation.env)
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
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(primary: &str) -> ComposeInvocation {
        ComposeInvocation {
            spec_paths: vec![
                PathBuf::from("/ws/compose/stacks/fleet/docker-compose.yml"),
                PathBuf::from("/ws/compose/services/apm-server/docker-compose.yml"),
            ],
            primary_name: primary.into(),
            command: vec!["up".into(), "-d".into()],
            env: ComposeEnv::new(),
        }
    }

    #[test]
    fn args_list_files_in_order_then_project_then_command() {
        let args = invocation("fleet").args();
        assert_eq!(
            args,
            vec![
                "-f",
                "/ws/compose/stacks/fleet/docker-compose.yml",
                "-f",
                "/ws/compose/services/apm-server/docker-compose.yml",
                "-p",
                "fleet",
                "up",
                "-d",
            ]
        );
    }

    #[test]
    fn project_name_is_normalized() {
        assert_eq!(invocation("Fleet Server.1").project_name(), "fleetserver1");
        assert_eq!(invocation("apm_server-2").project_name(), "apm_server-2");
    }

    #[test]
    fn missing_binary_is_command_failure() {
        let engine = DockerComposeEngine::new("definitely-not-a-compose-binary");
        let err = engine.invoke(&invocation("fleet")).expect_err("binary is missing");
        assert!(matches!(err, OpError::CommandFailed { ref status, .. } if status == "not started"));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_command_failure() {
        let engine = DockerComposeEngine::new("false");
        let err = engine.invoke(&invocation("fleet")).expect_err("false exits 1");
        assert!(matches!(err, OpError::CommandFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn zero_exit_is_success() {
        let engine = DockerComposeEngine::new("true");
        engine.invoke(&invocation("fleet")).expect("true exits 0");
    }
}
