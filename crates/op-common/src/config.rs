//! Harness configuration, read from the environment over built-in defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{OpError, Result};

/// Root configuration for the op harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpConfig {
    /// Workspace root holding materialized and custom composition files.
    pub workspace: PathBuf,
    /// Composition engine binary (`docker-compose` or a compatible wrapper).
    pub compose_bin: String,
    /// Agent version to install.
    pub agent_version: String,
    /// Version to fall back to when `agent_version` has no published artifact.
    pub agent_base_version: String,
    /// Local checkout whose build distributions replace downloads.
    pub beats_local_path: Option<PathBuf>,
    /// Base URL artifacts are downloaded from.
    pub artifacts_url: String,
    /// Fleet settings used when enrolling agents.
    pub fleet: FleetSettings,
    /// Log verbosity in the harness's own vocabulary (`DEBUG`, `WARNING`...).
    pub log_level: String,
    /// Whether log lines carry full timestamps.
    pub log_timestamps: bool,
}

/// Where enrolled agents reach their fleet server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetSettings {
    /// Host name, as seen from inside the composed environment.
    pub host: String,
    /// Port.
    pub port: u16,
}

impl Default for FleetSettings {
    fn default() -> Self {
        Self {
            host: constants::DEFAULT_FLEET_HOST.into(),
            port: constants::DEFAULT_FLEET_PORT,
        }
    }
}

impl Default for OpConfig {
    fn default() -> Self {
        Self {
            workspace: constants::default_workspace(),
            compose_bin: constants::DEFAULT_COMPOSE_BIN.into(),
            agent_version: constants::DEFAULT_AGENT_VERSION.into(),
            agent_base_version: constants::DEFAULT_AGENT_BASE_VERSION.into(),
            beats_local_path: None,
            artifacts_url: constants::DEFAULT_ARTIFACTS_URL.into(),
            fleet: FleetSettings::default(),
            log_level: "INFO".into(),
            log_timestamps: false,
        }
    }
}

impl OpConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds a value of the wrong shape.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Recognized variables: `OP_WORKSPACE`, `OP_COMPOSE_BIN`,
    /// `ELASTIC_AGENT_VERSION`, `ELASTIC_AGENT_BASE_VERSION`,
    /// `BEATS_LOCAL_PATH`, `OP_ARTIFACTS_URL`, `FLEET_SERVER_HOST`,
    /// `FLEET_SERVER_PORT`, `OP_LOG_LEVEL`, `OP_LOG_INCLUDE_TIMESTAMP`.
    ///
    /// # Errors
    ///
    /// Returns `OpError::Config` if `FLEET_SERVER_PORT` is not a port number.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("OP_WORKSPACE") {
            cfg.workspace = PathBuf::from(v);
        }
        if let Some(v) = non_empty("OP_COMPOSE_BIN") {
            cfg.compose_bin = v;
        }
        if let Some(v) = non_empty("ELASTIC_AGENT_VERSION") {
            cfg.agent_version = v;
        }
        if let Some(v) = non_empty("ELASTIC_AGENT_BASE_VERSION") {
            cfg.agent_base_version = v;
        }
        cfg.beats_local_path = non_empty("BEATS_LOCAL_PATH").map(PathBuf::from);
        if let Some(v) = non_empty("OP_ARTIFACTS_URL") {
            cfg.artifacts_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = non_empty("FLEET_SERVER_HOST") {
            cfg.fleet.host = v;
        }
        if let Some(v) = non_empty("FLEET_SERVER_PORT") {
            cfg.fleet.port = v.trim().parse().map_err(|_| OpError::Config {
                message: format!("FLEET_SERVER_PORT is not a port number: {v}"),
            })?;
        }
        if let Some(v) = non_empty("OP_LOG_LEVEL") {
            cfg.log_level = v;
        }
        cfg.log_timestamps = non_empty("OP_LOG_INCLUDE_TIMESTAMP")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));

        Ok(cfg)
    }

    /// Translates `log_level` into a `tracing` filter directive.
    ///
    /// Unknown values fall back to `info`.
    #[must_use]
    pub fn log_directive(&self) -> &'static str {
        match self.log_level.trim().to_ascii_uppercase().as_str() {
            "TRACE" => "trace",
            "DEBUG" => "debug",
            "WARNING" | "WARN" => "warn",
            "ERROR" | "FATAL" | "PANIC" => "error",
            _ => "info",
        }
    }

    /// Directory where downloaded artifacts are cached.
    #[must_use]
    pub fn downloads_dir(&self) -> PathBuf {
        self.workspace.join(constants::DOWNLOADS_DIR)
    }

    /// Root of the compose tree inside the workspace.
    #[must_use]
    pub fn compose_dir(&self) -> PathBuf {
        compose_dir(&self.workspace)
    }
}

/// Root of the compose tree inside `workspace`.
#[must_use]
pub fn compose_dir(workspace: &Path) -> PathBuf {
    workspace.join(constants::COMPOSE_DIR)
}

/// Verifies that every binary the harness shells out to is installed.
///
/// # Errors
///
/// Returns `OpError::NotFound` naming the first missing binary.
pub fn check_required_binaries(binaries: &[&str]) -> Result<()> {
    tracing::debug!("validating required tools");
    for binary in binaries {
        let path = which::which(binary).map_err(|_| OpError::NotFound {
            kind: "required binary",
            name: (*binary).to_string(),
        })?;
        tracing::debug!(software = binary, path = %path.display(), "binary is present");
    }
    Ok(())
}
