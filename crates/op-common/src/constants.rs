//! System-wide constants and default paths.

use std::path::PathBuf;

/// Name of the hidden workspace directory under the user's home.
pub const WORKSPACE_DIR_NAME: &str = ".op";

/// Directory inside the workspace holding composition files.
pub const COMPOSE_DIR: &str = "compose";

/// Directory inside the workspace holding downloaded artifacts.
pub const DOWNLOADS_DIR: &str = "downloads";

/// File name of every composition file, bundled or workspace-resident.
pub const COMPOSE_FILE_NAME: &str = "docker-compose.yml";

/// Default composition engine binary.
pub const DEFAULT_COMPOSE_BIN: &str = "docker-compose";

/// Container engine binary used by the deployment backend.
pub const DOCKER_BIN: &str = "docker";

/// Name of the agent artifact and its system service.
pub const AGENT_ARTIFACT: &str = "elastic-agent";

/// Agent version used when none is configured.
pub const DEFAULT_AGENT_VERSION: &str = "8.0.0-SNAPSHOT";

/// Fallback version used when the configured version cannot be fetched.
pub const DEFAULT_AGENT_BASE_VERSION: &str = "7.x-SNAPSHOT";

/// Base URL for released agent artifacts.
pub const DEFAULT_ARTIFACTS_URL: &str = "https://artifacts.elastic.co/downloads/beats";

/// Fleet server host reachable from the composed environment.
pub const DEFAULT_FLEET_HOST: &str = "fleet-server";

/// Fleet server port.
pub const DEFAULT_FLEET_PORT: u16 = 8220;

/// Returns the default workspace root, `$HOME/.op`.
///
/// Falls back to a relative `.op` directory when no home directory is
/// known, which keeps the harness usable inside minimal CI containers.
pub fn default_workspace() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_or_else(
            |_| PathBuf::from(WORKSPACE_DIR_NAME),
            |home| PathBuf::from(home).join(WORKSPACE_DIR_NAME),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_workspace_ends_with_hidden_dir() {
        assert!(default_workspace().ends_with(WORKSPACE_DIR_NAME));
    }
}
