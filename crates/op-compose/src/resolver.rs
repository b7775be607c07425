//! Maps a service or stack name to a composition file on disk.
//!
//! The workspace copy always wins. A name known only to the bundled set is
//! materialized into the workspace on first use, after which every
//! resolution takes the workspace path.
//!
//! Two resolvers materializing the same name at once both write identical
//! bytes; the last writer wins.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use op_common::constants::COMPOSE_FILE_NAME;
use op_common::error::{OpError, Result};
use op_common::types::ComposeKind;

use crate::assets::BundledAssets;

/// Resolves composition names against a workspace and a bundled set.
#[derive(Clone)]
pub struct ComposeResolver {
    workspace: PathBuf,
    assets: Arc<dyn BundledAssets>,
}

impl std::fmt::Debug for ComposeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposeResolver")
            .field("workspace", &self.workspace)
            .finish_non_exhaustive()
    }
}

impl ComposeResolver {
    /// Creates a resolver rooted at `workspace`.
    pub fn new(workspace: impl Into<PathBuf>, assets: Arc<dyn BundledAssets>) -> Self {
        Self {
            workspace: workspace.into(),
            assets,
        }
    }

    /// Returns the workspace root.
    #[must_use]
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Where the composition file for `name` lives once materialized.
    #[must_use]
    pub fn workspace_path(&self, kind: ComposeKind, name: &str) -> PathBuf {
        op_common::config::compose_dir(&self.workspace)
            .join(kind.dir_name())
            .join(name)
            .join(COMPOSE_FILE_NAME)
    }

    /// Returns the composition file for `name`, materializing the bundled
    /// default into the workspace if needed.
    ///
    /// # Errors
    ///
    /// Returns `OpError::NotFound` if neither the workspace nor the bundled
    /// set knows the name (nothing is written in that case), or
    /// `OpError::Io` if the workspace copy cannot be written.
    pub fn resolve(&self, kind: ComposeKind, name: &str) -> Result<PathBuf> {
        if !is_plain_name(name) {
            return Err(not_found(kind, name));
        }

        let compose_file_path = self.workspace_path(kind, name);
        if compose_file_path.is_file() {
            tracing::debug!(
                compose_file_path = %compose_file_path.display(),
                kind = kind.dir_name(),
                "compose file found at workdir"
            );
            return Ok(compose_file_path);
        }

        tracing::debug!(
            compose_file_path = %compose_file_path.display(),
            kind = kind.dir_name(),
            "compose file not found at workdir, extracting from bundled resources"
        );

        let Some(bytes) = self.assets.read(&bundled_path(kind, name)) else {
            tracing::error!(name, kind = kind.dir_name(), "could not find compose file");
            return Err(not_found(kind, name));
        };

        if let Some(parent) = compose_file_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| OpError::io(parent, e))?;
        }
        std::fs::write(&compose_file_path, bytes).map_err(|e| {
            tracing::error!(
                compose_file_path = %compose_file_path.display(),
                error = %e,
                "cannot write file at workdir"
            );
            OpError::io(&compose_file_path, e)
        })?;

        tracing::debug!(
            compose_file_path = %compose_file_path.display(),
            kind = kind.dir_name(),
            "compose file generated at workdir"
        );
        Ok(compose_file_path)
    }
}

/// Path of `name`'s composition file inside the bundled set.
#[must_use]
pub fn bundled_path(kind: ComposeKind, name: &str) -> String {
    format!("{}/{name}/{COMPOSE_FILE_NAME}", kind.dir_name())
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

fn not_found(kind: ComposeKind, name: &str) -> OpError {
    OpError::NotFound {
        kind: kind.label(),
        name: name.to_string(),
    }
}
