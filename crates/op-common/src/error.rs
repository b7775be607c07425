//! Unified error types for the op workspace.
//!
//! Every failure carries the context it happened in (name, kind, command)
//! and is returned to the immediate caller. Nothing in the workspace retries.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum OpError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A requested service, stack, or artifact does not exist.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Name of the missing resource.
        name: String,
    },

    /// An external command exited unsuccessfully or could not be spawned.
    #[error("command `{command}` failed ({status}): {stderr}")]
    CommandFailed {
        /// The command line as it was invoked.
        command: String,
        /// Exit status description.
        status: String,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// A component was used before it was initialized.
    #[error("configuration missing: {message}")]
    ConfigurationMissing {
        /// What was missing.
        message: String,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// Downloading an artifact failed.
    #[error("download of {url} failed: {message}")]
    Download {
        /// Requested URL.
        url: String,
        /// Failure description.
        message: String,
    },

    /// An operation failed and was wrapped with its context.
    #[error("{context}: {source}")]
    Operation {
        /// What was being attempted.
        context: String,
        /// Underlying error.
        source: Box<OpError>,
    },

    /// A composition file could not be parsed.
    #[error("YAML error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },
}

impl OpError {
    /// Wraps this error with a description of the operation that failed.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Operation {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Builds an [`OpError::Io`] for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, OpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_kind_and_name() {
        let err = OpError::NotFound {
            kind: "stack",
            name: "fleet".into(),
        };
        assert_eq!(err.to_string(), "stack not found: fleet");
    }

    #[test]
    fn context_wraps_the_original_message() {
        let err = OpError::CommandFailed {
            command: "elastic-agent enroll".into(),
            status: "exit status: 1".into(),
            stderr: "bad token".into(),
        }
        .context("failed to enroll the agent");
        let msg = err.to_string();
        assert!(msg.starts_with("failed to enroll the agent: "));
        assert!(msg.contains("bad token"));
    }
}
