//! Domain primitive types used across the op workspace.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OpError;

/// Whether a composition name refers to a service or a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComposeKind {
    /// A single, independently composable environment unit.
    Service,
    /// An aggregation of services described by a base composition file.
    Stack,
}

impl ComposeKind {
    /// Directory segment used in both the workspace and the bundled set.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Service => "services",
            Self::Stack => "stacks",
        }
    }

    /// Parses a directory segment back into a kind.
    #[must_use]
    pub fn from_dir_name(segment: &str) -> Option<Self> {
        match segment {
            "services" => Some(Self::Service),
            "stacks" => Some(Self::Stack),
            _ => None,
        }
    }

    /// Singular label used in logs and errors.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Stack => "stack",
        }
    }
}

impl fmt::Display for ComposeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Project name compose assigns to an environment labelled `name`.
///
/// Lowercased, with everything but ASCII alphanumerics, `-` and `_`
/// dropped. Container names are derived from it.
#[must_use]
pub fn compose_project_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// A discovered service and the location of its composition file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Service name, unique within the registry.
    pub name: String,
    /// Composition file location. Bundled entries hold their bundled path
    /// until they are materialized into the workspace.
    pub path: PathBuf,
}

/// A discovered stack and the location of its composition file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackSpec {
    /// Stack name, unique among stacks.
    pub name: String,
    /// Composition file location.
    pub path: PathBuf,
}

/// Package formats an agent can be installed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageFormat {
    /// Plain `.tar.gz` archive, run through systemd.
    Tar,
    /// RPM package installed with yum.
    Rpm,
    /// DEB package installed with apt.
    Deb,
    /// Container image; the service itself is the agent.
    Docker,
    /// Windows `.zip` archive managed by the service control manager.
    Zip,
}

impl PackageFormat {
    /// All supported formats.
    pub const ALL: [Self; 5] = [Self::Tar, Self::Rpm, Self::Deb, Self::Docker, Self::Zip];

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tar => "tar",
            Self::Rpm => "rpm",
            Self::Deb => "deb",
            Self::Docker => "docker",
            Self::Zip => "zip",
        }
    }
}

impl fmt::Display for PackageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageFormat {
    type Err = OpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| OpError::NotFound {
                kind: "package format",
                name: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_dir_names_roundtrip() {
        for kind in [ComposeKind::Service, ComposeKind::Stack] {
            assert_eq!(ComposeKind::from_dir_name(kind.dir_name()), Some(kind));
        }
        assert_eq!(ComposeKind::from_dir_name("volumes"), None);
    }

    #[test]
    fn project_name_is_lowercased_and_filtered() {
        assert_eq!(compose_project_name("Fleet"), "fleet");
        assert_eq!(compose_project_name("Fleet Server.1"), "fleetserver1");
        assert_eq!(compose_project_name("apm_server-2"), "apm_server-2");
    }

    #[test]
    fn package_format_parses_case_insensitively() {
        assert_eq!("RPM".parse::<PackageFormat>().expect("rpm"), PackageFormat::Rpm);
        assert_eq!("zip".parse::<PackageFormat>().expect("zip"), PackageFormat::Zip);
    }

    #[test]
    fn unknown_package_format_is_not_found() {
        let err = "msi".parse::<PackageFormat>().expect_err("msi is unsupported");
        assert!(matches!(err, OpError::NotFound { kind: "package format", .. }));
    }
}
