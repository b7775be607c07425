//! Minimal read-only view of a composition file.

use std::collections::BTreeMap;
use std::path::Path;

use op_common::error::{OpError, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CompositionFile {
    #[serde(default)]
    services: BTreeMap<String, serde_yaml::Value>,
}

/// Names of the containers a composition file declares, sorted.
///
/// # Errors
///
/// Returns `OpError::Yaml` if the content is not a valid composition file.
pub fn service_names(content: &str) -> Result<Vec<String>> {
    let file: CompositionFile = serde_yaml::from_str(content)?;
    Ok(file.services.into_keys().collect())
}

/// Reads `path` and returns the container names it declares.
///
/// # Errors
///
/// Returns `OpError::Io` if the file cannot be read, or `OpError::Yaml`.
pub fn read_service_names(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| OpError::io(path, e))?;
    service_names(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{BundledAssets, EmbeddedAssets};

    #[test]
    fn lists_declared_services() {
        let names = service_names(
            "version: '2.4'\nservices:\n  kibana:\n    image: k\n  elasticsearch:\n    image: e\n",
        )
        .expect("parse");
        assert_eq!(names, vec!["elasticsearch", "kibana"]);
    }

    #[test]
    fn file_without_services_is_empty() {
        assert!(service_names("version: '2.4'\n").expect("parse").is_empty());
    }

    #[test]
    fn malformed_yaml_is_rejected() {
        let err = service_names("services: [unclosed").expect_err("invalid yaml");
        assert!(matches!(err, OpError::Yaml { .. }));
    }

    #[test]
    fn every_bundled_file_parses() {
        let assets = EmbeddedAssets;
        for path in assets.paths().expect("paths") {
            let bytes = assets.read(&path).expect("bytes");
            let content = String::from_utf8(bytes).expect("utf-8");
            let names = service_names(&content).expect("valid composition");
            assert!(!names.is_empty(), "{path} declares no services");
        }
    }

    #[test]
    fn fleet_server_stack_declares_the_fleet_trio() {
        let bytes = EmbeddedAssets
            .read("stacks/fleet-server/docker-compose.yml")
            .expect("bundled");
        let names = service_names(&String::from_utf8(bytes).expect("utf-8")).expect("parse");
        assert_eq!(names, vec!["elasticsearch", "fleet-server", "kibana"]);
    }
}
