//! Per-service variables consumed by composition files.

use op_common::config::compose_dir;
use op_common::error::Result;

use crate::engine::ComposeEnv;
use crate::registry::Registry;

/// Adds the variables a service's composition file expects.
///
/// For a service `apache` at version `2.4` this sets `APACHE_VARIANT`,
/// `APACHE_VERSION` and, when the registry knows the service,
/// `APACHE_PATH` (the workspace directory holding its composition file,
/// where a bundled default is materialized). Dashes in
/// the service name become underscores so the keys stay valid variable
/// names.
///
/// # Errors
///
/// Returns `OpError::ConfigurationMissing` if the registry is uninitialized.
pub fn put_service_environment(
    registry: &Registry,
    env: &mut ComposeEnv,
    service: &str,
    version: &str,
) -> Result<()> {
    let prefix = service.to_ascii_uppercase().replace('-', "_");

    let _ = env.insert(format!("{prefix}_VARIANT"), service.to_string());
    let _ = env.insert(format!("{prefix}_VERSION"), version.to_string());

    match registry.lookup_service(service)? {
        Some(spec) => {
            // Bundled entries hold a path relative to the workspace compose dir.
            let file = if spec.path.is_relative() {
                compose_dir(registry.workspace()?).join(&spec.path)
            } else {
                spec.path
            };
            if let Some(dir) = file.parent() {
                let _ = env.insert(format!("{prefix}_PATH"), dir.to_string_lossy().into_owned());
            }
        }
        None => tracing::warn!(service, "could not find compose file"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssets;

    fn registry() -> (tempfile::TempDir, Registry) {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = Registry::new();
        registry
            .initialize(
                dir.path(),
                &MemoryAssets::new().with_file("services/apm-server/docker-compose.yml", "x"),
            )
            .expect("init");
        (dir, registry)
    }

    #[test]
    fn known_service_gets_variant_version_and_path() {
        let (dir, registry) = registry();
        let mut env = ComposeEnv::new();
        put_service_environment(&registry, &mut env, "apm-server", "7.12.0").expect("env");

        assert_eq!(env.get("APM_SERVER_VARIANT").map(String::as_str), Some("apm-server"));
        assert_eq!(env.get("APM_SERVER_VERSION").map(String::as_str), Some("7.12.0"));
        let expected = dir.path().join("compose/services/apm-server");
        assert_eq!(
            env.get("APM_SERVER_PATH").map(String::as_str),
            Some(expected.to_string_lossy().as_ref())
        );
    }

    #[test]
    fn workspace_service_path_is_its_own_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let custom = dir.path().join("compose/services/redis");
        std::fs::create_dir_all(&custom).expect("mkdir");
        std::fs::write(custom.join("docker-compose.yml"), "x").expect("write");

        let registry = Registry::new();
        registry.initialize(dir.path(), &MemoryAssets::new()).expect("init");
        let mut env = ComposeEnv::new();
        put_service_environment(&registry, &mut env, "redis", "6").expect("env");
        assert_eq!(
            env.get("REDIS_PATH").map(String::as_str),
            Some(custom.to_string_lossy().as_ref())
        );
    }

    #[test]
    fn unknown_service_gets_no_path() {
        let (_dir, registry) = registry();
        let mut env = ComposeEnv::new();
        put_service_environment(&registry, &mut env, "redis", "6").expect("env");
        assert!(env.contains_key("REDIS_VERSION"));
        assert!(!env.contains_key("REDIS_PATH"));
    }

    #[test]
    fn existing_entries_are_kept() {
        let (_dir, registry) = registry();
        let mut env = ComposeEnv::new();
        let _ = env.insert("STACK_VERSION".into(), "8.0.0".into());
        put_service_environment(&registry, &mut env, "redis", "6").expect("env");
        assert_eq!(env.get("STACK_VERSION").map(String::as_str), Some("8.0.0"));
    }
}
