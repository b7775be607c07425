//! Per-run context owning the registry, resolver, and configuration.
//!
//! Every harness run builds one [`OpContext`] and passes it by reference.
//! Independent runs in one process each hold their own.

use std::sync::Arc;

use op_common::config::OpConfig;
use op_common::error::Result;

use crate::assets::{BundledAssets, EmbeddedAssets};
use crate::engine::{ComposeEngine, DockerComposeEngine};
use crate::orchestrator::ComposeOrchestrator;
use crate::registry::Registry;
use crate::resolver::ComposeResolver;

/// Everything a harness run needs to find and compose environments.
pub struct OpContext {
    config: OpConfig,
    assets: Arc<dyn BundledAssets>,
    registry: Registry,
}

impl OpContext {
    /// Creates a context over the compiled-in composition files.
    #[must_use]
    pub fn new(config: OpConfig) -> Self {
        Self::with_assets(config, Arc::new(EmbeddedAssets))
    }

    /// Creates a context over an arbitrary bundled set.
    #[must_use]
    pub fn with_assets(config: OpConfig, assets: Arc<dyn BundledAssets>) -> Self {
        Self {
            config,
            assets,
            registry: Registry::new(),
        }
    }

    /// Populates the registry. Safe to call more than once.
    ///
    /// # Errors
    ///
    /// Returns the registry's initialization error; the context remains
    /// usable for resolution but lookups fail until a later call succeeds.
    pub fn initialize(&self) -> Result<()> {
        self.registry
            .initialize(&self.config.workspace, self.assets.as_ref())
    }

    /// Harness configuration.
    #[must_use]
    pub const fn config(&self) -> &OpConfig {
        &self.config
    }

    /// Service and stack catalog.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Resolver bound to this context's workspace and bundled set.
    #[must_use]
    pub fn resolver(&self) -> ComposeResolver {
        ComposeResolver::new(self.config.workspace.clone(), Arc::clone(&self.assets))
    }

    /// Orchestrator driving `engine`.
    #[must_use]
    pub fn orchestrator_with(&self, engine: Box<dyn ComposeEngine>) -> ComposeOrchestrator {
        ComposeOrchestrator::new(self.resolver(), engine)
    }

    /// Orchestrator driving the configured compose binary.
    #[must_use]
    pub fn orchestrator(&self) -> ComposeOrchestrator {
        self.orchestrator_with(Box::new(DockerComposeEngine::new(
            self.config.compose_bin.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssets;
    use op_common::types::ComposeKind;

    fn config(dir: &tempfile::TempDir) -> OpConfig {
        OpConfig {
            workspace: dir.path().to_path_buf(),
            ..OpConfig::default()
        }
    }

    #[test]
    fn independent_contexts_do_not_share_registries() {
        let a = tempfile::tempdir().expect("tempdir");
        let b = tempfile::tempdir().expect("tempdir");
        let first = OpContext::with_assets(
            config(&a),
            Arc::new(MemoryAssets::new().with_file("services/x/docker-compose.yml", "x")),
        );
        let second = OpContext::with_assets(config(&b), Arc::new(MemoryAssets::new()));
        first.initialize().expect("init");
        second.initialize().expect("init");

        assert!(first.registry().lookup_service("x").expect("lookup").is_some());
        assert!(second.registry().lookup_service("x").expect("lookup").is_none());
    }

    #[test]
    fn resolver_uses_context_workspace() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = OpContext::new(config(&dir));
        let path = ctx
            .resolver()
            .resolve(ComposeKind::Stack, "fleet-server")
            .expect("bundled stack");
        assert!(path.starts_with(dir.path()));
    }

    #[test]
    fn embedded_context_knows_bundled_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = OpContext::new(config(&dir));
        ctx.initialize().expect("init");
        assert!(ctx.registry().lookup_stack("fleet-server").expect("lookup").is_some());
        assert!(ctx.registry().lookup_service("centos-systemd").expect("lookup").is_some());
    }
}
