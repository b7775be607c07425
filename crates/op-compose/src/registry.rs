//! Catalog of every known service and stack.
//!
//! Populated once: bundled entries first, then workspace entries, so a
//! workspace directory shadows a bundled default of the same name. After
//! population the catalog is read-only and shared freely between readers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

use op_common::constants::COMPOSE_FILE_NAME;
use op_common::error::{OpError, Result};
use op_common::types::{ComposeKind, ServiceSpec, StackSpec};

use crate::assets::BundledAssets;

#[derive(Debug, Default)]
struct Catalog {
    workspace: PathBuf,
    services: BTreeMap<String, ServiceSpec>,
    stacks: BTreeMap<String, StackSpec>,
}

impl Catalog {
    fn register(&mut self, kind: ComposeKind, name: &str, path: PathBuf) {
        match kind {
            ComposeKind::Service => {
                let _ = self.services.insert(
                    name.to_string(),
                    ServiceSpec {
                        name: name.to_string(),
                        path,
                    },
                );
            }
            ComposeKind::Stack => {
                let _ = self.stacks.insert(
                    name.to_string(),
                    StackSpec {
                        name: name.to_string(),
                        path,
                    },
                );
            }
        }
    }
}

/// Registry of services and stacks known to this harness run.
#[derive(Debug, Default)]
pub struct Registry {
    catalog: OnceLock<Catalog>,
    init: Mutex<()>,
}

impl Registry {
    /// Creates an empty, uninitialized registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            catalog: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    /// Populates the registry from the bundled set and the workspace.
    ///
    /// Calling this again after a successful population is a no-op.
    /// Concurrent first calls are serialized: one scans, the rest wait and
    /// then find the populated catalog.
    ///
    /// # Errors
    ///
    /// Returns `OpError::Io` if the workspace compose directories cannot be
    /// created, or the bundled set's enumeration error. In both cases the
    /// registry stays uninitialized.
    pub fn initialize(&self, workspace: &Path, assets: &dyn BundledAssets) -> Result<()> {
        if self.catalog.get().is_some() {
            return Ok(());
        }
        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if self.catalog.get().is_some() {
            return Ok(());
        }

        ensure_workspace_dirs(workspace)?;

        let mut catalog = Catalog {
            workspace: workspace.to_path_buf(),
            ..Catalog::default()
        };

        let bundled = assets.paths().map_err(|e| {
            tracing::error!(workspace = %workspace.display(), error = %e, "could not get packaged compose files");
            e
        })?;
        for boxed_path in bundled {
            // services/<name>/docker-compose.yml
            let mut tokens = boxed_path.split('/');
            let (Some(kind), Some(name)) = (
                tokens.next().and_then(ComposeKind::from_dir_name),
                tokens.next(),
            ) else {
                continue;
            };
            tracing::debug!(service = name, path = %boxed_path, "bundled file");
            catalog.register(kind, name, PathBuf::from(&boxed_path));
        }

        for kind in [ComposeKind::Service, ComposeKind::Stack] {
            read_workspace_entries(&mut catalog, kind);
        }

        tracing::debug!(
            services = catalog.services.len(),
            stacks = catalog.stacks.len(),
            "registry initialized"
        );
        let _ = self.catalog.set(catalog);
        Ok(())
    }

    /// Whether `initialize` has completed successfully.
    pub fn is_initialized(&self) -> bool {
        self.catalog.get().is_some()
    }

    fn catalog(&self) -> Result<&Catalog> {
        self.catalog
            .get()
            .ok_or_else(|| OpError::ConfigurationMissing {
                message: "registry used before it was initialized".into(),
            })
    }

    /// Workspace root the registry was populated from.
    ///
    /// # Errors
    ///
    /// Returns `OpError::ConfigurationMissing` before initialization.
    pub fn workspace(&self) -> Result<&Path> {
        Ok(&self.catalog()?.workspace)
    }

    /// Looks up a service by name.
    ///
    /// # Errors
    ///
    /// Returns `OpError::ConfigurationMissing` before initialization.
    pub fn lookup_service(&self, name: &str) -> Result<Option<ServiceSpec>> {
        Ok(self.catalog()?.services.get(name).cloned())
    }

    /// Looks up a stack by name.
    ///
    /// # Errors
    ///
    /// Returns `OpError::ConfigurationMissing` before initialization.
    pub fn lookup_stack(&self, name: &str) -> Result<Option<StackSpec>> {
        Ok(self.catalog()?.stacks.get(name).cloned())
    }

    /// All services, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `OpError::ConfigurationMissing` before initialization.
    pub fn services(&self) -> Result<Vec<ServiceSpec>> {
        Ok(self.catalog()?.services.values().cloned().collect())
    }

    /// All stacks, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `OpError::ConfigurationMissing` before initialization.
    pub fn stacks(&self) -> Result<Vec<StackSpec>> {
        Ok(self.catalog()?.stacks.values().cloned().collect())
    }
}

fn ensure_workspace_dirs(workspace: &Path) -> Result<()> {
    let compose = op_common::config::compose_dir(workspace);
    for kind in [ComposeKind::Service, ComposeKind::Stack] {
        let dir = compose.join(kind.dir_name());
        std::fs::create_dir_all(&dir).map_err(|e| OpError::io(&dir, e))?;
    }
    tracing::debug!(compose_dir = %compose.display(), "workspace compose dirs ready");
    Ok(())
}

/// Registers every `<kind>/<name>/docker-compose.yml` found in the workspace.
fn read_workspace_entries(catalog: &mut Catalog, kind: ComposeKind) {
    let base = op_common::config::compose_dir(&catalog.workspace).join(kind.dir_name());
    let entries = match std::fs::read_dir(&base) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %base.display(), kind = kind.dir_name(), error = %e, "could not load file system");
            return;
        }
    };

    for entry in entries.flatten() {
        if !entry.file_type().is_ok_and(|t| t.is_dir()) {
            continue;
        }
        let compose_file_path = entry.path().join(COMPOSE_FILE_NAME);
        if !compose_file_path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        tracing::debug!(service = %name, path = %compose_file_path.display(), "workspace file");
        catalog.register(kind, &name, compose_file_path);
    }
}
