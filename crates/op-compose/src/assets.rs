//! Read-only set of default composition files.
//!
//! Paths are `/`-separated and shaped `{services|stacks}/{name}/{file}`,
//! mirroring the workspace layout under `compose/`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use op_common::error::{OpError, Result};

/// A read-only tree of bundled files.
pub trait BundledAssets: Send + Sync {
    /// Enumerates every bundled file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the set cannot be enumerated.
    fn paths(&self) -> Result<Vec<String>>;

    /// Returns the bytes stored at `path`, if any.
    fn read(&self, path: &str) -> Option<Vec<u8>>;
}

macro_rules! bundled {
    ($($path:literal),* $(,)?) => {
        &[$(($path, include_bytes!(concat!("../compose/", $path)).as_slice())),*]
    };
}

/// Composition files compiled into the binary.
const EMBEDDED: &[(&str, &[u8])] = bundled![
    "services/apache/docker-compose.yml",
    "services/apm-server/docker-compose.yml",
    "services/centos-systemd/docker-compose.yml",
    "services/debian-systemd/docker-compose.yml",
    "services/elastic-agent/docker-compose.yml",
    "services/redis/docker-compose.yml",
    "stacks/fleet-server/docker-compose.yml",
    "stacks/observability/docker-compose.yml",
];

/// The default composition files shipped inside the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedAssets;

impl BundledAssets for EmbeddedAssets {
    fn paths(&self) -> Result<Vec<String>> {
        Ok(EMBEDDED.iter().map(|(p, _)| (*p).to_string()).collect())
    }

    fn read(&self, path: &str) -> Option<Vec<u8>> {
        EMBEDDED
            .iter()
            .find(|(p, _)| *p == path)
            .map(|(_, bytes)| bytes.to_vec())
    }
}

/// In-memory bundled set, used to exercise materialization without
/// touching compiled-in resources.
#[derive(Debug, Default)]
pub struct MemoryAssets {
    files: BTreeMap<String, Vec<u8>>,
    reads: AtomicUsize,
    broken: bool,
}

impl MemoryAssets {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file at `path`.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let _ = self.files.insert(path.into(), bytes.into());
        self
    }

    /// Makes every enumeration fail, as an unreadable resource set would.
    #[must_use]
    pub const fn broken(mut self) -> Self {
        self.broken = true;
        self
    }

    /// Number of successful or attempted `read` calls so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl BundledAssets for MemoryAssets {
    fn paths(&self) -> Result<Vec<String>> {
        if self.broken {
            return Err(OpError::ConfigurationMissing {
                message: "bundled compose files are not readable".into(),
            });
        }
        Ok(self.files.keys().cloned().collect())
    }

    fn read(&self, path: &str) -> Option<Vec<u8>> {
        let _ = self.reads.fetch_add(1, Ordering::SeqCst);
        self.files.get(path).cloned()
    }
}
