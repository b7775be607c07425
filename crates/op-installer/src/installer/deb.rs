//! DEB installer for apt-based hosts.

use op_common::constants::AGENT_ARTIFACT;
use op_common::error::Result;
use op_common::types::PackageFormat;

use super::rpm::{enroll_installed, expected_package, linux_package_manifest, register_service};
use super::{Installer, InstallerTarget, ServiceOperatorManifest, StagedFile, systemctl};
use crate::artifact::debian_architecture;

/// Installs the agent from a DEB package.
#[derive(Debug)]
pub struct DebPackage {
    target: InstallerTarget,
    staged: StagedFile,
}

impl DebPackage {
    /// Binds the installer to `target`.
    #[must_use]
    pub fn new(target: InstallerTarget) -> Self {
        Self {
            target,
            staged: StagedFile::default(),
        }
    }
}

impl Installer for DebPackage {
    fn format(&self) -> PackageFormat {
        PackageFormat::Deb
    }

    fn target(&self) -> &InstallerTarget {
        &self.target
    }

    fn inspect(&self) -> ServiceOperatorManifest {
        linux_package_manifest()
    }

    fn preinstall(&self) -> Result<()> {
        let package = self
            .target
            .stage("linux", debian_architecture(), "deb", false)?;
        self.staged.set(package);
        Ok(())
    }

    fn install(&self) -> Result<()> {
        let package = format!(
            "/{}",
            self.staged
                .get_or(|| expected_package(&self.target, debian_architecture(), "deb"))
        );
        self.target
            .run(&["apt-get", "install", "-y", &package])
            .map(drop)
    }

    fn postinstall(&self) -> Result<()> {
        register_service(&self.target)
    }

    fn enroll(&self, token: &str) -> Result<()> {
        enroll_installed(&self.target, token)
    }

    fn start(&self) -> Result<()> {
        systemctl(&self.target, "start")
    }

    fn stop(&self) -> Result<()> {
        systemctl(&self.target, "stop")
    }

    fn uninstall(&self) -> Result<()> {
        self.target
            .run(&["apt-get", "remove", "-y", AGENT_ARTIFACT])
            .map(drop)
            .map_err(|e| e.context("failed to remove the agent package"))
    }
}
