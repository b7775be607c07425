//! `.tar.gz` archive installer for Linux hosts running systemd.

use op_common::error::Result;
use op_common::types::PackageFormat;

use super::{Installer, InstallerTarget, ServiceOperatorManifest, systemctl};
use crate::artifact::architecture;

/// Directory the archive is unpacked to inside the service.
const STAGING_DIR: &str = "/elastic-agent";

/// Installs the agent from a plain archive.
#[derive(Debug, Clone)]
pub struct TarPackage {
    target: InstallerTarget,
}

impl TarPackage {
    /// Binds the installer to `target`.
    #[must_use]
    pub const fn new(target: InstallerTarget) -> Self {
        Self { target }
    }
}

impl Installer for TarPackage {
    fn format(&self) -> PackageFormat {
        PackageFormat::Tar
    }

    fn target(&self) -> &InstallerTarget {
        &self.target
    }

    fn inspect(&self) -> ServiceOperatorManifest {
        ServiceOperatorManifest {
            work_dir: "/opt/Elastic/Agent".into(),
            commit_file: format!("{STAGING_DIR}/.elastic-agent.active.commit"),
        }
    }

    fn preinstall(&self) -> Result<()> {
        let archive = self.target.stage("linux", architecture(), "tar.gz", false)?;
        let unpacked = archive.trim_end_matches(".tar.gz");

        let _ = self
            .target
            .run(&["tar", "-xzf", &format!("/{archive}"), "-C", "/"])?;
        let output = self
            .target
            .run(&["mv", &format!("/{unpacked}"), STAGING_DIR])?;
        tracing::trace!(output = %output, "moved elastic-agent");
        Ok(())
    }

    fn install(&self) -> Result<()> {
        tracing::trace!("no TAR install instructions");
        Ok(())
    }

    fn enroll(&self, token: &str) -> Result<()> {
        self.target
            .run_with_flags(&[&format!("{STAGING_DIR}/elastic-agent"), "install"], token)
            .map(drop)
            .map_err(|e| e.context("failed to install the agent with subcommand"))
    }

    fn start(&self) -> Result<()> {
        systemctl(&self.target, "start")
    }

    fn stop(&self) -> Result<()> {
        systemctl(&self.target, "stop")
    }

    fn uninstall(&self) -> Result<()> {
        self.target
            .run(&["elastic-agent", "uninstall", "-f"])
            .map(drop)
            .map_err(|e| e.context("failed to uninstall the agent with subcommand"))
    }
}
