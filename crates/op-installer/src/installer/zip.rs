//! Windows `.zip` installer; the agent runs under the service control
//! manager once installed.

use op_common::error::Result;
use op_common::types::PackageFormat;

use super::{Installer, InstallerTarget, ServiceOperatorManifest};
use crate::artifact::architecture;

const STAGING_DIR: &str = r"C:\elastic-agent";
const INSTALL_DIR: &str = r"C:\Program Files\Elastic\Agent";
const SERVICE_NAME: &str = "Elastic Agent";

/// Installs the agent from a Windows archive.
#[derive(Debug, Clone)]
pub struct ZipPackage {
    target: InstallerTarget,
}

impl ZipPackage {
    /// Binds the installer to `target`.
    #[must_use]
    pub const fn new(target: InstallerTarget) -> Self {
        Self { target }
    }

    fn service_control(&self, action: &str) -> Result<()> {
        self.target
            .run(&["sc.exe", action, SERVICE_NAME])
            .map(drop)
    }
}

impl Installer for ZipPackage {
    fn format(&self) -> PackageFormat {
        PackageFormat::Zip
    }

    fn target(&self) -> &InstallerTarget {
        &self.target
    }

    fn inspect(&self) -> ServiceOperatorManifest {
        ServiceOperatorManifest {
            work_dir: INSTALL_DIR.into(),
            commit_file: format!(r"{STAGING_DIR}\.elastic-agent.active.commit"),
        }
    }

    fn preinstall(&self) -> Result<()> {
        let archive = self.target.stage("windows", architecture(), "zip", false)?;
        let unpacked = archive.trim_end_matches(".zip");

        let _ = self.target.run(&[
            "powershell",
            "-Command",
            "Expand-Archive",
            "-Path",
            &format!(r"C:\{archive}"),
            "-DestinationPath",
            r"C:\",
            "-Force",
        ])?;
        let _ = self.target.run(&[
            "powershell",
            "-Command",
            "Rename-Item",
            "-Path",
            &format!(r"C:\{unpacked}"),
            "-NewName",
            "elastic-agent",
        ])?;
        Ok(())
    }

    fn install(&self) -> Result<()> {
        tracing::trace!("no zip install instructions");
        Ok(())
    }

    fn enroll(&self, token: &str) -> Result<()> {
        self.target
            .run_with_flags(&[&format!(r"{STAGING_DIR}\elastic-agent.exe"), "install"], token)
            .map(drop)
            .map_err(|e| e.context("failed to install the agent with subcommand"))
    }

    fn start(&self) -> Result<()> {
        self.service_control("start")
    }

    fn stop(&self) -> Result<()> {
        self.service_control("stop")
    }

    fn uninstall(&self) -> Result<()> {
        self.target
            .run(&[&format!(r"{INSTALL_DIR}\elastic-agent.exe"), "uninstall", "-f"])
            .map(drop)
            .map_err(|e| e.context("failed to uninstall the agent with subcommand"))
    }
}
