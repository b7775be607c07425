//! RPM installer for yum-based hosts.

use op_common::constants::AGENT_ARTIFACT;
use op_common::error::Result;
use op_common::types::PackageFormat;

use super::{Installer, InstallerTarget, ServiceOperatorManifest, StagedFile, systemctl};
use crate::artifact::{ArtifactName, architecture, build_artifact_name};

/// Installs the agent from an RPM package.
#[derive(Debug)]
pub struct RpmPackage {
    target: InstallerTarget,
    staged: StagedFile,
}

impl RpmPackage {
    /// Binds the installer to `target`.
    #[must_use]
    pub fn new(target: InstallerTarget) -> Self {
        Self {
            target,
            staged: StagedFile::default(),
        }
    }
}

impl Installer for RpmPackage {
    fn format(&self) -> PackageFormat {
        PackageFormat::Rpm
    }

    fn target(&self) -> &InstallerTarget {
        &self.target
    }

    fn inspect(&self) -> ServiceOperatorManifest {
        linux_package_manifest()
    }

    fn preinstall(&self) -> Result<()> {
        let package = self.target.stage("linux", architecture(), "rpm", false)?;
        self.staged.set(package);
        Ok(())
    }

    fn install(&self) -> Result<()> {
        let package = format!(
            "/{}",
            self.staged
                .get_or(|| expected_package(&self.target, architecture(), "rpm"))
        );
        self.target
            .run(&["yum", "localinstall", "-y", &package])
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
            .run(&["yum", "remove", "-y", AGENT_ARTIFACT])
            .map(drop)
            .map_err(|e| e.context("failed to remove the agent package"))
    }
}

/// Package file name for the configured version, used when `install`
/// runs without a preceding `preinstall`.
pub(super) fn expected_package(target: &InstallerTarget, arch: &str, extension: &str) -> String {
    build_artifact_name(&ArtifactName {
        artifact: AGENT_ARTIFACT,
        version: &target.settings().version,
        os: "linux",
        arch,
        extension,
        docker: false,
        snapshot: false,
    })
}

/// Layout shared by the RPM and DEB packages.
pub(super) fn linux_package_manifest() -> ServiceOperatorManifest {
    ServiceOperatorManifest {
        work_dir: "/var/lib/elastic-agent".into(),
        commit_file: "/usr/share/elastic-agent/.elastic-agent.active.commit".into(),
    }
}

/// Makes systemd pick up the freshly installed unit and enable it.
pub(super) fn register_service(target: &InstallerTarget) -> Result<()> {
    let _ = target.run(&["systemctl", "daemon-reload"])?;
    systemctl(target, "enable")
}

/// Enrolls a package-installed agent, which is already on the `PATH`.
pub(super) fn enroll_installed(target: &InstallerTarget, token: &str) -> Result<()> {
    target
        .run_with_flags(&[AGENT_ARTIFACT, "enroll"], token)
        .map(drop)
        .map_err(|e| e.context("failed to enroll the agent"))
}
