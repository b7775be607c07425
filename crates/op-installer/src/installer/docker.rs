//! Container-native installer: the target service is the agent's own
//! container, so there is nothing to unpack and no package manager.

use op_common::constants::AGENT_ARTIFACT;
use op_common::error::Result;
use op_common::types::PackageFormat;

use super::{Installer, InstallerTarget, ServiceOperatorManifest};
use crate::artifact::debian_architecture;

/// Runs the agent from its container image.
#[derive(Debug, Clone)]
pub struct DockerPackage {
    target: InstallerTarget,
}

impl DockerPackage {
    /// Binds the installer to `target`.
    #[must_use]
    pub const fn new(target: InstallerTarget) -> Self {
        Self { target }
    }
}

impl Installer for DockerPackage {
    fn format(&self) -> PackageFormat {
        PackageFormat::Docker
    }

    fn target(&self) -> &InstallerTarget {
        &self.target
    }

    fn inspect(&self) -> ServiceOperatorManifest {
        ServiceOperatorManifest {
            work_dir: "/usr/share/elastic-agent".into(),
            commit_file: "/usr/share/elastic-agent/.elastic-agent.active.commit".into(),
        }
    }

    /// Loads the agent image into the engine so the composition can use it.
    fn preinstall(&self) -> Result<()> {
        let image = self
            .target
            .fetch("linux", debian_architecture(), "tar.gz", true)?;
        self.target.deployment().load_image(&image)
    }

    fn install(&self) -> Result<()> {
        tracing::trace!("no docker install instructions");
        Ok(())
    }

    fn enroll(&self, token: &str) -> Result<()> {
        self.target
            .run_with_flags(&[AGENT_ARTIFACT, "enroll"], token)
            .map(drop)
            .map_err(|e| e.context("failed to enroll the agent"))
    }

    fn start(&self) -> Result<()> {
        let target = &self.target;
        target.deployment().start(target.service())
    }

    fn stop(&self) -> Result<()> {
        let target = &self.target;
        target.deployment().stop(target.service())
    }

    fn uninstall(&self) -> Result<()> {
        tracing::trace!("no docker uninstall instructions, the container is removed on teardown");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::testing::{RecordingDeployment, target};
    use super::*;

    #[test]
    fn preinstall_loads_image_without_copying() {
        let deployment = Arc::new(RecordingDeployment::default());
        DockerPackage::new(target(deployment.clone()))
            .preinstall()
            .expect("preinstall");
        assert_eq!(
            deployment.calls(),
            vec![format!(
                "load /dl/elastic-agent-7.12.0-linux-{}.docker.tar.gz",
                debian_architecture()
            )]
        );
    }

    #[test]
    fn start_and_stop_use_container_lifecycle() {
        let deployment = Arc::new(RecordingDeployment::default());
        let installer = DockerPackage::new(target(deployment.clone()));
        installer.start().expect("start");
        installer.stop().expect("stop");
        assert_eq!(
            deployment.calls(),
            vec!["start centos-systemd", "stop centos-systemd"]
        );
    }

    #[test]
    fn install_and_uninstall_are_noops() {
        let deployment = Arc::new(RecordingDeployment::default());
        let installer = DockerPackage::new(target(deployment.clone()));
        installer.install().expect("install");
        installer.uninstall().expect("uninstall");
        assert!(deployment.calls().is_empty());
    }
}
