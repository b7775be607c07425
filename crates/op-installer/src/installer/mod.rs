//! Agent installers, one per package format.
//!
//! Every format implements the same [`Installer`] operations with
//! format-specific commands. [`attach`] picks the implementation for a
//! format and binds it to one running service.
//!
//! Installers do not check that operations are called in order: calling
//! `start` before `install` runs `start` and reports whatever the
//! underlying command reports.

mod deb;
mod docker;
mod rpm;
mod tar;
mod zip;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use op_common::config::{FleetSettings, OpConfig};
use op_common::constants::AGENT_ARTIFACT;
use op_common::error::{OpError, Result};
use op_common::types::PackageFormat;
use serde::{Deserialize, Serialize};

use crate::artifact::{ArtifactFetcher, ArtifactName, ArtifactRequest, build_artifact_name};
use crate::deploy::{Deployment, ServiceRequest};
use crate::fleet::EnrollmentConfig;

pub use deb::DebPackage;
pub use docker::DockerPackage;
pub use rpm::RpmPackage;
pub use tar::TarPackage;
pub use zip::ZipPackage;

/// Where an installed agent keeps its payload and version marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOperatorManifest {
    /// Directory holding the installed agent.
    pub work_dir: String,
    /// File recording the active build commit.
    pub commit_file: String,
}

/// Version and fleet settings an installer works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerSettings {
    /// Agent version to install.
    pub version: String,
    /// Version tried when `version` has no published artifact.
    pub base_version: String,
    /// Fleet server used by `enroll`.
    pub fleet: FleetSettings,
}

impl InstallerSettings {
    /// Takes the agent and fleet settings from the harness configuration.
    #[must_use]
    pub fn from_config(config: &OpConfig) -> Self {
        Self {
            version: config.agent_version.clone(),
            base_version: config.agent_base_version.clone(),
            fleet: config.fleet.clone(),
        }
    }
}

/// The service an installer operates on, and the collaborators it uses.
#[derive(Clone)]
pub struct InstallerTarget {
    service: ServiceRequest,
    deployment: Arc<dyn Deployment>,
    fetcher: Arc<dyn ArtifactFetcher>,
    settings: InstallerSettings,
}

impl std::fmt::Debug for InstallerTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallerTarget")
            .field("service", &self.service)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl InstallerTarget {
    /// Binds a service to its deployment and artifact source.
    #[must_use]
    pub fn new(
        service: ServiceRequest,
        deployment: Arc<dyn Deployment>,
        fetcher: Arc<dyn ArtifactFetcher>,
        settings: InstallerSettings,
    ) -> Self {
        Self {
            service,
            deployment,
            fetcher,
            settings,
        }
    }

    /// The targeted service.
    #[must_use]
    pub const fn service(&self) -> &ServiceRequest {
        &self.service
    }

    /// Installer settings.
    #[must_use]
    pub const fn settings(&self) -> &InstallerSettings {
        &self.settings
    }

    pub(crate) fn deployment(&self) -> &dyn Deployment {
        self.deployment.as_ref()
    }

    pub(crate) fn run(&self, args: &[&str]) -> Result<String> {
        let args: Vec<String> = args.iter().map(ToString::to_string).collect();
        self.deployment.exec_in(&self.service, &args)
    }

    pub(crate) fn run_with_flags(&self, args: &[&str], token: &str) -> Result<String> {
        let mut full: Vec<String> = args.iter().map(ToString::to_string).collect();
        full.extend(EnrollmentConfig::new(token, self.settings.fleet.clone()).flags());
        self.deployment.exec_in(&self.service, &full)
    }

    /// Fetches the agent artifact for this format and copies it into the
    /// service, returning the artifact's file name.
    pub(crate) fn stage(&self, os: &str, arch: &str, extension: &str, docker: bool) -> Result<String> {
        let local = self.fetch(os, arch, extension, docker)?;
        self.deployment
            .add_files(&self.service, std::slice::from_ref(&local))?;
        file_name(&local)
    }

    /// Fetches the agent artifact for this format to a local path.
    pub(crate) fn fetch(&self, os: &str, arch: &str, extension: &str, docker: bool) -> Result<PathBuf> {
        let name_for = |version: &str| {
            build_artifact_name(&ArtifactName {
                artifact: AGENT_ARTIFACT,
                version,
                os,
                arch,
                extension,
                docker,
                snapshot: false,
            })
        };
        let request = ArtifactRequest {
            artifact: AGENT_ARTIFACT.into(),
            file_name: name_for(&self.settings.version),
            fallback_file_name: (self.settings.base_version != self.settings.version)
                .then(|| name_for(&self.settings.base_version)),
        };

        self.fetcher.fetch_binary(&request).map_err(|e| {
            tracing::error!(
                artifact = AGENT_ARTIFACT,
                version = %self.settings.version,
                os,
                arch,
                extension,
                error = %e,
                "could not download the binary for the agent"
            );
            e
        })
    }
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| OpError::NotFound {
            kind: "artifact file name",
            name: path.to_string_lossy().into_owned(),
        })
}

/// Name of the package file `preinstall` copied into the service.
#[derive(Debug, Default)]
pub(crate) struct StagedFile(Mutex<Option<String>>);

impl StagedFile {
    pub(crate) fn set(&self, name: String) {
        if let Ok(mut staged) = self.0.lock() {
            *staged = Some(name);
        }
    }

    /// The staged name, or `expected` when nothing was staged by this
    /// installer (the package may have been copied in by other means).
    pub(crate) fn get_or(&self, expected: impl FnOnce() -> String) -> String {
        self.0
            .lock()
            .ok()
            .and_then(|staged| staged.clone())
            .unwrap_or_else(expected)
    }
}

/// Runs `systemctl <action> elastic-agent` in the target.
pub(crate) fn systemctl(target: &InstallerTarget, action: &str) -> Result<()> {
    target
        .run(&["systemctl", action, AGENT_ARTIFACT])
        .map(drop)
}

/// Lifecycle operations of an agent package.
pub trait Installer: Send + Sync {
    /// Package format this installer handles.
    fn format(&self) -> PackageFormat;

    /// The service and collaborators this installer is bound to.
    fn target(&self) -> &InstallerTarget;

    /// Where the installed payload and its version marker live.
    fn inspect(&self) -> ServiceOperatorManifest;

    /// Fetches the artifact for the host architecture and stages it.
    ///
    /// # Errors
    ///
    /// Returns an error if fetching, copying, or unpacking fails.
    fn preinstall(&self) -> Result<()>;

    /// Installs the staged package.
    ///
    /// # Errors
    ///
    /// Returns the package manager's failure.
    fn install(&self) -> Result<()>;

    /// Installs certificates the agent needs. Most formats need none.
    ///
    /// # Errors
    ///
    /// Returns the underlying command's failure.
    fn install_certs(&self) -> Result<()> {
        Ok(())
    }

    /// Registers the installed package with the service manager.
    ///
    /// # Errors
    ///
    /// Returns the underlying command's failure.
    fn postinstall(&self) -> Result<()> {
        Ok(())
    }

    /// Enrolls the agent into fleet with `token`.
    ///
    /// # Errors
    ///
    /// Returns the enrollment command's failure, wrapped with context.
    fn enroll(&self, token: &str) -> Result<()>;

    /// Starts the agent.
    ///
    /// # Errors
    ///
    /// Returns the service manager's failure.
    fn start(&self) -> Result<()>;

    /// Stops the agent.
    ///
    /// # Errors
    ///
    /// Returns the service manager's failure.
    fn stop(&self) -> Result<()>;

    /// Removes the agent.
    ///
    /// # Errors
    ///
    /// Returns the removal command's failure, wrapped with context.
    fn uninstall(&self) -> Result<()>;

    /// Runs `args` inside the target service.
    ///
    /// # Errors
    ///
    /// Returns the deployment's failure.
    fn exec(&self, args: &[String]) -> Result<String> {
        let target = self.target();
        target.deployment.exec_in(&target.service, args)
    }

    /// Copies `files` into the target service.
    ///
    /// # Errors
    ///
    /// Returns the deployment's failure.
    fn add_files(&self, files: &[PathBuf]) -> Result<()> {
        let target = self.target();
        target.deployment.add_files(&target.service, files)
    }

    /// Emits the target service's logs.
    ///
    /// # Errors
    ///
    /// Returns the deployment's failure.
    fn logs(&self) -> Result<()> {
        let target = self.target();
        target.deployment.logs(&target.service)
    }
}

/// Creates the installer for `format`, bound to `target`.
#[must_use]
pub fn attach(format: PackageFormat, target: InstallerTarget) -> Box<dyn Installer> {
    tracing::debug!(format = %format, service = %target.service.name, "attaching installer");
    match format {
        PackageFormat::Tar => Box::new(TarPackage::new(target)),
        PackageFormat::Rpm => Box::new(RpmPackage::new(target)),
        PackageFormat::Deb => Box::new(DebPackage::new(target)),
        PackageFormat::Docker => Box::new(DockerPackage::new(target)),
        PackageFormat::Zip => Box::new(ZipPackage::new(target)),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn attach_selects_implementation_by_format() {
        for format in PackageFormat::ALL {
            let installer = attach(format, target(Arc::new(RecordingDeployment::default())));
            assert_eq!(installer.format(), format);
        }
    }

    #[test]
    fn pass_throughs_target_bound_service() {
        let deployment = Arc::new(RecordingDeployment::default());
        let installer = attach(PackageFormat::Rpm, target(deployment.clone()));
        let _ = installer.exec(&["whoami".into()]).expect("exec");
        installer.add_files(&[PathBuf::from("/tmp/a")]).expect("add");
        installer.logs().expect("logs");
        assert_eq!(
            deployment.calls(),
            vec!["exec whoami", "add /tmp/a", "logs centos-systemd"]
        );
    }

    #[test]
    fn fetch_failure_is_returned() {
        struct Unreachable;
        impl ArtifactFetcher for Unreachable {
            fn fetch_binary(&self, request: &ArtifactRequest) -> Result<PathBuf> {
                Err(OpError::NotFound {
                    kind: "artifact",
                    name: request.file_name.clone(),
                })
            }
        }
        let deployment = Arc::new(RecordingDeployment::default());
        let target = InstallerTarget::new(
            ServiceRequest::new("fleet-server", "centos-systemd"),
            deployment.clone(),
            Arc::new(Unreachable),
            settings(),
        );
        let err = attach(PackageFormat::Tar, target).preinstall().expect_err("no artifact");
        assert!(matches!(err, OpError::NotFound { kind: "artifact", .. }));
        assert!(deployment.calls().is_empty());
    }

    #[test]
    fn fallback_name_only_when_versions_differ() {
        struct Capture(std::sync::Mutex<Option<ArtifactRequest>>);
        impl ArtifactFetcher for Capture {
            fn fetch_binary(&self, request: &ArtifactRequest) -> Result<PathBuf> {
                *self.0.lock().expect("lock") = Some(request.clone());
                Ok(PathBuf::from("/dl").join(&request.file_name))
            }
        }
        let capture = Arc::new(Capture(std::sync::Mutex::new(None)));
        let mut settings = settings();
        settings.version = "8.0.0-SNAPSHOT".into();
        let target = InstallerTarget::new(
            ServiceRequest::new("p", "s"),
            Arc::new(RecordingDeployment::default()),
            capture.clone(),
            settings,
        );
        let _ = target.fetch("linux", "x86_64", "rpm", false).expect("fetch");
        let request = capture.0.lock().expect("lock").clone().expect("captured");
        assert_eq!(request.file_name, "elastic-agent-8.0.0-SNAPSHOT-x86_64.rpm");
        assert_eq!(
            request.fallback_file_name.as_deref(),
            Some("elastic-agent-7.12.0-x86_64.rpm")
        );
    }
}
