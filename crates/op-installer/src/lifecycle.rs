//! Lifecycle tracking for an attached installer.

use std::fmt;

use op_common::error::Result;
use serde::{Deserialize, Serialize};

use crate::installer::Installer;

/// Last installer step that completed successfully.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Nothing has run yet.
    #[default]
    Unstaged,
    /// The artifact is fetched and staged in the service.
    Preinstalled,
    /// The package is installed.
    Installed,
    /// The agent is enrolled into fleet.
    Enrolled,
    /// The agent is running.
    Started,
    /// The agent is stopped.
    Stopped,
    /// The agent was removed.
    Uninstalled,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unstaged => "unstaged",
            Self::Preinstalled => "preinstalled",
            Self::Installed => "installed",
            Self::Enrolled => "enrolled",
            Self::Started => "started",
            Self::Stopped => "stopped",
            Self::Uninstalled => "uninstalled",
        };
        write!(f, "{s}")
    }
}

/// An installer plus the state its last successful step left it in.
///
/// The order of steps is not enforced; a failed step leaves the state
/// untouched.
pub struct InstallerHandle {
    installer: Box<dyn Installer>,
    state: LifecycleState,
}

impl fmt::Debug for InstallerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallerHandle")
            .field("format", &self.installer.format())
            .field("state", &self.state)
            .finish()
    }
}

impl InstallerHandle {
    /// Wraps a freshly attached installer.
    #[must_use]
    pub fn new(installer: Box<dyn Installer>) -> Self {
        Self {
            installer,
            state: LifecycleState::Unstaged,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// The wrapped installer.
    #[must_use]
    pub fn installer(&self) -> &dyn Installer {
        self.installer.as_ref()
    }

    fn step(
        &mut self,
        name: &'static str,
        next: LifecycleState,
        op: impl FnOnce(&dyn Installer) -> Result<()>,
    ) -> Result<()> {
        let format = self.installer.format();
        tracing::debug!(%format, step = name, from = %self.state, "running installer step");
        match op(self.installer.as_ref()) {
            Ok(()) => {
                tracing::info!(%format, step = name, state = %next, "installer step completed");
                self.state = next;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(%format, step = name, state = %self.state, error = %e, "installer step failed");
                Err(e)
            }
        }
    }

    /// Runs `preinstall`.
    ///
    /// # Errors
    ///
    /// Returns the installer's failure.
    pub fn preinstall(&mut self) -> Result<()> {
        self.step("preinstall", LifecycleState::Preinstalled, |i| i.preinstall())
    }

    /// Runs `install` followed by `install_certs`.
    ///
    /// # Errors
    ///
    /// Returns the installer's failure.
    pub fn install(&mut self) -> Result<()> {
        self.step("install", LifecycleState::Installed, |i| {
            i.install()?;
            i.install_certs()
        })
    }

    /// Runs `postinstall`. Moves the state up to `Installed`; a later
    /// state such as `Enrolled` or `Started` is kept.
    ///
    /// # Errors
    ///
    /// Returns the installer's failure.
    pub fn postinstall(&mut self) -> Result<()> {
        let next = match self.state {
            LifecycleState::Unstaged | LifecycleState::Preinstalled | LifecycleState::Installed => {
                LifecycleState::Installed
            }
            later => later,
        };
        self.step("postinstall", next, |i| i.postinstall())
    }

    /// Runs `enroll` with `token`.
    ///
    /// # Errors
    ///
    /// Returns the installer's failure.
    pub fn enroll(&mut self, token: &str) -> Result<()> {
        self.step("enroll", LifecycleState::Enrolled, |i| i.enroll(token))
    }

    /// Runs `start`.
    ///
    /// # Errors
    ///
    /// Returns the installer's failure.
    pub fn start(&mut self) -> Result<()> {
        self.step("start", LifecycleState::Started, |i| i.start())
    }

    /// Runs `stop`.
    ///
    /// # Errors
    ///
    /// Returns the installer's failure.
    pub fn stop(&mut self) -> Result<()> {
        self.step("stop", LifecycleState::Stopped, |i| i.stop())
    }

    /// Runs `uninstall`.
    ///
    /// # Errors
    ///
    /// Returns the installer's failure.
    pub fn uninstall(&mut self) -> Result<()> {
        self.step("uninstall", LifecycleState::Uninstalled, |i| i.uninstall())
    }
}
