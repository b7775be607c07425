//! # op-installer
//!
//! Installing, enrolling, and removing the agent inside running services.
//!
//! Handles:
//! - **Deployment**: the seam to the running services (copy, exec, logs).
//! - **Artifacts**: artifact naming and download with checksum checks.
//! - **Fleet**: enrollment flags.
//! - **Installers**: one implementation per package format.
//! - **Lifecycle**: tracking which installer step last succeeded.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod artifact;
pub mod deploy;
pub mod fleet;
pub mod installer;
pub mod lifecycle;

pub use installer::{Installer, attach};
pub use lifecycle::{InstallerHandle, LifecycleState};
