//! # op-compose
//!
//! Resolution and orchestration of named composition files.
//!
//! Handles:
//! - **Assets**: the read-only set of default composition files.
//! - **Resolver**: name → file, materializing bundled defaults into the workspace.
//! - **Registry**: the catalog of known services and stacks.
//! - **Orchestrator**: bringing stacks and services up and down as groups.
//! - **Engine**: the seam to the external compose tool.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod assets;
pub mod composition;
pub mod context;
pub mod engine;
pub mod env;
pub mod orchestrator;
pub mod registry;
pub mod resolver;

pub use context::OpContext;
