//! # op — environment operator
//!
//! Brings composed test environments up and down, and installs the
//! agent into their services.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

mod commands;

use clap::Parser;
use op_common::config::OpConfig;
use tracing_subscriber::EnvFilter;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = OpConfig::from_env()?;
    if let Some(workspace) = &cli.workspace {
        config.workspace.clone_from(workspace);
    }

    init_tracing(&config);
    commands::execute(cli, config)
}

/// `RUST_LOG` wins over `OP_LOG_LEVEL`.
fn init_tracing(config: &OpConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_directive()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.log_timestamps {
        builder.init();
    } else {
        builder.without_time().init();
    }
}
