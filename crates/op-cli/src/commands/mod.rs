//! CLI command definitions and dispatch.

pub mod agent;
pub mod deploy;
pub mod list;
pub mod run;
pub mod stop;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use op_common::config::{OpConfig, check_required_binaries};
use op_common::constants::DOCKER_BIN;
use op_common::types::ComposeKind;
use op_compose::OpContext;
use op_compose::engine::ComposeEnv;
use op_compose::env::put_service_environment;

/// op — compose test environments and drive agent installs.
#[derive(Parser, Debug)]
#[command(name = "op", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Workspace root holding materialized composition files.
    #[arg(long, global = true, env = "OP_WORKSPACE")]
    pub workspace: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bring up a service or a stack.
    Run(run::RunArgs),
    /// Tear down a service or a stack.
    Stop(stop::StopArgs),
    /// Add services to a running stack.
    Deploy(deploy::DeployArgs),
    /// Remove services from a running stack.
    Undeploy(deploy::DeployArgs),
    /// List known services and stacks.
    List(list::ListArgs),
    /// Run agent installer steps inside a service.
    Agent(agent::AgentArgs),
}

/// Composition kind as typed on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    /// A single service.
    Service,
    /// A stack, optionally with services layered on top.
    Stack,
}

impl From<KindArg> for ComposeKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Service => Self::Service,
            KindArg::Stack => Self::Stack,
        }
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli, config: OpConfig) -> anyhow::Result<()> {
    let ctx = OpContext::new(config);
    if let Err(e) = ctx.initialize() {
        tracing::error!(error = %e, "could not initialize the service registry");
    }

    match cli.command {
        Command::Run(args) => run::execute(&ctx, args),
        Command::Stop(args) => stop::execute(&ctx, args),
        Command::Deploy(args) => deploy::execute_deploy(&ctx, args),
        Command::Undeploy(args) => deploy::execute_undeploy(&ctx, args),
        Command::List(args) => list::execute(&ctx, &args),
        Command::Agent(args) => agent::execute(&ctx, args),
    }
}

/// Fails early when docker or the compose binary is not on the `PATH`.
fn require_compose_tools(ctx: &OpContext) -> anyhow::Result<()> {
    check_required_binaries(&[DOCKER_BIN, &ctx.config().compose_bin])?;
    Ok(())
}

/// Builds the compose environment for `services` plus user overrides.
fn compose_env(
    ctx: &OpContext,
    services: &[String],
    version: &str,
    overrides: Vec<(String, String)>,
) -> anyhow::Result<ComposeEnv> {
    let mut env = ComposeEnv::new();
    for service in services {
        put_service_environment(ctx.registry(), &mut env, service, version)?;
    }
    env.extend(overrides);
    Ok(env)
}

/// Parses a `KEY=VALUE` pair.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{s}`"))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}
