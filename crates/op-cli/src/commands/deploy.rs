//! `op deploy` / `op undeploy` — Add or remove services on a running stack.

use clap::Args;
use op_compose::OpContext;

use super::{compose_env, parse_key_val, require_compose_tools};

/// Arguments shared by `deploy` and `undeploy`.
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Running stack.
    pub stack: String,

    /// Services to add or remove.
    #[arg(required = true)]
    pub services: Vec<String>,

    /// Version exported to the services' composition files.
    #[arg(short, long, default_value = "latest")]
    pub version: String,

    /// Extra environment for the compose tool, as KEY=VALUE.
    #[arg(short, long, value_parser = parse_key_val)]
    pub env: Vec<(String, String)>,
}

/// Executes the `deploy` command.
///
/// # Errors
///
/// Returns an error if a composition file cannot be resolved or the
/// compose tool fails.
pub fn execute_deploy(ctx: &OpContext, args: DeployArgs) -> anyhow::Result<()> {
    require_compose_tools(ctx)?;

    let env = compose_env(ctx, &args.services, &args.version, args.env)?;
    ctx.orchestrator()
        .add_services(&args.stack, &args.services, &env)?;
    tracing::info!(stack = %args.stack, services = ?args.services, "services deployed");
    Ok(())
}

/// Executes the `undeploy` command. Removal stops at the first service
/// that fails; services removed before it stay removed.
///
/// # Errors
///
/// Returns the first removal failure.
pub fn execute_undeploy(ctx: &OpContext, args: DeployArgs) -> anyhow::Result<()> {
    require_compose_tools(ctx)?;

    ctx.orchestrator()
        .remove_services(&args.stack, &args.services)?;
    tracing::info!(stack = %args.stack, services = ?args.services, "services removed");
    Ok(())
}
