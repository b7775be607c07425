//! `op run` — Bring up a service or a stack.

use clap::Args;
use op_compose::OpContext;

use super::{KindArg, compose_env, parse_key_val, require_compose_tools};

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Whether `name` is a service or a stack.
    #[arg(value_enum)]
    pub kind: KindArg,

    /// Service or stack name.
    pub name: String,

    /// Services layered on top of a stack.
    #[arg(short, long = "service")]
    pub services: Vec<String>,

    /// Version exported to the services' composition files.
    #[arg(short, long, default_value = "latest")]
    pub version: String,

    /// Extra environment for the compose tool, as KEY=VALUE.
    #[arg(short, long, value_parser = parse_key_val)]
    pub env: Vec<(String, String)>,
}

/// Executes the `run` command.
///
/// # Errors
///
/// Returns an error if a composition file cannot be resolved or the
/// compose tool fails.
pub fn execute(ctx: &OpContext, args: RunArgs) -> anyhow::Result<()> {
    require_compose_tools(ctx)?;

    let mut services = args.services;
    if args.kind == KindArg::Service {
        services.insert(0, args.name.clone());
    }
    let env = compose_env(ctx, &services, &args.version, args.env)?;

    let names = match args.kind {
        KindArg::Service => services,
        KindArg::Stack => std::iter::once(args.name).chain(services).collect(),
    };
    ctx.orchestrator().up(args.kind.into(), &names, &env)?;
    tracing::info!(kind = ?args.kind, names = ?names, "environment is up");
    Ok(())
}
