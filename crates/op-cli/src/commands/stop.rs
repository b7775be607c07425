//! `op stop` — Tear down a service or a stack.

use clap::Args;
use op_compose::OpContext;

use super::{KindArg, require_compose_tools};

/// Arguments for the `stop` command.
#[derive(Args, Debug)]
pub struct StopArgs {
    /// Whether `name` is a service or a stack.
    #[arg(value_enum)]
    pub kind: KindArg,

    /// Service or stack name.
    pub name: String,

    /// Services that were layered on top of the stack.
    #[arg(short, long = "service")]
    pub services: Vec<String>,
}

/// Executes the `stop` command.
///
/// # Errors
///
/// Returns an error if a composition file cannot be resolved or the
/// compose tool fails.
pub fn execute(ctx: &OpContext, args: StopArgs) -> anyhow::Result<()> {
    require_compose_tools(ctx)?;

    let names: Vec<String> = std::iter::once(args.name).chain(args.services).collect();
    ctx.orchestrator().down(args.kind.into(), &names)?;
    tracing::info!(kind = ?args.kind, names = ?names, "environment is down");
    Ok(())
}
