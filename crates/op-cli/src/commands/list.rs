//! `op list` — List known services and stacks.

use std::path::PathBuf;

use clap::Args;
use op_common::types::ComposeKind;
use op_compose::OpContext;
use op_compose::composition::read_service_names;
use serde::Serialize;

/// Arguments for the `list` command.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Also show the services each stack defines.
    #[arg(short, long)]
    pub detailed: bool,

    /// Print the catalog as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct Entry {
    kind: &'static str,
    name: String,
    path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    services: Option<Vec<String>>,
}

/// Executes the `list` command.
///
/// # Errors
///
/// Returns an error if the registry is not initialized.
#[allow(clippy::print_stdout)]
pub fn execute(ctx: &OpContext, args: &ListArgs) -> anyhow::Result<()> {
    let entries = collect(ctx, args.detailed)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No services or stacks found.");
        return Ok(());
    }

    println!("{:<8} {:<20} PATH", "KIND", "NAME");
    for entry in &entries {
        println!("{:<8} {:<20} {}", entry.kind, entry.name, entry.path.display());
        if let Some(services) = &entry.services {
            println!("{:<29} {}", "", services.join(", "));
        }
    }
    Ok(())
}

fn collect(ctx: &OpContext, detailed: bool) -> anyhow::Result<Vec<Entry>> {
    let registry = ctx.registry();
    let resolver = ctx.resolver();
    let mut entries: Vec<Entry> = registry
        .services()?
        .into_iter()
        .map(|s| Entry {
            kind: "service",
            name: s.name,
            path: s.path,
            services: None,
        })
        .collect();

    for stack in registry.stacks()? {
        let services = if detailed {
            resolver
                .resolve(ComposeKind::Stack, &stack.name)
                .and_then(|path| read_service_names(&path))
                .map_err(|e| {
                    tracing::warn!(stack = %stack.name, error = %e, "could not read stack services");
                })
                .ok()
        } else {
            None
        };
        entries.push(Entry {
            kind: "stack",
            name: stack.name,
            path: stack.path,
            services,
        });
    }
    Ok(entries)
}
