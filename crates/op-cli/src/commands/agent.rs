//! `op agent` — Run agent installer steps inside a running service.

use std::sync::Arc;

use clap::{Args, ValueEnum};
use op_common::config::check_required_binaries;
use op_common::constants::DOCKER_BIN;
use op_common::types::PackageFormat;
use op_compose::OpContext;
use op_installer::artifact::HttpArtifactFetcher;
use op_installer::deploy::{DockerDeployment, ServiceRequest};
use op_installer::installer::{InstallerSettings, InstallerTarget};
use op_installer::{InstallerHandle, attach};

/// Installer step, in the order they are usually run.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Fetch and stage the artifact.
    Preinstall,
    /// Install the staged package.
    Install,
    /// Register the installed package with the service manager.
    Postinstall,
    /// Enroll into fleet.
    Enroll,
    /// Start the agent.
    Start,
    /// Stop the agent.
    Stop,
    /// Remove the agent.
    Uninstall,
    /// Emit the service's logs.
    Logs,
    /// Report where the agent is installed.
    Inspect,
}

/// Arguments for the `agent` command.
#[derive(Args, Debug)]
pub struct AgentArgs {
    /// Package format of the agent.
    #[arg(short, long)]
    pub format: PackageFormat,

    /// Compose project the service runs in.
    #[arg(short, long)]
    pub project: String,

    /// Service hosting the agent.
    #[arg(short, long)]
    pub service: String,

    /// Fleet enrollment token.
    #[arg(short, long, env = "FLEET_ENROLLMENT_TOKEN", default_value = "")]
    pub token: String,

    /// Steps to run, in order.
    #[arg(value_enum, required = true)]
    pub steps: Vec<Step>,
}

/// Executes the `agent` command. Steps run in the given order and stop
/// at the first failure.
///
/// # Errors
///
/// Returns the first failing step's error.
pub fn execute(ctx: &OpContext, args: AgentArgs) -> anyhow::Result<()> {
    check_required_binaries(&[DOCKER_BIN])?;

    let config = ctx.config();
    let fetcher = HttpArtifactFetcher::new(config.artifacts_url.clone(), config.downloads_dir())
        .with_local_path(config.beats_local_path.clone());
    let target = InstallerTarget::new(
        ServiceRequest::new(args.project, args.service),
        Arc::new(DockerDeployment::new(DOCKER_BIN)),
        Arc::new(fetcher),
        InstallerSettings::from_config(config),
    );
    let mut handle = InstallerHandle::new(attach(args.format, target));

    for step in args.steps {
        run_step(&mut handle, step, &args.token)
            .map_err(|e| anyhow::anyhow!("{step:?} failed: {e}"))?;
    }

    tracing::info!(format = %args.format, state = %handle.state(), "agent steps completed");
    Ok(())
}

fn run_step(handle: &mut InstallerHandle, step: Step, token: &str) -> op_common::error::Result<()> {
    match step {
        Step::Preinstall => handle.preinstall(),
        Step::Install => handle.install(),
        Step::Postinstall => handle.postinstall(),
        Step::Enroll => handle.enroll(token),
        Step::Start => handle.start(),
        Step::Stop => handle.stop(),
        Step::Uninstall => handle.uninstall(),
        Step::Logs => handle.installer().logs(),
        Step::Inspect => {
            let manifest = handle.installer().inspect();
            tracing::info!(
                work_dir = %manifest.work_dir,
                commit_file = %manifest.commit_file,
                "agent layout"
            );
            Ok(())
        }
    }
}
