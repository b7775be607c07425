//! Brings composed environments up and down.
//!
//! The first name of every call is the primary one: it labels the composed
//! environment and, for stacks, is the base composition file that the
//! remaining service files are layered over.

use std::path::PathBuf;

use op_common::error::{OpError, Result};
use op_common::types::ComposeKind;

use crate::engine::{ComposeEngine, ComposeEnv, ComposeInvocation};
use crate::resolver::ComposeResolver;

/// Drives a [`ComposeEngine`] over resolved composition files.
pub struct ComposeOrchestrator {
    resolver: ComposeResolver,
    engine: Box<dyn ComposeEngine>,
}

impl ComposeOrchestrator {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(resolver: ComposeResolver, engine: Box<dyn ComposeEngine>) -> Self {
        Self { resolver, engine }
    }

    /// Brings up `names` as one composed environment.
    ///
    /// With [`ComposeKind::Stack`] the first name is a stack and the rest
    /// are services layered on top; otherwise every name is a service.
    ///
    /// # Errors
    ///
    /// Returns a resolution error or the engine's failure.
    pub fn up<S: AsRef<str>>(&self, kind: ComposeKind, names: &[S], env: &ComposeEnv) -> Result<()> {
        let paths = self.resolve_paths(kind, names, false)?;
        self.execute(paths, primary(names)?, &["up", "-d"], env.clone())
    }

    /// Tears down the environment composed from `names`.
    ///
    /// A single one-character service name is resolved as a stack.
    ///
    /// # Errors
    ///
    /// Returns a resolution error or the engine's failure.
    pub fn down<S: AsRef<str>>(&self, kind: ComposeKind, names: &[S]) -> Result<()> {
        let paths = self.resolve_paths(kind, names, true)?;
        self.execute(
            paths,
            primary(names)?,
            &["down", "--remove-orphans"],
            ComposeEnv::new(),
        )
    }

    /// Adds `services` to the running `stack`.
    ///
    /// # Errors
    ///
    /// Returns a resolution error or the engine's failure.
    pub fn add_services<S: AsRef<str>>(
        &self,
        stack: &str,
        services: &[S],
        env: &ComposeEnv,
    ) -> Result<()> {
        tracing::debug!(stack, services = ?names_of(services), "adding services to compose");
        let names = with_stack(stack, services);
        self.up(ComposeKind::Stack, &names, env)
    }

    /// Stops and removes each of `services` from the running `stack`, one at
    /// a time.
    ///
    /// Stops at the first failure and returns it unchanged. Services removed
    /// before the failure stay removed.
    ///
    /// # Errors
    ///
    /// Returns a resolution error or the first engine failure.
    pub fn remove_services<S: AsRef<str>>(&self, stack: &str, services: &[S]) -> Result<()> {
        tracing::debug!(stack, services = ?names_of(services), "removing services from compose");
        let names = with_stack(stack, services);
        let paths = self.resolve_paths(ComposeKind::Stack, &names, false)?;

        for service in services {
            let service = service.as_ref();
            if let Err(e) = self.execute(
                paths.clone(),
                stack,
                &["rm", "-fvs", service],
                ComposeEnv::new(),
            ) {
                tracing::error!(service, stack, error = %e, "could not remove service");
                return Err(e);
            }
        }
        Ok(())
    }

    fn resolve_paths<S: AsRef<str>>(
        &self,
        kind: ComposeKind,
        names: &[S],
        bare_name_is_stack: bool,
    ) -> Result<Vec<PathBuf>> {
        let single_bare_name = bare_name_is_stack
            && kind == ComposeKind::Service
            && names.len() == 1
            && names[0].as_ref().chars().count() == 1;

        names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let kind = if i == 0 && (kind == ComposeKind::Stack || single_bare_name) {
                    ComposeKind::Stack
                } else {
                    ComposeKind::Service
                };
                self.resolver
                    .resolve(kind, name.as_ref())
                    .map_err(|e| e.context(format!("could not get compose file for {kind} {}", name.as_ref())))
            })
            .collect()
    }

    fn execute(
        &self,
        spec_paths: Vec<PathBuf>,
        primary_name: &str,
        command: &[&str],
        env: ComposeEnv,
    ) -> Result<()> {
        let invocation = ComposeInvocation {
            spec_paths,
            primary_name: primary_name.to_string(),
            command: command.iter().map(ToString::to_string).collect(),
            env,
        };
        tracing::info!(
            cmd = ?invocation.command,
            compose_file_paths = ?invocation.spec_paths,
            env = ?invocation.env,
            stack = %invocation.primary_name,
            "running docker compose"
        );
        self.engine.invoke(&invocation)?;
        tracing::debug!(stack = %invocation.primary_name, cmd = ?invocation.command, "docker compose executed");
        Ok(())
    }
}

fn primary<S: AsRef<str>>(names: &[S]) -> Result<&str> {
    names
        .first()
        .map(AsRef::as_ref)
        .ok_or_else(|| OpError::Config {
            message: "at least one service or stack name is required".into(),
        })
}

fn with_stack<S: AsRef<str>>(stack: &str, services: &[S]) -> Vec<String> {
    std::iter::once(stack.to_string())
        .chain(services.iter().map(|s| s.as_ref().to_string()))
        .collect()
}

fn names_of<S: AsRef<str>>(names: &[S]) -> Vec<&str> {
    names.iter().map(AsRef::as_ref).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::assets::MemoryAssets;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<ComposeInvocation>>,
    }

    struct RecordingEngine(Arc<Recorder>);

    impl ComposeEngine for RecordingEngine {
        fn invoke(&self, invocation: &ComposeInvocation) -> Result<()> {
            self.0.calls.lock().expect("lock").push(invocation.clone());
            Ok(())
        }
    }

    fn fixture() -> (tempfile::TempDir, Arc<Recorder>, ComposeOrchestrator) {
        let dir = tempfile::tempdir().expect("tempdir");
        let assets = Arc::new(
            MemoryAssets::new()
                .with_file("stacks/fleet-server/docker-compose.yml", "s")
                .with_file("stacks/a/docker-compose.yml", "a")
                .with_file("services/apm-server/docker-compose.yml", "p")
                .with_file("services/redis/docker-compose.yml", "r"),
        );
        let recorder = Arc::new(Recorder::default());
        let orchestrator = ComposeOrchestrator::new(
            ComposeResolver::new(dir.path(), assets),
            Box::new(RecordingEngine(recorder.clone())),
        );
        (dir, recorder, orchestrator)
    }

    fn calls(recorder: &Recorder) -> Vec<ComposeInvocation> {
        recorder.calls.lock().expect("lock").clone()
    }

    #[test]
    fn up_service_resolves_every_name_as_service() {
        let (dir, recorder, orchestrator) = fixture();
        orchestrator
            .up(ComposeKind::Service, &["redis"], &ComposeEnv::new())
            .expect("up");
        let calls = calls(&recorder);
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].spec_paths,
            vec![dir.path().join("compose/services/redis/docker-compose.yml")]
        );
        assert_eq!(calls[0].command, vec!["up", "-d"]);
    }

    #[test]
    fn up_passes_environment_through() {
        let (_dir, recorder, orchestrator) = fixture();
        let mut env = ComposeEnv::new();
        let _ = env.insert("REDIS_VERSION".into(), "6.0".into());
        orchestrator
            .up(ComposeKind::Service, &["redis"], &env)
            .expect("up");
        assert_eq!(calls(&recorder)[0].env, env);
    }

    #[test]
    fn down_single_bare_name_resolves_as_stack() {
        let (dir, recorder, orchestrator) = fixture();
        orchestrator.down(ComposeKind::Service, &["a"]).expect("down");
        let calls = calls(&recorder);
        assert_eq!(
            calls[0].spec_paths,
            vec![dir.path().join("compose/stacks/a/docker-compose.yml")]
        );
        assert_eq!(calls[0].command, vec!["down", "--remove-orphans"]);
    }

    #[test]
    fn down_stack_layers_services() {
        let (dir, recorder, orchestrator) = fixture();
        orchestrator
            .down(ComposeKind::Stack, &["fleet-server", "apm-server"])
            .expect("down");
        assert_eq!(
            calls(&recorder)[0].spec_paths,
            vec![
                dir.path().join("compose/stacks/fleet-server/docker-compose.yml"),
                dir.path().join("compose/services/apm-server/docker-compose.yml"),
            ]
        );
    }

    #[test]
    fn empty_names_are_rejected() {
        let (_dir, recorder, orchestrator) = fixture();
        let none: [&str; 0] = [];
        assert!(orchestrator.up(ComposeKind::Stack, &none, &ComposeEnv::new()).is_err());
        assert!(calls(&recorder).is_empty());
    }

    #[test]
    fn unknown_name_never_reaches_engine() {
        let (_dir, recorder, orchestrator) = fixture();
        let err = orchestrator
            .up(ComposeKind::Stack, &["fleet-server", "nope"], &ComposeEnv::new())
            .expect_err("nope is unknown");
        assert!(err.to_string().contains("nope"));
        assert!(calls(&recorder).is_empty());
    }

    #[test]
    fn add_services_prepends_stack() {
        let (_dir, recorder, orchestrator) = fixture();
        orchestrator
            .add_services("fleet-server", &["apm-server", "redis"], &ComposeEnv::new())
            .expect("add");
        let calls = calls(&recorder);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].primary_name, "fleet-server");
        assert_eq!(calls[0].spec_paths.len(), 3);
    }
}
