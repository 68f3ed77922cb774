//! Bootstrap and dispatch.
//!
//! One invocation runs in two strictly sequential phases:
//! 1. **Bootstrap**: privilege check, configuration load, verbosity,
//!    repository resolution.
//! 2. **Dispatch**: a small state machine selecting exactly one handler,
//!    running the implicit install beforehand when required and rejecting
//!    unconsumed options afterwards.
//!
//! The privilege check runs first of all, even before top-level help. Help
//! is then answered without touching the configuration or the repository.

use std::ffi::OsString;
use std::path::PathBuf;

use thiserror::Error;
use ubox_common::config::{ConfigSource, RuntimeConfig};
use ubox_common::error::UboxError;
use ubox_common::types::{ExitStatus, Verbosity};
use ubox_repo::LocalRepository;

use crate::cmdline::CommandLine;
use crate::commands::{Command, CommandHandlers, Context};
use crate::msg::MessageSink;

/// Conditions that abort bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Effective UID is 0 and `--allow-root` was not given.
    #[error("do not run as root !")]
    RunningAsRoot,

    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] UboxError),

    /// `--repo` points at something that is not a repository.
    #[error("invalid ubox repository: {}", .0.display())]
    InvalidRepository(PathBuf),

    /// The default repository was missing and could not be created.
    #[error("cannot create repository {}: {source}", .path.display())]
    CreateRepository {
        /// Repository root.
        path: PathBuf,
        /// Underlying failure.
        source: UboxError,
    },
}

/// Configuration and repository established by bootstrap.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Effective configuration.
    pub config: RuntimeConfig,
    /// Valid local repository.
    pub repo: LocalRepository,
}

impl Session {
    fn context<'a>(&'a self, sink: &'a mut dyn MessageSink) -> Context<'a> {
        Context {
            config: &self.config,
            repo: &self.repo,
            sink,
        }
    }
}

/// States of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Stage {
    Resolve,
    Unknown(String),
    Known(Command),
    CommandHelp(Command),
    Install(Command),
    Execute { command: Command, gated: bool },
    CheckLeftovers(ExitStatus),
    Done(ExitStatus),
}

/// Entry-point controller.
#[derive(Debug)]
pub struct Controller<C> {
    config_source: C,
    euid: u32,
}

impl<C: ConfigSource> Controller<C> {
    /// Creates a controller loading configuration from `config_source` and
    /// running with effective UID `euid`.
    pub const fn new(config_source: C, euid: u32) -> Self {
        Self {
            config_source,
            euid,
        }
    }

    /// Runs one invocation from raw arguments, program name first.
    pub fn execute<I, T>(
        &self,
        argv: I,
        sink: &mut dyn MessageSink,
        handlers: &mut dyn CommandHandlers,
    ) -> ExitStatus
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let mut line = match CommandLine::parse(argv) {
            Ok(line) => line,
            Err(e) => {
                sink.err(e.to_string().trim_end());
                return ExitStatus::FAILURE;
            }
        };

        if let Err(e) = self.check_privilege(&line) {
            sink.err(&format!("Error: {e}"));
            return ExitStatus::FAILURE;
        }

        if line.is_bare() || line.general().help {
            return handlers.help(sink);
        }

        match self.bootstrap(&line, sink) {
            Ok(session) => dispatch(&session, &mut line, sink, handlers),
            Err(e) => {
                sink.err(&format!("Error: {e}"));
                ExitStatus::FAILURE
            }
        }
    }

    /// Refuses effective UID 0 unless `--allow-root` was given.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::RunningAsRoot`].
    pub fn check_privilege(&self, line: &CommandLine) -> Result<(), BootstrapError> {
        if self.euid == 0 && !line.general().allow_root {
            return Err(BootstrapError::RunningAsRoot);
        }
        Ok(())
    }

    /// Establishes configuration, verbosity and repository.
    ///
    /// # Errors
    ///
    /// Returns an error when running as root without override, when the
    /// configuration cannot be loaded, when an explicit repository is not
    /// valid, or when the default repository cannot be created.
    pub fn bootstrap(
        &self,
        line: &CommandLine,
        sink: &mut dyn MessageSink,
    ) -> Result<Session, BootstrapError> {
        self.check_privilege(line)?;
        let general = line.general();

        let mut config = self.config_source.load(general.config.as_deref())?;

        if general.debug {
            config.verbose_level = Verbosity::Debug;
        } else if general.quiet {
            config.verbose_level = Verbosity::Message;
        }
        sink.set_level(config.verbose_level);

        if general.insecure {
            config.http_insecure = true;
        }

        if let Some(root) = &general.repo {
            config.topdir.clone_from(root);
            if !LocalRepository::new(root).is_repo() {
                return Err(BootstrapError::InvalidRepository(root.clone()));
            }
        }

        let repo = LocalRepository::new(&config.topdir);
        if !repo.is_repo() {
            sink.out(
                Verbosity::Info,
                &format!("Info: creating repo: {}", config.topdir.display()),
            );
            repo.create_repo().map_err(|source| BootstrapError::CreateRepository {
                path: config.topdir.clone(),
                source,
            })?;
        }
        tracing::debug!(
            topdir = %repo.topdir().display(),
            level = %sink.level(),
            "bootstrap complete"
        );

        Ok(Session { config, repo })
    }
}

/// Runs the dispatch state machine to completion.
pub fn dispatch(
    session: &Session,
    line: &mut CommandLine,
    sink: &mut dyn MessageSink,
    handlers: &mut dyn CommandHandlers,
) -> ExitStatus {
    let mut stage = Stage::Resolve;
    loop {
        tracing::trace!(?stage, "dispatch");
        stage = match stage {
            Stage::Resolve => {
                let token = line.command().unwrap_or_default();
                match token.parse::<Command>() {
                    Ok(command) => Stage::Known(command),
                    Err(_) => Stage::Unknown(token.to_string()),
                }
            }
            Stage::Unknown(token) => {
                if token.is_empty() {
                    sink.err("Error: missing command");
                } else {
                    sink.err(&format!("Error: invalid command: {token}"));
                }
                Stage::Done(ExitStatus::FAILURE)
            }
            Stage::Known(command) => {
                if line.flag("--help") {
                    Stage::CommandHelp(command)
                } else if command.is_introspection() {
                    Stage::Execute {
                        command,
                        gated: false,
                    }
                } else if command == Command::Install {
                    Stage::Execute {
                        command,
                        gated: true,
                    }
                } else {
                    Stage::Install(command)
                }
            }
            Stage::CommandHelp(command) => {
                sink.out(Verbosity::Error, command.doc());
                Stage::Done(ExitStatus::SUCCESS)
            }
            Stage::Install(command) => {
                let mut ctx = session.context(sink);
                let status = handlers.execute(Command::Install, &mut ctx, None);
                if !status.is_success() {
                    tracing::warn!(%status, "implicit install reported failure");
                }
                Stage::Execute {
                    command,
                    gated: true,
                }
            }
            Stage::Execute { command, gated } => {
                let mut ctx = session.context(sink);
                let status = handlers.execute(command, &mut ctx, Some(&mut *line));
                if gated {
                    Stage::CheckLeftovers(status)
                } else {
                    Stage::Done(status)
                }
            }
            Stage::CheckLeftovers(status) => {
                let leftovers = line.missing_options();
                if leftovers.is_empty() {
                    Stage::Done(status)
                } else {
                    sink.err(&format!("Error: syntax error at: {}", leftovers.join(" ")));
                    Stage::Done(ExitStatus::FAILURE)
                }
            }
            Stage::Done(status) => return status,
        };
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::path::Path;

    use super::*;
    use crate::msg::Recorder;

    /// Counts loads and hands out a fixed configuration.
    struct FakeSource {
        config: RuntimeConfig,
        loads: Cell<usize>,
        explicit: std::cell::RefCell<Option<PathBuf>>,
    }

    impl FakeSource {
        fn new(topdir: &Path) -> Self {
            Self {
                config: RuntimeConfig {
                    topdir: topdir.to_path_buf(),
                    ..RuntimeConfig::default()
                },
                loads: Cell::new(0),
                explicit: std::cell::RefCell::new(None),
            }
        }
    }

    impl ConfigSource for &FakeSource {
        fn load(&self, explicit: Option<&Path>) -> ubox_common::error::Result<RuntimeConfig> {
            self.loads.set(self.loads.get() + 1);
            *self.explicit.borrow_mut() = explicit.map(Path::to_path_buf);
            Ok(self.config.clone())
        }
    }

    /// One handler invocation.
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Call {
        command: Command,
        with_line: bool,
    }

    /// Records invocations and returns a configurable status.
    #[derive(Default)]
    struct FakeHandlers {
        helps: usize,
        calls: Vec<Call>,
        status: Option<ExitStatus>,
        seen: Option<RuntimeConfig>,
        seen_repo: Option<PathBuf>,
    }

    impl CommandHandlers for FakeHandlers {
        fn help(&mut self, _sink: &mut dyn MessageSink) -> ExitStatus {
            self.helps += 1;
            ExitStatus::SUCCESS
        }

        fn execute(
            &mut self,
            command: Command,
            ctx: &mut Context<'_>,
            line: Option<&mut CommandLine>,
        ) -> ExitStatus {
            self.calls.push(Call {
                command,
                with_line: line.is_some(),
            });
            self.seen = Some(ctx.config.clone());
            self.seen_repo = Some(ctx.repo.topdir().to_path_buf());
            self.status.unwrap_or(ExitStatus::SUCCESS)
        }
    }

    struct Harness {
        dir: tempfile::TempDir,
        source: FakeSource,
        handlers: FakeHandlers,
        sink: Recorder,
    }

    impl Harness {
        fn new() -> Self {
            let dir = tempfile::tempdir().expect("tempdir");
            let source = FakeSource::new(&dir.path().join("default"));
            Self {
                dir,
                source,
                handlers: FakeHandlers::default(),
                sink: Recorder::default(),
            }
        }

        fn run_as(&mut self, euid: u32, args: &[&str]) -> ExitStatus {
            let mut argv = vec!["ubox".to_string()];
            argv.extend(args.iter().map(ToString::to_string));
            Controller::new(&self.source, euid).execute(&argv, &mut self.sink, &mut self.handlers)
        }

        fn run(&mut self, args: &[&str]) -> ExitStatus {
            self.run_as(1000, args)
        }

        fn commands(&self) -> Vec<Command> {
            self.handlers.calls.iter().map(|c| c.command).collect()
        }
    }

    #[test]
    fn bare_invocation_shows_help_without_bootstrap() {
        let mut h = Harness::new();
        assert_eq!(h.run(&[]), ExitStatus::SUCCESS);
        assert_eq!(h.handlers.helps, 1);
        assert_eq!(h.source.loads.get(), 0);
        assert!(!h.dir.path().join("default").exists());
        assert!(h.handlers.calls.is_empty());
    }

    #[test]
    fn root_without_override_is_refused_even_for_help() {
        let cases: [&[&str]; 3] = [&[], &["-h"], &["--help", "pull"]];
        for args in cases {
            let mut h = Harness::new();
            assert_eq!(h.run_as(0, args), ExitStatus::FAILURE);
            assert_eq!(h.handlers.helps, 0);
            assert_eq!(h.source.loads.get(), 0);
            assert_eq!(h.sink.stderr(), "Error: do not run as root !");
        }
    }

    #[test]
    fn root_with_override_gets_help() {
        let mut h = Harness::new();
        assert_eq!(h.run_as(0, &["--allow-root", "-h"]), ExitStatus::SUCCESS);
        assert_eq!(h.handlers.helps, 1);
        assert_eq!(h.source.loads.get(), 0);
    }

    #[test]
    fn help_flag_bypasses_everything() {
        for flag in ["-h", "--help"] {
            let mut h = Harness::new();
            assert_eq!(h.run(&[flag, "pull", "--bogus"]), ExitStatus::SUCCESS);
            assert_eq!(h.handlers.helps, 1);
            assert_eq!(h.source.loads.get(), 0);
            assert!(h.handlers.calls.is_empty());
        }
    }

    #[test]
    fn root_without_override_is_refused_before_config() {
        let mut h = Harness::new();
        assert_eq!(h.run_as(0, &["images"]), ExitStatus::FAILURE);
        assert_eq!(h.source.loads.get(), 0);
        assert!(h.handlers.calls.is_empty());
        assert_eq!(h.sink.stderr(), "Error: do not run as root !");
    }

    #[test]
    fn root_with_override_proceeds() {
        let mut h = Harness::new();
        assert_eq!(h.run_as(0, &["--allow-root", "images"]), ExitStatus::SUCCESS);
        assert_eq!(h.source.loads.get(), 1);
        assert_eq!(h.commands(), vec![Command::Install, Command::Images]);
    }

    #[test]
    fn explicit_config_path_is_forwarded() {
        let mut h = Harness::new();
        let _ = h.run(&["--config=/etc/other.toml", "version"]);
        assert_eq!(
            *h.source.explicit.borrow(),
            Some(PathBuf::from("/etc/other.toml"))
        );
    }

    #[test]
    fn missing_default_repository_is_created() {
        let mut h = Harness::new();
        assert_eq!(h.run(&["images"]), ExitStatus::SUCCESS);
        let root = h.dir.path().join("default");
        assert!(LocalRepository::new(&root).is_repo());
        assert!(h.sink.stdout().contains("Info: creating repo:"));
    }

    #[test]
    fn invalid_repo_override_is_fatal_and_not_created() {
        let mut h = Harness::new();
        let bogus = h.dir.path().join("not-a-repo");
        let arg = format!("--repo={}", bogus.display());
        assert_eq!(h.run(&[arg.as_str(), "images"]), ExitStatus::FAILURE);
        assert!(!bogus.exists());
        assert!(h.handlers.calls.is_empty());
        assert!(h.sink.stderr().starts_with("Error: invalid ubox repository:"));
    }

    #[test]
    fn valid_repo_override_becomes_topdir() {
        let mut h = Harness::new();
        let other = LocalRepository::new(h.dir.path().join("other"));
        other.create_repo().expect("create");
        let arg = format!("--repo={}", other.topdir().display());
        assert_eq!(h.run(&[arg.as_str(), "ps"]), ExitStatus::SUCCESS);
        assert_eq!(h.handlers.seen_repo.as_deref(), Some(other.topdir()));
        let seen = h.handlers.seen.as_ref().expect("config seen");
        assert_eq!(seen.topdir, other.topdir());
    }

    #[test]
    fn verbosity_flags_reach_sink_and_config() {
        let mut h = Harness::new();
        let _ = h.run(&["-D", "-q", "ps"]);
        assert_eq!(h.sink.level, Verbosity::Debug);

        let mut h = Harness::new();
        let _ = h.run(&["--quiet", "ps"]);
        assert_eq!(h.sink.level, Verbosity::Message);
        let seen = h.handlers.seen.as_ref().expect("config seen");
        assert_eq!(seen.verbose_level, Verbosity::Message);

        let mut h = Harness::new();
        let _ = h.run(&["ps"]);
        assert_eq!(h.sink.level, Verbosity::Info);
    }

    #[test]
    fn insecure_flag_sets_config() {
        let mut h = Harness::new();
        let _ = h.run(&["--insecure", "ps"]);
        assert!(h.handlers.seen.as_ref().is_some_and(|c| c.http_insecure));
    }

    #[test]
    fn unknown_command_is_reported() {
        let mut h = Harness::new();
        assert_eq!(h.run(&["frobnicate"]), ExitStatus::FAILURE);
        assert!(h.handlers.calls.is_empty());
        assert_eq!(h.sink.stderr(), "Error: invalid command: frobnicate");
    }

    #[test]
    fn general_options_without_command_fail() {
        let mut h = Harness::new();
        assert_eq!(h.run(&["-D"]), ExitStatus::FAILURE);
        assert_eq!(h.sink.stderr(), "Error: missing command");
    }

    #[test]
    fn malformed_general_option_fails_before_bootstrap() {
        let mut h = Harness::new();
        assert_eq!(h.run(&["--bogus", "images"]), ExitStatus::FAILURE);
        assert_eq!(h.source.loads.get(), 0);
        assert!(!h.sink.err.is_empty());
    }

    #[test]
    fn install_runs_once_before_every_regular_command() {
        for command in Command::ALL {
            if command.is_introspection() || command == Command::Install {
                continue;
            }
            let mut h = Harness::new();
            let _ = h.run(&[command.name()]);
            assert_eq!(
                h.handlers.calls,
                vec![
                    Call {
                        command: Command::Install,
                        with_line: false,
                    },
                    Call {
                        command,
                        with_line: true,
                    },
                ],
                "{command}"
            );
        }
    }

    #[test]
    fn introspection_commands_skip_install() {
        for command in [Command::Version, Command::Showconf] {
            let mut h = Harness::new();
            let _ = h.run(&[command.name()]);
            assert_eq!(h.commands(), vec![command]);
        }
    }

    #[test]
    fn install_command_is_not_doubled() {
        let mut h = Harness::new();
        let _ = h.run(&["install"]);
        assert_eq!(
            h.handlers.calls,
            vec![Call {
                command: Command::Install,
                with_line: true,
            }]
        );
    }

    #[test]
    fn per_command_help_prints_doc_only() {
        let mut h = Harness::new();
        assert_eq!(h.run(&["rmi", "--help"]), ExitStatus::SUCCESS);
        assert!(h.handlers.calls.is_empty());
        assert_eq!(h.sink.stdout().lines().last(), Command::Rmi.doc().lines().last());
    }

    #[test]
    fn leftover_option_forces_failure() {
        let mut h = Harness::new();
        assert_eq!(h.run(&["pull", "--bogus"]), ExitStatus::FAILURE);
        assert_eq!(h.commands(), vec![Command::Install, Command::Pull]);
        assert_eq!(h.sink.stderr(), "Error: syntax error at: --bogus");
    }

    #[test]
    fn leftovers_override_handler_success_but_not_for_introspection() {
        let mut h = Harness::new();
        assert_eq!(h.run(&["version", "--bogus"]), ExitStatus::SUCCESS);
        assert!(h.sink.err.is_empty());
    }

    #[test]
    fn handler_status_is_propagated() {
        let mut h = Harness::new();
        h.handlers.status = Some(ExitStatus::FAILURE);
        assert_eq!(h.run(&["ps"]), ExitStatus::FAILURE);
        assert!(h.sink.err.is_empty());
    }
}
