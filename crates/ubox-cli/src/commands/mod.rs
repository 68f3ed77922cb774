//! Command table and handler dispatch.

pub mod containers;
pub mod help;
pub mod images;
pub mod inspect;
pub mod install;
pub mod mkrepo;
pub mod protect;
pub mod showconf;
pub mod unavailable;
pub mod version;

use std::fmt;
use std::str::FromStr;

use ubox_common::config::RuntimeConfig;
use ubox_common::types::ExitStatus;
use ubox_repo::LocalRepository;

use crate::cmdline::CommandLine;
use crate::msg::MessageSink;

/// Every command the CLI knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Search a registry.
    Search,
    /// Show usage.
    Help,
    /// List local images.
    Images,
    /// Pull an image.
    Pull,
    /// Create a container from an image.
    Create,
    /// List containers.
    Ps,
    /// Run a container.
    Run,
    /// Show version.
    Version,
    /// Remove an image.
    Rmi,
    /// Create a repository.
    Mkrepo,
    /// Import a tarball as an image.
    Import,
    /// Load a saved image.
    Load,
    /// Export a container.
    Export,
    /// Duplicate a container.
    Clone,
    /// Protect an image or container.
    Protect,
    /// Remove containers.
    Rm,
    /// Name a container.
    Name,
    /// Remove a container name.
    Rmname,
    /// Verify an image.
    Verify,
    /// Forget registry credentials.
    Logout,
    /// Unprotect an image or container.
    Unprotect,
    /// Show configuration.
    Showconf,
    /// Inspect a container or image.
    Inspect,
    /// Store registry credentials.
    Login,
    /// Configure a container's execution.
    Setup,
    /// Provision the execution environment.
    Install,
}

/// Error for a token that names no command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid command: {0}")]
pub struct UnknownCommand(pub String);

impl Command {
    /// All commands, in table order.
    pub const ALL: [Self; 26] = [
        Self::Search,
        Self::Help,
        Self::Images,
        Self::Pull,
        Self::Create,
        Self::Ps,
        Self::Run,
        Self::Version,
        Self::Rmi,
        Self::Mkrepo,
        Self::Import,
        Self::Load,
        Self::Export,
        Self::Clone,
        Self::Protect,
        Self::Rm,
        Self::Name,
        Self::Rmname,
        Self::Verify,
        Self::Logout,
        Self::Unprotect,
        Self::Showconf,
        Self::Inspect,
        Self::Login,
        Self::Setup,
        Self::Install,
    ];

    /// Command token.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Help => "help",
            Self::Images => "images",
            Self::Pull => "pull",
            Self::Create => "create",
            Self::Ps => "ps",
            Self::Run => "run",
            Self::Version => "version",
            Self::Rmi => "rmi",
            Self::Mkrepo => "mkrepo",
            Self::Import => "import",
            Self::Load => "load",
            Self::Export => "export",
            Self::Clone => "clone",
            Self::Protect => "protect",
            Self::Rm => "rm",
            Self::Name => "name",
            Self::Rmname => "rmname",
            Self::Verify => "verify",
            Self::Logout => "logout",
            Self::Unprotect => "unprotect",
            Self::Showconf => "showconf",
            Self::Inspect => "inspect",
            Self::Login => "login",
            Self::Setup => "setup",
            Self::Install => "install",
        }
    }

    /// Usage text shown by `ubox <command> --help`.
    #[must_use]
    pub const fn doc(self) -> &'static str {
        match self {
            Self::Search => {
                "search: search a registry for images\n\
                 search [options] <expression>\n\
                 --index=url             :docker index url\n\
                 --registry=url          :docker registry url\n\
                 --list-tags             :list tags of a repository\n\
                 -a                      :list all matches"
            }
            Self::Help => "help: show usage\nhelp",
            Self::Images => {
                "images: list images in the local repository\n\
                 images [options]\n\
                 -l                      :show image location and size\n\
                 P                       :image is protected"
            }
            Self::Pull => {
                "pull: download an image from a registry\n\
                 pull [options] <repo/image:tag>\n\
                 --index=url             :docker index url\n\
                 --registry=url          :docker registry url\n\
                 --httpproxy=proxy       :use proxy for downloads\n\
                 --platform=os/arch      :image platform"
            }
            Self::Create => {
                "create: extract an image into a new container\n\
                 create [options] <repo/image:tag>\n\
                 --name=xxx              :assign a name to the container\n\
                 --force                 :create even if the image is not local"
            }
            Self::Ps => {
                "ps: list containers\n\
                 ps [options]\n\
                 -s                      :show container size"
            }
            Self::Run => {
                "run: execute a container\n\
                 run [options] <container-id-or-name>\n\
                 run [options] <repo/image:tag>\n\
                 --rm                    :delete container upon exit\n\
                 --workdir=/home         :working directory\n\
                 --user=name             :run as user\n\
                 --volume=/data:/mnt     :mount host directory\n\
                 --env=\"MYVAR=xx\"        :set environment variable\n\
                 --name=xxx              :set or change the container name\n\
                 --entrypoint=cmd        :override the image entrypoint\n\
                 --hostauth              :bind the host passwd and group"
            }
            Self::Version => "version: show version information\nversion",
            Self::Rmi => {
                "rmi: delete an image from the local repository\n\
                 rmi [options] <repo/image:tag>\n\
                 -f                      :remove even if protected"
            }
            Self::Mkrepo => {
                "mkrepo: create a repository in another directory\n\
                 mkrepo <directory>"
            }
            Self::Import => {
                "import: import a tarball as an image\n\
                 import [options] <tar-file> <repo/image:tag>\n\
                 --mv                    :move the tarball into the repository\n\
                 --tocontainer           :import into a container\n\
                 --clone                 :import a container exported with clone\n\
                 --name=xxx              :container name"
            }
            Self::Load => {
                "load: load an image saved with docker save\n\
                 load -i <docker-saved-file>\n\
                 load < <docker-saved-file>"
            }
            Self::Export => {
                "export: export a container into a tarball\n\
                 export [options] -o <tar-file> <container-id-or-name>\n\
                 --clone                 :export with ubox metadata"
            }
            Self::Clone => {
                "clone: duplicate a container\n\
                 clone [options] <container-id-or-name>\n\
                 --name=xxx              :name of the new container"
            }
            Self::Protect => {
                "protect: protect a container or image against deletion\n\
                 protect <container-id-or-name>\n\
                 protect <repo/image:tag>"
            }
            Self::Rm => {
                "rm: delete containers\n\
                 rm [options] <container-id-or-name> ...\n\
                 -f                      :ignore containers that do not exist"
            }
            Self::Name => {
                "name: give a name to a container\n\
                 name <container-id> <container-name>"
            }
            Self::Rmname => {
                "rmname: remove a name from a container\n\
                 rmname <container-name>"
            }
            Self::Verify => {
                "verify: check the layers of an image\n\
                 verify <repo/image:tag>"
            }
            Self::Logout => {
                "logout: forget registry credentials\n\
                 logout [options]\n\
                 --registry=url          :registry url\n\
                 -a                      :forget all credentials"
            }
            Self::Unprotect => {
                "unprotect: remove the protection of a container or image\n\
                 unprotect <container-id-or-name>\n\
                 unprotect <repo/image:tag>"
            }
            Self::Showconf => "showconf: print the effective configuration\nshowconf",
            Self::Inspect => {
                "inspect: print container or image metadata\n\
                 inspect [options] <container-id-or-name>\n\
                 inspect <repo/image:tag>\n\
                 -p                      :print the container root filesystem path"
            }
            Self::Login => {
                "login: store registry credentials\n\
                 login [options]\n\
                 --username=user         :registry username\n\
                 --password=pass         :registry password\n\
                 --registry=url          :registry url"
            }
            Self::Setup => {
                "setup: choose how a container is executed\n\
                 setup [options] <container-id-or-name>\n\
                 --execmode=mode         :execution engine\n\
                 --force                 :force the change\n\
                 --purge                 :remove files created by previous modes"
            }
            Self::Install => {
                "install: provision the execution environment\n\
                 install [options]\n\
                 --force                 :reinstall\n\
                 --purge                 :remove a previous installation"
            }
        }
    }

    /// Commands that report state and never trigger the implicit install.
    #[must_use]
    pub const fn is_introspection(self) -> bool {
        matches!(self, Self::Version | Self::Showconf)
    }
}

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| UnknownCommand(s.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything a handler may use besides its command line.
pub struct Context<'a> {
    /// Effective configuration.
    pub config: &'a RuntimeConfig,
    /// Local repository, valid by the time any handler runs.
    pub repo: &'a LocalRepository,
    /// User-facing output.
    pub sink: &'a mut dyn MessageSink,
}

/// The handlers behind the command table.
pub trait CommandHandlers {
    /// Prints top-level usage. Runs before any configuration is loaded.
    fn help(&mut self, sink: &mut dyn MessageSink) -> ExitStatus;

    /// Runs `command`. `line` is `None` when the dispatcher invokes
    /// [`Command::Install`] implicitly, which behaves like an empty command
    /// line.
    fn execute(
        &mut self,
        command: Command,
        ctx: &mut Context<'_>,
        line: Option<&mut CommandLine>,
    ) -> ExitStatus;
}

/// Handlers operating on the local repository.
#[derive(Debug, Default)]
pub struct LocalCli;

impl CommandHandlers for LocalCli {
    fn help(&mut self, sink: &mut dyn MessageSink) -> ExitStatus {
        help::execute(sink)
    }

    fn execute(
        &mut self,
        command: Command,
        ctx: &mut Context<'_>,
        line: Option<&mut CommandLine>,
    ) -> ExitStatus {
        let mut empty = CommandLine::default();
        let line = line.unwrap_or(&mut empty);
        let result = match command {
            Command::Help => Ok(help::execute(ctx.sink)),
            Command::Version => version::execute(ctx),
            Command::Showconf => showconf::execute(ctx),
            Command::Mkrepo => mkrepo::execute(ctx, line),
            Command::Images => images::list(ctx, line),
            Command::Rmi => images::remove(ctx, line),
            Command::Ps => containers::list(ctx, line),
            Command::Rm => containers::remove(ctx, line),
            Command::Name => containers::name(ctx, line),
            Command::Rmname => containers::rmname(ctx, line),
            Command::Protect => protect::execute(ctx, line, true),
            Command::Unprotect => protect::execute(ctx, line, false),
            Command::Inspect => inspect::execute(ctx, line),
            Command::Search
            | Command::Pull
            | Command::Create
            | Command::Run
            | Command::Import
            | Command::Load
            | Command::Export
            | Command::Clone
            | Command::Verify
            | Command::Login
            | Command::Logout
            | Command::Setup => unavailable::execute(ctx, line, command),
            Command::Install => install::execute(ctx, line),
        };
        report(ctx, result)
    }
}

/// Turns a handler error into a user message and a failure status.
fn report(ctx: &mut Context<'_>, result: anyhow::Result<ExitStatus>) -> ExitStatus {
    match result {
        Ok(status) => status,
        Err(e) => {
            ctx.sink.err(&format!("Error: {e:#}"));
            ExitStatus::FAILURE
        }
    }
}


/// Temporary repository plus recording sink for handler tests.
#[cfg(test)]
pub struct Fixture {
    _dir: tempfile::TempDir,
    /// Configuration lent to handlers.
    pub config: RuntimeConfig,
    /// Freshly created repository.
    pub repo: LocalRepository,
    /// Captured output.
    pub sink: crate::msg::Recorder,
}

#[cfg(test)]
impl Fixture {
    /// Creates a valid repository in a temporary directory.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = LocalRepository::new(dir.path().join("repo"));
        repo.create_repo().expect("create repo");
        let config = RuntimeConfig {
            topdir: repo.topdir().to_path_buf(),
            ..RuntimeConfig::default()
        };
        Self {
            _dir: dir,
            config,
            repo,
            sink: crate::msg::Recorder::default(),
        }
    }

    /// Parses `ubox <args...>`.
    pub fn line(args: &[&str]) -> CommandLine {
        let mut argv = vec!["ubox"];
        argv.extend_from_slice(args);
        CommandLine::parse(argv).expect("parse")
    }

    /// Runs `handler` against the fixture.
    pub fn run<F>(&mut self, handler: F) -> anyhow::Result<ExitStatus>
    where
        F: FnOnce(&mut Context<'_>) -> anyhow::Result<ExitStatus>,
    {
        let mut ctx = Context {
            config: &self.config,
            repo: &self.repo,
            sink: &mut self.sink,
        };
        handler(&mut ctx)
    }
}
