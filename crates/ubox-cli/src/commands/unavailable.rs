//! Registry, execution and archive commands this build does not provide.
//!
//! They still read their documented options and operands, so a mistyped
//! option is reported as a syntax error like for any other command.

use ubox_common::types::ExitStatus;

use super::{Command, Context};
use crate::cmdline::CommandLine;

/// Options each command accepts, in [`CommandLine::declare_options`] form.
const fn accepted_options(command: Command) -> &'static str {
    match command {
        Command::Search => "-a --index= --registry= --httpproxy= --list-tags",
        Command::Pull => "--index= --registry= --httpproxy= --platform=",
        Command::Create => "--name= --force --platform=",
        Command::Run => {
            "-i -t -a -d --rm --hostauth --hostenv --bindhome --nobanner --nometa --dri \
             --location= --name= --workdir= -w= --user= -u= --volume= -v= --env= -e= \
             --env-file= --entrypoint= --publish= -p= --publish-all -P --novol= \
             --cpuset-cpus= --kernel= --platform= --pull="
        }
        Command::Import => "--mv --tocontainer --clone --name= --platform=",
        Command::Load => "-i=",
        Command::Export => "-o= --clone",
        Command::Clone => "--name=",
        Command::Verify => "",
        Command::Login => "--username= --password= --registry=",
        Command::Logout => "-a --registry=",
        Command::Setup => "--execmode= --force --purge --fixperm --nvidia",
        _ => "",
    }
}

/// Reads the command's options and operands, then reports that it is not
/// available.
///
/// # Errors
///
/// Never returns an error; unavailability is reported as a failure status.
pub fn execute(
    ctx: &mut Context<'_>,
    line: &mut CommandLine,
    command: Command,
) -> anyhow::Result<ExitStatus> {
    line.declare_options(accepted_options(command));
    let operands = line.params_from(1);
    tracing::debug!(%command, ?operands, "command not available");
    ctx.sink
        .err(&format!("Error: {command}: not available in this build"));
    Ok(ExitStatus::FAILURE)
}
