//! `ubox mkrepo` — Create a repository in another directory.

use std::path::PathBuf;

use anyhow::{Context as _, bail};
use ubox_common::types::{ExitStatus, Verbosity};
use ubox_repo::LocalRepository;

use super::Context;
use crate::cmdline::CommandLine;

/// Creates a repository at the first positional argument.
///
/// # Errors
///
/// Returns an error if no directory is given, the directory already holds a
/// repository, or it cannot be created.
pub fn execute(ctx: &mut Context<'_>, line: &mut CommandLine) -> anyhow::Result<ExitStatus> {
    let Some(dir) = line.param(1) else {
        bail!("must specify the repository directory");
    };
    let target = LocalRepository::new(PathBuf::from(&dir));
    if target.is_repo() {
        bail!("repository already exists: {dir}");
    }
    target
        .create_repo()
        .with_context(|| format!("cannot create repository {dir}"))?;
    ctx.sink
        .out(Verbosity::Info, &format!("Info: created repository {dir}"));
    Ok(ExitStatus::SUCCESS)
}
