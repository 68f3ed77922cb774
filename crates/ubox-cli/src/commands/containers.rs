//! `ubox ps`, `rm`, `name` and `rmname` — Local container bookkeeping.

use anyhow::{Context as _, bail};
use ubox_common::error::UboxError;
use ubox_common::types::{ExitStatus, Verbosity};
use ubox_repo::LocalRepository;

use super::Context;
use crate::cmdline::CommandLine;
use crate::output::{format_bytes, protection_flag};

/// Lists containers; `-s` adds their size.
///
/// # Errors
///
/// Returns an error if the containers directory cannot be read.
pub fn list(ctx: &mut Context<'_>, line: &mut CommandLine) -> anyhow::Result<ExitStatus> {
    let sizes = line.flag("-s");
    let containers = ctx.repo.list_containers()?;

    let mut header = format!("{:<36} {} {:<20} {}", "CONTAINER ID", "P", "NAMES", "IMAGE");
    if sizes {
        header.push_str("  SIZE");
    }
    ctx.sink.out(Verbosity::Message, &header);

    for c in &containers {
        let names = if c.names.is_empty() {
            "-".to_string()
        } else {
            c.names.join(",")
        };
        let mut row = format!(
            "{:<36} {} {:<20} {}",
            c.id,
            protection_flag(c.protected),
            names,
            c.image.as_deref().unwrap_or("-")
        );
        if sizes {
            let size = LocalRepository::disk_usage(&c.path)?;
            row.push_str(&format!("  {}", format_bytes(size)));
        }
        ctx.sink.out(Verbosity::Message, &row);
    }
    Ok(ExitStatus::SUCCESS)
}

/// Deletes containers by id or name; `-f` ignores unknown ones.
///
/// Every argument is attempted; the status is a failure if any deletion
/// failed.
///
/// # Errors
///
/// Returns an error if no container is given.
pub fn remove(ctx: &mut Context<'_>, line: &mut CommandLine) -> anyhow::Result<ExitStatus> {
    let force = line.flag("-f");
    let targets = line.params_from(1);
    if targets.is_empty() {
        bail!("must specify at least one container");
    }

    let mut status = ExitStatus::SUCCESS;
    for target in targets {
        let Some(id) = ctx.repo.resolve_container(&target) else {
            if !force {
                ctx.sink
                    .err(&format!("Error: container not found: {target}"));
                status = ExitStatus::FAILURE;
            }
            continue;
        };
        match ctx.repo.del_container(&id) {
            Ok(()) => ctx
                .sink
                .out(Verbosity::Info, &format!("Info: deleted container {id}")),
            Err(e) => {
                ctx.sink.err(&format!("Error: {e}"));
                status = ExitStatus::FAILURE;
            }
        }
    }
    Ok(status)
}

/// Attaches a name to a container.
///
/// # Errors
///
/// Returns an error if arguments are missing, the container is unknown, or
/// the name is invalid or taken.
pub fn name(ctx: &mut Context<'_>, line: &mut CommandLine) -> anyhow::Result<ExitStatus> {
    let (Some(target), Some(name)) = (line.param(1), line.param(2)) else {
        bail!("must specify a container and a name");
    };
    let id = ctx
        .repo
        .resolve_container(&target)
        .ok_or_else(|| UboxError::NotFound {
            kind: "container",
            id: target.clone(),
        })?;
    ctx.repo
        .set_name(&id, &name)
        .with_context(|| format!("naming container {id}"))?;
    Ok(ExitStatus::SUCCESS)
}

/// Removes a container name.
///
/// # Errors
///
/// Returns an error if the name is missing or does not exist.
pub fn rmname(ctx: &mut Context<'_>, line: &mut CommandLine) -> anyhow::Result<ExitStatus> {
    let Some(name) = line.param(1) else {
        bail!("must specify a container name");
    };
    ctx.repo.del_name(&name)?;
    Ok(ExitStatus::SUCCESS)
}
