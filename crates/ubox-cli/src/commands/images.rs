//! `ubox images` and `ubox rmi` — Local image catalog.

use anyhow::{Context as _, bail};
use ubox_common::types::{ExitStatus, ImageRef, Verbosity};
use ubox_repo::LocalRepository;

use super::Context;
use crate::cmdline::CommandLine;
use crate::output::{format_bytes, protection_flag};

/// Lists stored images; `-l` adds location and size.
///
/// # Errors
///
/// Returns an error if the image tree cannot be read.
pub fn list(ctx: &mut Context<'_>, line: &mut CommandLine) -> anyhow::Result<ExitStatus> {
    let long = line.flag("-l");
    let images = ctx.repo.list_images()?;

    ctx.sink.out(Verbosity::Message, "REPOSITORY");
    for entry in &images {
        let flag = protection_flag(entry.protected);
        ctx.sink
            .out(Verbosity::Message, &format!("{}    {flag}", entry.image));
        if long {
            let size = LocalRepository::disk_usage(&entry.path)?;
            ctx.sink.out(
                Verbosity::Message,
                &format!("  {} ({})", entry.path.display(), format_bytes(size)),
            );
        }
    }
    Ok(ExitStatus::SUCCESS)
}

/// Deletes an image; `-f` removes its protection first.
///
/// # Errors
///
/// Returns an error if the image reference is missing or invalid, or the
/// image cannot be deleted.
pub fn remove(ctx: &mut Context<'_>, line: &mut CommandLine) -> anyhow::Result<ExitStatus> {
    let force = line.flag("-f");
    let Some(target) = line.param(1) else {
        bail!("must specify an image");
    };
    let image: ImageRef = target.parse()?;
    if force {
        if let Some(dir) = ctx.repo.find_image(&image) {
            LocalRepository::unprotect(&dir)?;
        }
    }
    ctx.repo
        .del_image(&image)
        .with_context(|| format!("deleting image {image}"))?;
    ctx.sink
        .out(Verbosity::Info, &format!("Info: deleted image {image}"));
    Ok(ExitStatus::SUCCESS)
}
