//! `ubox inspect` — Container or image metadata.

use anyhow::bail;
use serde_json::json;
use ubox_common::error::UboxError;
use ubox_common::types::{ExitStatus, ImageRef, Verbosity};
use ubox_repo::LocalRepository;

use super::Context;
use crate::cmdline::CommandLine;

/// Prints metadata as JSON; `-p` prints only the container rootfs path.
///
/// # Errors
///
/// Returns an error if no target is given, nothing matches it, or the
/// metadata cannot be read.
pub fn execute(ctx: &mut Context<'_>, line: &mut CommandLine) -> anyhow::Result<ExitStatus> {
    let rootfs_only = line.flag("-p");
    let Some(target) = line.param(1) else {
        bail!("must specify a container or image");
    };

    if let Some(id) = ctx.repo.resolve_container(&target) {
        let rootfs = ctx.repo.container_rootfs(&id);
        if rootfs_only {
            ctx.sink
                .out(Verbosity::Error, &rootfs.display().to_string());
            return Ok(ExitStatus::SUCCESS);
        }
        let metadata = ctx.repo.container_metadata(&id)?;
        let doc = json!({
            "id": id.as_str(),
            "names": ctx.repo.container_names(&id)?,
            "image": metadata.as_ref().map(|m| m.image.clone()),
            "created_at": metadata.as_ref().map(|m| m.created_at),
            "protected": LocalRepository::is_protected(&ctx.repo.container_dir(&id)),
            "rootfs": rootfs,
        });
        ctx.sink
            .out(Verbosity::Error, &serde_json::to_string_pretty(&doc)?);
        return Ok(ExitStatus::SUCCESS);
    }

    if rootfs_only {
        bail!("-p applies to containers only: {target}");
    }
    let image: ImageRef = target.parse()?;
    let dir = ctx.repo.find_image(&image).ok_or_else(|| UboxError::NotFound {
        kind: "container or image",
        id: target.clone(),
    })?;
    let doc = json!({
        "image": image.to_string(),
        "path": dir,
        "protected": LocalRepository::is_protected(&dir),
    });
    ctx.sink
        .out(Verbosity::Error, &serde_json::to_string_pretty(&doc)?);
    Ok(ExitStatus::SUCCESS)
}
