//! `ubox protect` and `ubox unprotect` — Deletion guard on containers and images.

use std::path::PathBuf;

use anyhow::bail;
use ubox_common::error::UboxError;
use ubox_common::types::{ExitStatus, ImageRef, Verbosity};
use ubox_repo::LocalRepository;

use super::Context;
use crate::cmdline::CommandLine;

/// Resolves a container id or name first, then an image reference.
fn locate(repo: &LocalRepository, target: &str) -> Option<PathBuf> {
    if let Some(id) = repo.resolve_container(target) {
        return Some(repo.container_dir(&id));
    }
    target
        .parse::<ImageRef>()
        .ok()
        .and_then(|image| repo.find_image(&image))
}

/// Sets (`protect == true`) or clears the protection marker.
///
/// # Errors
///
/// Returns an error if no target is given, it matches neither a container
/// nor an image, or the marker cannot be changed.
pub fn execute(
    ctx: &mut Context<'_>,
    line: &mut CommandLine,
    protect: bool,
) -> anyhow::Result<ExitStatus> {
    let Some(target) = line.param(1) else {
        bail!("must specify a container or image");
    };
    let dir = locate(ctx.repo, &target).ok_or_else(|| UboxError::NotFound {
        kind: "container or image",
        id: target.clone(),
    })?;
    if protect {
        LocalRepository::protect(&dir)?;
        ctx.sink
            .out(Verbosity::Info, &format!("Info: protected {target}"));
    } else {
        LocalRepository::unprotect(&dir)?;
        ctx.sink
            .out(Verbosity::Info, &format!("Info: unprotected {target}"));
    }
    Ok(ExitStatus::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Fixture;
    use ubox_common::types::ContainerId;

    #[test]
    fn protect_container_by_name() {
        let mut fx = Fixture::new();
        let id = ContainerId::new("c1");
        let dir = fx.repo.add_container(&id, "alpine:latest").expect("add");
        fx.repo.set_name(&id, "web").expect("name");
        let mut line = Fixture::line(&["protect", "web"]);
        let _ = fx.run(|ctx| execute(ctx, &mut line, true)).expect("protect");
        assert!(LocalRepository::is_protected(&dir));

        let mut line = Fixture::line(&["unprotect", "c1"]);
        let _ = fx
            .run(|ctx| execute(ctx, &mut line, false))
            .expect("unprotect");
        assert!(!LocalRepository::is_protected(&dir));
    }

    #[test]
    fn protect_image() {
        let mut fx = Fixture::new();
        let image: ImageRef = "alpine:3".parse().expect("image");
        let dir = fx.repo.add_image(&image).expect("add");
        let mut line = Fixture::line(&["protect", "alpine:3"]);
        let _ = fx.run(|ctx| execute(ctx, &mut line, true)).expect("protect");
        assert!(LocalRepository::is_protected(&dir));
    }

    #[test]
    fn protect_unknown_target_fails() {
        let mut fx = Fixture::new();
        let mut line = Fixture::line(&["protect", "ghost"]);
        assert!(fx.run(|ctx| execute(ctx, &mut line, true)).is_err());
    }
}
