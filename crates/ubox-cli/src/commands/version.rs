//! `ubox version` — Version and repository location.

use ubox_common::constants::APP_NAME;
use ubox_common::types::{ExitStatus, Verbosity};

use super::Context;

/// Prints the version and the active repository root.
///
/// # Errors
///
/// Never fails; the signature matches the other handlers.
pub fn execute(ctx: &mut Context<'_>) -> anyhow::Result<ExitStatus> {
    ctx.sink.out(
        Verbosity::Error,
        &format!("{APP_NAME} {}", env!("CARGO_PKG_VERSION")),
    );
    ctx.sink.out(
        Verbosity::Message,
        &format!("repository: {}", ctx.repo.topdir().display()),
    );
    Ok(ExitStatus::SUCCESS)
}
