//! `ubox install` — Provision the execution environment.
//!
//! Runs implicitly before every command except `version`, `showconf` and
//! itself, so repeated runs must be cheap: once the marker exists nothing
//! is done unless `--force` or `--purge` is given.

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ubox_common::types::{ExitStatus, Verbosity};

use super::Context;
use crate::cmdline::CommandLine;

/// Contents of the install marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallMarker {
    /// Version that performed the install.
    pub version: String,
    /// Install time.
    pub installed_at: DateTime<Utc>,
}

/// Provisions `bin/` and `lib/` and writes the install marker.
///
/// # Errors
///
/// Returns an error if a directory or the marker cannot be written or
/// removed.
pub fn execute(ctx: &mut Context<'_>, line: &mut CommandLine) -> anyhow::Result<ExitStatus> {
    let force = line.flag("--force");
    let purge = line.flag("--purge");
    let marker = ctx.repo.install_marker();

    if purge && marker.exists() {
        std::fs::remove_file(&marker)
            .with_context(|| format!("cannot remove {}", marker.display()))?;
        ctx.sink.out(Verbosity::Info, "Info: removed previous installation");
    }
    if purge && !force {
        return Ok(ExitStatus::SUCCESS);
    }
    if marker.exists() && !force {
        tracing::debug!(marker = %marker.display(), "already installed");
        return Ok(ExitStatus::SUCCESS);
    }

    ctx.sink.out(
        Verbosity::Info,
        &format!("Info: installing in {}", ctx.repo.topdir().display()),
    );
    for dir in [ctx.repo.bin_dir(), ctx.repo.lib_dir()] {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("cannot create {}", dir.display()))?;
    }
    let record = InstallMarker {
        version: env!("CARGO_PKG_VERSION").to_string(),
        installed_at: Utc::now(),
    };
    std::fs::write(&marker, serde_json::to_vec_pretty(&record)?)
        .with_context(|| format!("cannot write {}", marker.display()))?;
    tracing::info!(version = %record.version, "installation complete");
    Ok(ExitStatus::SUCCESS)
}
