//! # ubox — user-space container repository CLI
//!
//! Bootstraps configuration and the local repository, then dispatches
//! exactly one command.

mod cmdline;
mod commands;
mod controller;
mod msg;
mod output;

use std::process::ExitCode;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt, reload};
use ubox_common::config::FileConfigSource;
use ubox_common::types::Verbosity;

use crate::commands::LocalCli;
use crate::controller::Controller;
use crate::msg::{Console, FilterHandle};

/// Installs the tracing subscriber.
///
/// `RUST_LOG`, when set, fixes the filter. Otherwise the filter follows the
/// user's verbosity through the returned handle.
fn init_tracing() -> Option<FilterHandle> {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        tracing_subscriber::registry()
            .with(EnvFilter::from_default_env())
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .init();
        return None;
    }
    let (filter, handle) = reload::Layer::new(msg::tracing_level(Verbosity::default()));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
    Some(handle)
}

fn main() -> ExitCode {
    let filter = init_tracing();
    let mut console = Console::new(filter);
    let controller = Controller::new(
        FileConfigSource::default(),
        nix::unistd::geteuid().as_raw(),
    );
    controller
        .execute(std::env::args_os(), &mut console, &mut LocalCli)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn default_filter_hides_info_diagnostics() {
        assert_eq!(msg::tracing_level(Verbosity::default()), LevelFilter::WARN);
    }
}
