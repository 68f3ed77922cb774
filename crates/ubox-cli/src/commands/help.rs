//! `ubox help` — Top-level usage.

use clap::CommandFactory;
use ubox_common::types::{ExitStatus, Verbosity};

use super::Command;
use crate::cmdline::GeneralOptions;
use crate::msg::MessageSink;

/// Builds the usage text: general options as rendered by clap, then every
/// command.
pub fn usage() -> String {
    let mut text = GeneralOptions::command().render_help().to_string();
    text.truncate(text.trim_end().len());
    text.push_str("\n\nCommands:\n");
    for command in Command::ALL {
        let summary = command
            .doc()
            .lines()
            .next()
            .and_then(|line| line.split_once(": "))
            .map_or("", |(_, summary)| summary);
        text.push_str(&format!("  {:<12}{summary}\n", command.name()));
    }
    text.push_str("\nRun 'ubox <command> --help' for command options.");
    text
}

/// Prints usage.
pub fn execute(sink: &mut dyn MessageSink) -> ExitStatus {
    sink.out(Verbosity::Error, &usage());
    ExitStatus::SUCCESS
}
