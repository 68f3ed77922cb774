//! Scoped command-line parsing.
//!
//! Arguments are split into three scopes:
//! - general options, before the command token, parsed by clap;
//! - the command token itself;
//! - per-command arguments, kept raw and read through queries that mark
//!   what they match as consumed.
//!
//! Whatever no query consumed is reported by [`CommandLine::missing_options`].

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Options accepted before the command token.
#[derive(Parser, Debug, Default, Clone, PartialEq, Eq)]
#[command(
    name = "ubox",
    override_usage = "ubox [general options] <command> [command options]",
    help_template = "{usage-heading} {usage}\n\nGeneral options (before the command):\n{options}",
    disable_help_flag = true,
    disable_version_flag = true,
    disable_help_subcommand = true
)]
pub struct GeneralOptions {
    /// Show help and exit.
    #[arg(short = 'h', long)]
    pub help: bool,

    /// Load configuration from this file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Most verbose output.
    #[arg(short = 'D', long)]
    pub debug: bool,

    /// Minimal output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Skip TLS verification.
    #[arg(long)]
    pub insecure: bool,

    /// Use an existing repository at this path.
    #[arg(long, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Allow running as root.
    #[arg(long)]
    pub allow_root: bool,

    #[command(subcommand)]
    tail: Option<Tail>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Tail {
    #[command(external_subcommand)]
    Command(Vec<String>),
}

/// A parsed invocation.
#[derive(Debug, Default, Clone)]
pub struct CommandLine {
    argc: usize,
    general: GeneralOptions,
    command: Option<String>,
    args: Vec<String>,
    consumed_options: BTreeSet<usize>,
    consumed_params: BTreeSet<usize>,
}

impl CommandLine {
    /// Parses raw process arguments, program name first.
    ///
    /// # Errors
    ///
    /// Returns clap's error when the general scope holds an unknown or
    /// malformed option.
    pub fn parse<I, T>(argv: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();
        let mut general = GeneralOptions::try_parse_from(&argv)?;
        let (command, args) = match general.tail.take() {
            Some(Tail::Command(mut tail)) if !tail.is_empty() => {
                let command = tail.remove(0);
                (Some(command), tail)
            }
            _ => (None, Vec::new()),
        };
        Ok(Self {
            argc: argv.len(),
            general,
            command,
            args,
            ..Self::default()
        })
    }

    /// True when nothing followed the program name.
    #[must_use]
    pub const fn is_bare(&self) -> bool {
        self.argc <= 1
    }

    /// General-scope options.
    #[must_use]
    pub const fn general(&self) -> &GeneralOptions {
        &self.general
    }

    /// The command token, if any.
    #[must_use]
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// Index of the `--` separator, or the argument count.
    fn options_end(&self) -> usize {
        self.args
            .iter()
            .position(|a| a == "--")
            .unwrap_or(self.args.len())
    }

    /// Returns whether the exact option `name` is present, consuming it.
    pub fn flag(&mut self, name: &str) -> bool {
        let end = self.options_end();
        let hits: Vec<usize> = (0..end).filter(|&i| self.args[i] == name).collect();
        let found = !hits.is_empty();
        self.consumed_options.extend(hits);
        found
    }

    /// Returns every value of `name`, given as `--opt=` (accepting both
    /// `--opt=v` and `--opt v`), consuming option and value.
    ///
    /// A trailing `--opt` without value is left unconsumed.
    pub fn values(&mut self, name: &str) -> Vec<String> {
        let bare = name.strip_suffix('=').unwrap_or(name);
        let joined = format!("{bare}=");
        let end = self.options_end();
        let mut found = Vec::new();
        let mut pos = 0;
        while pos < end {
            let arg = &self.args[pos];
            if let Some(value) = arg.strip_prefix(&joined) {
                found.push(value.to_string());
                let _ = self.consumed_options.insert(pos);
            } else if arg == bare && pos + 1 < end {
                found.push(self.args[pos + 1].clone());
                let _ = self.consumed_options.insert(pos);
                let _ = self.consumed_options.insert(pos + 1);
                pos += 1;
            }
            pos += 1;
        }
        found
    }

    /// Marks every option in the whitespace-separated `names` as consumed
    /// without reading it. Names ending in `=` take a value.
    pub fn declare_options(&mut self, names: &str) {
        for name in names.split_whitespace() {
            if name.ends_with('=') {
                let _ = self.values(name);
            } else {
                let _ = self.flag(name);
            }
        }
    }

    /// Positions of positional arguments, in order.
    ///
    /// Before `--`, arguments starting with `-` (other than `-` itself) and
    /// consumed option values are skipped.
    fn positional_positions(&self) -> Vec<usize> {
        let end = self.options_end();
        (0..self.args.len())
            .filter(|&i| {
                if i > end {
                    return true;
                }
                let arg = &self.args[i];
                i < end
                    && !(arg.starts_with('-') && arg.len() > 1)
                    && !self.consumed_options.contains(&i)
            })
            .collect()
    }

    fn consume_params(&mut self, positions: &[usize]) {
        let end = self.options_end();
        if end < self.args.len() && positions.iter().any(|&p| p > end) {
            let _ = self.consumed_params.insert(end);
        }
        self.consumed_params.extend(positions.iter().copied());
    }

    /// Returns the `n`-th positional argument (1-based), consuming it.
    pub fn param(&mut self, n: usize) -> Option<String> {
        let pos = *self.positional_positions().get(n.checked_sub(1)?)?;
        self.consume_params(&[pos]);
        Some(self.args[pos].clone())
    }

    /// Returns every positional argument from the `n`-th (1-based) onward,
    /// consuming them.
    pub fn params_from(&mut self, n: usize) -> Vec<String> {
        let positions: Vec<usize> = self
            .positional_positions()
            .into_iter()
            .skip(n.saturating_sub(1))
            .collect();
        self.consume_params(&positions);
        positions.iter().map(|&p| self.args[p].clone()).collect()
    }

    /// Per-command arguments no query consumed, in order.
    #[must_use]
    pub fn missing_options(&self) -> Vec<&str> {
        self.args
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.consumed_options.contains(i) && !self.consumed_params.contains(i))
            .map(|(_, a)| a.as_str())
            .collect()
    }
}
