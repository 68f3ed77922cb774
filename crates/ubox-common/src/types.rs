//! Domain primitive types used across the ubox workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UboxError;

/// Outcome of a whole invocation, handed back to the operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExitStatus(u8);

impl ExitStatus {
    /// Successful completion.
    pub const SUCCESS: Self = Self(0);
    /// Any failure.
    pub const FAILURE: Self = Self(1);

    /// Returns `true` for [`ExitStatus::SUCCESS`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        Self::from(status.0)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Output verbosity, least to most verbose.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Errors only.
    Error,
    /// Normal command output, no informational chatter.
    Message,
    /// Warnings.
    Warning,
    /// Informational messages.
    #[default]
    Info,
    /// Verbose progress.
    Verbose,
    /// Everything.
    Debug,
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Error => "error",
            Self::Message => "message",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Verbose => "verbose",
            Self::Debug => "debug",
        };
        f.write_str(name)
    }
}

impl FromStr for Verbosity {
    type Err = UboxError;

    /// Accepts a level name or its numeric value (`0`..=`5`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "error" => Ok(Self::Error),
            "1" | "message" => Ok(Self::Message),
            "2" | "warning" => Ok(Self::Warning),
            "3" | "info" => Ok(Self::Info),
            "4" | "verbose" => Ok(Self::Verbose),
            "5" | "debug" => Ok(Self::Debug),
            other => Err(UboxError::Config {
                message: format!("unknown verbosity level: {other}"),
            }),
        }
    }
}

/// Identifier of a container stored in the repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a new container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Image reference in `name[:tag]` form, the tag defaulting to `latest`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    /// Repository name, possibly containing `/`.
    pub name: String,
    /// Tag.
    pub tag: String,
}

impl ImageRef {
    /// Tag used when none is given.
    pub const DEFAULT_TAG: &'static str = "latest";
}

impl FromStr for ImageRef {
    type Err = UboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || UboxError::InvalidName { name: s.to_string() };
        // A colon after the last slash separates the tag; an earlier one is a registry port.
        let last_slash = s.rfind('/').map_or(0, |i| i + 1);
        let (name, tag) = match s[last_slash..].rfind(':') {
            Some(i) => (&s[..last_slash + i], &s[last_slash + i + 1..]),
            None => (s, Self::DEFAULT_TAG),
        };
        if name.is_empty()
            || tag.is_empty()
            || name.starts_with('/')
            || name.ends_with('/')
            || name.split('/').any(|part| part.is_empty() || part == "." || part == "..")
            || tag.contains('/')
            || tag == "."
            || tag == ".."
        {
            return Err(invalid());
        }
        Ok(Self {
            name: name.to_string(),
            tag: tag.to_string(),
        })
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.tag)
    }
}
