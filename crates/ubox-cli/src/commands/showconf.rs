//! `ubox showconf` — Print the effective configuration.

use ubox_common::types::{ExitStatus, Verbosity};

use super::Context;

/// Prints the configuration as TOML.
///
/// # Errors
///
/// Returns an error if the configuration cannot be rendered.
pub fn execute(ctx: &mut Context<'_>) -> anyhow::Result<ExitStatus> {
    let rendered = ctx.config.to_toml()?;
    ctx.sink.out(Verbosity::Message, "Configuration:");
    ctx.sink.out(Verbosity::Error, rendered.trim_end());
    Ok(ExitStatus::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::Recorder;
    use ubox_common::config::RuntimeConfig;
    use ubox_repo::LocalRepository;

    #[test]
    fn showconf_reflects_runtime_overrides() {
        let config = RuntimeConfig {
            http_insecure: true,
            ..RuntimeConfig::default()
        };
        let repo = LocalRepository::new("/unused");
        let mut sink = Recorder::default();
        let mut ctx = Context {
            config: &config,
            repo: &repo,
            sink: &mut sink,
        };
        assert_eq!(execute(&mut ctx).expect("showconf"), ExitStatus::SUCCESS);
        assert!(sink.stdout().contains("http_insecure = true"));
    }
}
