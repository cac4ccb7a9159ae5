#![forbid(unsafe_code)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{Level as TraceLevel, debug};
use tracing_subscriber::FmtSubscriber;

use cli::Cli;
use rplay_config::constants;
use rplay_config::{ConfigStore, JsonFileBackend};

/// LOG_LEVEL wins; otherwise the stored verbose flag picks debug over info
fn log_level(env_level: Option<&str>, verbose_pref: bool) -> TraceLevel {
    match env_level {
        Some(level) => match level.to_lowercase().as_str() {
            "trace" => TraceLevel::TRACE,
            "debug" => TraceLevel::DEBUG,
            "warn" => TraceLevel::WARN,
            "error" => TraceLevel::ERROR,
            _ => TraceLevel::INFO,
        },
        None if verbose_pref => TraceLevel::DEBUG,
        None => TraceLevel::INFO,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli.settings_path();
    let backend = JsonFileBackend::open(&path)
        .with_context(|| format!("Failed to open settings at {}", path.display()))?;

    // The logger depends on a stored preference, so peek at it before loading the store
    let verbose = rplay_config::config::Preferences::new(&backend).log_verbose();
    let env_level = std::env::var(constants::config::LOG_LEVEL_ENV).ok();
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level(env_level.as_deref(), verbose))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut store = ConfigStore::open(backend);
    debug!(path = %path.display(), "Settings store opened");

    cli.execute(&mut store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_defaults_to_info() {
        assert_eq!(log_level(None, false), TraceLevel::INFO);
        assert_eq!(log_level(None, true), TraceLevel::DEBUG);
    }

    #[test]
    fn test_log_level_env_overrides_preference() {
        assert_eq!(log_level(Some("WARN"), true), TraceLevel::WARN);
        assert_eq!(log_level(Some("trace"), false), TraceLevel::TRACE);
        assert_eq!(log_level(Some("bogus"), true), TraceLevel::INFO);
    }
}
