//! CLI configuration: thin wrapper around `spectra_config`.
//!
//! Adds resolution that respects `GlobalOpts` overrides (--config,
//! --output, --timeout-ms).

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use spectra_core::BrokerConfig;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use spectra_config::{Config, render_redacted};

/// The config file in effect: `--config` if given, else the platform default.
pub fn resolve_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(spectra_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(spectra_config::load_config_from(&resolve_path(global))?)
}

/// Flag > config file > table.
pub fn output_format(global: &GlobalOpts, config: &Config) -> OutputFormat {
    global.output.clone().unwrap_or_else(|| {
        OutputFormat::from_str(&config.defaults.output, true).unwrap_or(OutputFormat::Table)
    })
}

/// Translate the file config into a `BrokerConfig`, applying flag overrides.
pub fn broker_config(global: &GlobalOpts, config: &Config) -> Result<BrokerConfig, CliError> {
    let mut broker = spectra_config::to_broker_config(config)?;
    if let Some(ms) = global.timeout_ms {
        if ms == 0 {
            return Err(CliError::Validation {
                field: "--timeout-ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        broker.call_timeout = Duration::from_millis(ms);
    }
    Ok(broker)
}
