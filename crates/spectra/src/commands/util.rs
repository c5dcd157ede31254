//! Shared helpers for command handlers.

use spectra_core::{Broker, Rgb};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

/// The output format resolved in `main`; table if unset.
pub fn format(global: &GlobalOpts) -> &OutputFormat {
    global.output.as_ref().unwrap_or(&OutputFormat::Table)
}

pub fn color(global: &GlobalOpts) -> bool {
    output::should_color(&global.color)
}

/// Parse a `#RRGGBB` argument.
pub fn parse_colour(raw: &str) -> Result<Rgb, CliError> {
    Rgb::from_hex(raw).ok_or_else(|| CliError::Validation {
        field: "colour".into(),
        reason: format!("'{raw}' is not a #RRGGBB colour"),
    })
}

/// Fail with `NotFound` unless the device is known.
pub async fn require_device(broker: &Broker, backend: &str, uid: &str) -> Result<(), CliError> {
    if broker.get_device(backend, uid).await.is_some() {
        Ok(())
    } else {
        Err(CliError::NotFound {
            resource_type: "device".into(),
            identifier: format!("{backend}:{uid}"),
            list_command: "devices list".into(),
        })
    }
}

/// Print a one-line confirmation unless quiet or machine output.
pub fn confirm(global: &GlobalOpts, message: &str) {
    if matches!(format(global), OutputFormat::Table | OutputFormat::Plain) {
        output::print_output(message, global.quiet);
    }
}
