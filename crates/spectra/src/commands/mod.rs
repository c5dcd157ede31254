//! Command dispatch: bridges CLI args -> broker operations -> output formatting.

pub mod backends;
pub mod config_cmd;
pub mod devices;
pub mod matrix;
pub mod util;

use spectra_core::Broker;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a broker-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, broker: &Broker, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Backends(args) => backends::handle(broker, args, global).await,
        Command::Devices(args) => devices::handle(broker, args, global).await,
        Command::Matrix(args) => matrix::handle(broker, args, global).await,
        // Config is handled before a broker exists
        Command::Config(args) => config_cmd::handle(args, global),
    }
}
