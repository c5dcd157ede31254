//! Clap derive structures for the `spectra` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// spectra -- one front end for every RGB lighting daemon
#[derive(Debug, Parser)]
#[command(
    name = "spectra",
    version,
    about = "Control RGB lighting across hardware daemons",
    long_about = "Discover lighting devices across every configured backend daemon,\n\
        apply effects to their zones, and draw on per-key LED matrices.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "SPECTRA_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format (defaults to the config file's `defaults.output`)
    #[arg(long, short = 'o', env = "SPECTRA_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Backend call timeout in milliseconds (overrides config)
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect configured backend daemons
    #[command(alias = "b")]
    Backends(BackendsArgs),

    /// List, inspect and light devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Draw on per-key LED matrices
    #[command(alias = "m")]
    Matrix(MatrixArgs),

    /// Show the resolved configuration
    Config(ConfigArgs),
}

// ── Backends ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct BackendsArgs {
    #[command(subcommand)]
    pub command: BackendsCommand,
}

#[derive(Debug, Subcommand)]
pub enum BackendsCommand {
    /// List backends and probe their availability
    #[command(alias = "ls")]
    List,
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices across all backends
    #[command(alias = "ls")]
    List {
        /// Only devices of this form factor (keyboard, mouse, mousemat, ...)
        #[arg(long, short = 'f')]
        form_factor: Option<String>,
    },

    /// Show one device with its zones and effects
    Get {
        /// Backend id
        backend: String,
        /// Device uid
        uid: String,
    },

    /// Apply an effect to one zone
    Set(SetArgs),
}

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Backend id
    pub backend: String,

    /// Device uid
    pub uid: String,

    /// Zone to change
    #[arg(long, short = 'z', default_value = "main")]
    pub zone: String,

    /// Effect id (static, wave, breath, brightness, ...)
    #[arg(long, short = 'e')]
    pub effect: String,

    /// Effect parameter (integer or option id)
    #[arg(long, short = 'p')]
    pub param: Option<String>,

    /// Colour as #RRGGBB (repeatable)
    #[arg(long = "colour", short = 'c', alias = "color")]
    pub colours: Vec<String>,

    /// Require the device to have this serial
    #[arg(long)]
    pub serial: Option<String>,
}

// ── Matrix ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MatrixArgs {
    #[command(subcommand)]
    pub command: MatrixCommand,
}

#[derive(Debug, Subcommand)]
pub enum MatrixCommand {
    /// Fill one device's matrix with a single colour
    Fill {
        /// Backend id
        backend: String,
        /// Device uid
        uid: String,
        /// Colour as #RRGGBB
        #[arg(long = "colour", short = 'c', alias = "color")]
        colour: String,
    },

    /// Fill every matrix device and report which ones drew
    Test {
        /// Colour as #RRGGBB
        #[arg(long = "colour", short = 'c', alias = "color", default_value = "#00FF00")]
        colour: String,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the resolved configuration (tokens masked)
    Show,
    /// Print the config file path
    Path,
}
