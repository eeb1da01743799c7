//! CLI argument parsing for the caen_raw tool
//!
//! # Design Principles (KISS)
//! - Use clap's derive macro for declarative argument definition
//! - Common arguments shared via composition, not inheritance
//! - One subcommand per way of looking at a file

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{Config, ConfigError};

/// Common arguments shared across all subcommands
#[derive(Parser, Debug, Clone)]
pub struct CommonArgs {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short = 'f', long = "config", global = true)]
    pub config_file: Option<String>,
}

impl CommonArgs {
    /// Load the configured file, or defaults if none was given
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        match &self.config_file {
            Some(path) => Config::load(path),
            None => Ok(Config::default()),
        }
    }
}

/// Arguments for the caen_raw binary
#[derive(Parser, Debug, Clone)]
#[command(name = "caen_raw")]
#[command(about = "Inspect raw CAEN digitizer record files")]
#[command(version)]
pub struct CaenRawArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: RawCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RawCommand {
    /// Show record counts, digitizers and settings
    Info {
        /// Path to the raw data file
        file: PathBuf,
    },

    /// Print every record
    Dump {
        /// Path to the raw data file
        file: PathBuf,

        /// Emit one JSON object per line
        #[arg(long)]
        json: bool,

        /// Stop after this many records
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Decode the whole file with strict size checking
    Validate {
        /// Path to the raw data file
        file: PathBuf,
    },

    /// Summarise assembled events
    Events {
        /// Path to the raw data file
        file: PathBuf,
    },

    /// Print time/amplitude points for one channel of one event
    Trace {
        /// Path to the raw data file
        file: PathBuf,

        /// Event id
        #[arg(short, long)]
        event: u32,

        /// Channel number
        #[arg(short, long)]
        channel: u32,

        /// Convert amplitudes to volts
        #[arg(long)]
        volts: bool,
    },
}
