//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use hexlink_core::hex::parse_number;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hexlink")]
#[command(author, version, about = "Intel HEX inspector, converter and uploader", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to a device profile file or directory (contains .json files)
    /// Defaults to looking in ./devices/, ~/.config/hexlink/devices/ and
    /// /usr/share/hexlink/devices/
    #[arg(long, global = true)]
    pub device_db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Addressing mode for written HEX files
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeArg {
    /// Extended Linear Address records (32-bit)
    Linear,
    /// Extended Segment Address records (20-bit)
    Segmented,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode a HEX file and show what it contains
    Info {
        /// Input HEX file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Decode a HEX file and write it back in canonical form
    Convert {
        /// Input HEX file
        #[arg(short, long)]
        input: PathBuf,

        /// Output HEX file
        #[arg(short, long)]
        output: PathBuf,

        /// Addressing mode of the output (defaults to the input's)
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
    },

    /// Upload a HEX file to a device
    Upload {
        /// Input HEX file
        #[arg(short, long)]
        input: PathBuf,

        /// Device profile id
        #[arg(short, long)]
        device: String,

        /// Serial port, or tcp:host:port for a network bridge
        #[arg(short, long, required_unless_present = "dry_run")]
        port: Option<String>,

        /// Baud rate (overrides the device profile)
        #[arg(short, long)]
        baud: Option<u32>,

        /// Target capacity in bytes (overrides the device profile)
        #[arg(long, value_parser = parse_number)]
        max_size: Option<u64>,

        /// Upload even if decoding reported warnings
        #[arg(long)]
        force: bool,

        /// Frame the upload in memory and print a summary instead of sending it
        #[arg(long)]
        dry_run: bool,
    },

    /// List the device profiles in the database
    ListDevices,
}
