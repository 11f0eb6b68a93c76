//! hexlink - Intel HEX inspector, converter and serial uploader
//!
//! Decodes Intel HEX files into a sparse memory image, writes them back in
//! canonical form, and uploads them to bootloaders that take a size-prefixed
//! byte stream framed into bursts.
//!
//! # Architecture
//!
//! - **hexlink-core** - record codec, memory image, upload streamer and the
//!   JSON device profile database
//! - **hexlink-serial** - serial/TCP transports and burst framing
//!
//! This binary only wires them to the command line.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use hexlink_core::config::DeviceDatabase;

use std::path::{Path, PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Info { input } => commands::info::run_info(&input),
        Commands::Convert {
            input,
            output,
            mode,
        } => commands::convert::run_convert(&input, &output, mode.map(Into::into)),
        Commands::Upload {
            input,
            device,
            port,
            baud,
            max_size,
            force,
            dry_run,
        } => {
            let db = load_device_database(cli.device_db.as_deref())?;
            let profile = db.get(&device)?;
            let options = commands::upload::UploadOptions {
                port: if dry_run { None } else { port },
                baud,
                max_size,
                force,
            };
            commands::upload::run_upload(&input, profile, &options)
        }
        Commands::ListDevices => {
            let db = load_device_database(cli.device_db.as_deref())?;
            commands::list_devices(&db);
            Ok(())
        }
    }
}

/// Default locations searched for device profiles, in order
fn default_device_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("devices")];

    if let Some(config) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        paths.push(PathBuf::from(config).join("hexlink/devices"));
    } else if let Some(home) = std::env::var_os("HOME") {
        paths.push(PathBuf::from(home).join(".config/hexlink/devices"));
    }

    paths.push(PathBuf::from("/usr/share/hexlink/devices"));
    paths
}

/// Load the device database from the specified path or default locations
fn load_device_database(path: Option<&Path>) -> Result<DeviceDatabase, Box<dyn std::error::Error>> {
    let mut db = DeviceDatabase::new();

    if let Some(path) = path {
        // User specified a path
        if path.is_dir() {
            db.load_dir(path)?;
        } else if path.is_file() {
            db.load_file(path)?;
        } else {
            return Err(format!("Device database path not found: {}", path.display()).into());
        }
    } else {
        let mut loaded = false;
        for dir in default_device_paths() {
            if dir.is_dir() {
                match db.load_dir(&dir) {
                    Ok(count) => {
                        log::debug!("Loaded {} device profiles from {}", count, dir.display());
                        loaded = true;
                    }
                    Err(e) => {
                        log::warn!("Failed to load device profiles from {}: {}", dir.display(), e);
                    }
                }
            }
        }

        if !loaded {
            log::warn!("No device database found in default locations");
        }
    }

    log::info!("Loaded {} device profiles", db.len());
    Ok(db)
}
