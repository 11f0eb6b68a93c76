//! CLI command implementations
//!
//! Every command decodes its input the same way: diagnostics go to stderr,
//! and any decode error stops the command before it produces output.

pub mod convert;
pub mod info;
mod list;
pub mod upload;

pub use list::list_devices;

use hexlink_core::{decode_file, Decoded};
use std::path::Path;
use thiserror::Error;

/// Failures reported by commands after their inputs were read
#[derive(Debug, Error)]
pub enum CommandError {
    /// Decoding reported errors
    #[error("{path}: {errors} error(s) while decoding")]
    DecodeFailed { path: String, errors: usize },

    /// Decoding reported warnings and the command needs a clean image
    #[error("{path}: {warnings} warning(s) while decoding; use --force to upload anyway")]
    DecodeWarnings { path: String, warnings: usize },

    /// Encoding reported errors
    #[error("{0} error(s) while encoding")]
    EncodeFailed(usize),
}

/// Decode a HEX file and print its diagnostics
fn decode_input(path: &Path) -> Result<Decoded, Box<dyn std::error::Error>> {
    let decoded = decode_file(path)?;
    let diag = &decoded.diagnostics;
    if diag.warning_count() > 0 || diag.error_count() > 0 {
        eprint!("{}", diag);
    }
    log::debug!(
        "Read {} record lines from {:?}: {} warnings, {} errors",
        decoded.lines,
        path,
        diag.warning_count(),
        diag.error_count()
    );
    Ok(decoded)
}

/// Fail with [`CommandError::DecodeFailed`] if decoding reported errors
fn require_clean(path: &Path, decoded: &Decoded) -> Result<(), CommandError> {
    if decoded.is_ok() {
        Ok(())
    } else {
        Err(CommandError::DecodeFailed {
            path: path.display().to_string(),
            errors: decoded.diagnostics.error_count(),
        })
    }
}

/// Format a byte count with a binary unit
fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(300), "300 B");
        assert_eq!(format_size(32 * 1024), "32 KiB");
        assert_eq!(format_size(2 * 1024 * 1024), "2 MiB");
    }
}
