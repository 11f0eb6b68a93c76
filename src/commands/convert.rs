//! Convert command implementation

use super::{decode_input, require_clean, CommandError};
use crate::cli::ModeArg;
use hexlink_core::{encode, AddressingMode};
use std::fs;
use std::path::Path;

impl From<ModeArg> for AddressingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Linear => AddressingMode::Linear,
            ModeArg::Segmented => AddressingMode::Segmented,
        }
    }
}

/// Run the convert command
pub fn run_convert(
    input: &Path,
    output: &Path,
    mode: Option<AddressingMode>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut decoded = decode_input(input)?;
    require_clean(input, &decoded)?;

    if let Some(mode) = mode {
        if mode != decoded.image.mode() {
            log::info!("Switching addressing mode from {} to {}", decoded.image.mode(), mode);
            decoded.image.set_mode(mode);
        }
    }

    let encoded = encode(&decoded.image);
    if !encoded.is_ok() {
        eprint!("{}", encoded.diagnostics);
        return Err(CommandError::EncodeFailed(encoded.diagnostics.error_count()).into());
    }

    fs::write(output, &encoded.text)?;
    println!(
        "Wrote {} bytes in {} records to {:?}",
        decoded.image.len(),
        encoded.records,
        output
    );
    Ok(())
}
