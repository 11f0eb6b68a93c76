//! Info command implementation

use super::{decode_input, format_size, require_clean};
use hexlink_core::hex;
use hexlink_core::image::MemoryImage;
use std::path::Path;

/// Run the info command
pub fn run_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let decoded = decode_input(input)?;
    print_image_info(&decoded.image);

    println!(
        "Diagnostics:   {} warning(s), {} error(s)",
        decoded.diagnostics.warning_count(),
        decoded.diagnostics.error_count()
    );

    require_clean(input, &decoded)?;
    Ok(())
}

/// Print a summary of an image
fn print_image_info(image: &MemoryImage) {
    println!("Bytes:         {}", image.len());

    match image.address_range() {
        Some(range) => {
            println!(
                "Address range: 0x{} - 0x{} ({} segment(s))",
                hex::dword(*range.start()),
                hex::dword(*range.end()),
                image.segment_count()
            );
            println!("Load size:     {}", format_size(image.end_address()));
        }
        None => println!("Address range: (empty)"),
    }

    println!("Mode:          {}", image.mode());

    let entries = image.entry_points();
    match entries.primary() {
        Some(entry) => {
            println!(
                "Entry point:   {} (0x{})",
                entry,
                hex::dword(entry.absolute())
            );
            if entries.is_conflicting() {
                for other in entries.iter().skip(1) {
                    println!("               {} (conflicting)", other);
                }
            }
        }
        None => println!("Entry point:   (none)"),
    }
}
