//! List commands implementation

use super::format_size;
use hexlink_core::config::DeviceDatabase;

/// List all device profiles
pub fn list_devices(db: &DeviceDatabase) {
    if db.is_empty() {
        println!("No device profiles loaded. Use --device-db to point at a profile directory.");
        return;
    }

    println!("Device profiles:");
    println!();
    println!(
        "{:<16} {:<28} {:>10} {:>6} {:>10} {:>8}",
        "Id", "Name", "Capacity", "Burst", "Sync", "Baud"
    );
    println!("{}", "-".repeat(84));

    for profile in db.iter() {
        let sync = format!(
            "{}x{:02X}+{:02X}",
            profile.sync_byte_amount, profile.sync_byte, profile.preamble
        );
        let baud = profile
            .baud_rate
            .map_or_else(|| "-".to_string(), |b| b.to_string());

        println!(
            "{:<16} {:<28} {:>10} {:>6} {:>10} {:>8}",
            profile.id,
            profile.display_name(),
            format_size(profile.max_size),
            profile.bytes_per_burst,
            sync,
            baud
        );
    }
}
