//! Upload command implementation

use super::{decode_input, require_clean, CommandError};
use hexlink_core::config::DeviceProfile;
use hexlink_core::{Upload, UploadProgress, UploadState, UploadStats};
use hexlink_serial::{BurstSink, Connection, MemoryTransport, Transport};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Options for the upload command
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Port to open; `None` frames the upload in memory only
    pub port: Option<String>,
    /// Baud rate overriding the profile
    pub baud: Option<u32>,
    /// Capacity overriding the profile
    pub max_size: Option<u64>,
    /// Upload despite decode warnings
    pub force: bool,
}

/// Create the upload progress bar style
fn create_progress_bar_style() -> Result<ProgressStyle, Box<dyn std::error::Error>> {
    Ok(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {msg}")?
        .progress_chars("#>-"))
}

/// Progress reporter using an indicatif progress bar
pub struct IndicatifProgress {
    bar: Option<ProgressBar>,
    total: u64,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        Self {
            bar: None,
            total: 0,
        }
    }

    /// Leave the bar where it stopped
    fn abandon(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.abandon_with_message("Upload failed");
        }
    }
}

impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadProgress for IndicatifProgress {
    fn started(&mut self, total_bytes: usize) {
        self.total = total_bytes as u64;
        let pb = ProgressBar::new(self.total);
        pb.set_style(create_progress_bar_style().unwrap_or_else(|_| ProgressStyle::default_bar()));
        pb.set_message("Uploading");
        self.bar = Some(pb);
    }

    fn percent(&mut self, percent: f64) {
        if let Some(pb) = &self.bar {
            pb.set_position((percent / 100.0 * self.total as f64).round() as u64);
        }
    }

    fn complete(&mut self, stats: &UploadStats) {
        if let Some(pb) = self.bar.take() {
            pb.finish_with_message("Upload complete");
        }
        println!(
            "Sent {}-byte size header and {} bytes",
            stats.header_bytes, stats.payload_bytes
        );
    }
}

/// Run the upload command
pub fn run_upload(
    input: &Path,
    profile: &DeviceProfile,
    options: &UploadOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let decoded = decode_input(input)?;
    require_clean(input, &decoded)?;

    let warnings = decoded.diagnostics.warning_count();
    if warnings > 0 {
        if !options.force {
            return Err(CommandError::DecodeWarnings {
                path: input.display().to_string(),
                warnings,
            }
            .into());
        }
        log::warn!("Uploading despite {} decode warning(s)", warnings);
    }

    let capacity = options.max_size.unwrap_or(profile.max_size);
    let mut upload = Upload::new(&decoded, capacity);
    if let UploadState::NotReady(e) = upload.state() {
        return Err(e.into());
    }

    println!(
        "Uploading {} bytes to {} ({} bytes per burst, capacity {} bytes)",
        upload.size(),
        profile.display_name(),
        profile.bytes_per_burst,
        capacity
    );

    match &options.port {
        Some(port) => {
            let connection = Connection::parse(port)?;
            let transport = connection.open(options.baud.or(profile.baud_rate))?;
            stream(&mut upload, BurstSink::from_profile(transport, profile))?;
            log::info!("Upload to {} finished", connection);
        }
        None => {
            let transport = stream(
                &mut upload,
                BurstSink::from_profile(MemoryTransport::new(), profile),
            )?;
            println!(
                "Dry run: {} bursts, {} bytes on the wire",
                transport.writes(),
                transport.data().len()
            );
        }
    }

    Ok(())
}

/// Stream an upload through a burst sink and flush it
fn stream<T: Transport>(
    upload: &mut Upload<'_>,
    mut sink: BurstSink<T>,
) -> Result<T, Box<dyn std::error::Error>> {
    let mut progress = IndicatifProgress::new();
    if let Err(e) = upload.stream(&mut sink, &mut progress) {
        progress.abandon();
        return Err(match sink.error() {
            Some(cause) => format!("{}: {}", e, cause).into(),
            None => e.into(),
        });
    }
    Ok(sink.finish()?)
}
