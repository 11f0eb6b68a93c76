//! Device profile database for runtime loading and lookup
//!
//! A device profile describes how a target's bootloader expects an upload to
//! be framed. Profiles are JSON files, either a single profile object or a
//! list under `devices`:
//!
//! ```json
//! {
//!   "devices": [
//!     {
//!       "id": "avr-boot",
//!       "name": "AVR serial bootloader",
//!       "sync_byte": "0x55",
//!       "preamble": "0xAA",
//!       "sync_byte_amount": 4,
//!       "bytes_per_burst": 2,
//!       "max_size": "0x8000",
//!       "baud_rate": 57600
//!     }
//!   ]
//! }
//! ```
//!
//! Byte and size fields accept either a JSON number or a string holding a
//! decimal or `0x`-prefixed hexadecimal value.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{de, Deserialize, Deserializer};

use crate::hex;

/// Error type for device database operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading a profile file or directory
    #[error("I/O error reading {}: {source}", .path.display())]
    Io {
        /// File or directory being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
    /// JSON parsing error
    #[error("parse error in {origin}: {source}")]
    Parse {
        /// Where the JSON came from
        origin: String,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },
    /// A profile has values that cannot work
    #[error("invalid device profile '{id}': {reason}")]
    Invalid {
        /// Profile id
        id: String,
        /// What is wrong with it
        reason: String,
    },
    /// Two profiles share an id
    #[error("device '{0}' is defined more than once")]
    DuplicateDevice(String),
    /// No profile with the requested id
    #[error("unknown device '{0}'")]
    UnknownDevice(String),
}

/// Framing parameters of one target bootloader
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceProfile {
    /// Identifier used on the command line
    pub id: String,
    /// Human-readable name
    #[serde(default)]
    pub name: String,
    /// Byte repeated at the start of every burst
    #[serde(deserialize_with = "byte_value")]
    pub sync_byte: u8,
    /// Byte sent after the sync bytes of every burst
    #[serde(deserialize_with = "byte_value")]
    pub preamble: u8,
    /// How many sync bytes start a burst
    #[serde(deserialize_with = "number_value")]
    pub sync_byte_amount: u64,
    /// Payload bytes per burst; also the width of the size header
    #[serde(deserialize_with = "number_value")]
    pub bytes_per_burst: u64,
    /// Target capacity in bytes
    #[serde(deserialize_with = "number_value")]
    pub max_size: u64,
    /// Serial baud rate, if the bootloader needs a specific one
    #[serde(default)]
    pub baud_rate: Option<u32>,
}

impl DeviceProfile {
    /// Display name, falling back to the id
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Check that the profile can frame an upload
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::Invalid {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id must not be empty"));
        }
        if self.bytes_per_burst == 0 {
            return Err(invalid("bytes_per_burst must be at least 1"));
        }
        if usize::try_from(self.bytes_per_burst).is_err()
            || usize::try_from(self.sync_byte_amount).is_err()
        {
            return Err(invalid("burst parameters exceed the address space"));
        }
        if self.baud_rate == Some(0) {
            return Err(invalid("baud_rate must not be 0"));
        }
        Ok(())
    }

    /// Payload bytes per burst
    pub fn burst_len(&self) -> usize {
        self.bytes_per_burst as usize
    }

    /// Sync bytes per burst
    pub fn sync_len(&self) -> usize {
        self.sync_byte_amount as usize
    }
}

/// On-disk layout: a single profile or a list of them
#[derive(Deserialize)]
#[serde(untagged)]
enum ProfileFile {
    Many { devices: Vec<DeviceProfile> },
    One(DeviceProfile),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberDef {
    Int(u64),
    Text(String),
}

fn number_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match NumberDef::deserialize(deserializer)? {
        NumberDef::Int(n) => Ok(n),
        NumberDef::Text(s) => hex::parse_number(&s).map_err(de::Error::custom),
    }
}

fn byte_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let n = number_value(deserializer)?;
    u8::try_from(n).map_err(|_| de::Error::custom(format!("value {} does not fit in a byte", n)))
}

/// Collection of device profiles
#[derive(Debug, Clone, Default)]
pub struct DeviceDatabase {
    profiles: Vec<DeviceProfile>,
}

impl DeviceDatabase {
    /// Create an empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Load profiles from a single JSON file
    pub fn load_file(&mut self, path: &Path) -> Result<usize, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_json(&content, &path.display().to_string())
    }

    /// Load profiles from a JSON string
    pub fn load_json_str(&mut self, content: &str) -> Result<usize, ConfigError> {
        self.load_json(content, "<string>")
    }

    fn load_json(&mut self, content: &str, origin: &str) -> Result<usize, ConfigError> {
        let file: ProfileFile =
            serde_json::from_str(content).map_err(|source| ConfigError::Parse {
                origin: origin.to_string(),
                source,
            })?;
        let profiles = match file {
            ProfileFile::Many { devices } => devices,
            ProfileFile::One(profile) => alloc::vec![profile],
        };

        // Validate the whole file before adding any of it
        for (i, profile) in profiles.iter().enumerate() {
            profile.validate()?;
            let clash = self.find(&profile.id).is_some()
                || profiles[..i]
                    .iter()
                    .any(|p| p.id.eq_ignore_ascii_case(&profile.id));
            if clash {
                return Err(ConfigError::DuplicateDevice(profile.id.clone()));
            }
        }

        let count = profiles.len();
        log::debug!("Loaded {} device profiles from {}", count, origin);
        self.profiles.extend(profiles);
        Ok(count)
    }

    /// Load every `*.json` file in a directory, in file name order
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();

        let mut total = 0;
        for path in &files {
            total += self.load_file(path)?;
        }
        Ok(total)
    }

    /// Find a profile by id (case-insensitive)
    pub fn find(&self, id: &str) -> Option<&DeviceProfile> {
        self.profiles.iter().find(|p| p.id.eq_ignore_ascii_case(id))
    }

    /// Find a profile by id, failing with [`ConfigError::UnknownDevice`]
    pub fn get(&self, id: &str) -> Result<&DeviceProfile, ConfigError> {
        self.find(id)
            .ok_or_else(|| ConfigError::UnknownDevice(id.to_string()))
    }

    /// Number of loaded profiles
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// True when no profile is loaded
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Iterate over all profiles
    pub fn iter(&self) -> impl Iterator<Item = &DeviceProfile> {
        self.profiles.iter()
    }
}
