//! hexlink-core - Intel HEX codec and upload streamer
//!
//! This crate decodes Intel HEX text into a sparse memory image, encodes an
//! image back into the minimal record stream, and streams an image to a
//! byte sink behind a size header. It is `no_std` compatible (with `alloc`)
//! so the same code can run on a bootloader host or on an embedded bridge.
//!
//! # Features
//!
//! - `std` - File and reader helpers, and the JSON device profile database
//!
//! # Example
//!
//! ```
//! use hexlink_core::{decode_str, encode};
//!
//! let decoded = decode_str(":0300300002337A1E\n:00000001FF\n");
//! assert!(decoded.is_ok());
//! assert_eq!(decoded.image.get(0x31), Some(0x33));
//!
//! let encoded = encode(&decoded.image);
//! assert!(encoded.text.ends_with(":00000001FF\n"));
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

#[cfg(feature = "std")]
pub mod config;
pub mod decode;
pub mod diag;
pub mod encode;
pub mod error;
pub mod hex;
pub mod image;
pub mod record;
pub mod upload;

pub use decode::{decode_lines, decode_str, Decoded};
#[cfg(feature = "std")]
pub use decode::{decode_file, decode_reader};
pub use diag::Diagnostics;
pub use encode::{encode, write_records, Encoded};
pub use error::{Error, Result};
pub use image::{AddressingMode, EntryPoint, EntryPoints, MemoryImage};
pub use record::{Record, RecordType};
pub use upload::{ByteSink, NoProgress, Upload, UploadProgress, UploadState, UploadStats};
