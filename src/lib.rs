//! # jpeg-probe
//!
//! A JPEG (ITU-T T.81 / ISO-IEC 10918-1) container parser, entropy
//! decoder and raw image reconstructor:
//!
//! - **Container analysis** - a marker-driven state machine classifies
//!   and bounds every segment between SOI and EOI
//! - **Entropy decoding** - Huffman-coded scans are decoded into per-
//!   component coefficient grids (baseline and extended sequential, plus
//!   the initial DC scan of progressive streams)
//! - **Reconstruction** - dequantization, an AAN inverse DCT and BT.601
//!   color conversion turn the grids into grayscale or RGB pixels,
//!   honoring the EXIF orientation when present
//! - **Round-trip** - serializing an untouched parse reproduces the
//!   input byte-for-byte; optional tidy-up applies three bounded
//!   corrections (trailing restart removal, DNL folding, scan-derived
//!   line counts)
//!
//! ## Quick start
//!
//! ```no_run
//! use jpeg_probe::{parse, ParseOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("photo.jpg")?;
//! let model = parse(&bytes, ParseOptions::default()).map_err(|f| f.error)?;
//!
//! println!("{} frame(s), complete: {}", model.num_frames(), model.is_complete());
//! if let Some(info) = model.frame_info(0) {
//!     println!("{}x{} {:?}", info.width, info.height, info.encoding);
//! }
//!
//! // Byte-exact round trip.
//! let mut out = Vec::new();
//! model.serialize(&mut out)?;
//! assert_eq!(out, bytes);
//!
//! // Pixels, if the frame kind supports it.
//! let pixels = model.reconstruct(0, false)?;
//! println!("{}x{}, {} channel(s)", pixels.width, pixels.height, pixels.channels);
//! # Ok(())
//! # }
//! ```
//!
//! ## Failure behavior
//!
//! A failed parse still returns everything seen before the error:
//!
//! ```no_run
//! use jpeg_probe::{parse, ParseOptions};
//! # let bytes: Vec<u8> = Vec::new();
//! match parse(&bytes, ParseOptions::default().warn(true)) {
//!     Ok(model) => println!("{} segments", model.num_segments()),
//!     Err(failure) => {
//!         eprintln!("parse failed: {}", failure.error);
//!         eprintln!("still saw {} segments", failure.model.num_segments());
//!     }
//! }
//! ```
//!
//! Diagnostics for suspicious-but-legal input go through the [`log`]
//! facade when [`ParseOptions::warn`] is set; install any logger to see
//! them.
//!
//! Out of scope: arithmetic-coded and hierarchical streams are
//! recognized but refused, progressive refinement scans are preserved at
//! container level only, and encoding fresh JPEGs is not covered.

#![deny(unsafe_code)]

pub mod bitstream;
pub mod consts;
pub mod dct;
pub mod error;
pub mod frame;
pub mod huffman;
pub mod marker;
pub mod metadata;
pub mod model;
pub mod quant;
pub mod reconstruct;
pub mod segment;
pub mod types;

mod decoder;
mod parser;

// ============================================================================
// Primary API
// ============================================================================

/// Parse a JPEG byte stream. See [module documentation](crate).
pub use model::parse;

/// Parsing behavior switches.
pub use model::ParseOptions;

/// The parsed representation of one stream.
pub use model::Model;

/// A failed parse: error plus best-effort model.
pub use model::ParseFailure;

/// Error types.
pub use error::{Error, Result};

// ============================================================================
// Secondary API
// ============================================================================

/// Reconstructed pixel buffer.
pub use reconstruct::Pixels;

/// Frame summary and component declarations.
pub use types::{Component, Encoding, EncodingMode, EntropyCoding, FrameInfo};

/// Display orientation (EXIF codes 1..8).
pub use types::{Orientation, VisualSide};

/// Parser state, as reported in state errors.
pub use parser::ParserState;
