//! Error types for JPEG parsing, decoding and reconstruction.

use std::fmt;

use crate::huffman::TableClass;
use crate::parser::ParserState;

/// Result type for jpeg-probe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for jpeg-probe operations.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// First two bytes of the input are not the SOI marker
    SignatureMismatch {
        /// The bytes actually found at offset 0
        found: [u8; 2],
    },
    /// Marker code below 0x01 or a reserved/extension tag (TEM, JPG, RESn)
    BadMarker(u8),
    /// Marker is legal but appears in a state where it is not allowed
    WrongStateForMarker {
        /// Marker code (the byte after 0xFF)
        marker: u8,
        /// Parser state when the marker was seen
        state: ParserState,
    },
    /// Declared segment length overruns the input buffer
    SegmentTruncated {
        /// Marker code of the truncated segment
        marker: u8,
        /// Declared length (including the two length bytes)
        declared: u16,
        /// Bytes actually remaining in the buffer
        available: usize,
    },
    /// A segment header carries inconsistent or out-of-range fields
    BadSegment {
        /// Marker code of the offending segment
        marker: u8,
        /// What was wrong with it
        reason: &'static str,
    },
    /// A scan references a Huffman table that was never defined
    TableMissing {
        /// DC or AC
        class: TableClass,
        /// Destination slot (0-3)
        dest: u8,
    },
    /// A component references a quantization table that was never defined
    QuantTableMissing {
        /// Destination slot (0-3)
        dest: u8,
    },
    /// A DHT carries a length vector or symbol list no canonical tree fits
    MalformedTable(&'static str),
    /// A Huffman walk consumed 16 bits without reaching a leaf
    MalformedBitStream,
    /// DC/AC size category outside the legal range for the frame kind
    InvalidSize {
        /// The size category that was decoded
        size: u8,
        /// The largest category legal for this frame
        limit: u8,
    },
    /// A run length walked the zig-zag cursor past index 63
    Overrun,
    /// The entropy-coded segment ran out of bits mid-MCU
    Truncated,
    /// Arithmetic coding, hierarchical frames, progressive refinement
    UnsupportedKind(&'static str),
    /// Operation requires state the model does not have (e.g. serializing
    /// an incomplete parse)
    UnsupportedOperation(&'static str),
    /// I/O error from the destination writer
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SignatureMismatch { found } => {
                write!(
                    f,
                    "Not a JPEG file: expected FFD8 signature, found {:02X}{:02X}",
                    found[0], found[1]
                )
            }
            Error::BadMarker(marker) => {
                write!(f, "Invalid or reserved marker 0xFF{:02X}", marker)
            }
            Error::WrongStateForMarker { marker, state } => {
                write!(
                    f,
                    "Marker 0xFF{:02X} not allowed in {} state",
                    marker,
                    state.name()
                )
            }
            Error::SegmentTruncated {
                marker,
                declared,
                available,
            } => {
                write!(
                    f,
                    "Segment 0xFF{:02X} declares {} bytes but only {} remain",
                    marker, declared, available
                )
            }
            Error::BadSegment { marker, reason } => {
                write!(f, "Malformed segment 0xFF{:02X}: {}", marker, reason)
            }
            Error::TableMissing { class, dest } => {
                write!(
                    f,
                    "Scan references undefined {} Huffman table {}",
                    class.name(),
                    dest
                )
            }
            Error::QuantTableMissing { dest } => {
                write!(
                    f,
                    "Component references undefined quantization table {}",
                    dest
                )
            }
            Error::MalformedTable(reason) => {
                write!(f, "Malformed Huffman table: {}", reason)
            }
            Error::MalformedBitStream => {
                write!(f, "Huffman walk exceeded 16 bits without reaching a symbol")
            }
            Error::InvalidSize { size, limit } => {
                write!(
                    f,
                    "Coefficient size category {} exceeds limit {} for this frame",
                    size, limit
                )
            }
            Error::Overrun => {
                write!(f, "Run length walked past the end of the data unit")
            }
            Error::Truncated => {
                write!(f, "Entropy-coded segment exhausted before the scan completed")
            }
            Error::UnsupportedKind(what) => {
                write!(f, "Unsupported encoding kind: {}", what)
            }
            Error::UnsupportedOperation(what) => {
                write!(f, "Unsupported operation: {}", what)
            }
            Error::Io(msg) => {
                write!(f, "I/O error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
