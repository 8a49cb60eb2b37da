//! The parsed model and the public parse entry point.
//!
//! A [`Model`] owns the ordered segment list (the sole source of truth
//! for round-trip serialization), the frames with their decoded
//! coefficient grids, and whatever the metadata adapters recognized
//! (orientation, thumbnail). Parsing always yields a model: on failure
//! the partial model rides inside [`ParseFailure`] so callers can inspect
//! what was seen before the error.

use std::fmt;
use std::io::Write;

use crate::error::{Error, Result};
use crate::frame::{CoefGrid, Frame};
use crate::marker;
use crate::parser::{Parser, ParserState};
use crate::reconstruct::{self, Pixels};
use crate::segment::{describe_str, emit_marker, Segment};
use crate::types::{EncodingMode, EntropyCoding, FrameInfo, Orientation};

/// Parsing behavior switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Apply the bounded corrections: trailing-RST removal, DNL folding,
    /// scan-derived line-count override
    pub tidy_up: bool,
    /// Emit diagnostics (via the `log` facade) on suspicious but legal
    /// input
    pub warn: bool,
    /// Parse embedded thumbnails recursively
    pub recurse: bool,
}

impl ParseOptions {
    /// Enable or disable the tidy-up corrections.
    pub fn tidy_up(mut self, on: bool) -> Self {
        self.tidy_up = on;
        self
    }

    /// Enable or disable warnings.
    pub fn warn(mut self, on: bool) -> Self {
        self.warn = on;
        self
    }

    /// Enable or disable recursive thumbnail parsing.
    pub fn recurse(mut self, on: bool) -> Self {
        self.recurse = on;
        self
    }
}

/// A failed parse: the first fatal error plus the best-effort model.
pub struct ParseFailure<'a> {
    /// The first fatal error
    pub error: Error,
    /// Everything parsed before the error; incomplete but inspectable
    pub model: Box<Model<'a>>,
}

impl fmt::Debug for ParseFailure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseFailure")
            .field("error", &self.error)
            .field("segments", &self.model.num_segments())
            .finish()
    }
}

impl fmt::Display for ParseFailure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for ParseFailure<'_> {}

/// Parse a JPEG byte stream into a [`Model`].
///
/// The model borrows entropy-coded and application payloads from
/// `data`. On error the partial model is returned inside the failure.
pub fn parse<'a>(
    data: &'a [u8],
    options: ParseOptions,
) -> std::result::Result<Model<'a>, ParseFailure<'a>> {
    let (model, error) = Parser::parse(data, options);
    match error {
        None => Ok(model),
        Some(error) => Err(ParseFailure {
            error,
            model: Box::new(model),
        }),
    }
}

/// The parsed representation of one JPEG stream.
#[derive(Debug)]
pub struct Model<'a> {
    pub(crate) input_len: usize,
    pub(crate) state: ParserState,
    pub(crate) segments: Vec<Segment<'a>>,
    pub(crate) frames: Vec<Frame<'a>>,
    pub(crate) orientation: Option<Orientation>,
    pub(crate) thumbnail: Option<&'a [u8]>,
    pub(crate) thumbnail_model: Option<Box<Model<'a>>>,
}

impl<'a> Model<'a> {
    /// True when the stream ran from SOI to EOI without a fatal error.
    ///
    /// Completeness does not guarantee the image decodes on every
    /// renderer, only that the container is whole.
    pub fn is_complete(&self) -> bool {
        self.state == ParserState::Final
    }

    /// Number of frames seen (0 on early failure, 1 for every supported
    /// stream; hierarchical pyramids are rejected during parsing).
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Number of segments between SOI and EOI.
    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    /// Summary of a frame's header.
    pub fn frame_info(&self, index: usize) -> Option<FrameInfo> {
        let f = self.frames.get(index)?;
        Some(FrameInfo {
            encoding: f.encoding,
            entropy: f.encoding.entropy_coding(),
            precision: f.precision,
            width: f.n_samples_line,
            height: f.actual_lines(),
            components: f.components.clone(),
        })
    }

    /// The decoded coefficient grid of one frame component.
    pub fn coefficient_grid(&self, frame: usize, component: usize) -> Option<&CoefGrid> {
        self.frames.get(frame)?.grids.get(component)
    }

    /// Orientation recognized by a metadata adapter, if any.
    pub fn orientation(&self) -> Option<Orientation> {
        self.orientation
    }

    /// Raw bytes of the first embedded thumbnail, if one was recognized.
    pub fn thumbnail(&self) -> Option<&'a [u8]> {
        self.thumbnail
    }

    /// The recursively parsed thumbnail (only with
    /// [`ParseOptions::recurse`]).
    pub fn thumbnail_model(&self) -> Option<&Model<'a>> {
        self.thumbnail_model.as_deref()
    }

    /// Serialize the model back into a standards-compliant byte stream.
    ///
    /// An untouched parse reproduces its input byte-for-byte; tidy-up
    /// corrections and metadata removal change exactly what they claim
    /// to. Returns the number of bytes written.
    pub fn serialize<W: Write>(&self, w: &mut W) -> Result<usize> {
        if !self.is_complete() {
            return Err(Error::UnsupportedOperation(
                "serializing an incomplete model",
            ));
        }
        let mut n = emit_marker(w, marker::SOI)?;
        for seg in &self.segments {
            n += match seg {
                Segment::Frame(i) => self.frames[*i].serialize(w)?,
                Segment::Scan { frame, scan } => self.frames[*frame].scans[*scan].serialize(w)?,
                Segment::QuantTables(s) => s.serialize(w)?,
                Segment::HuffmanTables(s) => s.serialize(w)?,
                Segment::RestartInterval(s) => s.serialize(w)?,
                Segment::NumberOfLines(s) => s.serialize(w)?,
                Segment::Comment(s) => s.serialize(w)?,
                Segment::App(s) => s.serialize(w)?,
            };
        }
        n += emit_marker(w, marker::EOI)?;
        Ok(n)
    }

    /// Write a human-readable segment dump. Returns bytes written.
    pub fn describe<W: Write>(&self, w: &mut W) -> Result<usize> {
        let mut n = describe_str(
            w,
            &format!(
                "JPEG stream: {} segment(s), {}\n",
                self.segments.len(),
                if self.is_complete() { "complete" } else { "incomplete" }
            ),
        )?;
        for seg in &self.segments {
            n += match seg {
                Segment::Frame(i) => self.frames[*i].describe(w)?,
                Segment::Scan { frame, scan } => self.frames[*frame].scans[*scan].describe(w)?,
                Segment::QuantTables(s) => s.describe(w)?,
                Segment::HuffmanTables(s) => s.describe(w)?,
                Segment::RestartInterval(s) => s.describe(w)?,
                Segment::NumberOfLines(s) => s.describe(w)?,
                Segment::Comment(s) => s.describe(w)?,
                Segment::App(s) => s.describe(w)?,
            };
        }
        Ok(n)
    }

    /// Serialized length alongside the original input length.
    ///
    /// The two differ when corrections fired, metadata was removed, or
    /// the input carried trailing junk. An incomplete model reports 0.
    pub fn actual_lengths(&self) -> (usize, usize) {
        if !self.is_complete() {
            return (0, self.input_len);
        }
        match self.serialize(&mut std::io::sink()) {
            Ok(n) => (n, self.input_len),
            Err(_) => (0, self.input_len),
        }
    }

    /// Reconstruct a frame into pixels.
    ///
    /// With `as_gray` only the first component is emitted (one byte per
    /// pixel); otherwise three-component frames convert YCbCr to RGB.
    /// The stored orientation, if any, reorders the output.
    pub fn reconstruct(&self, frame: usize, as_gray: bool) -> Result<Pixels> {
        if !self.is_complete() {
            return Err(Error::UnsupportedOperation(
                "reconstructing an incomplete model",
            ));
        }
        let f = self
            .frames
            .get(frame)
            .ok_or(Error::UnsupportedOperation("no such frame"))?;
        if f.encoding.entropy_coding() != EntropyCoding::Huffman {
            return Err(Error::UnsupportedKind("arithmetic-coded frame"));
        }
        if !matches!(
            f.encoding.encoding_mode(),
            EncodingMode::BaselineSequential | EncodingMode::ExtendedSequential
        ) {
            return Err(Error::UnsupportedKind(
                "only sequential frames reconstruct to pixels",
            ));
        }
        if f.precision != 8 {
            return Err(Error::UnsupportedKind("extended precision reconstruction"));
        }
        if f.components.len() != 1 && f.components.len() != 3 {
            return Err(Error::UnsupportedKind(
                "component layout is neither grayscale nor YCbCr",
            ));
        }
        if f.scans.is_empty() || !f.scans.iter().all(|s| s.coefficients_decoded) {
            return Err(Error::UnsupportedKind("scan coefficients were not decoded"));
        }
        reconstruct::reconstruct(f, self.orientation, as_gray)
    }

    /// Mark application segments for removal; they vanish from the next
    /// serialization. `app` selects one APPn slot (0..15) or, when None,
    /// every application segment. Returns the number of segments marked.
    pub fn remove_metadata(&mut self, app: Option<u8>) -> usize {
        let mut n = 0;
        for seg in &mut self.segments {
            if let Segment::App(a) = seg {
                let matches = match app {
                    None => true,
                    Some(slot) => a.marker == marker::APP0 + (slot & 0x0F),
                };
                if matches && !a.removed {
                    a.removed = true;
                    n += 1;
                }
            }
        }
        n
    }
}
