//! Core type definitions for the JPEG container model.
//!
//! Frame encoding kinds mirror the thirteen SOF markers of T.81 (the
//! low nibble of the marker is the discriminant, with the DHT/JPG/DAC
//! holes left out). The derived classifications (entropy coding, encoding
//! mode, framing) fall out of simple arithmetic on that nibble.

use crate::marker;

/// How a frame is encoded: one of the thirteen SOF kinds of T.81.
///
/// The discriminant equals the low nibble of the SOF marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Encoding {
    /// SOF0: Huffman baseline sequential DCT
    BaselineSequential = 0,
    /// SOF1: Huffman extended sequential DCT
    ExtendedSequential = 1,
    /// SOF2: Huffman progressive DCT
    Progressive = 2,
    /// SOF3: Huffman lossless
    Lossless = 3,
    /// SOF5: differential Huffman sequential DCT
    DifferentialSequential = 5,
    /// SOF6: differential Huffman progressive DCT
    DifferentialProgressive = 6,
    /// SOF7: differential Huffman lossless
    DifferentialLossless = 7,
    /// SOF9: arithmetic extended sequential DCT
    ArithmeticSequential = 9,
    /// SOF10: arithmetic progressive DCT
    ArithmeticProgressive = 10,
    /// SOF11: arithmetic lossless
    ArithmeticLossless = 11,
    /// SOF13: differential arithmetic sequential DCT
    DifferentialArithmeticSequential = 13,
    /// SOF14: differential arithmetic progressive DCT
    DifferentialArithmeticProgressive = 14,
    /// SOF15: differential arithmetic lossless
    DifferentialArithmeticLossless = 15,
}

impl Encoding {
    /// Map an SOF marker code to its encoding kind.
    pub fn from_sof_marker(code: u8) -> Option<Encoding> {
        if !marker::is_sof(code) {
            return None;
        }
        Some(match code & 0x0F {
            0 => Encoding::BaselineSequential,
            1 => Encoding::ExtendedSequential,
            2 => Encoding::Progressive,
            3 => Encoding::Lossless,
            5 => Encoding::DifferentialSequential,
            6 => Encoding::DifferentialProgressive,
            7 => Encoding::DifferentialLossless,
            9 => Encoding::ArithmeticSequential,
            10 => Encoding::ArithmeticProgressive,
            11 => Encoding::ArithmeticLossless,
            13 => Encoding::DifferentialArithmeticSequential,
            14 => Encoding::DifferentialArithmeticProgressive,
            15 => Encoding::DifferentialArithmeticLossless,
            _ => return None,
        })
    }

    /// The SOF marker code for this kind.
    pub const fn sof_marker(self) -> u8 {
        marker::SOF0 + self as u8
    }

    /// Huffman or arithmetic entropy coding.
    pub const fn entropy_coding(self) -> EntropyCoding {
        if (self as u8) / 8 == 0 {
            EntropyCoding::Huffman
        } else {
            EntropyCoding::Arithmetic
        }
    }

    /// The scan-data format family.
    pub const fn encoding_mode(self) -> EncodingMode {
        match (self as u8) % 4 {
            0 => EncodingMode::BaselineSequential,
            1 => EncodingMode::ExtendedSequential,
            2 => EncodingMode::Progressive,
            _ => EncodingMode::Lossless,
        }
    }

    /// Single-frame or hierarchical (differential) framing.
    pub const fn framing(self) -> Framing {
        if ((self as u8) % 8) / 4 == 0 {
            Framing::SingleFrame
        } else {
            Framing::Hierarchical
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Encoding::BaselineSequential => "Huffman baseline sequential DCT",
            Encoding::ExtendedSequential => "Huffman extended sequential DCT",
            Encoding::Progressive => "Huffman progressive DCT",
            Encoding::Lossless => "Huffman lossless",
            Encoding::DifferentialSequential => "differential Huffman sequential DCT",
            Encoding::DifferentialProgressive => "differential Huffman progressive DCT",
            Encoding::DifferentialLossless => "differential Huffman lossless",
            Encoding::ArithmeticSequential => "arithmetic extended sequential DCT",
            Encoding::ArithmeticProgressive => "arithmetic progressive DCT",
            Encoding::ArithmeticLossless => "arithmetic lossless",
            Encoding::DifferentialArithmeticSequential => {
                "differential arithmetic sequential DCT"
            }
            Encoding::DifferentialArithmeticProgressive => {
                "differential arithmetic progressive DCT"
            }
            Encoding::DifferentialArithmeticLossless => "differential arithmetic lossless",
        }
    }
}

/// Entropy coding family of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntropyCoding {
    /// Huffman coded (SOF0-7)
    Huffman,
    /// Arithmetic coded (SOF9-15)
    Arithmetic,
}

impl EntropyCoding {
    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            EntropyCoding::Huffman => "Huffman coding",
            EntropyCoding::Arithmetic => "arithmetic coding",
        }
    }
}

/// Scan-data format family of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingMode {
    /// 8-bit precision, 2+2 entropy tables
    BaselineSequential,
    /// 8- or 12-bit precision, 4+4 entropy tables
    ExtendedSequential,
    /// Multiple scans refining spectral bands
    Progressive,
    /// Predictive lossless
    Lossless,
}

/// Whether the stream carries one frame or a hierarchical pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Exactly one frame (non-differential SOF)
    SingleFrame,
    /// DHP-introduced differential frames
    Hierarchical,
}

/// One image component as declared in the frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Component {
    /// Component identifier (1=Y, 2=Cb, 3=Cr by convention)
    pub id: u8,
    /// Horizontal sampling factor (1-4)
    pub h_samp_factor: u8,
    /// Vertical sampling factor (1-4)
    pub v_samp_factor: u8,
    /// Quantization table destination (0-3)
    pub quant_tbl_no: u8,
}

/// Read-only summary of a parsed frame, as handed out by the model.
#[derive(Debug, Clone)]
pub struct FrameInfo {
    /// How the frame is encoded
    pub encoding: Encoding,
    /// Huffman or arithmetic
    pub entropy: EntropyCoding,
    /// Bits per sample
    pub precision: u8,
    /// Samples per line
    pub width: u16,
    /// Number of lines, after any DNL or scan-derived correction
    pub height: u16,
    /// Component declarations in frame order
    pub components: Vec<Component>,
}

/// One side of the image, used to anchor the first row / first column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualSide {
    /// Left edge
    Left,
    /// Top edge
    Top,
    /// Right edge
    Right,
    /// Bottom edge
    Bottom,
}

/// Where the first row and first column of the stored pixels belong on
/// the displayed image.
///
/// The eight valid combinations map one-to-one onto EXIF orientation
/// codes 1..8. Pixel emission stays orientation-agnostic: the struct
/// supplies a source-index function and an axis-swap flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Orientation {
    /// Side the first stored row maps to
    pub row0: VisualSide,
    /// Side the first stored column maps to
    pub col0: VisualSide,
}

impl Orientation {
    /// The identity orientation (EXIF code 1).
    pub const TOP_LEFT: Orientation = Orientation {
        row0: VisualSide::Top,
        col0: VisualSide::Left,
    };

    /// Map an EXIF orientation code (1..8) onto an anchor pair.
    pub fn from_exif(code: u16) -> Option<Orientation> {
        use VisualSide::*;
        let (row0, col0) = match code {
            1 => (Top, Left),
            2 => (Top, Right),
            3 => (Bottom, Right),
            4 => (Bottom, Left),
            5 => (Left, Top),
            6 => (Right, Top),
            7 => (Right, Bottom),
            8 => (Left, Bottom),
            _ => return None,
        };
        Some(Orientation { row0, col0 })
    }

    /// The EXIF code for this anchor pair, if it is one of the 8 valid
    /// combinations.
    pub fn exif_code(self) -> Option<u16> {
        use VisualSide::*;
        Some(match (self.row0, self.col0) {
            (Top, Left) => 1,
            (Top, Right) => 2,
            (Bottom, Right) => 3,
            (Bottom, Left) => 4,
            (Left, Top) => 5,
            (Right, Top) => 6,
            (Right, Bottom) => 7,
            (Left, Bottom) => 8,
            _ => return None,
        })
    }

    /// True when rendering swaps rows and columns (90/270 degree family).
    pub fn swaps_axes(self) -> bool {
        matches!(self.row0, VisualSide::Left | VisualSide::Right)
    }

    /// True for the identity orientation.
    pub fn is_identity(self) -> bool {
        self == Orientation::TOP_LEFT
    }

    /// Source pixel position for output position (row, col).
    ///
    /// `src_rows` and `src_cols` are the dimensions of the stored image.
    /// For axis-swapping orientations the output grid is `src_cols x
    /// src_rows`; the caller iterates output coordinates and this maps
    /// them back onto storage.
    pub fn source_pos(
        self,
        row: usize,
        col: usize,
        src_rows: usize,
        src_cols: usize,
    ) -> (usize, usize) {
        use VisualSide::*;
        match (self.row0, self.col0) {
            (Top, Left) => (row, col),
            (Top, Right) => (row, src_cols - 1 - col),
            (Bottom, Right) => (src_rows - 1 - row, src_cols - 1 - col),
            (Bottom, Left) => (src_rows - 1 - row, col),
            (Left, Top) => (col, row),
            (Right, Top) => (src_rows - 1 - col, row),
            (Right, Bottom) => (src_rows - 1 - col, src_cols - 1 - row),
            (Left, Bottom) => (col, src_cols - 1 - row),
            // The four degenerate pairs (both anchors on the same axis)
            // cannot come out of from_exif; fall back to identity.
            _ => (row, col),
        }
    }
}
