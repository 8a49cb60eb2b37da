//! Application-segment adapters: JFIF, JFXX, EXIF.
//!
//! The core treats APPn payloads as opaque byte spans that serialize
//! verbatim; the adapters here only *recognize* known payloads to surface
//! three things the rest of the library consumes:
//!
//! - JFIF version/density fields (for description),
//! - the EXIF orientation tag (for the reconstructor),
//! - an embedded thumbnail byte range (for extraction / recursion).
//!
//! Recognition never fails: a payload that does not match a known layout
//! is kept as [`AppKind::Other`]. The EXIF walk is strictly bounds-checked
//! and interprets nothing beyond IFD0 tag 0x0112.

use std::io::{self, Write};
use std::ops::Range;

use crate::marker;
use crate::segment::{describe_str, emit_marker, emit_u16};
use crate::types::Orientation;

/// JFXX extension code: thumbnail stored as baseline JPEG.
pub const THUMBNAIL_BASELINE: u8 = 0x10;
/// JFXX extension code: thumbnail stored as one byte per pixel palette.
pub const THUMBNAIL_PALETTE: u8 = 0x11;
/// JFXX extension code: thumbnail stored as packed RGB.
pub const THUMBNAIL_RGB: u8 = 0x12;

/// What an application segment turned out to contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppKind {
    /// APP0 "JFIF": version, density, thumbnail dimensions
    Jfif(JfifInfo),
    /// APP0 "JFXX": extension with an embedded thumbnail
    Jfxx(JfxxInfo),
    /// APP1 "Exif": optional orientation extracted from IFD0
    Exif {
        /// Orientation from tag 0x0112, if present and valid
        orientation: Option<Orientation>,
    },
    /// APP1 XMP packet
    Xmp,
    /// Anything else; kept as opaque bytes
    Other,
}

/// Fields of a JFIF APP0 payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JfifInfo {
    /// Major version (usually 1)
    pub major: u8,
    /// Minor version
    pub minor: u8,
    /// Density unit: 0 none, 1 dots/inch, 2 dots/cm
    pub unit: u8,
    /// Horizontal density
    pub h_density: u16,
    /// Vertical density
    pub v_density: u16,
    /// Embedded thumbnail width in pixels (0 = none)
    pub thumb_width: u8,
    /// Embedded thumbnail height in pixels
    pub thumb_height: u8,
}

/// Fields of a JFXX APP0 extension payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JfxxInfo {
    /// Extension code (one of the THUMBNAIL_* constants)
    pub extension_code: u8,
    /// Byte range of the thumbnail data within the segment body
    pub thumbnail: Option<Range<usize>>,
}

/// An application segment: opaque payload plus whatever was recognized.
#[derive(Debug)]
pub struct AppSegment<'a> {
    /// Marker code (0xE0..0xEF)
    pub marker: u8,
    /// Segment body (after the length field), borrowed from the input
    pub body: &'a [u8],
    /// Recognized content
    pub kind: AppKind,
    /// Set by metadata removal; skips the segment on serialization
    pub removed: bool,
}

impl<'a> AppSegment<'a> {
    /// Wrap and classify an application segment payload.
    pub fn parse(marker_code: u8, body: &'a [u8]) -> AppSegment<'a> {
        let kind = match marker_code {
            marker::APP0 => classify_app0(body),
            marker::APP1 => classify_app1(body),
            _ => AppKind::Other,
        };
        AppSegment {
            marker: marker_code,
            body,
            kind,
            removed: false,
        }
    }

    /// Re-emit the segment verbatim, or nothing if it was removed.
    pub fn serialize<W: Write>(&self, w: &mut W) -> io::Result<usize> {
        if self.removed {
            return Ok(0);
        }
        let mut n = emit_marker(w, self.marker)?;
        n += emit_u16(w, 2 + self.body.len() as u16)?;
        w.write_all(self.body)?;
        Ok(n + self.body.len())
    }

    /// Summary line.
    pub fn describe<W: Write>(&self, w: &mut W) -> io::Result<usize> {
        let text = match &self.kind {
            AppKind::Jfif(info) => format!(
                "APP0: JFIF {}.{:02}, density {}x{} (unit {}), thumbnail {}x{}\n",
                info.major,
                info.minor,
                info.h_density,
                info.v_density,
                info.unit,
                info.thumb_width,
                info.thumb_height
            ),
            AppKind::Jfxx(info) => format!(
                "APP0: JFXX extension 0x{:02X}, {} thumbnail bytes\n",
                info.extension_code,
                info.thumbnail.as_ref().map_or(0, |r| r.len())
            ),
            AppKind::Exif { orientation } => match orientation {
                Some(o) => format!(
                    "APP1: EXIF, orientation {}\n",
                    o.exif_code().unwrap_or(0)
                ),
                None => "APP1: EXIF\n".to_string(),
            },
            AppKind::Xmp => "APP1: XMP packet\n".to_string(),
            AppKind::Other => format!(
                "{}: {} opaque bytes\n",
                marker::name(self.marker),
                self.body.len()
            ),
        };
        describe_str(w, &text)
    }

    /// The orientation this segment supplies, if any.
    pub fn orientation(&self) -> Option<Orientation> {
        match self.kind {
            AppKind::Exif { orientation } => orientation,
            _ => None,
        }
    }

    /// The embedded thumbnail bytes this segment supplies, if any.
    pub fn thumbnail(&self) -> Option<&'a [u8]> {
        match &self.kind {
            AppKind::Jfxx(info) => info
                .thumbnail
                .as_ref()
                .map(|r| &self.body[r.clone()]),
            _ => None,
        }
    }
}

/// Discriminate APP0 payloads: JFIF base header or JFXX extension.
fn classify_app0(body: &[u8]) -> AppKind {
    if body.len() >= 14 && &body[..5] == b"JFIF\0" {
        return AppKind::Jfif(JfifInfo {
            major: body[5],
            minor: body[6],
            unit: body[7],
            h_density: u16::from_be_bytes([body[8], body[9]]),
            v_density: u16::from_be_bytes([body[10], body[11]]),
            thumb_width: body[12],
            thumb_height: body[13],
        });
    }
    if body.len() >= 6 && &body[..5] == b"JFXX\0" {
        let code = body[5];
        let thumbnail = match code {
            // Baseline JPEG thumbnail: everything after the code byte.
            THUMBNAIL_BASELINE if body.len() > 6 => Some(6..body.len()),
            // Palette / RGB thumbnails carry their own dimensions; the
            // range still covers the raw payload.
            THUMBNAIL_PALETTE | THUMBNAIL_RGB if body.len() > 8 => Some(8..body.len()),
            _ => None,
        };
        return AppKind::Jfxx(JfxxInfo {
            extension_code: code,
            thumbnail,
        });
    }
    AppKind::Other
}

/// Discriminate APP1 payloads: EXIF (TIFF container) or XMP.
fn classify_app1(body: &[u8]) -> AppKind {
    if body.len() >= 6 && &body[..6] == b"Exif\0\0" {
        return AppKind::Exif {
            orientation: exif_orientation(&body[6..]),
        };
    }
    if body.starts_with(b"http://ns.adobe.com/xap/1.0/\0") {
        return AppKind::Xmp;
    }
    AppKind::Other
}

/// Walk a TIFF header and IFD0 looking for the orientation tag (0x0112).
///
/// Both byte orders are handled. Any structural inconsistency aborts the
/// walk and yields None; nothing else in the IFD is interpreted.
fn exif_orientation(tiff: &[u8]) -> Option<Orientation> {
    if tiff.len() < 8 {
        return None;
    }
    let big_endian = match &tiff[..2] {
        b"MM" => true,
        b"II" => false,
        _ => return None,
    };
    let u16_at = |off: usize| -> Option<u16> {
        let b = tiff.get(off..off + 2)?;
        Some(if big_endian {
            u16::from_be_bytes([b[0], b[1]])
        } else {
            u16::from_le_bytes([b[0], b[1]])
        })
    };
    let u32_at = |off: usize| -> Option<u32> {
        let b = tiff.get(off..off + 4)?;
        Some(if big_endian {
            u32::from_be_bytes([b[0], b[1], b[2], b[3]])
        } else {
            u32::from_le_bytes([b[0], b[1], b[2], b[3]])
        })
    };

    if u16_at(2)? != 42 {
        return None;
    }
    let ifd0 = u32_at(4)? as usize;
    let count = u16_at(ifd0)? as usize;
    for i in 0..count {
        let entry = ifd0 + 2 + i * 12;
        let tag = u16_at(entry)?;
        if tag != 0x0112 {
            continue;
        }
        // Type must be SHORT with one value; the value sits in the first
        // two bytes of the value field.
        if u16_at(entry + 2)? != 3 || u32_at(entry + 4)? != 1 {
            return None;
        }
        return Orientation::from_exif(u16_at(entry + 8)?);
    }
    None
}
