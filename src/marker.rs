//! JPEG marker classification for parsing.
//!
//! Every segment begins with 0xFF followed by a one-byte code. This module
//! names the codes and classifies them into the families the parser state
//! machine cares about: frame headers, tables, restart markers, application
//! segments, and the length-less structural markers.
//!
//! Reference: ITU-T T.81 Table B.1

/// Temporary private use in arithmetic coding. No length field.
pub const TEM: u8 = 0x01;

/// Start Of Frame, baseline sequential DCT (SOF0).
pub const SOF0: u8 = 0xC0;
/// Start Of Frame, extended sequential DCT (SOF1).
pub const SOF1: u8 = 0xC1;
/// Start Of Frame, progressive DCT (SOF2).
pub const SOF2: u8 = 0xC2;
/// Start Of Frame, lossless sequential (SOF3).
pub const SOF3: u8 = 0xC3;
/// Define Huffman Table.
pub const DHT: u8 = 0xC4;
/// Reserved for JPEG extensions.
pub const JPG: u8 = 0xC8;
/// Define Arithmetic Coding conditioning.
pub const DAC: u8 = 0xCC;
/// Last Start Of Frame code (SOF15).
pub const SOF15: u8 = 0xCF;

/// First restart marker (RST0). No length field.
pub const RST0: u8 = 0xD0;
/// Last restart marker (RST7). No length field.
pub const RST7: u8 = 0xD7;
/// Start Of Image. No length field.
pub const SOI: u8 = 0xD8;
/// End Of Image. No length field.
pub const EOI: u8 = 0xD9;
/// Start Of Scan, followed by an entropy-coded segment.
pub const SOS: u8 = 0xDA;
/// Define Quantization Table.
pub const DQT: u8 = 0xDB;
/// Define Number of Lines.
pub const DNL: u8 = 0xDC;
/// Define Restart Interval.
pub const DRI: u8 = 0xDD;
/// Define Hierarchical Progression.
pub const DHP: u8 = 0xDE;
/// Expand reference components.
pub const EXP: u8 = 0xDF;

/// First application segment (APP0, JFIF).
pub const APP0: u8 = 0xE0;
/// APP1 (EXIF, XMP).
pub const APP1: u8 = 0xE1;
/// Last application segment (APP15).
pub const APP15: u8 = 0xEF;

/// First reserved extension code (RES0).
pub const RES0: u8 = 0xF0;
/// Last reserved extension code (RES13).
pub const RES13: u8 = 0xFD;

/// Comment segment.
pub const COM: u8 = 0xFE;

/// Returns true for SOF0..SOF15 excluding DHT, JPG and DAC.
pub const fn is_sof(marker: u8) -> bool {
    marker >= SOF0 && marker <= SOF15 && marker != DHT && marker != JPG && marker != DAC
}

/// Returns true for RST0..RST7.
pub const fn is_rst(marker: u8) -> bool {
    marker >= RST0 && marker <= RST7
}

/// Returns true for APP0..APP15.
pub const fn is_app(marker: u8) -> bool {
    marker >= APP0 && marker <= APP15
}

/// Returns true for markers that are followed by a 16-bit length field.
///
/// SOI, EOI, TEM and RST0..RST7 stand alone; everything else carries a
/// big-endian length that includes the two length bytes themselves.
pub const fn has_length(marker: u8) -> bool {
    !(marker == SOI || marker == EOI || marker == TEM || is_rst(marker))
}

/// Returns true inside an ECS for the byte values that terminate it.
///
/// A 0xFF followed by anything except 0x00 (stuffing) or RST0..RST7 ends
/// the entropy-coded segment.
pub const fn ends_scan(byte: u8) -> bool {
    byte != 0x00 && !is_rst(byte)
}

/// Short human-readable name of a marker code.
pub fn name(marker: u8) -> &'static str {
    match marker {
        TEM => "TEM",
        SOF0 => "SOF0",
        SOF1 => "SOF1",
        SOF2 => "SOF2",
        SOF3 => "SOF3",
        DHT => "DHT",
        0xC5 => "SOF5",
        0xC6 => "SOF6",
        0xC7 => "SOF7",
        JPG => "JPG",
        0xC9 => "SOF9",
        0xCA => "SOF10",
        0xCB => "SOF11",
        DAC => "DAC",
        0xCD => "SOF13",
        0xCE => "SOF14",
        SOF15 => "SOF15",
        SOI => "SOI",
        EOI => "EOI",
        SOS => "SOS",
        DQT => "DQT",
        DNL => "DNL",
        DRI => "DRI",
        DHP => "DHP",
        EXP => "EXP",
        COM => "COM",
        m if is_rst(m) => {
            const RST_NAMES: [&str; 8] = [
                "RST0", "RST1", "RST2", "RST3", "RST4", "RST5", "RST6", "RST7",
            ];
            RST_NAMES[(m - RST0) as usize]
        }
        m if is_app(m) => {
            const APP_NAMES: [&str; 16] = [
                "APP0", "APP1", "APP2", "APP3", "APP4", "APP5", "APP6", "APP7", "APP8",
                "APP9", "APP10", "APP11", "APP12", "APP13", "APP14", "APP15",
            ];
            APP_NAMES[(m - APP0) as usize]
        }
        m if (RES0..=RES13).contains(&m) => "RES",
        _ => "reserved",
    }
}
