//! Frame model: sampling geometry, components, and coefficient grids.
//!
//! A frame header fixes the MCU geometry for every scan that follows:
//!
//! - `n_mcu_row = ceil(samples_per_line / (8 * max_h))`
//! - `n_mcu_col = ceil(lines / (8 * max_v))`
//!
//! and each component owns a grid of `(n_mcu_col * VSF) x (n_mcu_row *
//! HSF)` data units. When the header declares zero lines (height supplied
//! later by DNL) the grids start empty and grow a row at a time as the
//! scan decoder deposits data units.
//!
//! Reference: ITU-T T.81 Section A.2.2

use std::io::{self, Write};

use crate::consts::DCTSIZE2;
use crate::marker;
use crate::quant::QuantTable;
use crate::segment::{describe_str, emit_marker, emit_u16};
use crate::types::{Component, Encoding};

/// One decoded data unit: 64 coefficients in zig-zag order.
pub type DataUnit = [i16; DCTSIZE2];

/// A component's grid of decoded data units, row-major.
///
/// Rows can grow past the allocation when the frame height is unknown
/// until DNL; columns are fixed by the frame header.
#[derive(Debug, Clone)]
pub struct CoefGrid {
    cols: usize,
    rows: usize,
    units: Vec<DataUnit>,
}

impl CoefGrid {
    /// Allocate a grid of `rows x cols` zeroed data units.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            cols,
            rows,
            units: vec![[0; DCTSIZE2]; rows * cols],
        }
    }

    /// Extend the grid with zeroed rows so that `rows` fit.
    pub fn ensure_rows(&mut self, rows: usize) {
        if rows > self.rows {
            self.units.resize(rows * self.cols, [0; DCTSIZE2]);
            self.rows = rows;
        }
    }

    /// Data unit at (row, col).
    pub fn unit(&self, row: usize, col: usize) -> &DataUnit {
        &self.units[row * self.cols + col]
    }

    /// Mutable data unit at (row, col).
    pub fn unit_mut(&mut self, row: usize, col: usize) -> &mut DataUnit {
        &mut self.units[row * self.cols + col]
    }

    /// Number of unit rows currently present.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of unit columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// All units, row-major.
    pub fn units(&self) -> &[DataUnit] {
        &self.units
    }
}

/// One component reference inside a scan header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanComponentRef {
    /// Component id, matching a frame component
    pub component_id: u8,
    /// Index of that component in the frame's list
    pub component_index: usize,
    /// DC Huffman table selector (0-3)
    pub dc_tbl_no: u8,
    /// AC Huffman table selector (0-3)
    pub ac_tbl_no: u8,
}

/// One scan: header fields plus the borrowed entropy-coded bytes.
#[derive(Debug)]
pub struct Scan<'a> {
    /// Scan components in header order
    pub components: Vec<ScanComponentRef>,
    /// Spectral selection start (Ss)
    pub spectral_start: u8,
    /// Spectral selection end (Se)
    pub spectral_end: u8,
    /// Successive approximation high (Ah)
    pub approx_high: u8,
    /// Successive approximation low (Al)
    pub approx_low: u8,
    /// Restart interval active when the scan began (MCUs; 0 = none)
    pub restart_interval: u16,
    /// The entropy-coded bytes, byte stuffing and restarts included
    pub ecs: &'a [u8],
    /// MCUs decoded from the ECS (0 until decoded)
    pub n_mcus: usize,
    /// Restart markers seen inside the ECS
    pub rst_count: usize,
    /// True once the coefficient decoder ran over this scan
    pub coefficients_decoded: bool,
}

impl<'a> Scan<'a> {
    /// More than one component means interleaved MCUs.
    pub fn is_interleaved(&self) -> bool {
        self.components.len() > 1
    }

    /// Re-emit the SOS header followed by the ECS bytes verbatim.
    pub fn serialize<W: Write>(&self, w: &mut W) -> io::Result<usize> {
        let ls = 6 + 2 * self.components.len() as u16;
        let mut n = emit_marker(w, marker::SOS)?;
        n += emit_u16(w, ls)?;
        w.write_all(&[self.components.len() as u8])?;
        n += 1;
        for c in &self.components {
            w.write_all(&[c.component_id, (c.dc_tbl_no << 4) | (c.ac_tbl_no & 0x0F)])?;
            n += 2;
        }
        w.write_all(&[
            self.spectral_start,
            self.spectral_end,
            (self.approx_high << 4) | (self.approx_low & 0x0F),
        ])?;
        n += 3;
        w.write_all(self.ecs)?;
        Ok(n + self.ecs.len())
    }

    /// Summary line.
    pub fn describe<W: Write>(&self, w: &mut W) -> io::Result<usize> {
        let mut n = describe_str(
            w,
            &format!(
                "SOS: {} component(s), spectral {}..{}, approximation {}/{}, {} ECS bytes\n",
                self.components.len(),
                self.spectral_start,
                self.spectral_end,
                self.approx_high,
                self.approx_low,
                self.ecs.len()
            ),
        )?;
        for c in &self.components {
            n += describe_str(
                w,
                &format!(
                    "  component {} tables DC:{} AC:{}\n",
                    c.component_id, c.dc_tbl_no, c.ac_tbl_no
                ),
            )?;
        }
        if self.restart_interval > 0 {
            n += describe_str(
                w,
                &format!(
                    "  restart every {} MCUs ({} restarts seen)\n",
                    self.restart_interval, self.rst_count
                ),
            )?;
        }
        if self.n_mcus > 0 {
            n += describe_str(w, &format!("  {} MCUs decoded\n", self.n_mcus))?;
        }
        Ok(n)
    }
}

/// A parsed frame: header fields, components, and their coefficient grids.
#[derive(Debug)]
pub struct Frame<'a> {
    /// Encoding kind from the SOF marker
    pub encoding: Encoding,
    /// Bits per sample
    pub precision: u8,
    /// Lines as declared in the SOF (0 = supplied later by DNL)
    pub n_lines: u16,
    /// Samples per line
    pub n_samples_line: u16,
    /// Lines supplied by a DNL segment (0 = none seen)
    pub dnl_lines: u16,
    /// True when tidy-up folded the DNL value into this header
    pub dnl_folded: bool,
    /// Lines derived from the decoded scan geometry (0 = not overridden)
    pub scan_lines: u16,
    /// Largest horizontal sampling factor over the components
    pub max_h: u8,
    /// Largest vertical sampling factor over the components
    pub max_v: u8,
    /// Component declarations in header order
    pub components: Vec<Component>,
    /// Per-component coefficient grids, same order
    pub grids: Vec<CoefGrid>,
    /// Per-component quantization tables captured when the first scan
    /// began (later DQT overwrites must not affect earlier scans)
    pub quant_snapshot: Vec<Option<QuantTable>>,
    /// Scans in file order
    pub scans: Vec<Scan<'a>>,
}

impl<'a> Frame<'a> {
    /// Build a frame and allocate its component grids.
    pub fn new(
        encoding: Encoding,
        precision: u8,
        n_lines: u16,
        n_samples_line: u16,
        components: Vec<Component>,
    ) -> Frame<'a> {
        let max_h = components.iter().map(|c| c.h_samp_factor).max().unwrap_or(1);
        let max_v = components.iter().map(|c| c.v_samp_factor).max().unwrap_or(1);

        let n_mcu_row = ceil_div(usize::from(n_samples_line), 8 * usize::from(max_h));
        let n_mcu_col = ceil_div(usize::from(n_lines), 8 * usize::from(max_v));

        let grids = components
            .iter()
            .map(|c| {
                CoefGrid::new(
                    n_mcu_col * usize::from(c.v_samp_factor),
                    n_mcu_row * usize::from(c.h_samp_factor),
                )
            })
            .collect();
        let quant_snapshot = vec![None; components.len()];

        Frame {
            encoding,
            precision,
            n_lines,
            n_samples_line,
            dnl_lines: 0,
            dnl_folded: false,
            scan_lines: 0,
            max_h,
            max_v,
            components,
            grids,
            quant_snapshot,
            scans: Vec::new(),
        }
    }

    /// MCU columns per row of the image.
    pub fn n_mcus_row(&self) -> usize {
        ceil_div(usize::from(self.n_samples_line), 8 * usize::from(self.max_h))
    }

    /// MCU rows of the image; 0 while the height is still unknown.
    pub fn n_mcus_col(&self) -> usize {
        ceil_div(usize::from(self.n_lines), 8 * usize::from(self.max_v))
    }

    /// Index of the component with the given id.
    pub fn component_index(&self, id: u8) -> Option<usize> {
        self.components.iter().position(|c| c.id == id)
    }

    /// Data units per row for a component in a non-interleaved scan.
    pub fn units_per_line(&self, comp: usize) -> usize {
        let c = &self.components[comp];
        ceil_div(
            usize::from(self.n_samples_line) * usize::from(c.h_samp_factor),
            8 * usize::from(self.max_h),
        )
    }

    /// Data unit rows for a component in a non-interleaved scan; 0 while
    /// the height is unknown.
    pub fn unit_rows(&self, comp: usize) -> usize {
        let c = &self.components[comp];
        ceil_div(
            usize::from(self.n_lines) * usize::from(c.v_samp_factor),
            8 * usize::from(self.max_v),
        )
    }

    /// The line count every consumer should believe: scan-derived first,
    /// then DNL, then the SOF declaration.
    pub fn actual_lines(&self) -> u16 {
        if self.scan_lines != 0 {
            self.scan_lines
        } else if self.dnl_lines != 0 {
            self.dnl_lines
        } else {
            self.n_lines
        }
    }

    /// The line count written on serialization. Unlike
    /// [`Self::actual_lines`] the DNL value participates only once
    /// tidy-up folded it (keeping untouched parses byte-exact).
    pub fn serialized_lines(&self) -> u16 {
        if self.scan_lines != 0 {
            self.scan_lines
        } else if self.dnl_folded {
            self.dnl_lines
        } else {
            self.n_lines
        }
    }

    /// Re-emit the SOF segment.
    pub fn serialize<W: Write>(&self, w: &mut W) -> io::Result<usize> {
        let lf = 8 + 3 * self.components.len() as u16;
        let mut n = emit_marker(w, self.encoding.sof_marker())?;
        n += emit_u16(w, lf)?;
        w.write_all(&[self.precision])?;
        n += 1;
        n += emit_u16(w, self.serialized_lines())?;
        n += emit_u16(w, self.n_samples_line)?;
        w.write_all(&[self.components.len() as u8])?;
        n += 1;
        for c in &self.components {
            w.write_all(&[
                c.id,
                (c.h_samp_factor << 4) | (c.v_samp_factor & 0x0F),
                c.quant_tbl_no,
            ])?;
            n += 3;
        }
        Ok(n)
    }

    /// Summary lines.
    pub fn describe<W: Write>(&self, w: &mut W) -> io::Result<usize> {
        let mut n = describe_str(
            w,
            &format!(
                "{}: {} ({})\n",
                marker::name(self.encoding.sof_marker()),
                self.encoding.name(),
                self.encoding.entropy_coding().name()
            ),
        )?;
        n += describe_str(
            w,
            &format!(
                "  {} x {} pixels, {}-bit, {} component(s)\n",
                self.n_samples_line,
                self.actual_lines(),
                self.precision,
                self.components.len()
            ),
        )?;
        for (i, c) in self.components.iter().enumerate() {
            n += describe_str(
                w,
                &format!(
                    "  component #{} id {} sampling {}:{} quantization {}\n",
                    i, c.id, c.h_samp_factor, c.v_samp_factor, c.quant_tbl_no
                ),
            )?;
        }
        Ok(n)
    }
}

/// Ceiling division; 0 when the numerator is 0.
pub(crate) fn ceil_div(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

#[cfg(test)]
mod tests {
    use super::*;

    fn components_420() -> Vec<Component> {
        vec![
            Component { id: 1, h_samp_factor: 2, v_samp_factor: 2, quant_tbl_no: 0 },
            Component { id: 2, h_samp_factor: 1, v_samp_factor: 1, quant_tbl_no: 1 },
            Component { id: 3, h_samp_factor: 1, v_samp_factor: 1, quant_tbl_no: 1 },
        ]
    }

    #[test]
    fn test_mcu_geometry_420() {
        let f = Frame::new(Encoding::BaselineSequential, 8, 17, 33, components_420());
        assert_eq!(f.max_h, 2);
        assert_eq!(f.max_v, 2);
        // ceil(33 / 16) = 3 MCUs per row, ceil(17 / 16) = 2 MCU rows.
        assert_eq!(f.n_mcus_row(), 3);
        assert_eq!(f.n_mcus_col(), 2);
        // Y grid is 4x6 units, chroma 2x3.
        assert_eq!(f.grids[0].rows(), 4);
        assert_eq!(f.grids[0].cols(), 6);
        assert_eq!(f.grids[1].rows(), 2);
        assert_eq!(f.grids[1].cols(), 3);
    }

    #[test]
    fn test_unknown_height_allocates_no_rows() {
        let f = Frame::new(Encoding::BaselineSequential, 8, 0, 64, components_420());
        assert_eq!(f.n_mcus_col(), 0);
        assert_eq!(f.grids[0].rows(), 0);
        assert_eq!(f.grids[0].cols(), 8);
    }

    #[test]
    fn test_grid_growth() {
        let mut g = CoefGrid::new(0, 4);
        g.ensure_rows(2);
        assert_eq!(g.rows(), 2);
        g.unit_mut(1, 3)[0] = 7;
        assert_eq!(g.unit(1, 3)[0], 7);
        // Growing never shrinks.
        g.ensure_rows(1);
        assert_eq!(g.rows(), 2);
    }

    #[test]
    fn test_non_interleaved_unit_geometry() {
        let f = Frame::new(Encoding::BaselineSequential, 8, 24, 24, components_420());
        // Y: ceil(24 * 2 / 16) = 3 units per line and 3 unit rows.
        assert_eq!(f.units_per_line(0), 3);
        assert_eq!(f.unit_rows(0), 3);
        // Chroma: ceil(24 * 1 / 16) = 2.
        assert_eq!(f.units_per_line(1), 2);
        assert_eq!(f.unit_rows(1), 2);
        // The chroma grid is padded wider than the scan needs.
        assert_eq!(f.grids[1].cols(), 2);
        assert_eq!(f.grids[1].rows(), 2);
    }

    #[test]
    fn test_line_count_precedence() {
        let mut f = Frame::new(Encoding::BaselineSequential, 8, 0, 8, components_420());
        assert_eq!(f.actual_lines(), 0);
        f.dnl_lines = 100;
        assert_eq!(f.actual_lines(), 100);
        // Without folding the serialized header keeps the declared value.
        assert_eq!(f.serialized_lines(), 0);
        f.dnl_folded = true;
        assert_eq!(f.serialized_lines(), 100);
        f.scan_lines = 96;
        assert_eq!(f.actual_lines(), 96);
        assert_eq!(f.serialized_lines(), 96);
    }

    #[test]
    fn test_frame_serialization_layout() {
        let f = Frame::new(Encoding::BaselineSequential, 8, 480, 640, components_420());
        let mut out = Vec::new();
        let n = f.serialize(&mut out).unwrap();
        assert_eq!(n, out.len());
        assert_eq!(&out[..2], &[0xFF, 0xC0]);
        assert_eq!(u16::from_be_bytes([out[2], out[3]]), 8 + 9);
        assert_eq!(out[4], 8);
        assert_eq!(u16::from_be_bytes([out[5], out[6]]), 480);
        assert_eq!(u16::from_be_bytes([out[7], out[8]]), 640);
        assert_eq!(out[9], 3);
        // First component: id 1, sampling 2:2 packed, table 0.
        assert_eq!(&out[10..13], &[1, 0x22, 0]);
    }

    #[test]
    fn test_scan_serialization_layout() {
        let scan = Scan {
            components: vec![ScanComponentRef {
                component_id: 1,
                component_index: 0,
                dc_tbl_no: 0,
                ac_tbl_no: 1,
            }],
            spectral_start: 0,
            spectral_end: 63,
            approx_high: 0,
            approx_low: 0,
            restart_interval: 0,
            ecs: &[0xAB, 0xCD],
            n_mcus: 0,
            rst_count: 0,
            coefficients_decoded: false,
        };
        let mut out = Vec::new();
        let n = scan.serialize(&mut out).unwrap();
        assert_eq!(n, out.len());
        assert_eq!(&out[..2], &[0xFF, 0xDA]);
        assert_eq!(u16::from_be_bytes([out[2], out[3]]), 8);
        assert_eq!(out[4], 1); // one component
        assert_eq!(&out[5..7], &[1, 0x01]); // id 1, DC 0 / AC 1
        assert_eq!(&out[7..10], &[0, 63, 0]);
        assert_eq!(&out[10..], &[0xAB, 0xCD]);
    }
}
