//! The marker-driven container parser.
//!
//! A JPEG stream is a sequence of marker segments between SOI and EOI.
//! The parser walks them under a small state machine that enforces legal
//! segment order:
//!
//! ```text
//! INIT      -> APP        on SOI
//! APP       -> FRAME      on any table other than APPn
//! APP/FRAME -> SCAN1      on SOFn
//! SCAN1     -> SCAN1      on DHT|DQT|DRI|COM|APPn
//! SCAN1     -> SCAN1_ECS  on SOS
//! SCAN1_ECS -> SCANn      on DNL
//! SCAN1_ECS -> SCANn_ECS  on SOS
//! SCANn     -> SCANn_ECS  on SOS
//! *_ECS, SCANn -> FINAL   on EOI
//! ```
//!
//! Tables remain legal between scans (progressive streams redefine DHT
//! per scan), so the table row applies to every scan state alike.
//!
//! Each SOS is followed by its entropy-coded segment, whose end is found
//! by scanning for the first 0xFF byte not followed by 0x00 or a restart
//! marker. Restart sequence numbers are validated on the way. Scans the
//! frame kind supports are coefficient-decoded immediately; every scan is
//! preserved byte-exactly either way.
//!
//! Reference: ITU-T T.81 Annex B.2

use log::{debug, info, trace, warn};

use crate::decoder;
use crate::error::{Error, Result};
use crate::frame::{Frame, Scan, ScanComponentRef};
use crate::huffman::{HuffmanStore, HuffmanTable, TableClass};
use crate::marker;
use crate::metadata::AppSegment;
use crate::model::{Model, ParseOptions};
use crate::quant::{QuantStore, QuantTable};
use crate::segment::{
    ComSegment, DhtEntry, DhtSegment, DnlSegment, DqtEntry, DqtSegment, DriSegment, Segment,
};
use crate::types::{Component, Encoding, EncodingMode, EntropyCoding, Framing, Orientation};

/// Parser state, advanced on every marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Expecting SOI
    Init,
    /// After SOI, application segments and tables
    App,
    /// After the first non-APP table, expecting SOF
    Frame,
    /// After SOF, tables and the first SOS
    Scan1,
    /// After the first scan's ECS
    Scan1Ecs,
    /// After DNL, further scans
    ScanN,
    /// After a later scan's ECS
    ScanNEcs,
    /// After EOI
    Final,
}

impl ParserState {
    /// Human-readable state name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ParserState::Init => "initial",
            ParserState::App => "application",
            ParserState::Frame => "frame",
            ParserState::Scan1 => "first scan",
            ParserState::Scan1Ecs => "first scan entropy-coded",
            ParserState::ScanN => "later scan",
            ParserState::ScanNEcs => "later scan entropy-coded",
            ParserState::Final => "final",
        }
    }
}

/// Per-parse context: input cursor, state, active tables, output model.
pub(crate) struct Parser<'a> {
    data: &'a [u8],
    offset: usize,
    state: ParserState,
    options: ParseOptions,
    quant: QuantStore,
    huffman: HuffmanStore,
    restart_interval: u16,
    dnl_seen: bool,
    segments: Vec<Segment<'a>>,
    frames: Vec<Frame<'a>>,
    orientation: Option<Orientation>,
    thumbnail: Option<&'a [u8]>,
    thumbnail_model: Option<Box<Model<'a>>>,
}

impl<'a> Parser<'a> {
    /// Run a full parse. Always returns the model built so far; the error
    /// slot carries the first fatal condition, if any.
    pub(crate) fn parse(data: &'a [u8], options: ParseOptions) -> (Model<'a>, Option<Error>) {
        let mut p = Parser {
            data,
            offset: 0,
            state: ParserState::Init,
            options,
            quant: QuantStore::default(),
            huffman: HuffmanStore::default(),
            restart_interval: 0,
            dnl_seen: false,
            segments: Vec::new(),
            frames: Vec::new(),
            orientation: None,
            thumbnail: None,
            thumbnail_model: None,
        };
        let err = p.run().err();
        if let Some(e) = &err {
            debug!("parse stopped: {}", e);
        }
        let model = Model {
            input_len: data.len(),
            state: p.state,
            segments: p.segments,
            frames: p.frames,
            orientation: p.orientation,
            thumbnail: p.thumbnail,
            thumbnail_model: p.thumbnail_model,
        };
        (model, err)
    }

    fn run(&mut self) -> Result<()> {
        let data = self.data;
        if data.len() < 2 || data[0] != 0xFF || data[1] != marker::SOI {
            return Err(Error::SignatureMismatch {
                found: [
                    data.first().copied().unwrap_or(0),
                    data.get(1).copied().unwrap_or(0),
                ],
            });
        }

        while self.offset + 1 < data.len() {
            if data[self.offset] != 0xFF {
                return Err(Error::BadMarker(data[self.offset]));
            }
            // Runs of 0xFF before the code byte are fill and are skipped.
            while self.offset + 1 < data.len() && data[self.offset + 1] == 0xFF {
                self.offset += 1;
            }
            if self.offset + 1 >= data.len() {
                break;
            }
            let code = data[self.offset + 1];
            trace!("marker {} at offset 0x{:X}", marker::name(code), self.offset);

            match code {
                0x00 => return Err(Error::BadMarker(0)),
                marker::SOI => {
                    if self.state != ParserState::Init {
                        return Err(Error::WrongStateForMarker {
                            marker: code,
                            state: self.state,
                        });
                    }
                    self.state = ParserState::App;
                    self.offset += 2;
                }
                marker::EOI => {
                    if !matches!(
                        self.state,
                        ParserState::Scan1Ecs | ParserState::ScanNEcs | ParserState::ScanN
                    ) {
                        return Err(Error::WrongStateForMarker {
                            marker: code,
                            state: self.state,
                        });
                    }
                    self.state = ParserState::Final;
                    self.offset += 2;
                    if self.options.tidy_up {
                        self.fix_lines();
                    }
                    // Anything after EOI is trailing junk and is ignored.
                    return Ok(());
                }
                m if marker::is_rst(m) => {
                    // Restart markers live inside an ECS, never here.
                    return Err(Error::WrongStateForMarker {
                        marker: m,
                        state: self.state,
                    });
                }
                marker::TEM => return Err(Error::BadMarker(marker::TEM)),
                _ => {
                    if self.offset + 3 >= data.len() {
                        return Err(Error::SegmentTruncated {
                            marker: code,
                            declared: 0,
                            available: data.len() - self.offset - 2,
                        });
                    }
                    let slen =
                        u16::from_be_bytes([data[self.offset + 2], data[self.offset + 3]]);
                    if slen < 2 {
                        return Err(Error::BadSegment {
                            marker: code,
                            reason: "declared length below 2",
                        });
                    }
                    if self.offset + 2 + usize::from(slen) > data.len() {
                        return Err(Error::SegmentTruncated {
                            marker: code,
                            declared: slen,
                            available: data.len() - self.offset - 2,
                        });
                    }

                    if code == marker::SOS {
                        // Updates the offset past the header and its ECS.
                        self.start_of_scan(slen)?;
                        continue;
                    }
                    match code {
                        m if marker::is_app(m) => self.application(m, slen)?,
                        m if marker::is_sof(m) => self.start_of_frame(m, slen)?,
                        marker::DQT => self.define_quant_tables(slen)?,
                        marker::DHT => self.define_huffman_tables(slen)?,
                        marker::DRI => self.define_restart_interval(slen)?,
                        marker::DNL => self.define_number_of_lines(slen)?,
                        marker::COM => self.comment(slen)?,
                        marker::DAC => {
                            return Err(Error::UnsupportedKind(
                                "arithmetic coding conditioning (DAC)",
                            ))
                        }
                        marker::DHP | marker::EXP => {
                            return Err(Error::UnsupportedKind("hierarchical frames (DHP/EXP)"))
                        }
                        other => return Err(Error::BadMarker(other)),
                    }
                    self.offset += 2 + usize::from(slen);
                }
            }
        }
        // Ran off the end without EOI: the model stays incomplete.
        Ok(())
    }

    /// Body of the current segment (the L-2 bytes after the length field).
    fn body(&self, slen: u16) -> &'a [u8] {
        &self.data[self.offset + 4..self.offset + 2 + usize::from(slen)]
    }

    /// Shared state rule for table-class segments (DQT/DHT/DRI/COM).
    fn table_state_transition(&mut self, code: u8) -> Result<()> {
        match self.state {
            ParserState::App => {
                self.state = ParserState::Frame;
                Ok(())
            }
            ParserState::Frame
            | ParserState::Scan1
            | ParserState::Scan1Ecs
            | ParserState::ScanN
            | ParserState::ScanNEcs => Ok(()),
            s => Err(Error::WrongStateForMarker {
                marker: code,
                state: s,
            }),
        }
    }

    fn application(&mut self, code: u8, slen: u16) -> Result<()> {
        if matches!(self.state, ParserState::Init | ParserState::Final) {
            return Err(Error::WrongStateForMarker {
                marker: code,
                state: self.state,
            });
        }
        let seg = AppSegment::parse(code, self.body(slen));
        if self.orientation.is_none() {
            if let Some(o) = seg.orientation() {
                debug!("orientation {} from {}", o.exif_code().unwrap_or(0), marker::name(code));
                self.orientation = Some(o);
            }
        }
        if self.thumbnail.is_none() {
            if let Some(bytes) = seg.thumbnail() {
                self.thumbnail = Some(bytes);
                if self.options.recurse {
                    let mut sub_options = self.options;
                    sub_options.recurse = false;
                    let (model, err) = Parser::parse(bytes, sub_options);
                    if err.is_none() {
                        self.thumbnail_model = Some(Box::new(model));
                    } else if self.options.warn {
                        warn!("embedded thumbnail did not parse cleanly");
                    }
                }
            }
        }
        self.segments.push(Segment::App(seg));
        Ok(())
    }

    fn start_of_frame(&mut self, code: u8, slen: u16) -> Result<()> {
        if !matches!(self.state, ParserState::App | ParserState::Frame) {
            return Err(Error::WrongStateForMarker {
                marker: code,
                state: self.state,
            });
        }
        let encoding = Encoding::from_sof_marker(code).ok_or(Error::BadMarker(code))?;
        let body = self.body(slen);
        if body.len() < 6 {
            return Err(Error::BadSegment {
                marker: code,
                reason: "frame header too short",
            });
        }
        let precision = body[0];
        let n_lines = u16::from_be_bytes([body[1], body[2]]);
        let n_samples_line = u16::from_be_bytes([body[3], body[4]]);
        let n_components = usize::from(body[5]);
        if body.len() < 6 + 3 * n_components {
            return Err(Error::BadSegment {
                marker: code,
                reason: "component list truncated",
            });
        }
        if n_components == 0 {
            return Err(Error::BadSegment {
                marker: code,
                reason: "frame declares no components",
            });
        }
        if n_samples_line == 0 {
            return Err(Error::BadSegment {
                marker: code,
                reason: "zero samples per line",
            });
        }
        match encoding {
            Encoding::BaselineSequential => {
                if precision != 8 {
                    return Err(Error::BadSegment {
                        marker: code,
                        reason: "baseline precision must be 8",
                    });
                }
                if n_components != 1 && n_components != 3 {
                    return Err(Error::BadSegment {
                        marker: code,
                        reason: "baseline component count must be 1 or 3",
                    });
                }
            }
            Encoding::ExtendedSequential | Encoding::Progressive => {
                if precision != 8 && precision != 12 {
                    return Err(Error::BadSegment {
                        marker: code,
                        reason: "precision must be 8 or 12",
                    });
                }
            }
            _ => {}
        }

        let mut components = Vec::with_capacity(n_components);
        let mut off = 6;
        for _ in 0..n_components {
            let id = body[off];
            let h = body[off + 1] >> 4;
            let v = body[off + 1] & 0x0F;
            let q = body[off + 2];
            if !(1..=4).contains(&h) || !(1..=4).contains(&v) {
                return Err(Error::BadSegment {
                    marker: code,
                    reason: "sampling factor outside 1..4",
                });
            }
            if q > 3 {
                return Err(Error::BadSegment {
                    marker: code,
                    reason: "quantization selector outside 0..3",
                });
            }
            components.push(Component {
                id,
                h_samp_factor: h,
                v_samp_factor: v,
                quant_tbl_no: q,
            });
            off += 3;
        }

        if self.options.warn {
            if n_samples_line % 8 != 0 {
                warn!(
                    "samples per line ({}) is not a multiple of 8",
                    n_samples_line
                );
            }
            if encoding.entropy_coding() == EntropyCoding::Arithmetic {
                warn!("arithmetic-coded frame: coefficients will not be decoded");
            }
            if encoding.framing() == Framing::Hierarchical {
                warn!("differential frame outside a hierarchical stream");
            }
        }

        let frame = Frame::new(encoding, precision, n_lines, n_samples_line, components);
        debug!(
            "frame {}x{}, {} MCUs per row",
            n_samples_line,
            n_lines,
            frame.n_mcus_row()
        );
        self.frames.push(frame);
        self.segments.push(Segment::Frame(self.frames.len() - 1));
        self.state = ParserState::Scan1;
        Ok(())
    }

    fn define_quant_tables(&mut self, slen: u16) -> Result<()> {
        self.table_state_transition(marker::DQT)?;
        let body = self.body(slen);
        let mut off = 0;
        let mut seg = DqtSegment { tables: Vec::new() };
        while off < body.len() {
            let pq = body[off] >> 4;
            let dest = body[off] & 0x0F;
            if pq > 1 {
                return Err(Error::BadSegment {
                    marker: marker::DQT,
                    reason: "element precision code outside 0..1",
                });
            }
            if dest > 3 {
                return Err(Error::BadSegment {
                    marker: marker::DQT,
                    reason: "destination outside 0..3",
                });
            }
            off += 1;
            let elem = if pq == 1 { 2 } else { 1 };
            if off + 64 * elem > body.len() {
                return Err(Error::BadSegment {
                    marker: marker::DQT,
                    reason: "table overruns segment length",
                });
            }
            let mut values = [0u16; 64];
            for v in values.iter_mut() {
                if pq == 1 {
                    *v = u16::from_be_bytes([body[off], body[off + 1]]);
                    off += 2;
                } else {
                    *v = u16::from(body[off]);
                    off += 1;
                }
            }
            self.quant.install(dest, QuantTable::new(pq, values));
            trace!("quantization table {} installed ({}-bit)", dest, 8 * (pq + 1));
            seg.tables.push(DqtEntry { pq, dest, values });
        }
        if seg.tables.is_empty() {
            if self.options.warn {
                warn!("empty DQT segment ignored");
            }
        } else {
            self.segments.push(Segment::QuantTables(seg));
        }
        Ok(())
    }

    fn define_huffman_tables(&mut self, slen: u16) -> Result<()> {
        self.table_state_transition(marker::DHT)?;
        let body = self.body(slen);
        let mut off = 0;
        let mut seg = DhtSegment { tables: Vec::new() };
        while off < body.len() {
            let class = TableClass::from_nibble(body[off] >> 4).ok_or(Error::BadSegment {
                marker: marker::DHT,
                reason: "table class outside 0..1",
            })?;
            let dest = body[off] & 0x0F;
            if dest > 3 {
                return Err(Error::BadSegment {
                    marker: marker::DHT,
                    reason: "destination outside 0..3",
                });
            }
            off += 1;
            if off + 16 > body.len() {
                return Err(Error::BadSegment {
                    marker: marker::DHT,
                    reason: "length vector overruns segment",
                });
            }
            let mut bits = [0u8; 17];
            let mut total = 0usize;
            for i in 1..=16 {
                bits[i] = body[off + i - 1];
                total += usize::from(bits[i]);
            }
            off += 16;
            if off + total > body.len() {
                return Err(Error::BadSegment {
                    marker: marker::DHT,
                    reason: "symbol list overruns segment",
                });
            }
            let huffval = body[off..off + total].to_vec();
            off += total;
            let table = HuffmanTable::build(bits, huffval.clone())?;
            self.huffman.install(class, dest, table);
            trace!(
                "Huffman table {} {} installed ({} symbols)",
                class.name(),
                dest,
                total
            );
            seg.tables.push(DhtEntry {
                class,
                dest,
                bits,
                huffval,
            });
        }
        if seg.tables.is_empty() {
            if self.options.warn {
                warn!("empty DHT segment ignored");
            }
        } else {
            self.segments.push(Segment::HuffmanTables(seg));
        }
        Ok(())
    }

    fn define_restart_interval(&mut self, slen: u16) -> Result<()> {
        self.table_state_transition(marker::DRI)?;
        if slen != 4 {
            return Err(Error::BadSegment {
                marker: marker::DRI,
                reason: "DRI length must be 4",
            });
        }
        let body = self.body(slen);
        let interval = u16::from_be_bytes([body[0], body[1]]);
        self.restart_interval = interval;
        if self.options.warn && interval != 0 {
            if let Some(frame) = self.frames.last() {
                if frame.n_samples_line % interval != 0 {
                    warn!(
                        "samples per line ({}) is not a multiple of the restart interval ({})",
                        frame.n_samples_line, interval
                    );
                }
                if usize::from(interval) > frame.n_mcus_row() {
                    warn!(
                        "restart interval ({}) exceeds the MCUs per row ({})",
                        interval,
                        frame.n_mcus_row()
                    );
                }
            }
        }
        self.segments
            .push(Segment::RestartInterval(DriSegment { interval }));
        Ok(())
    }

    fn comment(&mut self, slen: u16) -> Result<()> {
        self.table_state_transition(marker::COM)?;
        self.segments.push(Segment::Comment(ComSegment {
            text: self.body(slen).to_vec(),
        }));
        Ok(())
    }

    fn define_number_of_lines(&mut self, slen: u16) -> Result<()> {
        if self.state != ParserState::Scan1Ecs {
            return Err(Error::WrongStateForMarker {
                marker: marker::DNL,
                state: self.state,
            });
        }
        if slen != 4 {
            return Err(Error::BadSegment {
                marker: marker::DNL,
                reason: "DNL length must be 4",
            });
        }
        if self.dnl_seen {
            return Err(Error::BadSegment {
                marker: marker::DNL,
                reason: "multiple DNL segments",
            });
        }
        self.dnl_seen = true;
        let body = self.body(slen);
        let n_lines = u16::from_be_bytes([body[0], body[1]]);
        let frame = self.frames.last_mut().expect("scan state implies a frame");
        let mut suppressed = false;
        if frame.n_lines == 0 {
            frame.dnl_lines = n_lines;
            if self.options.tidy_up {
                info!("folding DNL line count {} into the frame header", n_lines);
                frame.dnl_folded = true;
                suppressed = true;
            }
        } else if self.options.warn {
            warn!(
                "DNL present although the frame header declares {} lines",
                frame.n_lines
            );
        }
        self.segments.push(Segment::NumberOfLines(DnlSegment {
            n_lines,
            suppressed,
        }));
        self.state = ParserState::ScanN;
        Ok(())
    }

    fn start_of_scan(&mut self, slen: u16) -> Result<()> {
        if !matches!(
            self.state,
            ParserState::Scan1 | ParserState::Scan1Ecs | ParserState::ScanN | ParserState::ScanNEcs
        ) || self.frames.is_empty()
        {
            return Err(Error::WrongStateForMarker {
                marker: marker::SOS,
                state: self.state,
            });
        }
        let frame_idx = self.frames.len() - 1;
        let body = self.body(slen);
        if body.is_empty() {
            return Err(Error::BadSegment {
                marker: marker::SOS,
                reason: "scan header too short",
            });
        }
        let ns = usize::from(body[0]);
        if ns == 0 || ns > 4 {
            return Err(Error::BadSegment {
                marker: marker::SOS,
                reason: "scan component count outside 1..4",
            });
        }
        if usize::from(slen) != 6 + 2 * ns {
            return Err(Error::BadSegment {
                marker: marker::SOS,
                reason: "length does not match component count",
            });
        }

        let mut comps: Vec<ScanComponentRef> = Vec::with_capacity(ns);
        {
            let frame = &self.frames[frame_idx];
            let mut off = 1;
            let mut last_index: Option<usize> = None;
            for _ in 0..ns {
                let cid = body[off];
                let dc = body[off + 1] >> 4;
                let ac = body[off + 1] & 0x0F;
                off += 2;
                if dc > 3 || ac > 3 {
                    return Err(Error::BadSegment {
                        marker: marker::SOS,
                        reason: "entropy table selector outside 0..3",
                    });
                }
                let ci = frame.component_index(cid).ok_or(Error::BadSegment {
                    marker: marker::SOS,
                    reason: "scan references a component the frame does not declare",
                })?;
                if comps.iter().any(|c| c.component_index == ci) {
                    return Err(Error::BadSegment {
                        marker: marker::SOS,
                        reason: "component referenced twice",
                    });
                }
                if let Some(prev) = last_index {
                    if ci < prev {
                        return Err(Error::BadSegment {
                            marker: marker::SOS,
                            reason: "components out of frame order",
                        });
                    }
                }
                last_index = Some(ci);
                comps.push(ScanComponentRef {
                    component_id: cid,
                    component_index: ci,
                    dc_tbl_no: dc,
                    ac_tbl_no: ac,
                });
            }
        }
        let off = 1 + 2 * ns;
        let spectral_start = body[off];
        let spectral_end = body[off + 1];
        let approx_high = body[off + 2] >> 4;
        let approx_low = body[off + 2] & 0x0F;
        if spectral_start > 63 || spectral_end > 63 || spectral_end < spectral_start {
            return Err(Error::BadSegment {
                marker: marker::SOS,
                reason: "spectral selection outside 0..63",
            });
        }

        // Interleaved scans are bounded by the total sampling area.
        if ns > 1 {
            let frame = &self.frames[frame_idx];
            let area: usize = comps
                .iter()
                .map(|c| {
                    let fc = &frame.components[c.component_index];
                    usize::from(fc.h_samp_factor) * usize::from(fc.v_samp_factor)
                })
                .sum();
            if area > 10 {
                return Err(Error::BadSegment {
                    marker: marker::SOS,
                    reason: "interleaved sampling area exceeds 10",
                });
            }
        }

        // Referenced tables must exist before the scan begins, and each
        // component's quantization table is snapshotted at its first use.
        for c in &comps {
            let q_dest = self.frames[frame_idx].components[c.component_index].quant_tbl_no;
            let qt = self
                .quant
                .get(q_dest)
                .ok_or(Error::QuantTableMissing { dest: q_dest })?;
            if self.options.warn
                && qt.precision == 16
                && self.frames[frame_idx].precision == 8
            {
                warn!(
                    "16-bit quantization table {} used with 8-bit samples",
                    q_dest
                );
            }
            if self.frames[frame_idx].quant_snapshot[c.component_index].is_none() {
                self.frames[frame_idx].quant_snapshot[c.component_index] = Some(qt.clone());
            }
            if spectral_start == 0 {
                self.huffman.require(TableClass::Dc, c.dc_tbl_no)?;
            }
            if spectral_end > 0 {
                self.huffman.require(TableClass::Ac, c.ac_tbl_no)?;
            }
        }

        // Find the end of the entropy-coded segment, validating restart
        // markers on the way.
        let data = self.data;
        let tlen = data.len();
        let ecs_start = self.offset + 2 + usize::from(slen);
        let mut i = ecs_start;
        let mut rst_count = 0usize;
        let mut last_rst: u8 = 7;
        let mut last_rst_index: Option<usize> = None;
        loop {
            while i + 1 < tlen && !(data[i] == 0xFF && data[i + 1] != 0x00) {
                i += 1;
            }
            if i + 1 >= tlen {
                i = tlen;
                break;
            }
            let code = data[i + 1];
            if !marker::is_rst(code) {
                break;
            }
            let num = code - marker::RST0;
            if self.options.warn {
                if self.restart_interval == 0 {
                    warn!("restart marker without a restart interval definition");
                }
                if (last_rst + 1) % 8 != num {
                    warn!(
                        "restart sequence broken: found RST{}, expected RST{}",
                        num,
                        (last_rst + 1) % 8
                    );
                }
            }
            last_rst = num;
            last_rst_index = Some(i);
            rst_count += 1;
            i += 2;
        }
        // The terminating marker stays where it is; the correction only
        // narrows the preserved ECS bounds.
        let marker_pos = i;
        let mut end = i;
        if end >= ecs_start + 2 && last_rst_index == Some(end - 2) {
            if self.options.warn {
                warn!("scan ends with a redundant restart marker");
            }
            if self.options.tidy_up {
                info!("removing trailing restart marker");
                end -= 2;
            }
        }

        let scan = Scan {
            components: comps,
            spectral_start,
            spectral_end,
            approx_high,
            approx_low,
            restart_interval: self.restart_interval,
            ecs: &data[ecs_start..end],
            n_mcus: 0,
            rst_count,
            coefficients_decoded: false,
        };
        let scan_idx = self.frames[frame_idx].scans.len();
        self.frames[frame_idx].scans.push(scan);
        self.segments.push(Segment::Scan {
            frame: frame_idx,
            scan: scan_idx,
        });
        self.offset = marker_pos;
        self.state = if self.state == ParserState::Scan1 {
            ParserState::Scan1Ecs
        } else {
            ParserState::ScanNEcs
        };

        // Coefficient-decode the shapes the decoder understands;
        // everything else stays container-only.
        let encoding = self.frames[frame_idx].encoding;
        let decodable = encoding.entropy_coding() == EntropyCoding::Huffman
            && encoding.framing() == Framing::SingleFrame
            && match encoding.encoding_mode() {
                EncodingMode::BaselineSequential | EncodingMode::ExtendedSequential => true,
                EncodingMode::Progressive => {
                    spectral_start == 0 && spectral_end == 0 && approx_high == 0
                }
                EncodingMode::Lossless => false,
            };
        if decodable {
            decoder::decode_scan(
                &mut self.frames[frame_idx],
                scan_idx,
                &self.huffman,
                self.options.warn,
            )?;
            debug!(
                "scan {} decoded: {} MCUs",
                scan_idx, self.frames[frame_idx].scans[scan_idx].n_mcus
            );
        } else if self.options.warn {
            warn!(
                "scan coefficients not decoded (Ss {} Se {} Ah {})",
                spectral_start, spectral_end, approx_high
            );
        }
        Ok(())
    }

    /// Override the frame line count from the decoded scan geometry
    /// when the declared value is off by more than one MCU row.
    fn fix_lines(&mut self) {
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        if !matches!(
            frame.encoding,
            Encoding::BaselineSequential | Encoding::ExtendedSequential
        ) {
            return;
        }
        if frame.components.is_empty() || !frame.scans.iter().any(|s| s.coefficients_decoded) {
            return;
        }
        let rows = frame.grids[0].rows();
        if rows == 0 {
            return;
        }
        let v = usize::from(frame.components[0].v_samp_factor);
        let lines = 8 * rows * usize::from(frame.max_v) / v;
        let declared = usize::from(frame.actual_lines());
        if lines.abs_diff(declared) > 8 * usize::from(frame.max_v) {
            info!(
                "overriding frame line count: declared {}, scan produced {}",
                declared, lines
            );
            frame.scan_lines = lines.min(usize::from(u16::MAX)) as u16;
        }
    }
}
