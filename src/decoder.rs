//! Scan entropy decoder: Huffman-coded MCUs into coefficient grids.
//!
//! For each MCU the decoder walks a flattened plan of (component, unit)
//! slots computed once at scan start. Every data unit is one DC
//! difference (added to the component's running predictor) followed by
//! run-length-coded AC coefficients in zig-zag order, with EOB and ZRL
//! escapes. Restart intervals byte-align the reader, consume one RST
//! marker, and reset the predictors.
//!
//! Two scan shapes are coefficient-decoded: sequential scans (baseline or
//! extended) and the initial DC scan of a progressive frame. Later
//! progressive scans are handled at container level only.
//!
//! Reference: ITU-T T.81 Section F.2.2

use log::{trace, warn};

use crate::bitstream::{extend, BitReader};
use crate::consts::{
    DCTSIZE2, MAX_AC_SIZE_BASELINE, MAX_AC_SIZE_EXTENDED, MAX_DC_SIZE_BASELINE,
    MAX_DC_SIZE_EXTENDED,
};
use crate::error::{Error, Result};
use crate::frame::{DataUnit, Frame};
use crate::huffman::{HuffmanStore, HuffmanTable, TableClass};
use crate::marker;

/// Per-component decode state for one scan.
struct CompState {
    /// Frame component index (addresses the grid)
    comp: usize,
    /// Units per MCU horizontally (1 when non-interleaved)
    h: usize,
    /// Units per MCU vertically (1 when non-interleaved)
    v: usize,
    /// Units per row for this scan
    units_row: usize,
    /// Running DC predictor
    pred: i32,
    /// Grid row of the current MCU's top-left unit
    anchor_row: usize,
    /// Grid column of the current MCU's top-left unit
    anchor_col: usize,
}

/// Decode the entropy-coded data of one scan into the frame's grids.
///
/// Expects the caller to have verified that the scan shape is decodable
/// (sequential, or the initial progressive DC scan). On success the
/// scan's `n_mcus` and `coefficients_decoded` are filled in.
pub(crate) fn decode_scan<'a>(
    frame: &mut Frame<'a>,
    scan_idx: usize,
    huffman: &HuffmanStore,
    emit_warnings: bool,
) -> Result<()> {
    // Copy the plan data out of the scan so grid writes borrow freely.
    let (scan_comps, ss, se, ri, ecs) = {
        let s = &frame.scans[scan_idx];
        (
            s.components.clone(),
            s.spectral_start,
            s.spectral_end,
            usize::from(s.restart_interval),
            s.ecs,
        )
    };
    let dc_only = se == 0 && ss == 0;
    let interleaved = scan_comps.len() > 1;

    let (max_dc, max_ac) = if frame.precision > 8 {
        (MAX_DC_SIZE_EXTENDED, MAX_AC_SIZE_EXTENDED)
    } else {
        (MAX_DC_SIZE_BASELINE, MAX_AC_SIZE_BASELINE)
    };

    // Resolve the Huffman tables up front; a scan must not start with a
    // missing table.
    let mut dc_tables: Vec<&HuffmanTable> = Vec::with_capacity(scan_comps.len());
    let mut ac_tables: Vec<Option<&HuffmanTable>> = Vec::with_capacity(scan_comps.len());
    for sc in &scan_comps {
        dc_tables.push(huffman.require(TableClass::Dc, sc.dc_tbl_no)?);
        ac_tables.push(if dc_only {
            huffman.get(TableClass::Ac, sc.ac_tbl_no)
        } else {
            Some(huffman.require(TableClass::Ac, sc.ac_tbl_no)?)
        });
    }

    let mut states: Vec<CompState> = scan_comps
        .iter()
        .map(|sc| {
            let c = &frame.components[sc.component_index];
            let (h, v, units_row) = if interleaved {
                (
                    usize::from(c.h_samp_factor),
                    usize::from(c.v_samp_factor),
                    frame.n_mcus_row() * usize::from(c.h_samp_factor),
                )
            } else {
                (1, 1, frame.units_per_line(sc.component_index))
            };
            CompState {
                comp: sc.component_index,
                h,
                v,
                units_row,
                pred: 0,
                anchor_row: 0,
                anchor_col: 0,
            }
        })
        .collect();

    // Flattened MCU plan: (state index, row offset, column offset).
    let mut plan: Vec<(usize, usize, usize)> = Vec::new();
    for (si, st) in states.iter().enumerate() {
        for dr in 0..st.v {
            for dc in 0..st.h {
                plan.push((si, dr, dc));
            }
        }
    }

    // Expected MCU count, when the frame height is known.
    let expected: Option<usize> = if frame.n_mcus_col() == 0 {
        None
    } else if interleaved {
        Some(frame.n_mcus_row() * frame.n_mcus_col())
    } else {
        let comp = states[0].comp;
        Some(frame.units_per_line(comp) * frame.unit_rows(comp))
    };

    let mut reader = BitReader::new(ecs);
    let mut mcu: usize = 0;
    let mut restart_k: usize = 0;

    loop {
        if let Some(exp) = expected {
            if mcu == exp {
                break;
            }
        }

        let restart_due = ri > 0 && mcu > 0 && mcu % ri == 0;
        if restart_due {
            reader.align_to_byte();
            match reader.peek_marker() {
                Some(m) if marker::is_rst(m) => {
                    reader.take_marker();
                    let expected_code = marker::RST0 + (restart_k % 8) as u8;
                    if m != expected_code && emit_warnings {
                        warn!(
                            "restart marker out of sequence: found {}, expected {}",
                            marker::name(m),
                            marker::name(expected_code)
                        );
                    }
                    restart_k += 1;
                    for st in states.iter_mut() {
                        st.pred = 0;
                    }
                }
                Some(_) if expected.is_none() => break,
                Some(_) => return Err(Error::Truncated),
                None => {
                    if expected.is_none() && reader.at_scan_boundary() {
                        break;
                    }
                    // The encoder owed us a restart marker here; carry on
                    // without resetting predictors.
                    if emit_warnings {
                        warn!("expected a restart marker after {} MCUs", mcu);
                    }
                }
            }
        } else if expected.is_none() && mcu > 0 && reader.at_scan_boundary() {
            break;
        }

        for &(si, dr, dc) in &plan {
            let st = &mut states[si];
            let unit = decode_data_unit(
                &mut reader,
                dc_tables[si],
                ac_tables[si],
                &mut st.pred,
                max_dc,
                max_ac,
                dc_only,
            )?;
            let row = st.anchor_row + dr;
            let col = st.anchor_col + dc;
            let grid = &mut frame.grids[st.comp];
            grid.ensure_rows(row + 1);
            *grid.unit_mut(row, col) = unit;
            trace!(
                "mcu {} component {} unit ({}, {}) dc {}",
                mcu,
                st.comp,
                row,
                col,
                unit[0]
            );
        }

        for st in states.iter_mut() {
            st.anchor_col += st.h;
            if st.anchor_col >= st.units_row {
                st.anchor_col = 0;
                st.anchor_row += st.v;
            }
        }
        mcu += 1;
    }

    let scan = &mut frame.scans[scan_idx];
    scan.n_mcus = mcu;
    scan.coefficients_decoded = true;
    Ok(())
}

/// Decode one data unit: the DC difference, then run-length AC expansion.
fn decode_data_unit(
    reader: &mut BitReader<'_>,
    dc_table: &HuffmanTable,
    ac_table: Option<&HuffmanTable>,
    pred: &mut i32,
    max_dc: u8,
    max_ac: u8,
    dc_only: bool,
) -> Result<DataUnit> {
    let mut unit: DataUnit = [0; DCTSIZE2];

    // DC path: a size category, then that many magnitude bits.
    let size = dc_table.decode_symbol(reader)?;
    if size > max_dc {
        return Err(Error::InvalidSize { size, limit: max_dc });
    }
    let diff = if size > 0 {
        extend(reader.read_bits(size)?, size)
    } else {
        0
    };
    *pred += diff;
    unit[0] = *pred as i16;

    if dc_only {
        return Ok(unit);
    }
    let ac_table = ac_table.expect("AC table resolved for full scans");

    // AC path: (run, size) pairs walking the zig-zag cursor to 64.
    let mut k = 1usize;
    while k < DCTSIZE2 {
        let rs = ac_table.decode_symbol(reader)?;
        let run = usize::from(rs >> 4);
        let size = rs & 0x0F;
        if size == 0 {
            if rs == 0x00 {
                // EOB: the rest of the unit stays zero.
                break;
            }
            if rs == 0xF0 {
                // ZRL: sixteen zeros.
                if k + 16 > DCTSIZE2 {
                    return Err(Error::Overrun);
                }
                k += 16;
                continue;
            }
            return Err(Error::InvalidSize { size: 0, limit: max_ac });
        }
        if size > max_ac {
            return Err(Error::InvalidSize { size, limit: max_ac });
        }
        if k + run > DCTSIZE2 - 1 {
            return Err(Error::Overrun);
        }
        k += run;
        unit[k] = extend(reader.read_bits(size)?, size) as i16;
        k += 1;
    }
    Ok(unit)
}
