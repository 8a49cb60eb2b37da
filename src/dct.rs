//! Scaled AAN inverse DCT for 8x8 blocks.
//!
//! The transform runs in two passes over the dequantized block: one
//! butterfly per column, then one per row. The column pass is vectorized
//! with `wide::f32x8`, one lane per column, so the eight column transforms
//! run together; the row pass stays scalar because it feeds the rounded,
//! clamped sample store.
//!
//! The descale constants fold the DCT normalization into the first
//! multiply of each pass (Arai, Agui, Nakajima factorization).
//!
//! Reference: ITU-T T.81 Annex A.3.3

use wide::f32x8;

use crate::consts::{DCTSIZE, DCTSIZE2};

/// Per-index descale factors applied when loading a column or row.
const ISCALE: [f32; DCTSIZE] = [
    2.828_427_1, // 2 * sqrt(2)
    3.923_141_1,
    3.695_518_0,
    3.325_878_4,
    2.828_427_1,
    2.222_280_9,
    1.530_733_7,
    0.780_361_3,
];

const IA1: f32 = 1.414_213_6; // sqrt(2)
const A2: f32 = 0.541_196_1; // sqrt(2) * cos(3*pi/8)
const IA3: f32 = 1.414_213_6;
const A4: f32 = 1.306_563_0; // sqrt(2) * cos(pi/8)
const A5: f32 = 0.382_683_43; // cos(3*pi/8)

/// One butterfly over eight lanes (a column pass step for all columns).
#[inline]
fn butterfly_x8(d: [f32x8; DCTSIZE]) -> [f32x8; DCTSIZE] {
    let half = f32x8::splat(0.5);

    let v15 = d[0] * f32x8::splat(ISCALE[0]);
    let v26 = d[1] * f32x8::splat(ISCALE[1]);
    let v21 = d[2] * f32x8::splat(ISCALE[2]);
    let v28 = d[3] * f32x8::splat(ISCALE[3]);
    let v16 = d[4] * f32x8::splat(ISCALE[4]);
    let v25 = d[5] * f32x8::splat(ISCALE[5]);
    let v22 = d[6] * f32x8::splat(ISCALE[6]);
    let v27 = d[7] * f32x8::splat(ISCALE[7]);

    let v19 = (v25 - v28) * half;
    let v20 = (v26 - v27) * half;
    let v23 = (v26 + v27) * half;
    let v24 = (v25 + v28) * half;

    let v7 = (v23 + v24) * half;
    let v11 = (v21 + v22) * half;
    let v13 = (v23 - v24) * half;
    let v17 = (v21 - v22) * half;

    let v8 = (v15 + v16) * half;
    let v9 = (v15 - v16) * half;

    // 1/(a2*a5 - a2*a4 - a4*a5) is exactly -1, which collapses the two
    // rotation terms to a single multiply each.
    let term = (v19 - v20) * f32x8::splat(A5);
    let v12 = term - v19 * f32x8::splat(A4);
    let v14 = v20 * f32x8::splat(A2) - term;

    let v6 = v14 - v7;
    let v5 = v13 * f32x8::splat(IA3) - v6;
    let v4 = -v5 - v12;
    let v10 = v17 * f32x8::splat(IA1) - v11;

    let v0 = (v8 + v11) * half;
    let v1 = (v9 + v10) * half;
    let v2 = (v9 - v10) * half;
    let v3 = (v8 - v11) * half;

    [
        (v0 + v7) * half,
        (v1 + v6) * half,
        (v2 + v5) * half,
        (v3 + v4) * half,
        (v3 - v4) * half,
        (v2 - v5) * half,
        (v1 - v6) * half,
        (v0 - v7) * half,
    ]
}

/// Scalar butterfly for one row of the intermediate block.
#[inline]
fn butterfly_row(d: &[f32; DCTSIZE]) -> [f32; DCTSIZE] {
    let v15 = d[0] * ISCALE[0];
    let v26 = d[1] * ISCALE[1];
    let v21 = d[2] * ISCALE[2];
    let v28 = d[3] * ISCALE[3];
    let v16 = d[4] * ISCALE[4];
    let v25 = d[5] * ISCALE[5];
    let v22 = d[6] * ISCALE[6];
    let v27 = d[7] * ISCALE[7];

    let v19 = (v25 - v28) * 0.5;
    let v20 = (v26 - v27) * 0.5;
    let v23 = (v26 + v27) * 0.5;
    let v24 = (v25 + v28) * 0.5;

    let v7 = (v23 + v24) * 0.5;
    let v11 = (v21 + v22) * 0.5;
    let v13 = (v23 - v24) * 0.5;
    let v17 = (v21 - v22) * 0.5;

    let v8 = (v15 + v16) * 0.5;
    let v9 = (v15 - v16) * 0.5;

    let term = (v19 - v20) * A5;
    let v12 = term - v19 * A4;
    let v14 = v20 * A2 - term;

    let v6 = v14 - v7;
    let v5 = v13 * IA3 - v6;
    let v4 = -v5 - v12;
    let v10 = v17 * IA1 - v11;

    let v0 = (v8 + v11) * 0.5;
    let v1 = (v9 + v10) * 0.5;
    let v2 = (v9 - v10) * 0.5;
    let v3 = (v8 - v11) * 0.5;

    [
        (v0 + v7) * 0.5,
        (v1 + v6) * 0.5,
        (v2 + v5) * 0.5,
        (v3 + v4) * 0.5,
        (v3 - v4) * 0.5,
        (v2 - v5) * 0.5,
        (v1 - v6) * 0.5,
        (v0 - v7) * 0.5,
    ]
}

/// Inverse-transform a dequantized natural-order block.
///
/// Returns raw spatial values without level shift or clamping; callers
/// that want 8-bit samples go through [`inverse_dct_to_samples`].
pub fn inverse_dct_8x8(block: &[i32; DCTSIZE2]) -> [f32; DCTSIZE2] {
    // Column pass: lane c of each vector carries column c.
    let mut rows = [f32x8::splat(0.0); DCTSIZE];
    for (r, row) in rows.iter_mut().enumerate() {
        let mut lane = [0f32; DCTSIZE];
        for (c, l) in lane.iter_mut().enumerate() {
            *l = block[r * DCTSIZE + c] as f32;
        }
        *row = f32x8::from(lane);
    }
    let cols_done = butterfly_x8(rows);

    // Row pass: scalar, one row at a time.
    let mut out = [0f32; DCTSIZE2];
    for r in 0..DCTSIZE {
        let row = butterfly_row(&cols_done[r].to_array());
        out[r * DCTSIZE..(r + 1) * DCTSIZE].copy_from_slice(&row);
    }
    out
}

/// Round, level-shift by +128 and clamp a spatial value to an 8-bit sample.
#[inline]
pub fn level_shift(value: f32) -> u8 {
    (value.round() as i32 + 128).clamp(0, 255) as u8
}

/// Inverse-transform a block and deposit 8-bit samples into a plane.
///
/// `offset` addresses the top-left sample of the block inside `plane`;
/// rows are `stride` samples apart.
pub fn inverse_dct_to_samples(
    block: &[i32; DCTSIZE2],
    plane: &mut [u8],
    offset: usize,
    stride: usize,
) {
    let values = inverse_dct_8x8(block);
    for r in 0..DCTSIZE {
        let dst = offset + r * stride;
        for c in 0..DCTSIZE {
            plane[dst + c] = level_shift(values[r * DCTSIZE + c]);
        }
    }
}
