//! Pixel reconstruction: dequantize, inverse-transform, emit.
//!
//! Each component grid becomes a padded sample plane (dequantize + IDCT
//! per data unit), then pixels are emitted in output order. Grayscale
//! output reads the first component; color output upsamples chroma by
//! sampling-factor ratio and applies the BT.601 YCbCr to RGB conversion.
//!
//! The emission loop is orientation-agnostic: an [`Orientation`] supplies
//! the output-to-source index mapping and whether the axes swap, so all
//! eight EXIF orientations share one loop.

use crate::consts::DCTSIZE;
use crate::dct;
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::types::Orientation;

/// A reconstructed pixel buffer.
///
/// `data` is row-major with `stride` bytes per row; `channels` is 1 for
/// grayscale and 3 for RGB.
pub struct Pixels {
    /// Width in pixels (after orientation)
    pub width: usize,
    /// Height in pixels (after orientation)
    pub height: usize,
    /// Bytes per row
    pub stride: usize,
    /// Bytes per pixel (1 or 3)
    pub channels: usize,
    /// Sample bytes, row-major
    pub data: Vec<u8>,
}

/// One component's padded sample plane.
struct Plane {
    samples: Vec<u8>,
    stride: usize,
    rows: usize,
    /// Sampling ratio numerators against the frame maxima
    h: usize,
    v: usize,
}

impl Plane {
    /// Sample for image position (row, col), scaled by sampling factors
    /// and clamped to the plane (defensive against short planes).
    #[inline]
    fn sample(&self, row: usize, col: usize, max_h: usize, max_v: usize) -> u8 {
        let r = (row * self.v / max_v).min(self.rows - 1);
        let c = (col * self.h / max_h).min(self.stride - 1);
        self.samples[r * self.stride + c]
    }
}

/// Reconstruct the pixels of a fully decoded frame.
///
/// The caller (the model) has already verified the frame kind; this
/// routine assumes sequential Huffman data with 8-bit precision and 1 or
/// 3 components.
pub(crate) fn reconstruct(
    frame: &Frame<'_>,
    orientation: Option<Orientation>,
    as_gray: bool,
) -> Result<Pixels> {
    let max_h = usize::from(frame.max_h);
    let max_v = usize::from(frame.max_v);

    // Dequantize and inverse-transform every data unit into its plane.
    let mut planes: Vec<Plane> = Vec::with_capacity(frame.grids.len());
    for (ci, grid) in frame.grids.iter().enumerate() {
        let comp = &frame.components[ci];
        let table = frame.quant_snapshot[ci]
            .as_ref()
            .ok_or(Error::QuantTableMissing {
                dest: comp.quant_tbl_no,
            })?;
        let stride = grid.cols() * DCTSIZE;
        let rows = grid.rows() * DCTSIZE;
        if rows == 0 {
            return Err(Error::UnsupportedOperation(
                "no decoded data units to reconstruct",
            ));
        }
        let mut samples = vec![0u8; stride * rows];
        for r in 0..grid.rows() {
            for c in 0..grid.cols() {
                let block = table.dequantize(grid.unit(r, c));
                dct::inverse_dct_to_samples(
                    &block,
                    &mut samples,
                    r * DCTSIZE * stride + c * DCTSIZE,
                    stride,
                );
            }
        }
        planes.push(Plane {
            samples,
            stride,
            rows,
            h: usize::from(comp.h_samp_factor),
            v: usize::from(comp.v_samp_factor),
        });
    }

    let width = usize::from(frame.n_samples_line);
    let mut height = usize::from(frame.actual_lines());
    if height == 0 {
        // Height was never declared; the decoded geometry is the truth.
        height = planes[0].rows * max_v / planes[0].v;
    }
    height = height.min(planes[0].rows * max_v / planes[0].v);

    let gray = as_gray || frame.components.len() == 1;
    let channels = if gray { 1 } else { 3 };
    let orientation = orientation.unwrap_or(Orientation::TOP_LEFT);
    let (out_rows, out_cols) = if orientation.swaps_axes() {
        (width, height)
    } else {
        (height, width)
    };

    let mut data = vec![0u8; out_rows * out_cols * channels];
    for r in 0..out_rows {
        for c in 0..out_cols {
            let (sr, sc) = orientation.source_pos(r, c, height, width);
            let dst = (r * out_cols + c) * channels;
            if gray {
                data[dst] = planes[0].sample(sr, sc, max_h, max_v);
            } else {
                let y = f32::from(planes[0].sample(sr, sc, max_h, max_v));
                let cb = f32::from(planes[1].sample(sr, sc, max_h, max_v));
                let cr = f32::from(planes[2].sample(sr, sc, max_h, max_v));
                let (red, green, blue) = ycbcr_to_rgb(y, cb, cr);
                data[dst] = red;
                data[dst + 1] = green;
                data[dst + 2] = blue;
            }
        }
    }

    Ok(Pixels {
        width: out_cols,
        height: out_rows,
        stride: out_cols * channels,
        channels,
        data,
    })
}

/// BT.601 conversion with round-to-nearest and clamping.
fn ycbcr_to_rgb(y: f32, cb: f32, cr: f32) -> (u8, u8, u8) {
    let r = y + 1.402 * (cr - 128.0);
    let g = y - 0.34414 * (cb - 128.0) - 0.71414 * (cr - 128.0);
    let b = y + 1.772 * (cb - 128.0);
    (clamp_u8(r), clamp_u8(g), clamp_u8(b))
}

#[inline]
fn clamp_u8(v: f32) -> u8 {
    ((v + 0.5) as i32).clamp(0, 255) as u8
}
