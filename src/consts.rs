//! Core constants shared across the crate.
//!
//! Reference: ITU-T T.81 Annex A (DCT geometry), Figure A.6 (zig-zag order).

/// The DCT block is always 8x8.
pub const DCTSIZE: usize = 8;

/// Number of coefficients in one data unit.
pub const DCTSIZE2: usize = 64;

/// Number of quantization table destinations (Tq in [0..3]).
pub const NUM_QUANT_TBLS: usize = 4;

/// Number of Huffman table slots: (DC + AC) per destination, 4 destinations.
pub const NUM_HUFF_TBLS: usize = 8;

/// Longest legal Huffman code, in bits.
pub const MAX_CODE_LENGTH: usize = 16;

/// Largest DC size category for 8-bit precision frames.
pub const MAX_DC_SIZE_BASELINE: u8 = 11;

/// Largest DC size category for 12-bit extended precision frames.
pub const MAX_DC_SIZE_EXTENDED: u8 = 15;

/// Largest AC size category for 8-bit precision frames.
pub const MAX_AC_SIZE_BASELINE: u8 = 10;

/// Largest AC size category for 12-bit extended precision frames.
pub const MAX_AC_SIZE_EXTENDED: u8 = 14;

/// Zig-zag serialization position for each natural (row, col) coefficient.
///
/// `ZIGZAG_ROW_COL[r][c]` is the index inside the entropy-coded stream at
/// which the coefficient of row `r`, column `c` travels.
pub const ZIGZAG_ROW_COL: [[usize; DCTSIZE]; DCTSIZE] = [
    [0, 1, 5, 6, 14, 15, 27, 28],
    [2, 4, 7, 13, 16, 26, 29, 42],
    [3, 8, 12, 17, 25, 30, 41, 43],
    [9, 11, 18, 24, 31, 40, 44, 53],
    [10, 19, 23, 32, 39, 45, 52, 54],
    [20, 22, 33, 38, 46, 51, 55, 60],
    [21, 34, 37, 47, 50, 56, 59, 61],
    [35, 36, 48, 49, 57, 58, 62, 63],
];

/// Natural (row-major) coefficient index for each zig-zag position.
///
/// This is the inverse permutation of [`ZIGZAG_ROW_COL`]:
/// `JPEG_NATURAL_ORDER[ZIGZAG_ROW_COL[r][c]] == r * 8 + c`.
pub const JPEG_NATURAL_ORDER: [usize; DCTSIZE2] = [
    0, 1, 8, 16, 9, 2, 3, 10, //
    17, 24, 32, 25, 18, 11, 4, 5, //
    12, 19, 26, 33, 40, 48, 41, 34, //
    27, 20, 13, 6, 7, 14, 21, 28, //
    35, 42, 49, 56, 57, 50, 43, 36, //
    29, 22, 15, 23, 30, 37, 44, 51, //
    58, 59, 52, 45, 38, 31, 39, 46, //
    53, 60, 61, 54, 47, 55, 62, 63,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zigzag_is_permutation() {
        let mut seen = [false; DCTSIZE2];
        for row in &ZIGZAG_ROW_COL {
            for &z in row {
                assert!(z < DCTSIZE2);
                assert!(!seen[z], "zig-zag position {} repeated", z);
                seen[z] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_natural_order_inverts_zigzag() {
        for r in 0..DCTSIZE {
            for c in 0..DCTSIZE {
                let z = ZIGZAG_ROW_COL[r][c];
                assert_eq!(JPEG_NATURAL_ORDER[z], r * DCTSIZE + c);
            }
        }
    }

    #[test]
    fn test_zigzag_corners() {
        // DC travels first, the bottom-right corner travels last.
        assert_eq!(ZIGZAG_ROW_COL[0][0], 0);
        assert_eq!(ZIGZAG_ROW_COL[7][7], 63);
        // First off-diagonal step goes right, then down-left.
        assert_eq!(ZIGZAG_ROW_COL[0][1], 1);
        assert_eq!(ZIGZAG_ROW_COL[1][0], 2);
    }
}
