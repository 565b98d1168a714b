//! Sobel edge detection over a block of rows.
//!
//! A block only sees its own rows, so every sample whose 3x3 neighborhood
//! leaves the block is written as 0. When the image is split into several
//! blocks this zeroes the first and last row of each one, seams included.

use rayon::prelude::*;

use crate::{Block, ImagingErr, Result};

/// A fixed 3x3 weight matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operator([[i32; 3]; 3]);

/// Horizontal derivative.
pub const SOBEL_X: Operator = Operator::new([[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]]);

/// Vertical derivative.
pub const SOBEL_Y: Operator = Operator::new([[-1, -2, -1], [0, 0, 0], [1, 2, 1]]);

impl Operator {
    pub const fn new(weights: [[i32; 3]; 3]) -> Self {
        Self(weights)
    }

    /// Computes the weighted sum of the neighborhood centered at `(i, j)`.
    ///
    /// # Panics
    /// If `(i, j)` is not an interior sample of `src`.
    #[inline]
    pub fn apply(&self, src: &Block<'_>, i: usize, j: usize) -> i32 {
        let mut sum = 0;
        for (k, weights) in self.0.iter().enumerate() {
            for (l, weight) in weights.iter().enumerate() {
                sum += weight * i32::from(src.get(i + k - 1, j + l - 1));
            }
        }

        sum
    }
}

/// Combines both directional sums into a sample, saturating at 255.
///
/// The fractional part of the magnitude is truncated.
#[inline]
pub fn magnitude(sx: i32, sy: i32) -> u8 {
    let (sx, sy) = (f64::from(sx), f64::from(sy));
    (sx * sx + sy * sy).sqrt().min(255.0) as u8
}

/// Writes the gradient magnitude of every sample of `src` into `dst`.
///
/// Rows are processed in parallel, each task owning a disjoint output row.
///
/// # Errors
/// `ImagingErr::LengthMismatch` if `dst` is not shaped like `src`.
pub fn gradient_magnitude(src: Block<'_>, dst: &mut [u8]) -> Result<()> {
    let expected = src.samples().len();
    if dst.len() != expected {
        return Err(ImagingErr::LengthMismatch {
            what: "gradient output",
            got: dst.len(),
            expected,
        });
    }

    if src.is_empty() {
        return Ok(());
    }

    dst.par_chunks_mut(src.cols())
        .enumerate()
        .for_each(|(i, row)| gradient_row(&src, i, row));

    Ok(())
}

fn gradient_row(src: &Block<'_>, i: usize, row: &mut [u8]) {
    let (rows, cols) = (src.rows(), src.cols());

    if i == 0 || i + 1 == rows {
        row.fill(0);
        return;
    }

    for (j, out) in row.iter_mut().enumerate() {
        *out = if j == 0 || j + 1 == cols {
            0
        } else {
            magnitude(SOBEL_X.apply(src, i, j), SOBEL_Y.apply(src, i, j))
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Grid;

    fn reference(grid: &Grid) -> Vec<u8> {
        let (rows, cols) = (grid.rows() as isize, grid.cols() as isize);
        let at = |i: isize, j: isize| i32::from(grid.samples()[(i * cols + j) as usize]);

        let mut out = vec![0; grid.samples().len()];
        for i in 1..rows - 1 {
            for j in 1..cols - 1 {
                let sx = at(i - 1, j + 1) + 2 * at(i, j + 1) + at(i + 1, j + 1)
                    - at(i - 1, j - 1)
                    - 2 * at(i, j - 1)
                    - at(i + 1, j - 1);
                let sy = at(i + 1, j - 1) + 2 * at(i + 1, j) + at(i + 1, j + 1)
                    - at(i - 1, j - 1)
                    - 2 * at(i - 1, j)
                    - at(i - 1, j + 1);
                let m = ((sx * sx + sy * sy) as f64).sqrt() as i32;
                out[(i * cols + j) as usize] = m.min(255) as u8;
            }
        }

        out
    }

    fn noise(rows: usize, cols: usize) -> Grid {
        let mut state = 0x2545_f491_u32;
        let samples = (0..rows * cols)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 24) as u8
            })
            .collect();

        Grid::from_raw(rows, cols, samples).unwrap()
    }

    #[test]
    fn uniform_block_has_no_gradient() {
        let grid = Grid::filled(5, 6, 128);
        let mut out = vec![7; 30];

        gradient_magnitude(grid.view(), &mut out).unwrap();
        assert!(out.iter().all(|&s| s == 0));
    }

    #[test]
    fn vertical_step_saturates_and_borders_are_zero() {
        let grid = Grid::from_raw(3, 3, vec![0, 0, 255, 0, 0, 255, 0, 0, 255]).unwrap();
        let mut out = vec![1; 9];

        gradient_magnitude(grid.view(), &mut out).unwrap();
        assert_eq!(out, [0, 0, 0, 0, 255, 0, 0, 0, 0]);
    }

    #[test]
    fn magnitude_is_truncated() {
        // sx = sy = 2 -> sqrt(8) = 2.83
        let grid = Grid::from_raw(3, 3, vec![0, 0, 0, 0, 0, 0, 0, 0, 2]).unwrap();
        let mut out = vec![0; 9];

        gradient_magnitude(grid.view(), &mut out).unwrap();
        assert_eq!(out[4], 2);
        assert_eq!(magnitude(3, 4), 5);
        assert_eq!(magnitude(-300, 0), 255);
    }

    #[test]
    fn parallel_rows_match_the_plain_convolution() {
        let grid = noise(37, 53);
        let mut out = vec![0; grid.samples().len()];

        gradient_magnitude(grid.view(), &mut out).unwrap();
        assert_eq!(out, reference(&grid));
    }

    #[test]
    fn thin_blocks_are_all_border() {
        for (rows, cols) in [(1, 8), (2, 8), (8, 1), (8, 2)] {
            let grid = noise(rows, cols);
            let mut out = vec![9; rows * cols];

            gradient_magnitude(grid.view(), &mut out).unwrap();
            assert!(out.iter().all(|&s| s == 0), "{rows}x{cols}");
        }
    }

    #[test]
    fn empty_block_is_a_no_op() {
        let block = Block::new(&[], 0, 4).unwrap();
        gradient_magnitude(block, &mut []).unwrap();
    }

    #[test]
    fn mismatched_output_is_rejected() {
        let grid = Grid::new(3, 3);
        assert!(gradient_magnitude(grid.view(), &mut [0; 8]).is_err());
    }
}
