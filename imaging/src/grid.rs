use crate::{ImagingErr, Result};

/// An owned, row-major grid of 8-bit grayscale samples.
///
/// `samples.len() == rows * cols` holds for the entire lifetime of the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    samples: Vec<u8>,
}

impl Grid {
    /// Creates a new zeroed `Grid`.
    ///
    /// # Arguments
    /// * `rows` - The amount of rows.
    /// * `cols` - The amount of columns.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, 0)
    }

    /// Creates a new `Grid` where every sample is `value`.
    pub fn filled(rows: usize, cols: usize, value: u8) -> Self {
        Self {
            rows,
            cols,
            samples: vec![value; rows * cols],
        }
    }

    /// Wraps an existing buffer of samples.
    ///
    /// # Errors
    /// `ImagingErr::LengthMismatch` if `samples` doesn't hold exactly `rows * cols` items.
    pub fn from_raw(rows: usize, cols: usize, samples: Vec<u8>) -> Result<Self> {
        check_len("grid", samples.len(), rows, cols)?;
        Ok(Self {
            rows,
            cols,
            samples,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [u8] {
        &mut self.samples
    }

    /// Borrows the whole grid as a read only block.
    pub fn view(&self) -> Block<'_> {
        Block {
            samples: &self.samples,
            rows: self.rows,
            cols: self.cols,
        }
    }
}

/// A read only view over a contiguous range of rows.
#[derive(Debug, Clone, Copy)]
pub struct Block<'a> {
    samples: &'a [u8],
    rows: usize,
    cols: usize,
}

impl<'a> Block<'a> {
    /// Creates a new `Block` over `samples`.
    ///
    /// # Errors
    /// `ImagingErr::LengthMismatch` if `samples` doesn't hold exactly `rows * cols` items.
    pub fn new(samples: &'a [u8], rows: usize, cols: usize) -> Result<Self> {
        check_len("block", samples.len(), rows, cols)?;
        Ok(Self {
            samples,
            rows,
            cols,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn samples(&self) -> &'a [u8] {
        self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// # Panics
    /// If `(i, j)` lies outside of the block.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> u8 {
        self.samples[i * self.cols + j]
    }
}

fn check_len(what: &'static str, got: usize, rows: usize, cols: usize) -> Result<()> {
    let expected = rows * cols;
    if got != expected {
        return Err(ImagingErr::LengthMismatch {
            what,
            got,
            expected,
        });
    }

    Ok(())
}
