//! Static row partitioning shared by every participant.
//!
//! The plan is never sent over the wire: each participant derives it from the
//! broadcast dimensions and the world size, and the very same plan drives both
//! the scatter and the gather.

use std::num::NonZeroUsize;

use comms::specs::image::Dimensions;

use crate::{NodeErr, Result};

/// One participant's share of the image, offsets and lengths are in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub rows: usize,
    pub offset: usize,
    pub len: usize,
}

/// The row assignment for every participant, indexed by rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    cols: usize,
    parts: Vec<Partition>,
}

impl PartitionPlan {
    /// Creates a new `PartitionPlan`.
    ///
    /// Each participant gets `rows / n` rows, the first `rows % n` get one more.
    /// Participants past the row count end up with empty partitions.
    ///
    /// # Arguments
    /// * `dims` - The dimensions of the whole image.
    /// * `participants` - The world size.
    pub fn new(dims: Dimensions, participants: NonZeroUsize) -> Self {
        let n = participants.get();
        let (base, remainder) = (dims.rows / n, dims.rows % n);

        let mut offset = 0;
        let parts = (0..n)
            .map(|rank| {
                let rows = base + usize::from(rank < remainder);
                let len = rows * dims.cols;
                let part = Partition { rows, offset, len };
                offset += len;
                part
            })
            .collect();

        Self {
            cols: dims.cols,
            parts,
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The world size this plan was made for.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// # Panics
    /// If `rank` is not smaller than the world size.
    pub fn part(&self, rank: usize) -> Partition {
        self.parts[rank]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Partition> {
        self.parts.iter()
    }

    /// The amount of samples covered by the plan.
    pub fn total_len(&self) -> usize {
        self.parts.iter().map(|p| p.len).sum()
    }

    /// Splits a full image buffer into one block per rank.
    ///
    /// # Errors
    /// `NodeErr::BufferLengthMismatch` if `buf` is not exactly as long as the plan.
    pub fn split<'a>(&self, buf: &'a [u8]) -> Result<Vec<&'a [u8]>> {
        self.check_len(buf.len())?;

        let mut rest = buf;
        let blocks = self
            .parts
            .iter()
            .map(|part| {
                let (block, tail) = rest.split_at(part.len);
                rest = tail;
                block
            })
            .collect();

        Ok(blocks)
    }

    /// Splits a full image buffer into one disjoint mutable block per rank.
    ///
    /// # Errors
    /// `NodeErr::BufferLengthMismatch` if `buf` is not exactly as long as the plan.
    pub fn split_mut<'a>(&self, buf: &'a mut [u8]) -> Result<Vec<&'a mut [u8]>> {
        self.check_len(buf.len())?;

        let mut rest = buf;
        let mut blocks = Vec::with_capacity(self.parts.len());
        for part in &self.parts {
            let (block, tail) = std::mem::take(&mut rest).split_at_mut(part.len);
            blocks.push(block);
            rest = tail;
        }

        Ok(blocks)
    }

    fn check_len(&self, got: usize) -> Result<()> {
        let expected = self.total_len();
        if got != expected {
            return Err(NodeErr::BufferLengthMismatch { got, expected });
        }

        Ok(())
    }
}

/// Rejects images that can't be partitioned by rows.
///
/// Only the coordinator knows the real dimensions before they are broadcast,
/// so only it calls this.
pub fn check_dimensions(dims: Dimensions) -> Result<()> {
    if dims.cols == 0 {
        return Err(NodeErr::InvalidDimensions {
            rows: dims.rows,
            cols: dims.cols,
        });
    }

    Ok(())
}
