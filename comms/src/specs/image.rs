use serde::{Deserialize, Serialize};

/// The shape of the source image, broadcast by the coordinator so every
/// participant can derive the same partition plan on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub rows: usize,
    pub cols: usize,
}

impl Dimensions {
    /// Total amount of samples in the image.
    pub fn pixels(&self) -> usize {
        self.rows * self.cols
    }
}
