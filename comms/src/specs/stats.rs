use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A participant's local measurements, sent to the coordinator for reduction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageStats {
    /// Elapsed time of the edge detection stage.
    pub compute: Duration,
    /// Elapsed time of the thresholding stage.
    pub postprocess: Duration,
    /// Amount of samples that passed the threshold.
    pub edge_pixels: u64,
}
