//! Stage timing and its cross participant reduction.
//!
//! Participants run concurrently, so a stage lasts as long as its slowest
//! participant: durations are reduced with `max`, counts with `+`.

use std::{
    fmt,
    time::{Duration, Instant},
};

use comms::specs::stats::StageStats;

/// Monotonic stopwatch started on creation.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// An associative and commutative reduction with an identity element.
pub trait Combine: Sized {
    fn identity() -> Self;

    fn combine(self, other: Self) -> Self;
}

impl Combine for StageStats {
    fn identity() -> Self {
        Self::default()
    }

    fn combine(self, other: Self) -> Self {
        Self {
            compute: self.compute.max(other.compute),
            postprocess: self.postprocess.max(other.postprocess),
            edge_pixels: self.edge_pixels + other.edge_pixels,
        }
    }
}

/// Folds every item into a single value, the order of `items` is irrelevant.
pub fn reduce<T, I>(items: I) -> T
where
    T: Combine,
    I: IntoIterator<Item = T>,
{
    items.into_iter().fold(T::identity(), T::combine)
}

/// Pipeline wide timings, only known at the coordinator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalTiming {
    /// Load and grayscale conversion at the coordinator.
    pub preprocess: Duration,
    /// Slowest participant's edge detection.
    pub compute: Duration,
    /// Slowest participant's thresholding.
    pub postprocess: Duration,
    /// From pipeline start until the gather completed.
    pub total: Duration,
}

impl GlobalTiming {
    /// Time not accounted for by the measured stages, in milliseconds.
    ///
    /// This is a residual rather than a measurement. It approximates the cost
    /// of scatter, gather and barriers and may come out negative under clock
    /// noise.
    pub fn overhead_ms(&self) -> f64 {
        ms(self.total) - (ms(self.preprocess) + ms(self.compute) + ms(self.postprocess))
    }
}

/// The coordinator's final summary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub participants: usize,
    pub timing: GlobalTiming,
    pub edge_pixels: u64,
}

impl Report {
    /// Builds the report out of the coordinator's own measurements and the reduced stats.
    pub fn new(
        participants: usize,
        preprocess: Duration,
        total: Duration,
        reduced: StageStats,
    ) -> Self {
        Self {
            participants,
            timing: GlobalTiming {
                preprocess,
                compute: reduced.compute,
                postprocess: reduced.postprocess,
                total,
            },
            edge_pixels: reduced.edge_pixels,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.timing;

        writeln!(f, "--- distributed edge pipeline ---")?;
        writeln!(f, "participants       : {}", self.participants)?;
        writeln!(f, "preprocess         : {:.3} ms", ms(t.preprocess))?;
        writeln!(f, "compute (max)      : {:.3} ms", ms(t.compute))?;
        writeln!(f, "postprocess (max)  : {:.3} ms", ms(t.postprocess))?;
        writeln!(f, "---------------------------------")?;
        writeln!(f, "total              : {:.3} ms", ms(t.total))?;
        writeln!(f, "comm. overhead     : {:.3} ms (approximate)", t.overhead_ms())?;
        write!(f, "edge pixels        : {}", self.edge_pixels)
    }
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
