pub mod error;
pub mod grayscale;
pub mod grid;
pub mod io;
pub mod kernel;
pub mod threshold;

pub use error::{ImagingErr, Result};
pub use grid::{Block, Grid};
