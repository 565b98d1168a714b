use std::{
    error::Error,
    fmt::{self, Display},
    path::PathBuf,
};

use image::ImageError;

/// The result type used in the entire imaging module.
pub type Result<T> = std::result::Result<T, ImagingErr>;

/// The imaging module's error type.
#[derive(Debug)]
pub enum ImagingErr {
    Decode {
        path: PathBuf,
        source: ImageError,
    },
    Encode {
        path: PathBuf,
        source: ImageError,
    },
    LengthMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    Oversized {
        rows: usize,
        cols: usize,
    },
}

impl Display for ImagingErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImagingErr::Decode { path, source } => {
                write!(f, "failed to load image {}: {source}", path.display())
            }
            ImagingErr::Encode { path, source } => {
                write!(f, "failed to write image {}: {source}", path.display())
            }
            ImagingErr::LengthMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "{what} has {got} samples, expected {expected} (rows * cols)"
            ),
            ImagingErr::Oversized { rows, cols } => {
                write!(f, "a {rows}x{cols} grid doesn't fit an image file")
            }
        }
    }
}

impl Error for ImagingErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ImagingErr::Decode { source, .. } | ImagingErr::Encode { source, .. } => Some(source),
            _ => None,
        }
    }
}
