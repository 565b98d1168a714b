use std::{error::Error, fmt, io};

use imaging::ImagingErr;

/// The node module's result type.
pub type Result<T> = std::result::Result<T, NodeErr>;

/// Participant runtime failures.
#[derive(Debug)]
pub enum NodeErr {
    Io(io::Error),
    /// The source image couldn't be loaded, aborts the whole pipeline.
    InputUnavailable(ImagingErr),
    /// The assembled image couldn't be written.
    Output(ImagingErr),
    Imaging(ImagingErr),
    Config(String),
    InvalidDimensions {
        rows: usize,
        cols: usize,
    },
    /// Another participant aborted the pipeline.
    Aborted(String),
    UnexpectedMessage {
        op: &'static str,
        got: &'static str,
    },
    BlockLengthMismatch {
        rank: usize,
        got: usize,
        expected: usize,
    },
    BufferLengthMismatch {
        got: usize,
        expected: usize,
    },
    MissingRootBuffer {
        op: &'static str,
    },
    InvalidRank {
        rank: usize,
        size: usize,
    },
    DuplicateRank {
        rank: usize,
    },
}

impl fmt::Display for NodeErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeErr::Io(e) => write!(f, "io error: {e}"),
            NodeErr::InputUnavailable(e) => write!(f, "input unavailable: {e}"),
            NodeErr::Output(e) => write!(f, "failed to persist the result: {e}"),
            NodeErr::Imaging(e) => write!(f, "imaging error: {e}"),
            NodeErr::Config(detail) => write!(f, "invalid configuration: {detail}"),
            NodeErr::InvalidDimensions { rows, cols } => {
                write!(f, "invalid image dimensions {rows}x{cols}, columns must be positive")
            }
            NodeErr::Aborted(detail) => write!(f, "pipeline aborted: {detail}"),
            NodeErr::UnexpectedMessage { op, got } => {
                write!(f, "unexpected message during {op}: got {got}")
            }
            NodeErr::BlockLengthMismatch {
                rank,
                got,
                expected,
            } => write!(
                f,
                "block length mismatch for rank {rank}: got {got}, expected {expected}"
            ),
            NodeErr::BufferLengthMismatch { got, expected } => write!(
                f,
                "buffer length mismatch: got {got}, the partition plan covers {expected}"
            ),
            NodeErr::MissingRootBuffer { op } => {
                write!(f, "the coordinator must provide a buffer for {op}")
            }
            NodeErr::InvalidRank { rank, size } => {
                write!(f, "rank {rank} is out of range for a world of {size}")
            }
            NodeErr::DuplicateRank { rank } => write!(f, "rank {rank} joined twice"),
        }
    }
}

impl Error for NodeErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NodeErr::Io(e) => Some(e),
            NodeErr::InputUnavailable(e) | NodeErr::Output(e) | NodeErr::Imaging(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for NodeErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ImagingErr> for NodeErr {
    fn from(value: ImagingErr) -> Self {
        Self::Imaging(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<NodeErr> for io::Error {
    fn from(value: NodeErr) -> Self {
        match value {
            NodeErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
