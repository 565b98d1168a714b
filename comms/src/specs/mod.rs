//! Wire-level types exchanged inside control commands.

pub mod image;
pub mod stats;
