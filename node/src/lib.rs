pub mod bootstrap;
pub mod collective;
pub mod config;
pub mod error;
pub mod partition;
pub mod pipeline;
pub mod timeline;

pub use collective::{Communicator, Link};
pub use error::{NodeErr, Result};
pub use partition::PartitionPlan;
