use std::{env, num::NonZeroUsize, path::PathBuf};

use crate::{NodeErr, Result};

/// Image decoded at the coordinator.
pub const INPUT_PATH: &str = "input.jpg";
/// Where the coordinator writes the binary edge map.
pub const OUTPUT_PATH: &str = "edges_final.jpg";
/// Gradient magnitudes above this value are edges.
pub const THRESHOLD: u8 = 100;

pub const DEFAULT_COORDINATOR_ADDR: &str = "127.0.0.1:7070";
pub const DEFAULT_WORLD_SIZE: usize = 1;

/// What the pipeline reads, writes and how it binarizes.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub threshold: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(INPUT_PATH),
            output: PathBuf::from(OUTPUT_PATH),
            threshold: THRESHOLD,
        }
    }
}

/// How this process takes part in the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    /// Every participant runs inside this process, linked by in memory pipes.
    Local,
    /// This process is a single participant linked to the others over TCP.
    Process { rank: usize, coordinator_addr: String },
}

/// Process placement, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    world_size: NonZeroUsize,
    launch: Launch,
}

impl NodeConfig {
    /// Reads `WORLD_SIZE`, `RANK` and `COORDINATOR_ADDR`.
    ///
    /// # Errors
    /// `NodeErr::Config` on malformed or out of range values.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` but reading the variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let world_size = match lookup("WORLD_SIZE") {
            Some(value) => parse::<usize>("WORLD_SIZE", &value)?,
            None => DEFAULT_WORLD_SIZE,
        };
        let world_size = NonZeroUsize::new(world_size)
            .ok_or_else(|| NodeErr::Config("WORLD_SIZE must be at least 1".into()))?;

        let launch = match lookup("RANK") {
            None => Launch::Local,
            Some(value) => {
                let rank = parse::<usize>("RANK", &value)?;
                if rank >= world_size.get() {
                    return Err(NodeErr::InvalidRank {
                        rank,
                        size: world_size.get(),
                    });
                }

                let coordinator_addr = lookup("COORDINATOR_ADDR")
                    .unwrap_or_else(|| DEFAULT_COORDINATOR_ADDR.to_string());
                Launch::Process {
                    rank,
                    coordinator_addr,
                }
            }
        };

        Ok(Self { world_size, launch })
    }

    pub fn world_size(&self) -> NonZeroUsize {
        self.world_size
    }

    pub fn launch(&self) -> &Launch {
        &self.launch
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| NodeErr::Config(format!("{key} must be a non negative integer, got {value:?}")))
}
