use std::io;

use log::info;

use node::{
    bootstrap,
    config::{Launch, NodeConfig, PipelineConfig},
};

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let node = NodeConfig::from_env()?;
    let pipeline = PipelineConfig::default();
    let size = node.world_size();

    let report = match node.launch() {
        Launch::Local => {
            info!("running {size} participant(s) in process");
            bootstrap::run_local(size, &pipeline).await?
        }
        Launch::Process {
            rank,
            coordinator_addr,
        } => bootstrap::run_process(*rank, coordinator_addr, size, &pipeline).await?,
    };

    if let Some(report) = report {
        println!("{report}");
    }

    Ok(())
}
