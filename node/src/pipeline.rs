//! The distributed grayscale, edge and threshold pipeline.

use std::io;

use comms::specs::{image::Dimensions, stats::StageStats};
use imaging::{Block, Grid, kernel, threshold};
use log::{info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    task,
};

use crate::{
    NodeErr, Result,
    collective::Communicator,
    config::PipelineConfig,
    partition::{self, PartitionPlan},
    timeline::{Report, Stopwatch},
};

/// Runs the whole pipeline as one participant.
///
/// Must be called by every participant of the world. The coordinator loads
/// the input, the block work is shared by everyone and the coordinator
/// writes the assembled result.
///
/// On failure the other participants are told to abort, so a missing input
/// fails the entire world rather than only the coordinator.
///
/// # Returns
/// The report at the coordinator, `None` at the peers.
pub async fn run<R, W>(
    comm: &mut Communicator<R, W>,
    config: &PipelineConfig,
) -> Result<Option<Report>>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match execute(comm, config).await {
        Ok(report) => Ok(report),
        Err(e) => {
            let notify = comm.is_coordinator() || !matches!(e, NodeErr::Aborted(_));
            if notify {
                warn!("rank {} aborting: {e}", comm.rank());
                comm.abort(&e.to_string()).await;
            }

            Err(e)
        }
    }
}

async fn execute<R, W>(
    comm: &mut Communicator<R, W>,
    config: &PipelineConfig,
) -> Result<Option<Report>>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let total = Stopwatch::start();

    let mut preprocess = None;
    let source = if comm.is_coordinator() {
        let watch = Stopwatch::start();
        let input = config.input.clone();
        let grid = task::spawn_blocking(move || imaging::io::load_grayscale(input))
            .await
            .map_err(io::Error::other)?
            .map_err(NodeErr::InputUnavailable)?;
        preprocess = Some(watch.elapsed());

        info!(
            rows = grid.rows(),
            cols = grid.cols();
            "loaded {}", config.input.display()
        );
        Some(grid)
    } else {
        None
    };

    let cutoff = config.threshold;
    let (result, local) = map_blocks(comm, source.as_ref(), move |block, out| {
        process_block(block, out, cutoff)
    })
    .await?;

    let total = total.elapsed();
    let reduced = comm.reduce_stats(local).await?;

    let report = match (result, reduced, preprocess) {
        (Some(result), Some(reduced), Some(preprocess)) => {
            let output = config.output.clone();
            task::spawn_blocking(move || imaging::io::save(&result, output))
                .await
                .map_err(io::Error::other)?
                .map_err(NodeErr::Output)?;
            info!("wrote {}", config.output.display());

            let participants = comm.size().get();
            Some(Report::new(participants, preprocess, total, reduced))
        }
        _ => None,
    };

    comm.disconnect().await?;
    Ok(report)
}

/// Distributes `source` by rows, runs `stage` on every block and gathers the
/// outputs back into the coordinator.
///
/// `stage` runs on the blocking pool, the block buffers are moved in and back.
///
/// Each participant derives the partition plan from the broadcast dimensions
/// and uses that same plan for both the scatter and the gather.
///
/// # Arguments
/// * `source` - The full image at the coordinator, ignored at the peers.
/// * `stage` - The work done on the local block, writing into a same sized output.
///
/// # Returns
/// The assembled output at the coordinator (`None` at the peers) together
/// with this participant's stats as returned by `stage`.
pub async fn map_blocks<R, W, F>(
    comm: &mut Communicator<R, W>,
    source: Option<&Grid>,
    stage: F,
) -> Result<(Option<Grid>, StageStats)>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    F: FnOnce(Block<'_>, &mut [u8]) -> Result<StageStats> + Send + 'static,
{
    let dims = match source {
        Some(grid) if comm.is_coordinator() => {
            let dims = Dimensions {
                rows: grid.rows(),
                cols: grid.cols(),
            };
            partition::check_dimensions(dims)?;
            Some(dims)
        }
        _ => None,
    };

    let dims = comm.broadcast_dims(dims).await?;
    let plan = PartitionPlan::new(dims, comm.size());
    let part = plan.part(comm.rank());

    let mut local = vec![0; part.len];

    comm.scatter(source.map(Grid::samples), &plan, &mut local)
        .await?;
    comm.barrier().await?;

    let (rows, cols) = (part.rows, plan.cols());
    let (output, stats) = task::spawn_blocking(move || {
        let mut output = vec![0; local.len()];
        let block = Block::new(&local, rows, cols)?;
        let stats = stage(block, &mut output)?;
        Ok::<_, NodeErr>((output, stats))
    })
    .await
    .map_err(io::Error::other)??;

    let mut result = comm.is_coordinator().then(|| Grid::new(dims.rows, cols));
    let dest = result.as_mut().map(Grid::samples_mut);
    comm.gather(&output, &plan, dest).await?;

    Ok((result, stats))
}

/// Edge detection followed by thresholding on a single block, timing each stage.
pub fn process_block(block: Block<'_>, out: &mut [u8], cutoff: u8) -> Result<StageStats> {
    let watch = Stopwatch::start();
    kernel::gradient_magnitude(block, out)?;
    let compute = watch.elapsed();

    let watch = Stopwatch::start();
    let edge_pixels = threshold::binarize(out, cutoff);
    let postprocess = watch.elapsed();

    Ok(StageStats {
        compute,
        postprocess,
        edge_pixels,
    })
}
