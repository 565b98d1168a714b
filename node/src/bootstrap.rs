//! Wiring participants together, over TCP or inside a single process.

use std::{io, num::NonZeroUsize, time::Duration};

use comms::msg::{Command, Msg};
use log::{debug, info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{
        TcpListener, TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    task::JoinSet,
    time,
};

use crate::{
    NodeErr, Result,
    collective::{COORDINATOR, Communicator, Link, local_world},
    config::PipelineConfig,
    pipeline,
    timeline::Report,
};

/// The TCP world's communicator type.
pub type NetCommunicator = Communicator<OwnedReadHalf, OwnedWriteHalf>;

type NetLink = Link<OwnedReadHalf, OwnedWriteHalf>;

const CONNECT_ATTEMPTS: usize = 50;
const CONNECT_BACKOFF: Duration = Duration::from_millis(100);
const LOCAL_PIPE_SIZE: usize = 64 * 1024;

/// Accepts every peer of the world on `listener` and orders them by rank.
///
/// # Errors
/// `NodeErr::InvalidRank` or `NodeErr::DuplicateRank` if a peer announces a
/// rank that doesn't fit the world.
pub async fn accept_peers(listener: &TcpListener, size: NonZeroUsize) -> Result<NetCommunicator> {
    let npeers = size.get() - 1;
    let mut slots: Vec<Option<NetLink>> = (0..npeers).map(|_| None).collect();

    for _ in 0..npeers {
        let (stream, addr) = listener.accept().await?;
        let (rx, tx) = stream.into_split();
        let (rx, tx) = comms::channel(rx, tx);
        let mut link = Link::new(rx, tx);

        let rank = expect_join(&mut link, size).await?;
        let slot = &mut slots[rank - 1];
        if slot.is_some() {
            return Err(NodeErr::DuplicateRank { rank });
        }

        *slot = Some(link);
        info!("rank {rank} joined from {addr}");
    }

    let peers = slots.into_iter().flatten().collect();
    Ok(Communicator::coordinator(peers))
}

/// Waits for a peer to announce its rank.
///
/// # Returns
/// The announced rank, always between 1 and `size - 1`.
pub async fn expect_join<R, W>(link: &mut Link<R, W>, size: NonZeroUsize) -> Result<usize>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        match link.recv().await? {
            Msg::Control(Command::Join { rank }) if rank != COORDINATOR && rank < size.get() => {
                return Ok(rank);
            }
            Msg::Control(Command::Join { rank }) => {
                return Err(NodeErr::InvalidRank {
                    rank,
                    size: size.get(),
                });
            }
            msg => warn!("expected Join, got {}", msg.kind()),
        }
    }
}

/// Connects to the coordinator and announces this peer's rank.
pub async fn join(addr: &str, rank: usize, size: NonZeroUsize) -> Result<NetCommunicator> {
    let stream = connect(addr).await?;
    let (rx, tx) = stream.into_split();
    let (rx, tx) = comms::channel(rx, tx);
    let mut root = Link::new(rx, tx);

    root.send(&Msg::Control(Command::Join { rank })).await?;
    info!("rank {rank} joined coordinator at {addr}");

    Ok(Communicator::peer(rank, size, root))
}

/// Peers may start before the coordinator listens, so connecting is retried.
async fn connect(addr: &str) -> io::Result<TcpStream> {
    let mut attempt = 1;

    loop {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) if attempt < CONNECT_ATTEMPTS => {
                debug!(attempt = attempt; "coordinator at {addr} not reachable yet: {e}");
                attempt += 1;
                time::sleep(CONNECT_BACKOFF).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Runs this process as the participant `rank` of a TCP world.
///
/// # Returns
/// The report at the coordinator, `None` at the peers.
pub async fn run_process(
    rank: usize,
    coordinator_addr: &str,
    size: NonZeroUsize,
    config: &PipelineConfig,
) -> Result<Option<Report>> {
    let mut comm = if rank == COORDINATOR {
        let listener = TcpListener::bind(coordinator_addr).await?;
        info!("listening at {coordinator_addr}, waiting for {} peer(s)", size.get() - 1);
        accept_peers(&listener, size).await?
    } else {
        join(coordinator_addr, rank, size).await?
    };

    pipeline::run(&mut comm, config).await
}

/// Runs every participant of the world in this process, each in its own task.
///
/// # Returns
/// The coordinator's report, or the coordinator's error if it failed and
/// otherwise the first peer error.
pub async fn run_local(size: NonZeroUsize, config: &PipelineConfig) -> Result<Option<Report>> {
    let mut tasks = JoinSet::new();

    for mut comm in local_world(size, LOCAL_PIPE_SIZE) {
        let config = config.clone();
        tasks.spawn(async move {
            let rank = comm.rank();
            (rank, pipeline::run(&mut comm, &config).await)
        });
    }

    let mut report = None;
    let mut failure = None;

    while let Some(joined) = tasks.join_next().await {
        let (rank, res) = joined.map_err(io::Error::other)?;

        match res {
            Ok(Some(r)) => report = Some(r),
            Ok(None) => {}
            Err(e) => {
                warn!("rank {rank} failed: {e}");
                if rank == COORDINATOR || failure.is_none() {
                    failure = Some(e);
                }
            }
        }
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(report),
    }
}
