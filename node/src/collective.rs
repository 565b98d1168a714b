//! Rooted collective operations between participants.
//!
//! The topology is a star: the coordinator (rank 0) keeps one link per peer,
//! every peer keeps a single link to the coordinator. Every operation is
//! collective, all participants must call it in the same order or the
//! pipeline blocks forever.

use std::{io, num::NonZeroUsize};

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg, Payload},
    specs::{image::Dimensions, stats::StageStats},
};
use futures::future;
use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadHalf, WriteHalf};

use crate::{NodeErr, Result, partition::PartitionPlan, timeline};

/// The starting size of the receiver buffer.
const STARTING_RX_BUF_SIZE: usize = 1028;

/// The rank of the participant every collective is rooted at.
pub const COORDINATOR: usize = 0;

/// A bidirectional channel to another participant.
pub struct Link<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    rx: OnoReceiver<R>,
    tx: OnoSender<W>,
    rx_buf: Vec<u8>,
}

impl<R, W> Link<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a new `Link`.
    ///
    /// # Arguments
    /// * `rx` - The receiving end of the communication.
    /// * `tx` - The sending end of the communication.
    pub fn new(rx: OnoReceiver<R>, tx: OnoSender<W>) -> Self {
        Self {
            rx,
            tx,
            rx_buf: Vec::with_capacity(STARTING_RX_BUF_SIZE),
        }
    }

    pub async fn send(&mut self, msg: &Msg<'_>) -> io::Result<()> {
        self.tx.send(msg).await
    }

    pub async fn recv(&mut self) -> io::Result<Msg<'_>> {
        self.rx.recv_into(&mut self.rx_buf).await
    }
}

enum Role<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// `peers[i]` talks to rank `i + 1`.
    Coordinator { peers: Vec<Link<R, W>> },
    Peer { root: Link<R, W> },
}

/// A participant's handle on the collective operations.
pub struct Communicator<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    rank: usize,
    size: NonZeroUsize,
    role: Role<R, W>,
}

impl<R, W> Communicator<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates the coordinator's communicator.
    ///
    /// # Arguments
    /// * `peers` - One link per peer, ordered by rank starting at rank 1.
    pub fn coordinator(peers: Vec<Link<R, W>>) -> Self {
        Self {
            rank: COORDINATOR,
            size: NonZeroUsize::MIN.saturating_add(peers.len()),
            role: Role::Coordinator { peers },
        }
    }

    /// Creates a peer's communicator.
    ///
    /// # Arguments
    /// * `rank` - This peer's rank, between 1 and `size - 1`.
    /// * `size` - The world size.
    /// * `root` - The link to the coordinator.
    pub fn peer(rank: usize, size: NonZeroUsize, root: Link<R, W>) -> Self {
        Self {
            rank,
            size,
            role: Role::Peer { root },
        }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> NonZeroUsize {
        self.size
    }

    pub fn is_coordinator(&self) -> bool {
        matches!(self.role, Role::Coordinator { .. })
    }

    /// Shares the image dimensions held by the coordinator with every peer.
    ///
    /// # Arguments
    /// * `dims` - The dimensions at the coordinator, ignored at the peers.
    ///
    /// # Returns
    /// The coordinator's dimensions, at every participant.
    pub async fn broadcast_dims(&mut self, dims: Option<Dimensions>) -> Result<Dimensions> {
        match &mut self.role {
            Role::Coordinator { peers } => {
                let dims = dims.ok_or(NodeErr::MissingRootBuffer { op: "broadcast" })?;
                let msg = Msg::Control(Command::Dimensions(dims));

                let futs = peers.iter_mut().map(|link| link.send(&msg));
                future::try_join_all(futs).await?;

                debug!(rows = dims.rows, cols = dims.cols; "broadcast dimensions");
                Ok(dims)
            }
            Role::Peer { root } => match root.recv().await? {
                Msg::Control(Command::Dimensions(dims)) => Ok(dims),
                other => Err(unexpected("broadcast", &other)),
            },
        }
    }

    /// Blocks until every participant reached the barrier.
    pub async fn barrier(&mut self) -> Result<()> {
        match &mut self.role {
            Role::Coordinator { peers } => {
                let futs = peers.iter_mut().map(|link| async move {
                    match link.recv().await? {
                        Msg::Control(Command::Barrier) => Ok(()),
                        other => Err(unexpected("barrier", &other)),
                    }
                });
                future::try_join_all(futs).await?;

                let msg = Msg::Control(Command::Release);
                let futs = peers.iter_mut().map(|link| link.send(&msg));
                future::try_join_all(futs).await?;
            }
            Role::Peer { root } => {
                root.send(&Msg::Control(Command::Barrier)).await?;
                match root.recv().await? {
                    Msg::Control(Command::Release) => {}
                    other => return Err(unexpected("barrier", &other)),
                }
            }
        }

        Ok(())
    }

    /// Distributes the coordinator's full image, one block per participant.
    ///
    /// # Arguments
    /// * `source` - The full image at the coordinator, ignored at the peers.
    /// * `plan` - The partition plan, identical at every participant.
    /// * `local` - Where this participant's block is written to.
    pub async fn scatter(
        &mut self,
        source: Option<&[u8]>,
        plan: &PartitionPlan,
        local: &mut [u8],
    ) -> Result<()> {
        let rank = self.rank;

        match &mut self.role {
            Role::Coordinator { peers } => {
                let source = source.ok_or(NodeErr::MissingRootBuffer { op: "scatter" })?;
                let blocks = plan.split(source)?;

                copy_block(COORDINATOR, blocks[COORDINATOR], local)?;

                let futs = peers
                    .iter_mut()
                    .zip(&blocks[COORDINATOR + 1..])
                    .map(|(link, block)| async move {
                        let msg = Msg::Data(Payload::Source(block));
                        link.send(&msg).await
                    });
                future::try_join_all(futs).await?;

                debug!(participants = plan.len(); "scattered image");
            }
            Role::Peer { root } => match root.recv().await? {
                Msg::Data(Payload::Source(block)) => {
                    copy_block(rank, block, local)?;
                    debug!(rank = rank, len = block.len(); "received block");
                }
                other => return Err(unexpected("scatter", &other)),
            },
        }

        Ok(())
    }

    /// Assembles every participant's block into the coordinator's full image.
    ///
    /// The coordinator only returns once every block arrived with the exact
    /// length the plan expects for its rank.
    ///
    /// # Arguments
    /// * `local` - This participant's output block.
    /// * `plan` - The partition plan, identical at every participant.
    /// * `dest` - The full image at the coordinator, ignored at the peers.
    pub async fn gather(
        &mut self,
        local: &[u8],
        plan: &PartitionPlan,
        dest: Option<&mut [u8]>,
    ) -> Result<()> {
        match &mut self.role {
            Role::Coordinator { peers } => {
                let dest = dest.ok_or(NodeErr::MissingRootBuffer { op: "gather" })?;
                let mut slots = plan.split_mut(dest)?.into_iter();

                if let Some(own) = slots.next() {
                    copy_block(COORDINATOR, local, own)?;
                }

                let futs = peers
                    .iter_mut()
                    .zip(slots)
                    .enumerate()
                    .map(|(i, (link, slot))| async move {
                        let rank = i + 1;
                        match link.recv().await? {
                            Msg::Data(Payload::Output(block)) => copy_block(rank, block, slot),
                            other => Err(unexpected("gather", &other)),
                        }
                    });
                future::try_join_all(futs).await?;

                debug!(participants = plan.len(); "gathered image");
            }
            Role::Peer { root } => {
                root.send(&Msg::Data(Payload::Output(local))).await?;
            }
        }

        Ok(())
    }

    /// Reduces every participant's stats into the coordinator.
    ///
    /// # Returns
    /// `Some` with the reduced stats at the coordinator, `None` at the peers.
    pub async fn reduce_stats(&mut self, local: StageStats) -> Result<Option<StageStats>> {
        match &mut self.role {
            Role::Coordinator { peers } => {
                let futs = peers.iter_mut().map(|link| async move {
                    match link.recv().await? {
                        Msg::Control(Command::ReportStats(stats)) => Ok(stats),
                        other => Err(unexpected("reduce", &other)),
                    }
                });
                let remote = future::try_join_all(futs).await?;

                let reduced = timeline::reduce(std::iter::once(local).chain(remote));
                Ok(Some(reduced))
            }
            Role::Peer { root } => {
                root.send(&Msg::Control(Command::ReportStats(local)))
                    .await?;
                Ok(None)
            }
        }
    }

    /// Ends the session once the coordinator is done with the results.
    ///
    /// Peers wait here, so a coordinator failure after the gather still
    /// reaches them as `NodeErr::Aborted`.
    pub async fn disconnect(&mut self) -> Result<()> {
        match &mut self.role {
            Role::Coordinator { peers } => {
                let msg = Msg::Control(Command::Disconnect);
                let futs = peers.iter_mut().map(|link| link.send(&msg));
                future::try_join_all(futs).await?;
            }
            Role::Peer { root } => match root.recv().await? {
                Msg::Control(Command::Disconnect) => {}
                other => return Err(unexpected("disconnect", &other)),
            },
        }

        Ok(())
    }

    /// Tells the other side(s) that this participant gave up.
    ///
    /// The coordinator notifies every peer, a peer notifies the coordinator.
    /// Whoever receives the notice fails its pending collective with
    /// `NodeErr::Aborted`. Delivery is best effort.
    pub async fn abort(&mut self, reason: &str) {
        let msg = Msg::Err(reason.into());
        let rank = self.rank;

        let links: Vec<&mut Link<R, W>> = match &mut self.role {
            Role::Coordinator { peers } => peers.iter_mut().collect(),
            Role::Peer { root } => vec![root],
        };

        let futs = links.into_iter().map(|link| link.send(&msg));
        for res in future::join_all(futs).await {
            if let Err(e) = res {
                warn!("rank {rank} failed to deliver abort: {e}");
            }
        }
    }
}

/// The in memory world's communicator type.
pub type LocalCommunicator = Communicator<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

/// Builds a world of `size` participants connected through in memory pipes.
///
/// Participants share nothing but the pipes, so each can be moved into its own task.
///
/// # Arguments
/// * `size` - The world size.
/// * `pipe_size` - The buffer size of every pipe, in bytes.
///
/// # Returns
/// One communicator per rank, ordered by rank.
pub fn local_world(size: NonZeroUsize, pipe_size: usize) -> Vec<LocalCommunicator> {
    let mut peers = Vec::with_capacity(size.get() - 1);
    let mut world = Vec::with_capacity(size.get());

    for rank in 1..size.get() {
        let (coord_end, peer_end) = tokio::io::duplex(pipe_size);

        let (rx, tx) = tokio::io::split(coord_end);
        let (rx, tx) = comms::channel(rx, tx);
        peers.push(Link::new(rx, tx));

        let (rx, tx) = tokio::io::split(peer_end);
        let (rx, tx) = comms::channel(rx, tx);
        world.push(Communicator::peer(rank, size, Link::new(rx, tx)));
    }

    world.insert(COORDINATOR, Communicator::coordinator(peers));
    world
}

fn copy_block(rank: usize, src: &[u8], dst: &mut [u8]) -> Result<()> {
    if src.len() != dst.len() {
        return Err(NodeErr::BlockLengthMismatch {
            rank,
            got: src.len(),
            expected: dst.len(),
        });
    }

    dst.copy_from_slice(src);
    Ok(())
}

fn unexpected(op: &'static str, msg: &Msg<'_>) -> NodeErr {
    match msg {
        Msg::Err(detail) => NodeErr::Aborted(detail.to_string()),
        other => NodeErr::UnexpectedMessage {
            op,
            got: other.kind(),
        },
    }
}
