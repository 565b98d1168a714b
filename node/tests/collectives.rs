use std::{num::NonZeroUsize, time::Duration};

use comms::specs::{image::Dimensions, stats::StageStats};
use futures::future;
use node::{
    NodeErr, PartitionPlan,
    collective::{LocalCommunicator, local_world},
};

/// Small pipes so that blocks never fit a single write.
const PIPE_SIZE: usize = 256;

fn world(n: usize) -> Vec<LocalCommunicator> {
    local_world(NonZeroUsize::new(n).unwrap(), PIPE_SIZE)
}

fn ramp(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}

#[tokio::test]
async fn world_ranks_are_ordered() {
    let world = world(4);

    assert!(world[0].is_coordinator());
    for (rank, comm) in world.iter().enumerate() {
        assert_eq!(comm.rank(), rank);
        assert_eq!(comm.size().get(), 4);
    }
}

#[tokio::test]
async fn scatter_then_gather_is_identity() {
    let dims = Dimensions { rows: 37, cols: 11 };
    let source = ramp(dims.pixels());

    for n in 1..=6 {
        let futs = world(n).into_iter().map(|mut comm| {
            let source = &source;
            async move {
                let root = comm.is_coordinator();
                let dims = comm.broadcast_dims(root.then_some(dims)).await?;
                let plan = PartitionPlan::new(dims, comm.size());
                let part = plan.part(comm.rank());

                let mut local = vec![0; part.len];
                let src = root.then_some(source.as_slice());
                comm.scatter(src, &plan, &mut local).await?;
                assert_eq!(local, source[part.offset..part.offset + part.len]);

                let mut dest = root.then(|| vec![0; dims.pixels()]);
                comm.gather(&local, &plan, dest.as_deref_mut()).await?;
                Ok::<_, NodeErr>(dest)
            }
        });

        let results = future::try_join_all(futs).await.unwrap();
        assert_eq!(results[0].as_deref(), Some(source.as_slice()), "n = {n}");
        assert!(results[1..].iter().all(Option::is_none));
    }
}

#[tokio::test]
async fn gathered_blocks_land_at_their_offsets() {
    let dims = Dimensions { rows: 5, cols: 2 };
    let plan = PartitionPlan::new(dims, NonZeroUsize::new(3).unwrap());

    let futs = world(3).into_iter().map(|mut comm| {
        let plan = &plan;
        async move {
            let part = plan.part(comm.rank());
            let local = vec![comm.rank() as u8 + 1; part.len];

            let mut dest = comm.is_coordinator().then(|| vec![0; dims.pixels()]);
            comm.gather(&local, plan, dest.as_deref_mut()).await?;
            Ok::<_, NodeErr>(dest)
        }
    });

    let results = future::try_join_all(futs).await.unwrap();
    assert_eq!(results[0].as_deref(), Some(&[1, 1, 1, 1, 2, 2, 2, 2, 3, 3][..]));
}

#[tokio::test]
async fn gather_rejects_a_short_block() {
    let dims = Dimensions { rows: 4, cols: 3 };
    let plan = PartitionPlan::new(dims, NonZeroUsize::new(2).unwrap());

    let mut world = world(2);
    let mut peer = world.pop().unwrap();
    let mut root = world.pop().unwrap();

    let mut dest = vec![0; dims.pixels()];
    let (root_res, peer_res) = tokio::join!(
        root.gather(&[1; 6], &plan, Some(dest.as_mut_slice())),
        peer.gather(&[2; 5], &plan, None),
    );

    peer_res.unwrap();
    assert!(matches!(
        root_res,
        Err(NodeErr::BlockLengthMismatch {
            rank: 1,
            got: 5,
            expected: 6
        })
    ));
}

#[tokio::test]
async fn root_must_provide_its_buffers() {
    let mut world = world(1);
    let root = &mut world[0];
    let plan = PartitionPlan::new(Dimensions { rows: 1, cols: 1 }, root.size());

    assert!(matches!(
        root.broadcast_dims(None).await,
        Err(NodeErr::MissingRootBuffer { op: "broadcast" })
    ));
    assert!(matches!(
        root.scatter(None, &plan, &mut [0]).await,
        Err(NodeErr::MissingRootBuffer { op: "scatter" })
    ));
    assert!(matches!(
        root.gather(&[0], &plan, None).await,
        Err(NodeErr::MissingRootBuffer { op: "gather" })
    ));
}

#[tokio::test]
async fn coordinator_abort_reaches_every_peer() {
    let mut world = world(4);
    let mut root = world.remove(0);

    let peers = world
        .into_iter()
        .map(|mut comm| async move { comm.broadcast_dims(None).await });

    let (_, results) = tokio::join!(
        root.abort("input unavailable"),
        future::join_all(peers)
    );

    assert_eq!(results.len(), 3);
    for res in results {
        assert!(matches!(res, Err(NodeErr::Aborted(detail)) if detail == "input unavailable"));
    }
}

#[tokio::test]
async fn peer_abort_fails_the_coordinator() {
    let mut world = world(2);
    let mut peer = world.pop().unwrap();
    let mut root = world.pop().unwrap();

    let (root_res, _) = tokio::join!(root.barrier(), peer.abort("worker gave up"));

    assert!(matches!(root_res, Err(NodeErr::Aborted(detail)) if detail == "worker gave up"));
}

#[tokio::test]
async fn barrier_releases_everyone() {
    let futs = world(5)
        .into_iter()
        .map(|mut comm| async move { comm.barrier().await });

    future::try_join_all(futs).await.unwrap();
}

#[tokio::test]
async fn reduction_keeps_the_slowest_stage_and_sums_counts() {
    let futs = world(4).into_iter().map(|mut comm| async move {
        let rank = comm.rank() as u64;
        let local = StageStats {
            compute: Duration::from_millis(10 * (rank + 1)),
            postprocess: Duration::from_millis(40 - 10 * rank),
            edge_pixels: rank,
        };

        comm.reduce_stats(local).await
    });

    let results = future::try_join_all(futs).await.unwrap();

    assert_eq!(
        results[0],
        Some(StageStats {
            compute: Duration::from_millis(40),
            postprocess: Duration::from_millis(40),
            edge_pixels: 6,
        })
    );
    assert!(results[1..].iter().all(Option::is_none));
}

#[tokio::test]
async fn peers_wait_for_the_coordinator_to_disconnect() {
    let futs = world(3)
        .into_iter()
        .map(|mut comm| async move { comm.disconnect().await });

    future::try_join_all(futs).await.unwrap();
}
