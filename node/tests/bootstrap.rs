use std::{num::NonZeroUsize, time::Duration};

use comms::{
    msg::{Command, Msg},
    specs::stats::StageStats,
};
use imaging::Grid;
use node::{
    NodeErr,
    bootstrap::{self, accept_peers, join},
    config::PipelineConfig,
};
use tokio::net::{TcpListener, TcpStream};

fn size(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

#[tokio::test]
async fn tcp_world_runs_collectives() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    // Peers join in reverse order, the coordinator must still order them by rank.
    let (root, two, one) = tokio::join!(
        accept_peers(&listener, size(3)),
        join(&addr, 2, size(3)),
        async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            join(&addr, 1, size(3)).await
        },
    );
    let (mut root, mut one, mut two) = (root.unwrap(), one.unwrap(), two.unwrap());

    assert_eq!((root.rank(), one.rank(), two.rank()), (0, 1, 2));

    let stats = |edge_pixels| StageStats {
        edge_pixels,
        ..StageStats::default()
    };

    let (reduced, _, _) = tokio::join!(
        root.reduce_stats(stats(1)),
        one.reduce_stats(stats(10)),
        two.reduce_stats(stats(100)),
    );
    assert_eq!(reduced.unwrap().map(|s| s.edge_pixels), Some(111));
}

#[tokio::test]
async fn out_of_range_rank_is_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let rogue = async {
        let stream = TcpStream::connect(addr).await?;
        let (rx, tx) = stream.into_split();
        let (rx, mut tx) = comms::channel(rx, tx);
        tx.send(&Msg::Control(Command::Join { rank: 7 })).await?;
        Ok::<_, std::io::Error>(rx)
    };

    let (res, rogue) = tokio::join!(accept_peers(&listener, size(2)), rogue);
    let _keep_open = rogue.unwrap();

    assert!(matches!(res, Err(NodeErr::InvalidRank { rank: 7, size: 2 })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn local_world_runs_the_pipeline_in_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        input: dir.path().join("input.png"),
        output: dir.path().join("output.png"),
        threshold: 100,
    };
    imaging::io::save(&Grid::filled(12, 12, 128), &config.input).unwrap();

    let report = bootstrap::run_local(size(4), &config).await.unwrap().unwrap();

    assert_eq!(report.participants, 4);
    assert_eq!(report.edge_pixels, 0);
    assert_eq!(
        imaging::io::load_grayscale(&config.output).unwrap(),
        Grid::new(12, 12)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn local_world_surfaces_the_coordinator_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        input: dir.path().join("missing.jpg"),
        output: dir.path().join("output.jpg"),
        threshold: 100,
    };

    let res = bootstrap::run_local(size(3), &config).await;
    assert!(matches!(res, Err(NodeErr::InputUnavailable(_))));
}
