//! End-to-end tests for the background refresh loader.
//!
//! Each test wires a `RefreshLoader` to an in-memory directory and a
//! recording sink, queues uids, and checks what the sink received and which
//! fetches the directory saw.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracker_core::memory::{MemoryDirectory, MemoryUser, RecordingSink, Relationships};
use tracker_core::{
    Collaborators, IdentifierResolver, LoadError, LoadTarget, LoaderState, QueueError,
    RefreshLoader, RelationshipResult, ShutdownHooks, SyncMode, Uid,
};

const WAIT: Duration = Duration::from_secs(3);

struct Harness {
    dir: Arc<MemoryDirectory>,
    sink: Arc<RecordingSink>,
    loader: Arc<RefreshLoader>,
}

fn harness(dir: MemoryDirectory) -> Harness {
    harness_with_capacity(dir, 100)
}

fn harness_with_capacity(dir: MemoryDirectory, capacity: usize) -> Harness {
    let dir = Arc::new(dir);
    let sink = Arc::new(RecordingSink::new());
    let collaborators = Collaborators {
        session: dir.clone(),
        identity: dir.clone(),
        sync: dir.clone(),
        sink: sink.clone(),
    };
    Harness {
        dir,
        sink,
        loader: Arc::new(RefreshLoader::with_capacity(collaborators, capacity)),
    }
}

fn result(uid: &str, followees: &[&str], followers: &[&str]) -> RelationshipResult {
    RelationshipResult {
        uid: Uid::from(uid),
        followees: followees.iter().map(|s| s.to_string()).collect(),
        followers: followers.iter().map(|s| s.to_string()).collect(),
    }
}

fn full_user(uid: &str) -> MemoryUser {
    MemoryUser::new(uid, uid)
        .with_cached(Relationships::new(&["a"], &["b"]))
        .with_live(Relationships::new(&["a", "c"], &["b"]))
}

#[tokio::test]
async fn test_cached_then_live_results_are_published_in_order() {
    let h = harness(MemoryDirectory::new(vec![
        MemoryUser::new("u1", "alice")
            .with_cached(Relationships::new(&["A"], &["B"]))
            .with_live(Relationships::new(&["A", "C"], &["B"])),
    ]));
    h.loader.start(&CancellationToken::new());
    h.loader.queue(Uid::from("u1")).unwrap();

    assert!(h.sink.wait_for(2, WAIT).await);
    h.loader.shutdown().await;

    assert_eq!(
        h.sink.results(),
        vec![
            result("u1", &["A"], &["B"]),
            result("u1", &["A", "C"], &["B"]),
        ]
    );
}

#[tokio::test]
async fn test_cached_failure_still_runs_live_phase() {
    let h = harness(MemoryDirectory::new(vec![
        MemoryUser::new("u1", "alice").with_live(Relationships::new(&["A"], &[])),
    ]));
    h.loader.start(&CancellationToken::new());
    h.loader.queue(Uid::from("u1")).unwrap();

    assert!(h.sink.wait_for(1, WAIT).await);
    h.loader.shutdown().await;

    assert_eq!(h.sink.results(), vec![result("u1", &["A"], &[])]);
    let modes: Vec<SyncMode> = h
        .dir
        .fetches_for(&Uid::from("u1"))
        .into_iter()
        .map(|(mode, _)| mode)
        .collect();
    // Cached followee fetch failed, so the cached follower fetch never ran.
    assert_eq!(modes, vec![SyncMode::Cached, SyncMode::Live, SyncMode::Live]);
}

#[tokio::test]
async fn test_total_failure_publishes_nothing_and_loop_continues() {
    let h = harness(MemoryDirectory::new(vec![
        MemoryUser::new("u-empty", "empty"),
        full_user("u-good"),
    ]));
    h.loader.start(&CancellationToken::new());
    h.loader.queue(Uid::from("u-missing")).unwrap();
    h.loader.queue(Uid::from("u-empty")).unwrap();
    h.loader.queue(Uid::from("u-good")).unwrap();

    assert!(h.sink.wait_for(2, WAIT).await);
    h.loader.shutdown().await;

    let results = h.sink.results();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.uid == Uid::from("u-good")));
    assert_eq!(h.dir.fetches_for(&Uid::from("u-missing")).len(), 2);
    assert_eq!(h.dir.fetches_for(&Uid::from("u-empty")).len(), 2);
}

#[tokio::test]
async fn test_queue_rejects_the_101st_unconsumed_request() {
    let h = harness(MemoryDirectory::default());

    for i in 0..100 {
        h.loader.queue(Uid::new(format!("u{}", i))).unwrap();
    }
    assert_eq!(
        h.loader.queue(Uid::from("u100")),
        Err(QueueError::QueueFull { capacity: 100 })
    );
    assert_eq!(h.loader.pending(), 100);
}

#[tokio::test]
async fn test_concurrent_producers_share_the_capacity() {
    let h = harness_with_capacity(MemoryDirectory::default(), 100);

    let mut producers = Vec::new();
    for p in 0..4 {
        let loader = h.loader.clone();
        producers.push(tokio::spawn(async move {
            (0..50)
                .filter(|i| loader.queue(Uid::new(format!("p{}-{}", p, i))).is_ok())
                .count()
        }));
    }

    let mut accepted = 0;
    for producer in producers {
        accepted += producer.await.unwrap();
    }
    assert_eq!(accepted, 100);
}

#[tokio::test]
async fn test_double_start_runs_a_single_worker() {
    let h = harness(MemoryDirectory::new(vec![full_user("u1"), full_user("u2")]));
    let parent = CancellationToken::new();
    h.loader.start(&parent);
    h.loader.start(&parent);
    assert_eq!(h.loader.state(), LoaderState::Running);

    h.loader.queue(Uid::from("u1")).unwrap();
    h.loader.queue(Uid::from("u2")).unwrap();

    assert!(h.sink.wait_for(4, WAIT).await);
    // Give a hypothetical second worker time to show itself.
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.loader.shutdown().await;

    assert_eq!(h.sink.len(), 4);
    assert_eq!(h.dir.fetches_for(&Uid::from("u1")).len(), 4);
    assert_eq!(h.dir.fetches_for(&Uid::from("u2")).len(), 4);
}

#[tokio::test]
async fn test_requests_are_processed_in_fifo_order() {
    let h = harness(MemoryDirectory::new(vec![
        full_user("u1"),
        full_user("u2"),
        full_user("u3"),
    ]));
    for uid in ["u1", "u2", "u3"] {
        h.loader.queue(Uid::from(uid)).unwrap();
    }
    h.loader.start(&CancellationToken::new());

    assert!(h.sink.wait_for(6, WAIT).await);
    h.loader.shutdown().await;

    let order: Vec<String> = h
        .sink
        .results()
        .into_iter()
        .map(|r| r.uid.to_string())
        .collect();
    assert_eq!(order, vec!["u1", "u1", "u2", "u2", "u3", "u3"]);
}

#[tokio::test]
async fn test_duplicate_requests_are_not_deduplicated() {
    let h = harness(MemoryDirectory::new(vec![full_user("u1")]));
    h.loader.queue(Uid::from("u1")).unwrap();
    h.loader.queue(Uid::from("u1")).unwrap();
    h.loader.start(&CancellationToken::new());

    assert!(h.sink.wait_for(4, WAIT).await);
    h.loader.shutdown().await;
    assert_eq!(h.sink.len(), 4);
}

#[tokio::test]
async fn test_shutdown_drops_queued_requests_and_restart_takes_only_new_ones() {
    // Live fetches hang until cancelled, so the worker is mid-request when
    // shutdown is called.
    let h = harness(
        MemoryDirectory::new(vec![
            full_user("u1"),
            full_user("u2"),
            full_user("u3"),
            full_user("u4"),
        ])
        .with_latency(Duration::from_secs(60)),
    );
    h.loader.start(&CancellationToken::new());
    for uid in ["u1", "u2", "u3"] {
        h.loader.queue(Uid::from(uid)).unwrap();
    }

    // Cached phase of u1 published; live phase is in flight.
    assert!(h.sink.wait_for(1, WAIT).await);
    tokio::time::timeout(WAIT, h.loader.shutdown())
        .await
        .expect("shutdown should complete once the in-flight fetch is cancelled");
    assert_eq!(h.loader.state(), LoaderState::Stopped);
    assert_eq!(h.loader.pending(), 0);

    h.loader.start(&CancellationToken::new());
    h.loader.queue(Uid::from("u4")).unwrap();
    assert!(h.sink.wait_for(2, WAIT).await);
    tokio::time::timeout(WAIT, h.loader.shutdown()).await.unwrap();

    let uids: Vec<Uid> = h.sink.results().into_iter().map(|r| r.uid).collect();
    assert_eq!(uids, vec![Uid::from("u1"), Uid::from("u4")]);
    assert!(h.dir.fetches_for(&Uid::from("u2")).is_empty());
    assert!(h.dir.fetches_for(&Uid::from("u3")).is_empty());
}

#[tokio::test]
async fn test_restart_before_old_worker_exits_keeps_new_requests() {
    let h = harness(
        MemoryDirectory::new(vec![full_user("u1"), full_user("u4")])
            .with_latency(Duration::from_millis(200)),
    );
    h.loader.start(&CancellationToken::new());
    h.loader.queue(Uid::from("u1")).unwrap();
    assert!(h.sink.wait_for(1, WAIT).await);

    // Restart and enqueue while the old worker is still winding down.
    let done = h.loader.shutdown();
    h.loader.start(&CancellationToken::new());
    h.loader.queue(Uid::from("u4")).unwrap();
    tokio::time::timeout(WAIT, done).await.unwrap();

    assert!(h.sink.wait_for(3, WAIT).await);
    tokio::time::timeout(WAIT, h.loader.shutdown()).await.unwrap();

    let uids: Vec<Uid> = h.sink.results().into_iter().map(|r| r.uid).collect();
    assert_eq!(uids, vec![Uid::from("u1"), Uid::from("u4"), Uid::from("u4")]);
    assert_eq!(h.dir.fetches_for(&Uid::from("u4")).len(), 4);
}

#[tokio::test]
async fn test_shutdown_with_empty_queue_is_prompt() {
    let h = harness(MemoryDirectory::default());
    h.loader.start(&CancellationToken::new());
    tokio::time::sleep(Duration::from_millis(20)).await;

    let done = tokio::time::timeout(Duration::from_millis(500), h.loader.shutdown()).await;
    assert!(done.is_ok());
}

#[tokio::test]
async fn test_teardown_hook_stops_the_loader() {
    let h = harness(MemoryDirectory::new(vec![full_user("u1")]));
    h.loader.start(&CancellationToken::new());

    let mut hooks = ShutdownHooks::new(WAIT);
    let loader = h.loader.clone();
    hooks.push("refresh_loader", move || loader.shutdown().boxed());

    hooks.run().await.unwrap();
    assert_eq!(h.loader.state(), LoaderState::Stopped);
}

#[tokio::test]
async fn test_explicit_uid_resolution_never_touches_collaborators() {
    let h = harness(
        MemoryDirectory::new(vec![MemoryUser::new("u-alice", "alice")]).with_session("u-me"),
    );
    let resolver = IdentifierResolver::new(&Collaborators {
        session: h.dir.clone(),
        identity: h.dir.clone(),
        sync: h.dir.clone(),
        sink: h.sink.clone(),
    });
    let target = LoadTarget {
        uid: Some(Uid::from("u-explicit")),
        assertion: Some("alice".to_string()),
    };

    let uid = resolver
        .resolve(&target, true, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(uid, Uid::from("u-explicit"));
    assert!(h.dir.calls().is_empty());
}

#[tokio::test]
async fn test_no_session_fails_without_identity_lookup() {
    let h = harness(MemoryDirectory::new(vec![MemoryUser::new("u-alice", "alice")]));
    let resolver = IdentifierResolver::new(&Collaborators {
        session: h.dir.clone(),
        identity: h.dir.clone(),
        sync: h.dir.clone(),
        sink: h.sink.clone(),
    });

    let err = resolver
        .resolve(&LoadTarget::current_session(), true, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::NoActiveSession));
    assert!(
        h.dir
            .calls()
            .iter()
            .all(|c| !matches!(c, tracker_core::memory::Call::ResolveAssertion(_)))
    );
}
