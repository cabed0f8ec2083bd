mod common;

use std::time::Duration;

use hydractor::config::{Mode, Placement};
use hydractor::{BehaviorRegistry, BehaviorSpec, SystemBuilder};
use serde_json::json;

/// The same `echo` behavior, placed in a forked worker instead of
/// in-memory, still round-trips its payload through the parent/child wire
/// protocol.
#[tokio::test]
async fn echo_round_trips_through_a_forked_worker() {
    let registry = BehaviorRegistry::new();
    let system = SystemBuilder::new()
        .worker_program(env!("CARGO_BIN_EXE_hydractor-test-worker"))
        .behaviors(registry)
        .test(true)
        .create()
        .await
        .unwrap();
    let root = system.root_actor();

    let mut placement = Placement::default();
    placement.mode = Some(Mode::Forked);

    let worker = root
        .create_child(BehaviorSpec::Registered("echoBehavior".to_string()), placement)
        .await
        .unwrap();

    assert!(!worker.id().is_empty());
    assert_ne!(worker.id(), root.id());

    let reply = worker
        .send_and_receive("echo", json!("hi"), Some(Duration::from_secs(5)))
        .await
        .unwrap();
    assert_eq!(reply, json!("hi"));

    worker.destroy().await.unwrap();
}

/// A forked actor proxies `whoami` to its worker-side in-memory root the
/// same way an in-memory child would, just over the wire.
#[tokio::test]
async fn whoami_reflects_the_workers_own_root_id() {
    let registry = BehaviorRegistry::new();
    let system = SystemBuilder::new()
        .worker_program(env!("CARGO_BIN_EXE_hydractor-test-worker"))
        .behaviors(registry)
        .test(true)
        .create()
        .await
        .unwrap();
    let root = system.root_actor();

    let mut placement = Placement::default();
    placement.mode = Some(Mode::Forked);

    let worker = root
        .create_child(BehaviorSpec::Registered("whoamiBehavior".to_string()), placement)
        .await
        .unwrap();

    let reply = worker
        .send_and_receive("whoami", serde_json::Value::Null, Some(Duration::from_secs(5)))
        .await
        .unwrap();
    assert_eq!(reply, json!(worker.id()));

    worker.destroy().await.unwrap();
}

/// Placement resolves to `forked` only when asked explicitly; a bare
/// `Placement::default()` stays in-memory even when a worker program is
/// configured.
#[tokio::test]
async fn default_placement_does_not_fork_even_when_a_worker_program_is_set() {
    let registry = BehaviorRegistry::new();
    let system = SystemBuilder::new()
        .worker_program(env!("CARGO_BIN_EXE_hydractor-test-worker"))
        .behaviors(registry)
        .test(true)
        .create()
        .await
        .unwrap();
    let root = system.root_actor();

    let child = root
        .create_child(BehaviorSpec::Local(Box::new(common::Echo)), Placement::default())
        .await
        .unwrap();

    let reply = child.send_and_receive("echo", json!(7), None).await.unwrap();
    assert_eq!(reply, json!(7));
}
