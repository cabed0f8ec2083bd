mod common;

use std::time::Duration;

use hydractor::config::{Mode, Placement};
use hydractor::{ActorError, ActorSystem, BehaviorRegistry, BehaviorSpec, SystemBuilder};
use hydractor_testkit::probe::channel::probe;
use hydractor_testkit::probe::ProbeReceive;
use serde_json::Value;

/// Destroying an actor runs its own `destroy` hook before cascading the
/// teardown to its children's hooks.
#[tokio::test]
async fn destroy_runs_the_parents_own_hook_before_cascading_to_children() {
    let system = ActorSystem::new().await.unwrap();
    let root = system.root_actor();

    let (probe, mut listen) = probe();
    let parent = root
        .create_child(
            BehaviorSpec::Local(Box::new(common::NotifyOnDestroy {
                label: "parent",
                probe: probe.clone(),
            })),
            Placement::default(),
        )
        .await
        .unwrap();
    let _child = parent
        .create_child(
            BehaviorSpec::Local(Box::new(common::NotifyOnDestroy {
                label: "child",
                probe,
            })),
            Placement::default(),
        )
        .await
        .unwrap();

    parent.destroy().await.unwrap();

    assert_eq!(listen.recv().await, "parent");
    assert_eq!(listen.recv().await, "child");
}

/// A forked worker whose handler crashes the process leaves the
/// outstanding `send_and_receive` failing with a transport-closed error,
/// and the parent-side reference keeps failing the same way afterward.
#[tokio::test]
async fn worker_crash_fails_the_pending_call_and_every_call_after_it() {
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

    let crashed = worker
        .send_and_receive("crash", Value::Null, Some(Duration::from_secs(5)))
        .await;
    assert!(matches!(crashed, Err(ActorError::TransportClosed)));

    let after = worker
        .send_and_receive("whoami", Value::Null, Some(Duration::from_secs(2)))
        .await;
    assert!(matches!(after, Err(ActorError::TransportClosed)));
}
