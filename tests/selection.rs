mod common;

use hydractor::behavior::decapitalize;
use hydractor::config::{Mode, Placement};
use hydractor::{ActorSystem, BehaviorRegistry, BehaviorSpec, SystemBuilder};
use serde_json::Value;

#[test]
fn decapitalize_only_lowercases_the_first_letter() {
    assert_eq!(decapitalize("Worker"), "worker");
    assert_eq!(decapitalize("EchoBehavior"), "echoBehavior");
    assert_eq!(decapitalize("alreadyLower"), "alreadyLower");
    assert_eq!(decapitalize(""), "");
}

/// Given a config entry of `{mode: forked, clusterSize: 3}` and call-site
/// options of `{clusterSize: 1}`, the resolved placement is
/// `{mode: forked, clusterSize: 1}` — the config entry's mode wins because
/// the caller never specified one, but the caller's `clusterSize` wins over
/// the config entry's.
#[test]
fn config_precedence_matches_the_documented_example() {
    let mut config_entry = Placement::default();
    config_entry.mode = Some(Mode::Forked);
    config_entry.cluster_size = Some(3);

    let mut call_opts = Placement::default();
    call_opts.cluster_size = Some(1);

    let resolved = Placement::default().overlay(&config_entry).overlay(&call_opts);

    assert_eq!(resolved.mode(), Mode::Forked);
    assert_eq!(resolved.cluster_size(), 1);
}

#[test]
fn default_placement_is_in_memory_with_cluster_size_one() {
    let resolved = Placement::default();
    assert_eq!(resolved.mode(), Mode::InMemory);
    assert_eq!(resolved.cluster_size(), 1);
}

/// Creating an actor with `clusterSize: N` yields an actor whose N
/// successive sends are dispatched to N distinct underlying children in
/// round-robin order, wrapping back to the first on the N+1th call.
#[tokio::test]
async fn cluster_round_robin_fans_out_across_distinct_children() {
    let registry = BehaviorRegistry::new();
    registry.register("whoami", || Box::new(common::Whoami));

    let system = SystemBuilder::new()
        .behaviors(registry)
        .test(true)
        .create()
        .await
        .unwrap();
    let root = system.root_actor();

    let mut placement = Placement::default();
    placement.cluster_size = Some(3);

    let cluster = root
        .create_child(BehaviorSpec::Registered("whoami".to_string()), placement)
        .await
        .unwrap();

    let mut ids = Vec::new();
    for _ in 0..4 {
        let reply = cluster
            .send_and_receive("whoami", Value::Null, None)
            .await
            .unwrap();
        ids.push(reply.as_str().unwrap().to_string());
    }

    assert_ne!(ids[0], ids[1]);
    assert_ne!(ids[1], ids[2]);
    assert_ne!(ids[0], ids[2]);
    assert_eq!(ids[0], ids[3], "the fourth call should wrap back to the first child");
}

#[tokio::test]
async fn local_behavior_cannot_be_used_for_cluster_placement() {
    let system = ActorSystem::new().await.unwrap();
    let root = system.root_actor();

    let mut placement = Placement::default();
    placement.cluster_size = Some(2);

    let result = root
        .create_child(BehaviorSpec::Local(Box::new(common::Echo)), placement)
        .await;
    assert!(result.is_err());
}
