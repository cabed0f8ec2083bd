mod common;

use std::collections::HashSet;

use hydractor::config::Placement;
use hydractor::{ActorError, ActorSystem, BehaviorSpec};
use serde_json::json;

#[tokio::test]
async fn echo_in_memory_round_trips_the_payload() {
    let system = ActorSystem::new().await.unwrap();
    let root = system.root_actor();

    let echo = root
        .create_child(BehaviorSpec::Local(Box::new(common::Echo)), Placement::default())
        .await
        .unwrap();

    let reply = echo
        .send_and_receive("echo", json!(42), None)
        .await
        .unwrap();
    assert_eq!(reply, json!(42));
}

#[tokio::test]
async fn created_actors_have_unique_ids() {
    let system = ActorSystem::new().await.unwrap();
    let root = system.root_actor();

    let mut ids = HashSet::new();
    ids.insert(root.id().to_string());
    for _ in 0..25 {
        let child = root
            .create_child(BehaviorSpec::Local(Box::new(common::Echo)), Placement::default())
            .await
            .unwrap();
        assert!(ids.insert(child.id().to_string()), "actor id was reused");
    }
}

#[tokio::test]
async fn a_child_parent_is_fixed_from_creation_until_destruction() {
    let system = ActorSystem::new().await.unwrap();
    let root = system.root_actor();

    let child = root
        .create_child(BehaviorSpec::Local(Box::new(common::Echo)), Placement::default())
        .await
        .unwrap();

    let parent_before = child.parent().unwrap().id().to_string();
    assert_eq!(parent_before, root.id());

    child.send_and_receive("echo", json!("hi"), None).await.unwrap();

    let parent_after = child.parent().unwrap().id().to_string();
    assert_eq!(parent_before, parent_after);
}

#[tokio::test]
async fn root_actor_has_no_parent() {
    let system = ActorSystem::new().await.unwrap();
    assert!(system.root_actor().parent().is_none());
}

#[tokio::test]
async fn send_and_receive_after_destroy_fails_with_being_destroyed() {
    let system = ActorSystem::new().await.unwrap();
    let root = system.root_actor();

    let echo = root
        .create_child(BehaviorSpec::Local(Box::new(common::Echo)), Placement::default())
        .await
        .unwrap();

    echo.destroy().await.unwrap();

    let result = echo.send_and_receive("echo", json!(1), None).await;
    assert!(matches!(result, Err(ActorError::BeingDestroyed)));
}

#[tokio::test]
async fn send_after_destroy_is_dropped_without_panicking() {
    let system = ActorSystem::new().await.unwrap();
    let root = system.root_actor();

    let echo = root
        .create_child(BehaviorSpec::Local(Box::new(common::Echo)), Placement::default())
        .await
        .unwrap();

    echo.destroy().await.unwrap();
    echo.send("echo", json!(1)).await;
}

#[tokio::test]
async fn destroy_is_idempotent() {
    let system = ActorSystem::new().await.unwrap();
    let root = system.root_actor();

    let echo = root
        .create_child(BehaviorSpec::Local(Box::new(common::Echo)), Placement::default())
        .await
        .unwrap();

    assert!(echo.destroy().await.is_ok());
    assert!(echo.destroy().await.is_ok());
}
