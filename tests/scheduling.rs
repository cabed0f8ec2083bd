mod common;

use std::time::Duration;

use hydractor::config::Placement;
use hydractor::{ActorError, ActorSystem, BehaviorSpec};
use serde_json::{json, Value};

#[tokio::test]
async fn send_and_receive_without_a_deadline_waits_for_the_reply() {
    let system = ActorSystem::new().await.unwrap();
    let root = system.root_actor();

    let echo = root
        .create_child(BehaviorSpec::Local(Box::new(common::Echo)), Placement::default())
        .await
        .unwrap();

    let reply = echo.send_and_receive("echo", json!("hi"), None).await.unwrap();
    assert_eq!(reply, json!("hi"));
}

#[tokio::test]
async fn send_and_receive_resolves_before_a_generous_deadline() {
    let system = ActorSystem::new().await.unwrap();
    let root = system.root_actor();

    let echo = root
        .create_child(BehaviorSpec::Local(Box::new(common::Echo)), Placement::default())
        .await
        .unwrap();

    let reply = echo
        .send_and_receive("echo", json!("hi"), Some(Duration::from_secs(5)))
        .await
        .unwrap();
    assert_eq!(reply, json!("hi"));
}

#[tokio::test]
async fn send_and_receive_times_out_against_a_handler_that_never_replies() {
    let system = ActorSystem::new().await.unwrap();
    let root = system.root_actor();

    let slow = root
        .create_child(BehaviorSpec::Local(Box::new(common::Whoami)), Placement::default())
        .await
        .unwrap();

    let result = slow
        .send_and_receive("slow", Value::Null, Some(Duration::from_millis(50)))
        .await;
    assert!(matches!(result, Err(ActorError::Timeout)));
}

#[tokio::test]
async fn a_pending_timeout_does_not_leave_the_actor_unusable() {
    let system = ActorSystem::new().await.unwrap();
    let root = system.root_actor();

    let whoami = root
        .create_child(BehaviorSpec::Local(Box::new(common::Whoami)), Placement::default())
        .await
        .unwrap();

    let timed_out = whoami
        .send_and_receive("slow", Value::Null, Some(Duration::from_millis(50)))
        .await;
    assert!(matches!(timed_out, Err(ActorError::Timeout)));

    // the actor's mailbox keeps draining after a timed-out call; a later,
    // unrelated request still gets served.
    let reply = whoami.send_and_receive("whoami", Value::Null, None).await;
    assert!(reply.is_ok());
}
