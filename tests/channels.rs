mod common;

use async_trait::async_trait;
use hydractor::behavior::ActorContext;
use hydractor::config::Placement;
use hydractor::error::ActorError;
use hydractor::{ActorSystem, Behavior, BehaviorSpec};
use hydractor_testkit::p_assert_eq;
use hydractor_testkit::probe::channel::{probe, ChannelProbe};
use hydractor_testkit::probe::ProbeReceive;
use serde_json::{json, Value};

/// Records the order its `record` handler is invoked in onto a probe, so
/// tests can assert FIFO delivery from a single sender.
struct OrderRecorder {
    probe: ChannelProbe<(), u64>,
}

#[async_trait]
impl Behavior for OrderRecorder {
    fn type_name(&self) -> &'static str {
        "orderRecorder"
    }

    async fn handle(&mut self, topic: &str, payload: Value, _ctx: &ActorContext) -> Result<Value, ActorError> {
        match topic {
            "record" => {
                let n = payload.as_u64().unwrap_or(0);
                self.probe.event(n);
                Ok(Value::Null)
            }
            other => Err(ActorError::Handler(format!("no handler for '{}'", other))),
        }
    }
}

#[tokio::test]
async fn fifo_pairwise_delivery_from_a_single_sender() {
    let system = ActorSystem::new().await.unwrap();
    let root = system.root_actor();

    let (probe, mut listen) = probe();
    let recorder = root
        .create_child(
            BehaviorSpec::Local(Box::new(OrderRecorder { probe })),
            Placement::default(),
        )
        .await
        .unwrap();

    for n in 0..10u64 {
        recorder.send("record", json!(n)).await;
    }

    for n in 0..10u64 {
        p_assert_eq!(listen, n);
    }
}

#[tokio::test]
async fn concurrent_asks_resolve_with_their_own_correlated_payload() {
    let system = ActorSystem::new().await.unwrap();
    let root = system.root_actor();

    let echo = root
        .create_child(BehaviorSpec::Local(Box::new(common::Echo)), Placement::default())
        .await
        .unwrap();

    let mut handles = Vec::new();
    for n in 0..30u64 {
        let echo = echo.clone();
        handles.push(tokio::spawn(async move {
            let reply = echo.send_and_receive("echo", json!(n), None).await.unwrap();
            assert_eq!(reply, json!(n));
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
}
