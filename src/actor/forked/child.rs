use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::transport::{Transport, TransportEvent};
use super::super::{ActorOps, ActorRef};
use crate::behavior::BehaviorSpec;
use crate::config::Placement;
use crate::error::ActorError;
use crate::protocol::{self, ActorMessageBody, Frame};

/// The worker-side counterpart to `ForkedActorParent`. Wraps the worker's
/// own in-memory root actor and shuttles `actor-message`/`destroy` frames
/// arriving over `transport` to it, writing back `actor-response`/
/// `destroyed`. `run` is the worker's main loop once the actor is ready.
pub struct ForkedActorChild {
    parent: Option<ActorRef>,
    transport: Arc<dyn Transport>,
    inner: ActorRef,
}

impl ForkedActorChild {
    pub(crate) fn new(parent: Option<ActorRef>, transport: Arc<dyn Transport>, inner: ActorRef) -> Arc<Self> {
        Arc::new(ForkedActorChild {
            parent,
            transport,
            inner,
        })
    }

    /// Services frames from the parent until the transport closes (the
    /// parent destroyed this actor, or exited outright), at which point the
    /// worker process should shut down.
    pub async fn run(self: Arc<Self>) {
        let mut events = self.transport.subscribe();
        loop {
            match events.recv().await {
                Ok(TransportEvent::Message(frame)) => {
                    if frame.is(protocol::ACTOR_MESSAGE) {
                        self.clone().handle_message(frame).await;
                    } else if frame.is(protocol::DESTROY) {
                        let _ = self.inner.destroy().await;
                        let _ = self.transport.send(&Frame::new(protocol::DESTROYED)).await;
                        break;
                    }
                }
                Ok(TransportEvent::Error(_)) => continue,
                Ok(TransportEvent::Exit) | Err(_) => {
                    let _ = self.inner.destroy().await;
                    break;
                }
            }
        }
    }

    async fn handle_message(self: Arc<Self>, frame: Frame) {
        let body: ActorMessageBody = match frame.body.and_then(|b| serde_json::from_value(b).ok()) {
            Some(body) => body,
            None => return,
        };

        match frame.id {
            Some(id) => {
                let reply = match self.inner.send_and_receive(&body.topic, body.payload, None).await {
                    Ok(value) => Frame::new(protocol::ACTOR_RESPONSE).with_id(id).with_body(value),
                    Err(e) => Frame::new(protocol::ACTOR_RESPONSE).with_id(id).with_error(e.to_string()),
                };
                let _ = self.transport.send(&reply).await;
            }
            None => {
                self.inner.send(&body.topic, body.payload).await;
            }
        }
    }
}

#[async_trait]
impl ActorOps for ForkedActorChild {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn parent(&self) -> Option<ActorRef> {
        self.parent.clone()
    }

    fn children(&self) -> Vec<ActorRef> {
        self.inner.children()
    }

    fn forget_child(&self, id: &str) {
        self.inner.forget_child(id);
    }

    async fn send(&self, topic: &str, payload: Value) {
        self.inner.send(topic, payload).await
    }

    async fn send_and_receive(
        &self,
        topic: &str,
        payload: Value,
        timeout: Option<Duration>,
    ) -> Result<Value, ActorError> {
        self.inner.send_and_receive(topic, payload, timeout).await
    }

    async fn create_child(
        &self,
        spec: BehaviorSpec,
        opts: Placement,
    ) -> Result<ActorRef, ActorError> {
        self.inner.create_child(spec, opts).await
    }

    async fn initialize(&self) -> Result<(), ActorError> {
        self.inner.initialize().await
    }

    async fn destroy(&self) -> Result<(), ActorError> {
        self.inner.destroy().await
    }
}
