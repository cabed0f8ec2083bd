use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use slog::warn;
use tokio::sync::{broadcast, oneshot, Mutex};

use super::transport::{Transport, TransportEvent};
use super::super::{ActorCore, ActorOps, ActorRef};
use crate::behavior::BehaviorSpec;
use crate::config::Placement;
use crate::error::ActorError;
use crate::id::IdGenerator;
use crate::protocol::{self, Frame};

/// The local-process proxy for an actor living inside a forked worker.
/// `send`/`send_and_receive` translate to `actor-message` frames; a
/// background task drains the transport and resolves pending
/// `send_and_receive` calls by correlation id as `actor-response` frames
/// arrive.
pub struct ForkedActorParent {
    core: ActorCore,
    transport: Arc<dyn Transport>,
    pending: DashMap<String, oneshot::Sender<Result<Value, ActorError>>>,
    closed: AtomicBool,
    destroyed_waiter: Mutex<Option<oneshot::Sender<()>>>,
    ids: IdGenerator,
}

impl ForkedActorParent {
    pub(crate) fn spawn(core: ActorCore, transport: Arc<dyn Transport>) -> ActorRef {
        let actor = Arc::new(ForkedActorParent {
            core,
            transport,
            pending: DashMap::new(),
            closed: AtomicBool::new(false),
            destroyed_waiter: Mutex::new(None),
            ids: IdGenerator::new(),
        });
        let dyn_actor: ActorRef = actor.clone();
        actor.core.bind_self(&dyn_actor);

        let reader = actor.clone();
        let mut events = actor.transport.subscribe();
        tokio::spawn(async move {
            reader.drain_transport(&mut events).await;
        });

        dyn_actor
    }

    async fn drain_transport(&self, events: &mut broadcast::Receiver<TransportEvent>) {
        loop {
            match events.recv().await {
                Ok(TransportEvent::Message(frame)) => {
                    if frame.is(protocol::ACTOR_RESPONSE) {
                        self.resolve_pending(frame);
                    } else if frame.is(protocol::DESTROYED) {
                        self.notify_destroyed();
                    }
                }
                Ok(TransportEvent::Error(reason)) => {
                    warn!(self.core.system.log(), "forked actor protocol error";
                        "actor" => self.core.id.clone(), "error" => reason);
                }
                Ok(TransportEvent::Exit) | Err(broadcast::error::RecvError::Closed) => {
                    self.mark_closed();
                    self.notify_destroyed();
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
    }

    fn resolve_pending(&self, frame: Frame) {
        let Some(id) = frame.id else { return };
        if let Some((_, sender)) = self.pending.remove(&id) {
            let result = match frame.error {
                Some(message) => Err(ActorError::Handler(message)),
                None => Ok(frame.body.unwrap_or(Value::Null)),
            };
            let _ = sender.send(result);
        }
    }

    fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let pending: Vec<_> = self
            .pending
            .iter()
            .map(|e| e.key().clone())
            .collect();
        for id in pending {
            if let Some((_, sender)) = self.pending.remove(&id) {
                let _ = sender.send(Err(ActorError::TransportClosed));
            }
        }
    }

    fn notify_destroyed(&self) {
        if let Ok(mut slot) = self.destroyed_waiter.try_lock() {
            if let Some(waiter) = slot.take() {
                let _ = waiter.send(());
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActorOps for ForkedActorParent {
    fn id(&self) -> &str {
        &self.core.id
    }

    fn name(&self) -> &str {
        &self.core.name
    }

    fn parent(&self) -> Option<ActorRef> {
        self.core.parent.clone()
    }

    fn children(&self) -> Vec<ActorRef> {
        // Descendants of a forked actor live inside the worker's own
        // `ActorSystem`; they are not individually represented on this
        // side of the transport.
        Vec::new()
    }

    fn forget_child(&self, _id: &str) {}

    async fn send(&self, topic: &str, payload: Value) {
        if self.is_closed() {
            warn!(self.core.system.log(), "dropping message sent to a forked actor whose transport closed";
                "actor" => self.core.id.clone(), "topic" => topic.to_string());
            return;
        }
        let body = serde_json::to_value(protocol::ActorMessageBody {
            topic: topic.to_string(),
            payload,
        })
        .unwrap_or(Value::Null);
        if self
            .transport
            .send(&Frame::new(protocol::ACTOR_MESSAGE).with_body(body))
            .await
            .is_err()
        {
            self.mark_closed();
        }
    }

    async fn send_and_receive(
        &self,
        topic: &str,
        payload: Value,
        timeout: Option<Duration>,
    ) -> Result<Value, ActorError> {
        if self.is_closed() {
            return Err(ActorError::TransportClosed);
        }

        let correlation_id = self.ids.generate();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.insert(correlation_id.clone(), reply_tx);

        let body = serde_json::to_value(protocol::ActorMessageBody {
            topic: topic.to_string(),
            payload,
        })
        .unwrap_or(Value::Null);
        let frame = Frame::new(protocol::ACTOR_MESSAGE)
            .with_id(correlation_id.clone())
            .with_body(body);

        if self.transport.send(&frame).await.is_err() {
            self.pending.remove(&correlation_id);
            self.mark_closed();
            return Err(ActorError::TransportClosed);
        }

        let await_reply = async {
            reply_rx
                .await
                .unwrap_or(Err(ActorError::TransportClosed))
        };

        match timeout {
            Some(duration) => match tokio::time::timeout(duration, await_reply).await {
                Ok(result) => result,
                Err(_) => {
                    self.pending.remove(&correlation_id);
                    Err(ActorError::Timeout)
                }
            },
            None => await_reply.await,
        }
    }

    async fn create_child(
        &self,
        _spec: BehaviorSpec,
        _opts: Placement,
    ) -> Result<ActorRef, ActorError> {
        // Children of a forked actor are created by behavior code running
        // inside the worker, against the worker's own `ActorSystem` (the
        // root of which is the matching `ForkedActorChild`). There is no
        // wire message for reaching into an already-running worker's
        // hierarchy from the parent process, so this is not supported from
        // out here; see DESIGN.md.
        Err(ActorError::Protocol(
            "cannot create a child of a forked actor from outside its worker process".into(),
        ))
    }

    async fn initialize(&self) -> Result<(), ActorError> {
        Ok(())
    }

    async fn destroy(&self) -> Result<(), ActorError> {
        if self.core.begin_destroy() {
            let (tx, rx) = oneshot::channel();
            *self.destroyed_waiter.lock().await = Some(tx);

            let _ = self.transport.send(&Frame::new(protocol::DESTROY)).await;
            let _ = tokio::time::timeout(Duration::from_secs(5), rx).await;

            self.transport.kill().await;
            self.mark_closed();

            if let Some(parent) = &self.core.parent {
                parent.forget_child(&self.core.id);
            }
        }
        Ok(())
    }
}
