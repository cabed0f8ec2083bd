use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use slog::warn;
use tokio::sync::{mpsc, oneshot, Mutex};

use super::{ActorCore, ActorOps, ActorRef};
use crate::behavior::{BehaviorSpec, Behavior};
use crate::config::Placement;
use crate::error::ActorError;

enum Envelope {
    Message {
        topic: String,
        payload: Value,
        reply: Option<oneshot::Sender<Result<Value, ActorError>>>,
    },
    Destroy,
}

/// A purely local actor. A single cooperative task owns the behavior and
/// drains an ordered mailbox, so handlers for one actor never run
/// concurrently with each other and messages from a given sender are
/// processed in send order.
pub struct InMemoryActor {
    core: ActorCore,
    mailbox_tx: mpsc::UnboundedSender<Envelope>,
    init_rx: Mutex<Option<oneshot::Receiver<Result<(), ActorError>>>>,
    destroyed_rx: Mutex<Option<oneshot::Receiver<()>>>,
}

impl InMemoryActor {
    pub(crate) fn spawn(core: ActorCore, mut behavior: Box<dyn Behavior>) -> ActorRef {
        let (mailbox_tx, mut mailbox_rx) = mpsc::unbounded_channel::<Envelope>();
        let (init_tx, init_rx) = oneshot::channel();
        let (destroyed_tx, destroyed_rx) = oneshot::channel();

        let actor = Arc::new(InMemoryActor {
            core,
            mailbox_tx,
            init_rx: Mutex::new(Some(init_rx)),
            destroyed_rx: Mutex::new(Some(destroyed_rx)),
        });
        let dyn_actor: ActorRef = actor.clone();
        actor.core.bind_self(&dyn_actor);

        let ctx = actor.core.context();
        let log = ctx.system.log();
        tokio::spawn(async move {
            let init_result = behavior.initialize(&ctx).await;
            let failed = init_result.is_err();
            let _ = init_tx.send(init_result);

            if !failed {
                loop {
                    match mailbox_rx.recv().await {
                        Some(Envelope::Message {
                            topic,
                            payload,
                            reply,
                        }) => {
                            let result = behavior.handle(&topic, payload, &ctx).await;
                            match reply {
                                Some(reply) => {
                                    let _ = reply.send(result);
                                }
                                None => {
                                    if let Err(e) = result {
                                        warn!(log, "actor handler failed, message dropped";
                                            "actor" => ctx.id.clone(), "topic" => topic, "error" => e.to_string());
                                    }
                                }
                            }
                        }
                        Some(Envelope::Destroy) => {
                            let _ = behavior.destroy(&ctx).await;
                            break;
                        }
                        None => break,
                    }
                }
            }
            let _ = destroyed_tx.send(());
        });

        dyn_actor
    }
}

#[async_trait]
impl ActorOps for InMemoryActor {
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
        self.core.children_vec()
    }

    fn forget_child(&self, id: &str) {
        self.core.remove_child(id);
    }

    async fn send(&self, topic: &str, payload: Value) {
        if self.core.is_destroying() {
            warn!(self.core.system.log(), "dropping message sent to actor being destroyed";
                "actor" => self.core.id.clone(), "topic" => topic.to_string());
            return;
        }
        let _ = self.mailbox_tx.send(Envelope::Message {
            topic: topic.to_string(),
            payload,
            reply: None,
        });
    }

    async fn send_and_receive(
        &self,
        topic: &str,
        payload: Value,
        timeout: Option<Duration>,
    ) -> Result<Value, ActorError> {
        if self.core.is_destroying() {
            return Err(ActorError::BeingDestroyed);
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .mailbox_tx
            .send(Envelope::Message {
                topic: topic.to_string(),
                payload,
                reply: Some(reply_tx),
            })
            .is_err()
        {
            return Err(ActorError::BeingDestroyed);
        }

        let await_reply = async {
            reply_rx
                .await
                .unwrap_or_else(|_| Err(ActorError::Handler("actor terminated before replying".into())))
        };

        match timeout {
            Some(duration) => tokio::time::timeout(duration, await_reply)
                .await
                .map_err(|_| ActorError::Timeout)?,
            None => await_reply.await,
        }
    }

    async fn create_child(
        &self,
        spec: BehaviorSpec,
        opts: Placement,
    ) -> Result<ActorRef, ActorError> {
        self.core.create_child(spec, opts).await
    }

    async fn initialize(&self) -> Result<(), ActorError> {
        let rx = self.init_rx.lock().await.take();
        match rx {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(ActorError::SpawnFailed("actor task ended before initializing".into()))),
            None => Ok(()),
        }
    }

    async fn destroy(&self) -> Result<(), ActorError> {
        if self.core.begin_destroy() {
            let _ = self.mailbox_tx.send(Envelope::Destroy);
            let rx = self.destroyed_rx.lock().await.take();
            if let Some(rx) = rx {
                let _ = rx.await;
            }
            self.core.destroy_children().await;
            if let Some(parent) = &self.core.parent {
                parent.forget_child(&self.core.id);
            }
        }
        Ok(())
    }
}
