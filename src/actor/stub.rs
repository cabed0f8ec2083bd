use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{ActorOps, ActorRef};
use crate::behavior::BehaviorSpec;
use crate::config::Placement;
use crate::error::ActorError;

/// A forward reference to an actor by id, before it has a concrete binding.
/// A worker uses one of these to address its own parent: the parent's real
/// `id` is known from the `create-actor` frame before the worker has
/// anything to route through. Operations resolve through to the bound
/// actor on demand, or fail with `StubUnresolved` if nothing has been
/// bound yet.
pub struct ActorStub {
    id: String,
    resolved: RwLock<Option<ActorRef>>,
}

impl ActorStub {
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        Arc::new(ActorStub {
            id: id.into(),
            resolved: RwLock::new(None),
        })
    }

    pub async fn resolve(&self, actor: ActorRef) {
        *self.resolved.write().await = Some(actor);
    }

    async fn resolved_actor(&self) -> Result<ActorRef, ActorError> {
        self.resolved
            .read()
            .await
            .clone()
            .ok_or(ActorError::StubUnresolved)
    }
}

#[async_trait]
impl ActorOps for ActorStub {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn parent(&self) -> Option<ActorRef> {
        None
    }

    fn children(&self) -> Vec<ActorRef> {
        Vec::new()
    }

    async fn send(&self, topic: &str, payload: Value) {
        if let Ok(actor) = self.resolved_actor().await {
            actor.send(topic, payload).await;
        }
    }

    async fn send_and_receive(
        &self,
        topic: &str,
        payload: Value,
        timeout: Option<Duration>,
    ) -> Result<Value, ActorError> {
        self.resolved_actor()
            .await?
            .send_and_receive(topic, payload, timeout)
            .await
    }

    async fn create_child(
        &self,
        spec: BehaviorSpec,
        opts: Placement,
    ) -> Result<ActorRef, ActorError> {
        self.resolved_actor().await?.create_child(spec, opts).await
    }

    async fn initialize(&self) -> Result<(), ActorError> {
        match self.resolved.read().await.clone() {
            Some(actor) => actor.initialize().await,
            None => Ok(()),
        }
    }

    async fn destroy(&self) -> Result<(), ActorError> {
        match self.resolved.read().await.clone() {
            Some(actor) => actor.destroy().await,
            None => Ok(()),
        }
    }
}
