use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{ActorCore, ActorOps, ActorRef};
use crate::behavior::BehaviorSpec;
use crate::config::Placement;
use crate::error::ActorError;

/// Multiplexes traffic round-robin across an ordered set of equivalent
/// children. Created internally by `ActorSystem::create_actor` whenever a
/// placement resolves to `cluster_size > 1`; the balancer itself owns no
/// behavior of its own, just a cursor.
pub struct RoundRobinBalancerActor {
    core: ActorCore,
    order: RwLock<Vec<ActorRef>>,
    cursor: AtomicUsize,
}

impl RoundRobinBalancerActor {
    pub(crate) fn spawn(core: ActorCore) -> ActorRef {
        let actor = Arc::new(RoundRobinBalancerActor {
            core,
            order: RwLock::new(Vec::new()),
            cursor: AtomicUsize::new(0),
        });
        let dyn_actor: ActorRef = actor.clone();
        actor.core.bind_self(&dyn_actor);
        dyn_actor
    }

    /// Used by `ActorSystem::create_actor` while standing the cluster up,
    /// before any of these children have been returned to application code.
    pub(crate) fn push_child(&self, child: ActorRef) {
        self.order.write().unwrap().push(child);
    }

    fn next(&self) -> Result<ActorRef, ActorError> {
        let order = self.order.read().unwrap();
        if order.is_empty() {
            return Err(ActorError::TransportClosed);
        }
        let idx = self.cursor.fetch_add(1, Ordering::SeqCst) % order.len();
        Ok(order[idx].clone())
    }
}

#[async_trait]
impl ActorOps for RoundRobinBalancerActor {
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
        self.order.read().unwrap().clone()
    }

    fn forget_child(&self, id: &str) {
        self.order.write().unwrap().retain(|c| c.id() != id);
    }

    async fn send(&self, topic: &str, payload: Value) {
        if let Ok(child) = self.next() {
            child.send(topic, payload).await;
        }
    }

    async fn send_and_receive(
        &self,
        topic: &str,
        payload: Value,
        timeout: Option<Duration>,
    ) -> Result<Value, ActorError> {
        let child = self.next()?;
        let result = child.send_and_receive(topic, payload, timeout).await;
        if matches!(result, Err(ActorError::TransportClosed)) {
            self.forget_child(child.id());
        }
        result
    }

    async fn create_child(
        &self,
        spec: BehaviorSpec,
        opts: Placement,
    ) -> Result<ActorRef, ActorError> {
        if self.core.is_destroying() {
            return Err(ActorError::BeingDestroyed);
        }
        let myself = self.core.myself();
        let child = self.core.system.create_actor(spec, &myself, opts).await?;
        self.push_child(child.clone());
        Ok(child)
    }

    async fn initialize(&self) -> Result<(), ActorError> {
        Ok(())
    }

    async fn destroy(&self) -> Result<(), ActorError> {
        if self.core.begin_destroy() {
            let children = self.order.read().unwrap().clone();
            for child in children {
                let _ = child.destroy().await;
            }
            if let Some(parent) = &self.core.parent {
                parent.forget_child(&self.core.id);
            }
        }
        Ok(())
    }
}
