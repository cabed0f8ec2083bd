mod balancer;
mod forked;
mod in_memory;
mod stub;

pub use balancer::RoundRobinBalancerActor;
pub use forked::{ChildTransport, ForkedActorChild, ForkedActorParent, StdioTransport, Transport, TransportEvent};
pub use in_memory::InMemoryActor;
pub use stub::ActorStub;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::behavior::{ActorContext, BehaviorSpec};
use crate::config::Placement;
use crate::error::ActorError;
use crate::system::ActorSystem;

/// A handle to any actor variant. All five placement variants (in-memory,
/// forked-parent, forked-child, stub, round-robin balancer) implement
/// `ActorOps` and are handed around as this one type, so callers never need
/// to know or care where an actor actually lives.
pub type ActorRef = Arc<dyn ActorOps>;

/// The capability set every actor exposes, regardless of placement.
#[async_trait]
pub trait ActorOps: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn parent(&self) -> Option<ActorRef>;
    fn children(&self) -> Vec<ActorRef>;

    /// Drops a destroyed child from this actor's bookkeeping. Stubs and the
    /// balancer override this; the default is a no-op for variants that
    /// don't track children of their own.
    fn forget_child(&self, _id: &str) {}

    /// Fire-and-forget.
    async fn send(&self, topic: &str, payload: Value);

    /// Ask: await a correlated reply, optionally bounded by a timeout.
    async fn send_and_receive(
        &self,
        topic: &str,
        payload: Value,
        timeout: Option<Duration>,
    ) -> Result<Value, ActorError>;

    async fn create_child(
        &self,
        spec: BehaviorSpec,
        opts: Placement,
    ) -> Result<ActorRef, ActorError>;

    async fn initialize(&self) -> Result<(), ActorError>;

    async fn destroy(&self) -> Result<(), ActorError>;
}

/// Shared bookkeeping every non-stub, non-balancer actor variant embeds:
/// identity, parent/children links, a handle back to the owning system for
/// `create_child`, a lazily-bound self reference (an actor can't know its
/// own `Arc` until after it has been constructed), and the
/// being-destroyed flag `send`/`send_and_receive` consult.
pub(crate) struct ActorCore {
    pub id: String,
    pub name: String,
    pub parent: Option<ActorRef>,
    pub system: ActorSystem,
    children: DashMap<String, ActorRef>,
    myself: OnceLock<Weak<dyn ActorOps>>,
    pub destroying: AtomicBool,
}

impl ActorCore {
    pub fn new(id: String, name: String, parent: Option<ActorRef>, system: ActorSystem) -> Self {
        ActorCore {
            id,
            name,
            parent,
            system,
            children: DashMap::new(),
            myself: OnceLock::new(),
            destroying: AtomicBool::new(false),
        }
    }

    /// Must be called exactly once, right after the owning `Arc<dyn
    /// ActorOps>` is constructed, before the actor is usable.
    pub fn bind_self(&self, actor: &ActorRef) {
        let _ = self.myself.set(Arc::downgrade(actor));
    }

    pub fn myself(&self) -> ActorRef {
        self.myself
            .get()
            .and_then(Weak::upgrade)
            .expect("actor self-reference bound before use")
    }

    pub fn context(&self) -> ActorContext {
        ActorContext {
            id: self.id.clone(),
            name: self.name.clone(),
            myself: self.myself(),
            system: self.system.clone(),
        }
    }

    pub fn add_child(&self, child: ActorRef) {
        self.children.insert(child.id().to_string(), child);
    }

    pub fn remove_child(&self, id: &str) {
        self.children.remove(id);
    }

    pub fn children_vec(&self) -> Vec<ActorRef> {
        self.children.iter().map(|e| e.value().clone()).collect()
    }

    pub fn is_destroying(&self) -> bool {
        self.destroying.load(Ordering::SeqCst)
    }

    /// Returns `true` the first time it's called (i.e. this call is the one
    /// that should actually run teardown); subsequent calls return `false`.
    pub fn begin_destroy(&self) -> bool {
        !self.destroying.swap(true, Ordering::SeqCst)
    }

    pub async fn create_child(
        &self,
        spec: BehaviorSpec,
        opts: Placement,
    ) -> Result<ActorRef, ActorError> {
        if self.is_destroying() {
            return Err(ActorError::BeingDestroyed);
        }
        let myself = self.myself();
        let child = self.system.create_actor(spec, &myself, opts).await?;
        self.add_child(child.clone());
        Ok(child)
    }

    /// Destroys every child concurrently and waits for all of them.
    pub async fn destroy_children(&self) {
        let handles: Vec<_> = self
            .children_vec()
            .into_iter()
            .map(|child| tokio::spawn(async move { let _ = child.destroy().await; }))
            .collect();
        for handle in handles {
            let _ = handle.await;
        }
    }
}
