use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::actor::ActorRef;
use crate::error::ActorError;
use crate::system::ActorSystem;

/// What an actor does: a handler table keyed by topic, plus the optional
/// `initialize`/`destroy` lifecycle hooks. This trait is not generic over a
/// single typed `Msg`, because placement is decided at runtime and a
/// behavior has to look the same whether its actor ends up in-memory or
/// inside a forked worker — routing happens on the
/// wire `topic` string rather than on a Rust type.
#[async_trait]
pub trait Behavior: Send {
    /// Used both for config-key lookup (decapitalized) and as the name a
    /// forked worker resolves from the factory registry. The
    /// `#[hydractor_macros::behavior(...)]` attribute fills this in for you.
    fn type_name(&self) -> &'static str;

    async fn initialize(&mut self, _ctx: &ActorContext) -> Result<(), ActorError> {
        Ok(())
    }

    async fn handle(
        &mut self,
        topic: &str,
        payload: Value,
        ctx: &ActorContext,
    ) -> Result<Value, ActorError>;

    async fn destroy(&mut self, _ctx: &ActorContext) -> Result<(), ActorError> {
        Ok(())
    }
}

/// Passed to every handler invocation as `this`: a handler invocation
/// always carries its own id, name, a reference to itself, and a handle
/// back to the owning system, so it can address itself or spawn children
/// without a separate capability object.
#[derive(Clone)]
pub struct ActorContext {
    pub id: String,
    pub name: String,
    pub myself: ActorRef,
    pub system: ActorSystem,
}

/// How a `create_actor`/`create_child` caller supplies a behavior.
///
/// `Local` works only for in-memory placement: the boxed value can't be
/// shipped across a process boundary. `Registered` names an entry in a
/// `BehaviorRegistry` populated identically on both the parent and the
/// worker binary — the redesign this crate takes over runtime
/// source-to-text code transport: the worker resolves a named factory
/// instead of evaluating shipped source.
pub enum BehaviorSpec {
    Local(Box<dyn Behavior>),
    Registered(String),
}

impl BehaviorSpec {
    /// Name used for config-key lookup (before decapitalization).
    pub fn name(&self) -> String {
        match self {
            BehaviorSpec::Local(b) => b.type_name().to_string(),
            BehaviorSpec::Registered(name) => name.clone(),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, BehaviorSpec::Local(_))
    }

    pub fn registered_name(&self) -> Option<&str> {
        match self {
            BehaviorSpec::Registered(name) => Some(name.as_str()),
            BehaviorSpec::Local(_) => None,
        }
    }
}

/// Decapitalizes the first letter of a discovered behavior name, for
/// config-key lookup.
pub fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

type Factory = Arc<dyn Fn() -> Box<dyn Behavior> + Send + Sync>;

/// The explicit registration point both sides rely on: the parent
/// process and the worker binary populate the same table (by name) before
/// actors start getting created, so a `BehaviorSpec::Registered` can be
/// resolved on either side without shipping code.
#[derive(Clone, Default)]
pub struct BehaviorRegistry {
    factories: Arc<DashMap<String, Factory>>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        BehaviorRegistry {
            factories: Arc::new(DashMap::new()),
        }
    }

    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Behavior> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn create(&self, name: &str) -> Option<Box<dyn Behavior>> {
        self.factories.get(name).map(|f| f())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}
