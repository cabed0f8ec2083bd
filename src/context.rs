use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::behavior::BehaviorSpec;
use crate::error::ActorError;
use crate::system::ActorSystem;

/// The restricted view of the owning `ActorSystem` handed to
/// `Context::initialize`: a context gets only the operations spec.md §4.1
/// calls out as safe to expose through the proxy (notably `require`), not
/// the full `create_actor`/`destroy` surface an actor gets through
/// `ActorContext`.
#[derive(Clone)]
pub struct SystemProxy {
    system: ActorSystem,
}

impl SystemProxy {
    pub(crate) fn new(system: ActorSystem) -> Self {
        SystemProxy { system }
    }

    pub fn id(&self) -> &str {
        self.system.id()
    }

    pub fn name(&self) -> &str {
        self.system.name()
    }

    /// Module loader helper (spec.md §4.1): a leading `/` resolves `path`
    /// against the system's own registered names rather than a real
    /// filesystem, and a trailing `/` is accepted the same way spec.md
    /// describes "load a whole directory" without actually walking one —
    /// both forms ultimately resolve through the `BehaviorRegistry` every
    /// forked worker already populates identically (the same named-factory
    /// redesign `BehaviorSpec::Registered` takes in place of code
    /// transport, applied here to context's module resolution too).
    pub fn require(&self, path: &str) -> Option<BehaviorSpec> {
        let name = path.trim_start_matches('/').trim_end_matches('/');
        if name.is_empty() {
            return None;
        }
        if self.system.behaviors().contains(name) {
            Some(BehaviorSpec::Registered(name.to_string()))
        } else {
            None
        }
    }
}

/// User-supplied shared state/collaborators threaded through the system
/// (spec.md §3 `ActorSystem.context`, §4.1 "resolve context"). Optional —
/// most systems never set one. `initialize` runs once, after the system's
/// own bookkeeping exists but before the root actor is built, the same
/// ordering spec.md §4.1 lays out.
#[async_trait]
pub trait Context: Send + Sync {
    /// Used to name this context in the `create-actor` frame sent to a
    /// forked worker, so the worker can resolve the same context from its
    /// own `ContextRegistry` (populated identically on both ends, mirroring
    /// `BehaviorRegistry`).
    fn type_name(&self) -> &'static str;

    async fn initialize(&self, _proxy: &SystemProxy) -> Result<(), ActorError> {
        Ok(())
    }
}

/// How a `SystemBuilder::context` caller supplies a context. `Local` can
/// only be used by the system that constructs it directly — it can't be
/// shipped across a fork boundary, the same limitation `BehaviorSpec::Local`
/// has.
pub enum ContextSpec {
    Local(Box<dyn Context>),
    Registered(String),
}

impl ContextSpec {
    pub fn registered_name(&self) -> Option<&str> {
        match self {
            ContextSpec::Registered(name) => Some(name.as_str()),
            ContextSpec::Local(_) => None,
        }
    }
}

type ContextFactory = Arc<dyn Fn() -> Box<dyn Context> + Send + Sync>;

/// The explicit registration point a parent process and the worker
/// binaries it forks populate identically, so a `ContextSpec::Registered`
/// name can be resolved on either side without shipping code — the same
/// contract `BehaviorRegistry` establishes for behaviors.
#[derive(Clone, Default)]
pub struct ContextRegistry {
    factories: Arc<DashMap<String, ContextFactory>>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        ContextRegistry {
            factories: Arc::new(DashMap::new()),
        }
    }

    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Context> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn create(&self, name: &str) -> Option<Box<dyn Context>> {
        self.factories.get(name).map(|f| f())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}
