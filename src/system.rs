use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;
use regex::Regex;
use serde_json::Value;
use slog::{o, Drain, Level, Logger};
use tokio::sync::OnceCell;

use crate::actor::{
    ActorCore, ActorOps, ActorRef, ActorStub, ChildTransport, ForkedActorChild, ForkedActorParent,
    InMemoryActor, RoundRobinBalancerActor, Transport,
};
use crate::behavior::{decapitalize, ActorContext, Behavior, BehaviorRegistry, BehaviorSpec};
use crate::config::{Configuration, ConfigSource, Mode, Placement};
use crate::context::{Context, ContextRegistry, ContextSpec, SystemProxy};
use crate::error::ActorError;
use crate::id::IdGenerator;
use crate::protocol::{self, ActorCreatedBody, CreateActorBody, Frame, ParentRef};
use crate::validate::validate_name;

/// Everything a worker process needs to know to attach itself back to the
/// parent that forked it: the stub id the parent assigned it, and the
/// transport (its own stdio) it should speak the wire protocol over.
pub struct ForkedOptions {
    pub id: String,
    pub transport: Arc<dyn Transport>,
}

/// Collects the knobs `ActorSystem::create` needs. Built via `SystemBuilder`
/// rather than constructed directly.
#[derive(Default)]
pub struct SystemBuilder {
    name: Option<String>,
    root: Option<BehaviorSpec>,
    forked: Option<ForkedOptions>,
    config: Option<ConfigSource>,
    test: bool,
    debug: bool,
    log: Option<Logger>,
    app_root: Option<PathBuf>,
    worker_program: Option<PathBuf>,
    worker_args: Vec<String>,
    behaviors: Option<BehaviorRegistry>,
    context: Option<ContextSpec>,
    contexts: Option<ContextRegistry>,
}

impl SystemBuilder {
    pub fn new() -> Self {
        SystemBuilder::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The behavior the system's root actor runs. Required unless `forked`
    /// is also set (a worker's root wraps whatever behavior the parent
    /// asked it to construct).
    pub fn root(mut self, spec: BehaviorSpec) -> Self {
        self.root = Some(spec);
        self
    }

    /// Marks this system as running inside a forked worker process, wired
    /// back up to the parent that spawned it.
    pub fn forked(mut self, opts: ForkedOptions) -> Self {
        self.forked = Some(opts);
        self
    }

    pub fn config(mut self, source: ConfigSource) -> Self {
        self.config = Some(source);
        self
    }

    pub fn test(mut self, test: bool) -> Self {
        self.test = test;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn log(mut self, log: Logger) -> Self {
        self.log = Some(log);
        self
    }

    pub fn app_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.app_root = Some(path.into());
        self
    }

    /// The executable forked for `Mode::Forked` placements. Defaults to
    /// `hydractor-worker`, resolved via `PATH` like any other child process.
    pub fn worker_program(mut self, path: impl Into<PathBuf>) -> Self {
        self.worker_program = Some(path.into());
        self
    }

    /// Extra arguments forwarded to every forked worker, after per-child
    /// debug-port rewriting (see `rewrite_debug_args`).
    pub fn worker_args(mut self, args: Vec<String>) -> Self {
        self.worker_args = args;
        self
    }

    /// The `Behavior` factories this system (and, transitively, any worker
    /// it forks) can resolve `BehaviorSpec::Registered` names against.
    pub fn behaviors(mut self, registry: BehaviorRegistry) -> Self {
        self.behaviors = Some(registry);
        self
    }

    /// Shared state/collaborators for this system (spec.md §3
    /// `ActorSystem.context`). Resolved and, if it defines one, its
    /// `initialize` hook run once, before the root actor is built.
    pub fn context(mut self, spec: ContextSpec) -> Self {
        self.context = Some(spec);
        self
    }

    /// The `Context` factories this system (and, transitively, any worker
    /// it forks) can resolve `ContextSpec::Registered` names against.
    pub fn contexts(mut self, registry: ContextRegistry) -> Self {
        self.contexts = Some(registry);
        self
    }

    pub async fn create(self) -> Result<ActorSystem, ActorError> {
        ActorSystem::create(self).await
    }
}

fn default_log(test: bool, debug: bool) -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let level = if test {
        Level::Error
    } else if debug {
        Level::Debug
    } else {
        Level::Info
    };
    let drain = slog::LevelFilter::new(drain, level).fuse();
    Logger::root(drain, o!())
}

struct Inner {
    id: String,
    name: String,
    started_at: Instant,
    log: Logger,
    config: Configuration,
    behaviors: BehaviorRegistry,
    ids: IdGenerator,
    debug_port_counter: AtomicUsize,
    worker_program: PathBuf,
    worker_args: Vec<String>,
    registered_ids: DashMap<String, ()>,
    test: bool,
    debug: bool,
    /// The system's own shared context, if one was resolved (spec.md §3).
    context: Option<Arc<dyn Context>>,
    /// The name `context` was registered under, forwarded to every forked
    /// worker's `create-actor` frame so it can resolve the same context
    /// from its own `ContextRegistry`. Absent if there is no context, or it
    /// came from a `ContextSpec::Local` that can't cross a fork boundary.
    context_name: Option<String>,
}

/// The orchestrator that owns the root actor, holds placement configuration,
/// performs placement decisions for every `create_actor` call, and forks
/// and wires up worker processes.
///
/// Cheaply `Clone`: every actor variant carries one of these, so spawning a
/// child anywhere in the tree can turn around and call back into
/// `create_actor`.
#[derive(Clone)]
pub struct ActorSystem {
    inner: Arc<Inner>,
    root: Arc<OnceLock<ActorRef>>,
}

static DEFAULT_SYSTEM: OnceCell<ActorSystem> = OnceCell::const_new();

impl ActorSystem {
    /// Builds a system with default options: an in-memory neutral root, no
    /// placement overrides beyond whatever `<app_root>/actors.json` holds.
    pub async fn new() -> Result<ActorSystem, ActorError> {
        SystemBuilder::new().create().await
    }

    /// The process-wide default system. The source this crate is modeled on
    /// reallocates its default system on every access once one already
    /// exists; that reads as an oversight rather than intent, so this
    /// lazily builds one the first time it's asked for and hands back that
    /// same instance on every later call.
    pub async fn default() -> Result<ActorSystem, ActorError> {
        DEFAULT_SYSTEM
            .get_or_try_init(|| async { ActorSystem::new().await })
            .await
            .cloned()
    }

    async fn create(mut builder: SystemBuilder) -> Result<ActorSystem, ActorError> {
        let name = builder.name.clone().unwrap_or_else(|| "hydractor".to_string());
        validate_name(&name).map_err(|e| ActorError::Config(e.to_string()))?;

        let log = builder
            .log
            .clone()
            .unwrap_or_else(|| default_log(builder.test, builder.debug));

        let app_root = builder
            .app_root
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        slog::debug!(log, "starting actor system"; "name" => name.clone());

        let config = Configuration::load(builder.config.clone(), &app_root, &log).await;

        // Resolved up front so both halves land in `Inner` before the root
        // actor is built (spec.md §4.1's "resolve context" precedes "resolve
        // root"). `take()` leaves the other builder fields untouched for
        // `build_root` below.
        let (context_name, context) = match builder.context.take() {
            None => (None, None),
            Some(ContextSpec::Local(instance)) => (None, Some(Arc::from(instance))),
            Some(ContextSpec::Registered(registered_name)) => {
                let instance = builder
                    .contexts
                    .clone()
                    .unwrap_or_default()
                    .create(&registered_name)
                    .ok_or_else(|| {
                        ActorError::SpawnFailed(format!(
                            "no context registered under '{}'",
                            registered_name
                        ))
                    })?;
                (Some(registered_name), Some(Arc::from(instance)))
            }
        };

        let inner = Arc::new(Inner {
            id: IdGenerator::new().generate(),
            name: name.clone(),
            started_at: Instant::now(),
            log: log.clone(),
            config,
            behaviors: builder.behaviors.clone().unwrap_or_default(),
            ids: IdGenerator::new(),
            debug_port_counter: AtomicUsize::new(0),
            worker_program: builder
                .worker_program
                .clone()
                .unwrap_or_else(|| PathBuf::from("hydractor-worker")),
            worker_args: builder.worker_args.clone(),
            registered_ids: DashMap::new(),
            test: builder.test,
            debug: builder.debug,
            context,
            context_name,
        });

        let system = ActorSystem {
            inner,
            root: Arc::new(OnceLock::new()),
        };

        if let Some(context) = system.inner.context.clone() {
            context.initialize(&SystemProxy::new(system.clone())).await?;
        }

        let root = system.build_root(builder).await?;
        root.initialize().await?;
        let _ = system.root.set(root);

        slog::debug!(system.inner.log, "actor system started"; "id" => system.inner.id.clone(), "name" => name);

        Ok(system)
    }

    async fn build_root(&self, builder: SystemBuilder) -> Result<ActorRef, ActorError> {
        if let Some(forked) = builder.forked {
            let spec = builder
                .root
                .ok_or_else(|| ActorError::SpawnFailed("a forked root requires a root behavior".into()))?;
            let (name, behavior) = self.resolve_behavior(spec)?;

            let id = self.generate_actor_id();
            self.register_actor_id(&id)?;

            let parent_stub = ActorStub::new(forked.id.clone());
            let inner_core = ActorCore::new(id, name, Some(parent_stub.clone()), self.clone());
            let inner_root = InMemoryActor::spawn(inner_core, behavior);

            let child = ForkedActorChild::new(Some(parent_stub), forked.transport, inner_root);
            let dyn_child: ActorRef = child.clone();
            tokio::spawn(child.run());
            Ok(dyn_child)
        } else if let Some(spec) = builder.root {
            let (name, behavior) = self.resolve_behavior(spec)?;
            let id = self.generate_actor_id();
            self.register_actor_id(&id)?;
            let core = ActorCore::new(id, name, None, self.clone());
            Ok(InMemoryActor::spawn(core, behavior))
        } else {
            let id = self.generate_actor_id();
            self.register_actor_id(&id)?;
            let core = ActorCore::new(id, "root".to_string(), None, self.clone());
            Ok(InMemoryActor::spawn(core, Box::new(RootActor)))
        }
    }

    fn resolve_behavior(&self, spec: BehaviorSpec) -> Result<(String, Box<dyn Behavior>), ActorError> {
        match spec {
            BehaviorSpec::Local(behavior) => {
                let name = behavior.type_name().to_string();
                Ok((name, behavior))
            }
            BehaviorSpec::Registered(name) => {
                let behavior = self.inner.behaviors.create(&name).ok_or_else(|| {
                    ActorError::SpawnFailed(format!("no behavior registered under '{}'", name))
                })?;
                Ok((name, behavior))
            }
        }
    }

    fn register_actor_id(&self, id: &str) -> Result<(), ActorError> {
        if self.inner.registered_ids.insert(id.to_string(), ()).is_some() {
            return Err(ActorError::SpawnFailed(format!(
                "actor id '{}' is already registered",
                id
            )));
        }
        Ok(())
    }

    /// Returns the root actor. By the time an `ActorSystem` exists at all,
    /// `create` has already awaited the root's `initialize`, so this never
    /// blocks and never finds the slot empty.
    pub fn root_actor(&self) -> ActorRef {
        self.root
            .get()
            .cloned()
            .expect("root actor initialized before ActorSystem::create returns")
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn started_at(&self) -> Instant {
        self.inner.started_at
    }

    pub fn log(&self) -> Logger {
        self.inner.log.clone()
    }

    pub fn behaviors(&self) -> &BehaviorRegistry {
        &self.inner.behaviors
    }

    /// The system's shared context, if `SystemBuilder::context` set one.
    pub fn context(&self) -> Option<Arc<dyn Context>> {
        self.inner.context.clone()
    }

    pub fn generate_actor_id(&self) -> String {
        self.inner.ids.generate()
    }

    /// The single placement dispatch point: every `create_child` call on
    /// every actor variant funnels through here.
    pub async fn create_actor(
        &self,
        spec: BehaviorSpec,
        parent: &ActorRef,
        opts: Placement,
    ) -> Result<ActorRef, ActorError> {
        let behavior_name = spec.name();
        let config_key = decapitalize(&behavior_name);

        let mut placement = Placement::default();
        if let Some(entry) = self.inner.config.get(&config_key) {
            placement = placement.overlay(entry);
        }
        placement = placement.overlay(&opts);

        if placement.cluster_size() > 1 {
            return self.create_cluster(spec, parent, placement, config_key).await;
        }

        match placement.mode() {
            Mode::InMemory => self.create_in_memory(spec, parent, behavior_name).await,
            Mode::Forked => self.create_forked(spec, parent, behavior_name).await,
            Mode::Other(raw) => Err(ActorError::UnknownMode(raw)),
        }
    }

    async fn create_in_memory(
        &self,
        spec: BehaviorSpec,
        parent: &ActorRef,
        behavior_name: String,
    ) -> Result<ActorRef, ActorError> {
        validate_name(&behavior_name).map_err(|e| ActorError::Config(e.to_string()))?;
        let (name, behavior) = self.resolve_behavior(spec)?;
        let id = self.generate_actor_id();
        self.register_actor_id(&id)?;

        let core = ActorCore::new(id, name, Some(parent.clone()), self.clone());
        let actor = InMemoryActor::spawn(core, behavior);
        actor.initialize().await?;
        Ok(actor)
    }

    async fn create_forked(
        &self,
        spec: BehaviorSpec,
        parent: &ActorRef,
        behavior_name: String,
    ) -> Result<ActorRef, ActorError> {
        validate_name(&behavior_name).map_err(|e| ActorError::Config(e.to_string()))?;
        let registered_name = spec
            .registered_name()
            .ok_or_else(|| {
                ActorError::Config("forked placement requires a registered behavior, not a local instance".into())
            })?
            .to_string();

        let args = self.spawn_args();
        let program = self.inner.worker_program.to_string_lossy().into_owned();
        let transport = ChildTransport::spawn(&program, &args, self.inner.log.clone())
            .await
            .map_err(|e| ActorError::SpawnFailed(e.to_string()))?;

        let body = CreateActorBody {
            behavior: registered_name,
            context: self.inner.context_name.clone(),
            config: self.inner.config.to_value(),
            test: self.inner.test,
            debug: self.inner.debug,
            parent: ParentRef {
                id: parent.id().to_string(),
            },
        };
        let frame = Frame::new(protocol::CREATE_ACTOR)
            .with_body(serde_json::to_value(&body).unwrap_or(Value::Null));

        if let Err(e) = transport.send(&frame).await {
            transport.kill().await;
            return Err(ActorError::SpawnFailed(e.to_string()));
        }

        let mut events = transport.subscribe();
        let reply = loop {
            match events.recv().await {
                Ok(crate::actor::TransportEvent::Message(frame)) => break Ok(frame),
                Ok(crate::actor::TransportEvent::Error(e)) => break Err(ActorError::Protocol(e)),
                Ok(crate::actor::TransportEvent::Exit) | Err(_) => {
                    break Err(ActorError::SpawnFailed(
                        "worker exited before replying to create-actor".into(),
                    ))
                }
            }
        };

        let frame = match reply {
            Ok(frame) => frame,
            Err(e) => {
                transport.kill().await;
                return Err(e);
            }
        };

        if let Some(error) = frame.error {
            transport.kill().await;
            return Err(ActorError::SpawnFailed(error));
        }
        if !frame.is(protocol::ACTOR_CREATED) {
            transport.kill().await;
            return Err(ActorError::Protocol("unexpected response for create-actor".into()));
        }

        let created: ActorCreatedBody = match frame.body.and_then(|b| serde_json::from_value(b).ok()) {
            Some(body) => body,
            None => {
                transport.kill().await;
                return Err(ActorError::Protocol("actor-created frame was missing an id".into()));
            }
        };

        self.register_actor_id(&created.id)?;
        let core = ActorCore::new(created.id, behavior_name, Some(parent.clone()), self.clone());
        let actor = ForkedActorParent::spawn(core, transport);
        actor.initialize().await?;
        Ok(actor)
    }

    async fn create_cluster(
        &self,
        spec: BehaviorSpec,
        parent: &ActorRef,
        placement: Placement,
        config_key: String,
    ) -> Result<ActorRef, ActorError> {
        let registered_name = spec.registered_name().map(str::to_string).ok_or_else(|| {
            ActorError::Config(
                "cluster placement (clusterSize > 1) requires a registered behavior, not a local instance".into(),
            )
        })?;

        let balancer_core = ActorCore::new(
            self.generate_actor_id(),
            format!("{}-cluster", config_key),
            Some(parent.clone()),
            self.clone(),
        );
        let balancer = RoundRobinBalancerActor::spawn(balancer_core);

        let mut child_placement = placement.clone();
        child_placement.cluster_size = Some(1);

        for _ in 0..placement.cluster_size() {
            let child_spec = BehaviorSpec::Registered(registered_name.clone());
            balancer.create_child(child_spec, child_placement.clone()).await?;
        }

        Ok(balancer)
    }

    /// Appends per-child debug arguments, rewriting any legacy
    /// `--debug-brk=<port>` or modern `--inspect`/`--inspect-brk[=<port>]`
    /// flag so concurrently forked children don't collide on the same port.
    fn spawn_args(&self) -> Vec<String> {
        let child_index = self.inner.debug_port_counter.fetch_add(1, Ordering::SeqCst);
        rewrite_debug_args(&self.inner.worker_args, child_index)
    }

    /// Destroys the root actor (cascading to every descendant). The caller
    /// is responsible for exiting the process afterward.
    pub async fn destroy(&self) -> Result<(), ActorError> {
        slog::info!(self.inner.log, "destroying actor system";
            "id" => self.inner.id.clone(), "uptime_ms" => self.started_at().elapsed().as_millis() as u64);
        self.root_actor().destroy().await
    }
}

fn rewrite_debug_args(args: &[String], child_index: usize) -> Vec<String> {
    let legacy = Regex::new(r"^--debug-brk=(\d+)$").expect("valid regex");
    let modern = Regex::new(r"^--inspect(-brk)?(?:=(\d+))?$").expect("valid regex");

    args.iter()
        .map(|arg| {
            if let Some(caps) = legacy.captures(arg) {
                let base: usize = caps[1].parse().unwrap_or(0);
                format!("--debug-brk={}", base + child_index)
            } else if let Some(caps) = modern.captures(arg) {
                match caps.get(2) {
                    Some(port) => {
                        let base: usize = port.as_str().parse().unwrap_or(0);
                        let brk = if caps.get(1).is_some() { "-brk" } else { "" };
                        format!("--inspect{}={}", brk, base + child_index)
                    }
                    None => arg.clone(),
                }
            } else {
                arg.clone()
            }
        })
        .collect()
}

/// The behavior a bare `ActorSystem::new()` gives its root when the caller
/// hasn't supplied one: it exists only to anchor the tree and accepts no
/// messages of its own.
struct RootActor;

#[async_trait]
impl Behavior for RootActor {
    fn type_name(&self) -> &'static str {
        "root"
    }

    async fn handle(&mut self, topic: &str, _payload: Value, _ctx: &ActorContext) -> Result<Value, ActorError> {
        Err(ActorError::Handler(format!(
            "root actor has no handler for topic '{}'",
            topic
        )))
    }
}
