use std::sync::Arc;

use serde_json::json;
use slog::{error, info, Logger};

use crate::actor::{StdioTransport, Transport, TransportEvent};
use crate::behavior::{BehaviorRegistry, BehaviorSpec};
use crate::config::ConfigSource;
use crate::context::{ContextRegistry, ContextSpec};
use crate::error::ActorError;
use crate::protocol::{self, CreateActorBody, Frame};
use crate::system::{ForkedOptions, SystemBuilder};

/// The body of a worker process: read the single `create-actor` frame the
/// parent sends on startup, resolve the named behavior against `behaviors`,
/// build an `ActorSystem` wrapping it in a `ForkedActorChild`, reply
/// `actor-created`, then block until the parent's transport closes.
///
/// `behaviors` and `contexts` must be populated with the same names the
/// parent process registers — the contract `BehaviorSpec::Registered` and
/// `ContextSpec::Registered` rely on. A thin `main` in an embedding
/// application registers its own behaviors/contexts and calls this; the
/// crate's own `hydractor-worker` binary calls it with whatever registries
/// it was given (empty by default).
pub async fn run(behaviors: BehaviorRegistry, contexts: ContextRegistry) -> Result<(), ActorError> {
    let log = worker_log();
    let transport: Arc<dyn Transport> = StdioTransport::new(log.clone());

    let body = match read_create_actor(&transport).await {
        Ok(body) => body,
        Err(e) => {
            error!(log, "worker could not read create-actor frame"; "error" => e.to_string());
            return Err(e);
        }
    };

    let forked = ForkedOptions {
        id: body.parent.id.clone(),
        transport: transport.clone(),
    };

    let mut system_builder = SystemBuilder::new()
        .log(log.clone())
        .test(body.test)
        .debug(body.debug)
        .forked(forked)
        .root(BehaviorSpec::Registered(body.behavior.clone()))
        .config(ConfigSource::Data(body.config))
        .behaviors(behaviors)
        .contexts(contexts);

    if let Some(context_name) = body.context.clone() {
        system_builder = system_builder.context(ContextSpec::Registered(context_name));
    }

    let system = system_builder.create().await;

    let system = match system {
        Ok(system) => system,
        Err(e) => {
            let _ = transport
                .send(&Frame::new(protocol::ACTOR_CREATED).with_error(e.to_string()))
                .await;
            return Err(e);
        }
    };

    let root_id = system.root_actor().id().to_string();
    info!(log, "worker root actor ready"; "id" => root_id.clone());
    let _ = transport
        .send(&Frame::new(protocol::ACTOR_CREATED).with_body(json!({ "id": root_id })))
        .await;

    wait_for_close(&transport).await;
    Ok(())
}

async fn read_create_actor(transport: &Arc<dyn Transport>) -> Result<CreateActorBody, ActorError> {
    let mut events = transport.subscribe();
    loop {
        match events.recv().await {
            Ok(TransportEvent::Message(frame)) => {
                if !frame.is(protocol::CREATE_ACTOR) {
                    continue;
                }
                let body = frame
                    .body
                    .and_then(|b| serde_json::from_value(b).ok())
                    .ok_or_else(|| ActorError::Protocol("malformed create-actor frame".into()))?;
                return Ok(body);
            }
            Ok(TransportEvent::Error(e)) => return Err(ActorError::Protocol(e)),
            Ok(TransportEvent::Exit) | Err(_) => {
                return Err(ActorError::TransportClosed);
            }
        }
    }
}

async fn wait_for_close(transport: &Arc<dyn Transport>) {
    let mut events = transport.subscribe();
    loop {
        match events.recv().await {
            Ok(TransportEvent::Exit) => break,
            Ok(_) => continue,
            Err(_) => break,
        }
    }
}

fn worker_log() -> Logger {
    use slog::{o, Drain};
    let decorator = slog_term::PlainSyncDecorator::new(std::io::stderr());
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    Logger::root(drain, o!())
}
