use std::error::Error;
use std::fmt;

/// The error kinds the runtime can surface, per the propagation policy:
/// spawn/protocol errors reach the originating `create_actor`/`send_and_receive`
/// call, handler errors reach `send_and_receive` callers only, and
/// configuration/logging failures are recovered locally with a warning and
/// never make it here.
pub enum ActorError {
    /// `createActor` was asked for a placement mode it doesn't recognize.
    UnknownMode(String),
    /// Forking the worker, or the worker exiting before it replied
    /// `actor-created`, failed the create call.
    SpawnFailed(String),
    /// A frame arrived out of the shape the protocol expects (unexpected
    /// type, a reply with no matching pending request, ...).
    Protocol(String),
    /// The transport to a forked actor closed (worker exited, or the
    /// IPC channel was dropped) while a message or reply was outstanding.
    TransportClosed,
    /// `send_and_receive` did not get a correlated reply before its deadline.
    Timeout,
    /// An operation was attempted on an `ActorStub` that has not been
    /// resolved to a concrete actor yet.
    StubUnresolved,
    /// The behavior's handler returned an error (`send_and_receive`) or
    /// panicked/rejected (`send`, where it is logged and dropped instead).
    Handler(String),
    /// The configuration file existed but could not be parsed.
    Config(String),
    /// `send`/`send_and_receive` arrived after `destroy()` had already begun.
    BeingDestroyed,
}

impl Error for ActorError {}

impl fmt::Display for ActorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ActorError::UnknownMode(mode) => write!(f, "unknown placement mode '{}'", mode),
            ActorError::SpawnFailed(reason) => write!(f, "failed to spawn worker: {}", reason),
            ActorError::Protocol(reason) => write!(f, "protocol error: {}", reason),
            ActorError::TransportClosed => write!(f, "transport closed"),
            ActorError::Timeout => write!(f, "timed out waiting for a reply"),
            ActorError::StubUnresolved => write!(f, "stub is not yet resolved to an actor"),
            ActorError::Handler(reason) => write!(f, "handler error: {}", reason),
            ActorError::Config(reason) => write!(f, "invalid configuration: {}", reason),
            ActorError::BeingDestroyed => write!(f, "actor is being destroyed"),
        }
    }
}

impl fmt::Debug for ActorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
