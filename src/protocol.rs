use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CREATE_ACTOR: &str = "create-actor";
pub const ACTOR_CREATED: &str = "actor-created";
pub const ACTOR_MESSAGE: &str = "actor-message";
pub const ACTOR_RESPONSE: &str = "actor-response";
pub const DESTROY: &str = "destroy";
pub const DESTROYED: &str = "destroyed";

/// The wire envelope exchanged between a parent and a forked worker. One
/// frame per newline-delimited JSON line (see `actor::forked::transport`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Frame {
    pub fn new(kind: impl Into<String>) -> Self {
        Frame {
            kind: kind.into(),
            id: None,
            body: None,
            error: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

/// Body of a `create-actor` frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateActorBody {
    /// Name a `BehaviorRegistry` on the worker side resolves to a factory.
    pub behavior: String,
    /// Name a `ContextRegistry` on the worker side resolves to a factory,
    /// mirroring `behavior` — absent if the forking system has no context,
    /// or its context was supplied as a `ContextSpec::Local` that can't
    /// cross the fork boundary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Placement configuration snapshot, passed through so the worker's own
    /// `ActorSystem` can keep resolving placement for its own descendants.
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub test: bool,
    #[serde(default)]
    pub debug: bool,
    pub parent: ParentRef,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParentRef {
    pub id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActorCreatedBody {
    pub id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActorMessageBody {
    pub topic: String,
    pub payload: Value,
}
