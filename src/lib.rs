#![crate_name = "hydractor"]
#![deny(clippy::all)]
#![allow(clippy::large_enum_variant)]

mod validate;

pub mod actor;
pub mod behavior;
pub mod config;
pub mod context;
pub mod error;
pub mod id;
pub mod protocol;
pub mod supervision;
pub mod system;
pub mod worker;

pub use actor::{ActorOps, ActorRef};
pub use behavior::{ActorContext, Behavior, BehaviorRegistry, BehaviorSpec};
pub use context::{Context, ContextRegistry, ContextSpec, SystemProxy};
pub use error::ActorError;
pub use system::{ActorSystem, ForkedOptions, SystemBuilder};
