//! Worker bootstrap used only by this crate's own forked-placement
//! integration tests (`tests/forked.rs`, `tests/supervision.rs`). Registers
//! a handful of generic behaviors (an `echo` handler, a `whoami` handler
//! for the round-robin cluster test, and a `crash` handler that exits the
//! process mid-flight) so the tests never need a bespoke worker binary per
//! scenario.

use hydractor::behavior::ActorContext;
use hydractor::error::ActorError;
use hydractor_macros::behavior;
use serde_json::Value;

struct EchoBehavior;

#[behavior(echo)]
impl EchoBehavior {
    async fn echo(&mut self, payload: Value, _ctx: &ActorContext) -> Result<Value, ActorError> {
        Ok(payload)
    }
}

struct WhoamiBehavior;

#[behavior(whoami, crash)]
impl WhoamiBehavior {
    async fn whoami(&mut self, _payload: Value, ctx: &ActorContext) -> Result<Value, ActorError> {
        Ok(Value::String(ctx.id.clone()))
    }

    /// Exits the process without replying, simulating a worker crash while a
    /// `send_and_receive` call is outstanding.
    async fn crash(&mut self, _payload: Value, _ctx: &ActorContext) -> Result<Value, ActorError> {
        std::process::exit(1);
    }
}

#[tokio::main]
async fn main() {
    let behaviors = hydractor::BehaviorRegistry::new();
    behaviors.register("echoBehavior", || Box::new(EchoBehavior));
    behaviors.register("whoamiBehavior", || Box::new(WhoamiBehavior));
    let contexts = hydractor::ContextRegistry::new();

    if let Err(e) = hydractor::worker::run(behaviors, contexts).await {
        eprintln!("hydractor-test-worker exited: {}", e);
        std::process::exit(1);
    }
}
