//! Shared test behaviors and helpers, `mod`-included by the integration
//! test binaries that need them: the place for fixtures too small to earn
//! their own file but reused across more than one test.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use hydractor::behavior::ActorContext;
use hydractor::error::ActorError;
use hydractor::Behavior;
use hydractor_macros::behavior;
use hydractor_testkit::probe::channel::ChannelProbe;
use hydractor_testkit::probe::Probe;
use serde_json::Value;

/// Replies on `echo` with whatever payload it was sent.
pub struct Echo;

#[behavior(echo)]
impl Echo {
    pub async fn echo(&mut self, payload: Value, _ctx: &ActorContext) -> Result<Value, ActorError> {
        Ok(payload)
    }
}

/// Replies on `whoami` with its own actor id, and sleeps indefinitely on
/// `slow` so callers can exercise `send_and_receive` timeouts.
pub struct Whoami;

#[behavior(whoami, slow)]
impl Whoami {
    pub async fn whoami(&mut self, _payload: Value, ctx: &ActorContext) -> Result<Value, ActorError> {
        Ok(Value::String(ctx.id.clone()))
    }

    pub async fn slow(&mut self, _payload: Value, _ctx: &ActorContext) -> Result<Value, ActorError> {
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        Ok(Value::Null)
    }
}

/// Signals a labeled event through `probe` exactly when its `destroy` hook
/// runs, so tests can observe teardown ordering between a parent and its
/// children.
pub struct NotifyOnDestroy {
    pub label: &'static str,
    pub probe: ChannelProbe<(), &'static str>,
}

#[async_trait]
impl Behavior for NotifyOnDestroy {
    fn type_name(&self) -> &'static str {
        "notifyOnDestroy"
    }

    async fn handle(&mut self, topic: &str, _payload: Value, _ctx: &ActorContext) -> Result<Value, ActorError> {
        Err(ActorError::Handler(format!(
            "notifyOnDestroy has no handler for topic '{}'",
            topic
        )))
    }

    async fn destroy(&mut self, _ctx: &ActorContext) -> Result<(), ActorError> {
        self.probe.event(self.label);
        Ok(())
    }
}

static TEMP_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A fresh, empty directory under the OS temp dir, for tests exercising
/// `app_root`-relative configuration fallback without touching any real
/// `actors.json` a developer might have lying around.
pub fn unique_temp_dir(label: &str) -> PathBuf {
    let n = TEMP_DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!(
        "hydractor-test-{}-{}-{}",
        label,
        std::process::id(),
        n
    ));
    dir
}
