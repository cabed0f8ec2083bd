//! Baseline worker bootstrap: an application that forks workers for its own
//! custom behaviors ships its own thin binary registering those behaviors
//! and calling `hydractor::worker::run`. This one runs with an empty
//! registry and exists so the fork protocol has something to exec against
//! out of the box (exercised by this crate's own forked-placement tests).

#[tokio::main]
async fn main() {
    let behaviors = hydractor::BehaviorRegistry::new();
    let contexts = hydractor::ContextRegistry::new();
    if let Err(e) = hydractor::worker::run(behaviors, contexts).await {
        eprintln!("hydractor-worker exited: {}", e);
        std::process::exit(1);
    }
}
