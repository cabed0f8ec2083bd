use slog::info;

use crate::system::ActorSystem;

/// Installs SIGINT/SIGTERM handling for `system`: on either signal, logs and
/// destroys the system (cascading to every forked worker, each of which
/// notices its own transport close and exits in turn), then terminates the
/// process. Not installed automatically — an embedding application calls
/// this once after its `ActorSystem` is ready, the way a `main` wires up its
/// own shutdown policy.
pub fn install_signal_handlers(system: ActorSystem) {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!(system.log(), "received shutdown signal"; "system" => system.id().to_string());
        let _ = system.destroy().await;
        std::process::exit(0);
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
