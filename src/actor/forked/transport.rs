use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use slog::{trace, warn, Logger};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{broadcast, Mutex};

use crate::protocol::Frame;

/// Events a transport reader pushes out: a parsed frame, a frame that
/// failed to parse, or the far end going away. Mirrors spec's
/// `onMessage`/`onError`/`onExit` callback triad as a broadcast channel,
/// since that's the idiomatic Rust shape for "many independent listeners
/// of the same asynchronous event stream".
#[derive(Clone, Debug)]
pub enum TransportEvent {
    Message(Frame),
    Error(String),
    Exit,
}

/// Bidirectional, newline-delimited-JSON, FIFO channel between a parent
/// and a worker process. `ChildTransport` is the parent-side
/// implementation, fixed around a `tokio::process::Child`;
/// `StdioTransport` (used from the worker binary) implements the same
/// trait over the worker's own stdio.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, frame: &Frame) -> std::io::Result<()>;
    fn subscribe(&self) -> broadcast::Receiver<TransportEvent>;
    async fn kill(&self);
}

pub struct ChildTransport {
    child: Mutex<Child>,
    stdin: Mutex<tokio::process::ChildStdin>,
    events: broadcast::Sender<TransportEvent>,
    initial_rx: std::sync::Mutex<Option<broadcast::Receiver<TransportEvent>>>,
}

impl ChildTransport {
    /// Forks `program` with `args`, wiring its stdin/stdout as the frame
    /// channel (stderr is inherited so worker panics still surface on the
    /// parent's console). Spawns a background task that reads one JSON
    /// frame per line and republishes it on `events`.
    pub async fn spawn(
        program: &str,
        args: &[String],
        log: Logger,
    ) -> std::io::Result<Arc<Self>> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = command.spawn()?;
        let stdin = child.stdin.take().expect("child spawned with piped stdin");
        let stdout = child.stdout.take().expect("child spawned with piped stdout");

        // The channel's own receiver is retained and handed out to the
        // first `subscribe()` caller, so a frame the reader task broadcasts
        // before anyone has explicitly subscribed isn't lost (broadcast
        // only delivers to receivers that already exist at send time).
        let (events, initial_rx) = broadcast::channel(256);
        spawn_reader(BufReader::new(stdout), events.clone(), log);

        Ok(Arc::new(ChildTransport {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            events,
            initial_rx: std::sync::Mutex::new(Some(initial_rx)),
        }))
    }
}

#[async_trait]
impl Transport for ChildTransport {
    async fn send(&self, frame: &Frame) -> std::io::Result<()> {
        write_frame(&self.stdin, frame).await
    }

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        match self.initial_rx.lock().unwrap().take() {
            Some(rx) => rx,
            None => self.events.subscribe(),
        }
    }

    async fn kill(&self) {
        let _ = self.child.lock().await.start_kill();
    }
}

/// Worker-side transport: the mirror image of `ChildTransport`, reading
/// frames from the worker's own stdin and writing replies to its own
/// stdout. There is nothing to `kill` from this side; the worker notices
/// the parent going away when its stdin read loop hits EOF.
pub struct StdioTransport {
    stdout: Mutex<tokio::io::Stdout>,
    events: broadcast::Sender<TransportEvent>,
    initial_rx: std::sync::Mutex<Option<broadcast::Receiver<TransportEvent>>>,
}

impl StdioTransport {
    pub fn new(log: Logger) -> Arc<Self> {
        // Same reservation as `ChildTransport::spawn`: the worker's own
        // stdin read loop can outrun the first explicit `subscribe()` call
        // (`worker::run` reads `create-actor` immediately), so the channel's
        // own receiver is kept and handed out first.
        let (events, initial_rx) = broadcast::channel(256);
        spawn_reader(BufReader::new(tokio::io::stdin()), events.clone(), log);
        Arc::new(StdioTransport {
            stdout: Mutex::new(tokio::io::stdout()),
            events,
            initial_rx: std::sync::Mutex::new(Some(initial_rx)),
        })
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn send(&self, frame: &Frame) -> std::io::Result<()> {
        write_frame(&self.stdout, frame).await
    }

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        match self.initial_rx.lock().unwrap().take() {
            Some(rx) => rx,
            None => self.events.subscribe(),
        }
    }

    async fn kill(&self) {
        // A worker cannot kill its own parent; nothing to do here.
    }
}

async fn write_frame<W>(writer: &Mutex<W>, frame: &Frame) -> std::io::Result<()>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(frame)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    line.push('\n');
    let mut writer = writer.lock().await;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}

fn spawn_reader<R>(mut reader: BufReader<R>, events: broadcast::Sender<TransportEvent>, log: Logger)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    trace!(log, "transport read side closed");
                    let _ = events.send(TransportEvent::Exit);
                    break;
                }
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<Frame>(trimmed) {
                        Ok(frame) => {
                            let _ = events.send(TransportEvent::Message(frame));
                        }
                        Err(e) => {
                            warn!(log, "dropped a malformed frame"; "error" => e.to_string());
                            let _ = events.send(TransportEvent::Error(e.to_string()));
                        }
                    }
                }
                Err(e) => {
                    warn!(log, "transport read error"; "error" => e.to_string());
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    let _ = events.send(TransportEvent::Exit);
                    break;
                }
            }
        }
    });
}
