use crate::controller::{Announce, App, Ui};
use std::path::PathBuf;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Requests from the UI adapter to the engine thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register { user_id: String, name: String },
    Start,
    Stop,
    Capture,
    Snapshot(PathBuf),
    List,
    Reload,
    Shutdown,
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
}

impl EngineHandle {
    pub async fn send(&self, command: Command) -> Result<(), EngineError> {
        self.tx.send(command).await.map_err(|_| EngineError::ChannelClosed)
    }
}

/// Spawn the controller on a dedicated OS thread ticking every `period`.
///
/// The thread exits on [`Command::Shutdown`] or when every handle is dropped.
pub fn spawn_engine<U, A>(
    app: App<U, A>,
    period: Duration,
) -> Result<(EngineHandle, JoinHandle<()>), EngineError>
where
    U: Ui + Send + 'static,
    A: Announce + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Command>(8);

    let thread = std::thread::Builder::new()
        .name("rollcall-engine".into())
        .spawn(move || {
            tracing::info!(period_ms = period.as_millis() as u64, "engine thread started");
            run(app, &mut rx, period);
            tracing::info!("engine thread exiting");
        })?;

    Ok((EngineHandle { tx }, thread))
}

/// Drive `app` until shutdown: handle commands between ticks, tick at a fixed period.
///
/// Blocks on the channel while no camera is open. Returns the app for inspection.
pub fn run<U: Ui, A: Announce>(
    mut app: App<U, A>,
    rx: &mut mpsc::Receiver<Command>,
    period: Duration,
) -> App<U, A> {
    loop {
        let tick_started = Instant::now();

        loop {
            let command = if app.is_camera_open() {
                match rx.try_recv() {
                    Ok(c) => c,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return shut_down(app),
                }
            } else {
                match rx.blocking_recv() {
                    Some(c) => c,
                    None => return shut_down(app),
                }
            };

            tracing::debug!(?command, "engine command");
            if command == Command::Shutdown {
                return shut_down(app);
            }
            handle(&mut app, command);
        }

        app.tick(Instant::now());

        let elapsed = tick_started.elapsed();
        if elapsed < period {
            std::thread::sleep(period - elapsed);
        }
    }
}

fn handle<U: Ui, A: Announce>(app: &mut App<U, A>, command: Command) {
    match command {
        Command::Register { user_id, name } => app.request_registration(&user_id, &name),
        Command::Start => app.start_recognition(),
        Command::Stop => app.stop(),
        Command::Capture => app.capture(),
        Command::Snapshot(path) => app.snapshot(&path),
        Command::List => app.list_gallery(),
        Command::Reload => app.load_gallery(),
        Command::Shutdown => {}
    }
}

fn shut_down<U: Ui, A: Announce>(mut app: App<U, A>) -> App<U, A> {
    if app.is_camera_open() {
        app.stop();
    }
    app
}
