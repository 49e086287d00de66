//! Background execution context for the asset cache manager.
//!
//! The worker owns one `AssetCacheManager` inside a spawned Tokio task and
//! handles one command at a time, so lifecycle events reach the manager in
//! the order the host sent them and never overlap. Lifecycle outcomes are
//! reported on an event channel; fetch answers come back on a oneshot.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use super::{
    Activation, AssetCacheManager, AssetError, CacheStorage, Fetcher, Installation,
    LifecycleState, Restoration, Served,
};

/// Buffer size for the worker command and event channels.
/// The host sends at most a handful of lifecycle events per run.
const CHANNEL_BUFFER_SIZE: usize = 16;

/// Lifecycle outcomes reported back to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// Version a previous run activated (or none)
    Restored(Option<Restoration>),
    Installed(Installation),
    Activated(Activation),
    /// A lifecycle event failed; the manager is back in `state`
    Failed {
        event: &'static str,
        error: String,
        state: LifecycleState,
    },
}

enum Command {
    Restore,
    Install,
    Activate,
    Fetch(String, oneshot::Sender<Result<Served, AssetError>>),
}

/// Handle for sending lifecycle events to the worker task.
/// Clone is cheap - all clones feed the same task.
#[derive(Clone)]
pub struct AssetWorker {
    commands: mpsc::Sender<Command>,
}

impl AssetWorker {
    /// Move the manager into a background task.
    ///
    /// The task ends once every handle has been dropped.
    pub fn spawn<S, F>(manager: AssetCacheManager<S, F>) -> (Self, mpsc::Receiver<WorkerEvent>)
    where
        S: CacheStorage + 'static,
        F: Fetcher + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        tokio::spawn(run(manager, command_rx, event_tx));

        (
            Self {
                commands: command_tx,
            },
            event_rx,
        )
    }

    pub async fn restore(&self) -> Result<(), AssetError> {
        self.send(Command::Restore).await
    }

    pub async fn install(&self) -> Result<(), AssetError> {
        self.send(Command::Install).await
    }

    pub async fn activate(&self) -> Result<(), AssetError> {
        self.send(Command::Activate).await
    }

    /// Route a request through the cache, waiting for the answer.
    pub async fn fetch(&self, path: &str) -> Result<Served, AssetError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Fetch(path.to_string(), reply_tx)).await?;
        reply_rx.await.map_err(|_| AssetError::WorkerClosed)?
    }

    async fn send(&self, command: Command) -> Result<(), AssetError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| AssetError::WorkerClosed)
    }
}

async fn run<S: CacheStorage, F: Fetcher>(
    mut manager: AssetCacheManager<S, F>,
    mut commands: mpsc::Receiver<Command>,
    events: mpsc::Sender<WorkerEvent>,
) {
    debug!("Asset worker started");

    while let Some(command) = commands.recv().await {
        let event = match command {
            Command::Restore => Some(match manager.restore().await {
                Ok(version) => WorkerEvent::Restored(version),
                Err(e) => failed("restore", e, &manager),
            }),
            Command::Install => Some(match manager.install().await {
                Ok(installation) => WorkerEvent::Installed(installation),
                Err(e) => failed("install", e, &manager),
            }),
            Command::Activate => Some(match manager.activate().await {
                Ok(activation) => WorkerEvent::Activated(activation),
                Err(e) => failed("activate", e, &manager),
            }),
            Command::Fetch(path, reply) => {
                // The requester may have given up; nothing to report then
                let _ = reply.send(manager.fetch(&path).await);
                None
            }
        };

        if let Some(event) = event {
            if let Err(e) = events.send(event).await {
                error!(error = %e, "Failed to send worker event - channel closed");
            }
        }
    }

    debug!("Asset worker stopped");
}

fn failed<S: CacheStorage, F: Fetcher>(
    event: &'static str,
    error: AssetError,
    manager: &AssetCacheManager<S, F>,
) -> WorkerEvent {
    WorkerEvent::Failed {
        event,
        error: error.to_string(),
        state: manager.state(),
    }
}
