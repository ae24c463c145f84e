//! The authoritative tick loop.
//!
//! One dedicated thread owns the [`Simulation`] and runs a current-thread
//! tokio runtime. Each pass of the loop handles exactly one of: the shutdown
//! signal, one queued command, or the tick timer. Network tasks talk to it
//! through an [`EngineClient`]: commands go in over a bounded queue and
//! state comes out as a published [`WorldSnapshot`].

use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use loil_core::{CharacterId, LocationId, ObjectId, PlayerId};
use loil_simulation::{InteractionOutcome, SimError, SimResult, Simulation};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};

use crate::bridge::WorldSnapshot;

/// Tuning for the tick loop.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fixed timer period between ticks.
    pub tick_period: Duration,
    /// Capacity of the command queue; commands beyond it are rejected.
    pub queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(16),
            queue_capacity: 256,
        }
    }
}

/// Errors returned to engine callers.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The command queue is full; the caller should retry later.
    #[error("command queue is full")]
    Busy,

    /// The tick loop has stopped.
    #[error("engine is shutting down")]
    ShuttingDown,

    /// The simulation rejected the command.
    #[error(transparent)]
    Sim(#[from] SimError),

    /// The tick thread could not be started.
    #[error("failed to start engine thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The tick thread panicked.
    #[error("engine thread panicked")]
    Panicked,
}

type Reply<T> = oneshot::Sender<SimResult<T>>;

enum Command {
    Join {
        player: PlayerId,
        character: Option<CharacterId>,
        location: LocationId,
        reply: Reply<CharacterId>,
    },
    Heading {
        player: PlayerId,
        direction: i8,
        vertical: i8,
        reply: Reply<()>,
    },
    Stop {
        player: PlayerId,
        reply: Reply<()>,
    },
    Interact {
        player: PlayerId,
        object: ObjectId,
        index: usize,
        reply: Reply<InteractionOutcome>,
    },
}

impl Command {
    fn apply(self, sim: &mut Simulation, snapshots: &watch::Sender<Arc<WorldSnapshot>>) {
        match self {
            Self::Join {
                player,
                character,
                location,
                reply,
            } => {
                let result = sim.bind_player(player, character, location);
                finish(sim, snapshots, result, reply);
            }
            Self::Heading {
                player,
                direction,
                vertical,
                reply,
            } => {
                let result =
                    controlled_by(sim, player).and_then(|id| sim.set_heading(id, direction, vertical));
                finish(sim, snapshots, result, reply);
            }
            Self::Stop { player, reply } => {
                let result = controlled_by(sim, player).and_then(|id| sim.stop(id));
                finish(sim, snapshots, result, reply);
            }
            Self::Interact {
                player,
                object,
                index,
                reply,
            } => {
                let result =
                    controlled_by(sim, player).and_then(|id| sim.interact(id, object, index));
                finish(sim, snapshots, result, reply);
            }
        }
    }
}

fn controlled_by(sim: &Simulation, player: PlayerId) -> SimResult<CharacterId> {
    sim.world()
        .character_for_player(player)
        .map(|c| c.id)
        .ok_or(SimError::NoCharacter(player))
}

/// Publish on success, then answer the caller.
fn finish<T>(
    sim: &Simulation,
    snapshots: &watch::Sender<Arc<WorldSnapshot>>,
    result: SimResult<T>,
    reply: Reply<T>,
) {
    if result.is_ok() {
        publish(sim, snapshots);
    }
    if reply.send(result).is_err() {
        tracing::debug!("command caller went away before the reply");
    }
}

fn publish(sim: &Simulation, snapshots: &watch::Sender<Arc<WorldSnapshot>>) {
    snapshots.send_replace(Arc::new(WorldSnapshot::capture(sim)));
}

// ---------------------------------------------------------------------------
// Client handle
// ---------------------------------------------------------------------------

/// Cloneable handle used by network tasks.
#[derive(Clone)]
pub struct EngineClient {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Arc<WorldSnapshot>>,
}

impl fmt::Debug for EngineClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineClient")
            .field("queue_capacity", &self.commands.max_capacity())
            .field("closed", &self.commands.is_closed())
            .finish()
    }
}

impl EngineClient {
    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .try_send(command(tx))
            .map_err(|e| match e {
                TrySendError::Full(_) => EngineError::Busy,
                TrySendError::Closed(_) => EngineError::ShuttingDown,
            })?;
        let result = rx.await.map_err(|_| EngineError::ShuttingDown)?;
        Ok(result?)
    }

    /// Bind `player` to a character; see [`Simulation::bind_player`].
    pub async fn join(
        &self,
        player: PlayerId,
        character: Option<CharacterId>,
        location: LocationId,
    ) -> Result<CharacterId, EngineError> {
        self.request(|reply| Command::Join {
            player,
            character,
            location,
            reply,
        })
        .await
    }

    /// Set the heading of the player's character.
    pub async fn set_heading(
        &self,
        player: PlayerId,
        direction: i8,
        vertical: i8,
    ) -> Result<(), EngineError> {
        self.request(|reply| Command::Heading {
            player,
            direction,
            vertical,
            reply,
        })
        .await
    }

    /// Stop the player's character.
    pub async fn stop(&self, player: PlayerId) -> Result<(), EngineError> {
        self.request(|reply| Command::Stop { player, reply }).await
    }

    /// Run interaction `index` of `object` for the player's character.
    pub async fn interact(
        &self,
        player: PlayerId,
        object: ObjectId,
        index: usize,
    ) -> Result<InteractionOutcome, EngineError> {
        self.request(|reply| Command::Interact {
            player,
            object,
            index,
            reply,
        })
        .await
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<WorldSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// A receiver notified whenever a new snapshot is published.
    pub fn subscribe(&self) -> watch::Receiver<Arc<WorldSnapshot>> {
        self.snapshots.clone()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Owner of the tick thread.
pub struct Engine {
    client: EngineClient,
    shutdown: oneshot::Sender<()>,
    thread: JoinHandle<Simulation>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("client", &self.client)
            .field("finished", &self.thread.is_finished())
            .finish()
    }
}

impl Engine {
    /// Move `sim` onto a new tick thread and start the loop.
    pub fn spawn(sim: Simulation, config: EngineConfig) -> Result<Self, EngineError> {
        let (commands_tx, commands_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (snapshots_tx, snapshots_rx) = watch::channel(Arc::new(WorldSnapshot::capture(&sim)));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let period = config.tick_period.max(Duration::from_millis(1));

        let thread = std::thread::Builder::new()
            .name("loil-tick".into())
            .spawn(move || run(sim, commands_rx, shutdown_rx, snapshots_tx, period))
            .map_err(EngineError::Spawn)?;

        Ok(Self {
            client: EngineClient {
                commands: commands_tx,
                snapshots: snapshots_rx,
            },
            shutdown: shutdown_tx,
            thread,
        })
    }

    /// A new handle for sending commands and reading snapshots.
    pub fn client(&self) -> EngineClient {
        self.client.clone()
    }

    /// Stop the loop and take the simulation back. Commands still queued are
    /// dropped; their callers see [`EngineError::ShuttingDown`].
    pub fn shutdown(self) -> Result<Simulation, EngineError> {
        let Self {
            client,
            shutdown,
            thread,
        } = self;
        drop(client);
        if shutdown.send(()).is_err() {
            tracing::debug!("tick loop already stopped");
        }
        thread.join().map_err(|_| EngineError::Panicked)
    }
}

fn run(
    sim: Simulation,
    commands: mpsc::Receiver<Command>,
    shutdown: oneshot::Receiver<()>,
    snapshots: watch::Sender<Arc<WorldSnapshot>>,
    period: Duration,
) -> Simulation {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "could not start the tick runtime");
            return sim;
        }
    };
    runtime.block_on(tick_loop(sim, commands, shutdown, snapshots, period))
}

async fn tick_loop(
    mut sim: Simulation,
    mut commands: mpsc::Receiver<Command>,
    mut shutdown: oneshot::Receiver<()>,
    snapshots: watch::Sender<Arc<WorldSnapshot>>,
    period: Duration,
) -> Simulation {
    let mut timer = tokio::time::interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = Instant::now();
    tracing::info!(period_ms = period.as_millis() as u64, "tick loop started");

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            Some(command) = commands.recv() => command.apply(&mut sim, &snapshots),
            _ = timer.tick() => {
                let now = Instant::now();
                let elapsed = now.duration_since(last).as_secs_f64();
                last = now;
                match sim.tick(elapsed) {
                    Ok(report) => {
                        if report.changed || !report.transitions.is_empty() {
                            publish(&sim, &snapshots);
                        }
                    }
                    Err(e) => tracing::error!(error = %e, tick = sim.current_tick(), "tick failed"),
                }
            }
        }
    }

    commands.close();
    tracing::info!(tick = sim.current_tick(), "tick loop stopped");
    sim
}
