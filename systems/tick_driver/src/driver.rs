use std::{
    collections::VecDeque,
    io,
    sync::{
        mpsc::{self, RecvTimeoutError, TryRecvError},
        Arc, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use ant_maze_core::{AgentSnapshot, GridTopology, SimulationError};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::Simulation;

/// Control signal applied between ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverCommand {
    /// Carves a new maze and respawns the agents.
    Configure {
        /// Maze width in cells.
        columns: u32,
        /// Maze height in cells.
        rows: u32,
        /// Percentage of optional interior walls retained.
        density: u8,
    },
    /// Reapplies the wall density to the current maze.
    SetDensity {
        /// Percentage of optional interior walls retained.
        density: u8,
    },
}

/// Consistent view of the simulation published after every tick.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    /// Index of the tick that produced the frame.
    pub tick: u64,
    /// Agent snapshots after the tick.
    pub agents: Vec<AgentSnapshot>,
    /// Topology the tick ran against.
    pub walls: Option<Arc<GridTopology>>,
}

/// Failure reported by the driver thread.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The operating system refused to start the driver thread.
    #[error("failed to spawn tick driver thread")]
    Spawn(#[source] io::Error),
    /// A tick failed and stopped the driver.
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    /// The driver thread already stopped.
    #[error("tick driver is no longer running")]
    Disconnected,
    /// The driver thread panicked.
    #[error("tick driver thread panicked")]
    Panicked,
}

enum Control {
    Command(DriverCommand),
    Shutdown,
}

/// Runs a [`Simulation`] on a dedicated thread at a fixed period.
#[derive(Debug)]
pub struct TickDriver {
    control: mpsc::Sender<Control>,
    frame: Arc<RwLock<Frame>>,
    handle: Option<JoinHandle<Result<Simulation, SimulationError>>>,
}

impl TickDriver {
    /// Moves `simulation` onto a new thread that ticks it every `period`.
    ///
    /// Ticks are skipped until a maze has been configured.
    pub fn spawn(simulation: Simulation, period: Duration) -> Result<Self, DriverError> {
        let frame = Arc::new(RwLock::new(Frame {
            tick: simulation.tick_index(),
            agents: simulation.snapshot(),
            walls: simulation.walls(),
        }));
        let (control, receiver) = mpsc::channel();
        let published = Arc::clone(&frame);
        let handle = thread::Builder::new()
            .name("ant-maze-tick-driver".into())
            .spawn(move || run(simulation, period, &receiver, &published))
            .map_err(DriverError::Spawn)?;

        info!(period_ms = period.as_millis() as u64, "tick driver started");
        Ok(Self {
            control,
            frame,
            handle: Some(handle),
        })
    }

    /// Queues a control signal for the next gap between ticks.
    pub fn send(&self, command: DriverCommand) -> Result<(), DriverError> {
        self.control
            .send(Control::Command(command))
            .map_err(|_| DriverError::Disconnected)
    }

    /// Latest published frame.
    #[must_use]
    pub fn frame(&self) -> Frame {
        read_frame(&self.frame).clone()
    }

    /// Index of the latest published tick.
    #[must_use]
    pub fn latest_tick(&self) -> u64 {
        read_frame(&self.frame).tick
    }

    /// Reports whether the driver thread has stopped on its own.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stops the driver and hands back the simulation.
    ///
    /// Returns the fatal error instead if a tick stopped the driver early.
    pub fn shutdown(mut self) -> Result<Simulation, DriverError> {
        let handle = self.handle.take().ok_or(DriverError::Disconnected)?;
        let _ = self.control.send(Control::Shutdown);
        let simulation = handle.join().map_err(|_| DriverError::Panicked)??;
        info!(tick = simulation.tick_index(), "tick driver stopped");
        Ok(simulation)
    }
}

impl Drop for TickDriver {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.control.send(Control::Shutdown);
            let _ = handle.join();
        }
    }
}

enum Wake {
    Deadline,
    Shutdown,
}

fn run(
    mut simulation: Simulation,
    period: Duration,
    receiver: &mpsc::Receiver<Control>,
    frame: &RwLock<Frame>,
) -> Result<Simulation, SimulationError> {
    let mut pending = VecDeque::new();
    let mut deadline = Instant::now() + period;

    loop {
        if drain(receiver, &mut pending).is_err() {
            return Ok(simulation);
        }
        while let Some(control) = pending.pop_front() {
            match control {
                Control::Command(command) => {
                    apply_command(&mut simulation, command);
                    publish(frame, &simulation, simulation.snapshot());
                }
                Control::Shutdown => return Ok(simulation),
            }
        }

        if simulation.is_configured() {
            match simulation.tick() {
                Ok(agents) => publish(frame, &simulation, agents),
                Err(fault) => {
                    error!(error = %fault, tick = simulation.tick_index(), "tick failed");
                    return Err(fault);
                }
            }
        }

        if let Wake::Shutdown = wait_until(deadline, receiver, &mut pending) {
            return Ok(simulation);
        }

        deadline += period;
        let now = Instant::now();
        if deadline < now {
            debug!(
                behind_ms = now.duration_since(deadline).as_millis() as u64,
                "tick overran its period"
            );
            deadline = now + period;
        }
    }
}

fn apply_command(simulation: &mut Simulation, command: DriverCommand) {
    let result = match command {
        DriverCommand::Configure {
            columns,
            rows,
            density,
        } => simulation.configure(columns, rows, density),
        DriverCommand::SetDensity { density } => simulation.set_density(density),
    };
    if let Err(rejected) = result {
        warn!(error = %rejected, ?command, "ignored control command");
    }
}

struct Disconnected;

fn drain(
    receiver: &mpsc::Receiver<Control>,
    pending: &mut VecDeque<Control>,
) -> Result<(), Disconnected> {
    loop {
        match receiver.try_recv() {
            Ok(control) => pending.push_back(control),
            Err(TryRecvError::Empty) => return Ok(()),
            Err(TryRecvError::Disconnected) => return Err(Disconnected),
        }
    }
}

fn wait_until(
    deadline: Instant,
    receiver: &mpsc::Receiver<Control>,
    pending: &mut VecDeque<Control>,
) -> Wake {
    loop {
        let now = Instant::now();
        if now >= deadline {
            return Wake::Deadline;
        }
        match receiver.recv_timeout(deadline - now) {
            Ok(Control::Shutdown) | Err(RecvTimeoutError::Disconnected) => return Wake::Shutdown,
            Ok(control) => pending.push_back(control),
            Err(RecvTimeoutError::Timeout) => return Wake::Deadline,
        }
    }
}

fn publish(frame: &RwLock<Frame>, simulation: &Simulation, agents: Vec<AgentSnapshot>) {
    let mut guard = write_frame(frame);
    guard.tick = simulation.tick_index();
    guard.agents = agents;
    guard.walls = simulation.walls();
}

fn read_frame(frame: &RwLock<Frame>) -> RwLockReadGuard<'_, Frame> {
    frame.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_frame(frame: &RwLock<Frame>) -> RwLockWriteGuard<'_, Frame> {
    frame.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
