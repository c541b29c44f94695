//! [`FrameDriver`] – headless render loop.
//!
//! Stands in for a display's refresh callback: it owns the [`Simulation`],
//! calls [`Simulation::tick`] at a fixed cadence with the *measured*
//! wall-clock delta since the previous frame, and publishes the resulting
//! [`TelemetrySnapshot`] on a [`watch`] channel.  Control commands arrive on
//! an [`mpsc`] channel and are applied between frames, so the simulation has
//! exactly one owner and needs no locking.
//!
//! # Example
//!
//! ```rust,no_run
//! use ecobot_runtime::frame_driver::{DriverCommand, FrameDriver};
//! use ecobot_sim::{Simulation, SimulationConfig};
//!
//! # async fn demo() {
//! let sim = Simulation::new(SimulationConfig::default()).unwrap();
//! let handle = FrameDriver::new(sim, 60).spawn();
//! handle.send(DriverCommand::Start).await.unwrap();
//! println!("{:?}", handle.snapshot());
//! let _sim = handle.shutdown().await.unwrap();
//! # }
//! ```

use std::time::Duration;

use ecobot_sim::Simulation;
use ecobot_types::{EcoError, TelemetrySnapshot};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

const COMMAND_CAPACITY: usize = 16;

/// Operator controls applied between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverCommand {
    Start,
    Stop,
    Reset,
    /// Stop the loop and hand the simulation back.
    Shutdown,
}

pub struct FrameDriver {
    sim: Simulation,
    frame_period: Duration,
}

impl FrameDriver {
    /// Drive `sim` at `frame_rate` frames per second (minimum 1).
    pub fn new(sim: Simulation, frame_rate: u32) -> Self {
        Self {
            sim,
            frame_period: Duration::from_secs_f64(1.0 / f64::from(frame_rate.max(1))),
        }
    }

    /// Start the loop on the current Tokio runtime.
    pub fn spawn(self) -> FrameDriverHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (telemetry_tx, telemetry_rx) = watch::channel(self.sim.snapshot());
        let task = tokio::spawn(self.run(command_rx, telemetry_tx));
        FrameDriverHandle {
            commands: command_tx,
            telemetry: telemetry_rx,
            task,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<DriverCommand>,
        telemetry: watch::Sender<TelemetrySnapshot>,
    ) -> Simulation {
        let mut interval = tokio::time::interval(self.frame_period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_frame = Instant::now();
        info!(period_ms = self.frame_period.as_millis() as u64, "frame driver started");

        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(DriverCommand::Start) => self.sim.start(),
                        Some(DriverCommand::Stop) => self.sim.stop(),
                        Some(DriverCommand::Reset) => self.sim.reset(),
                        Some(DriverCommand::Shutdown) | None => break,
                    }
                    telemetry.send_replace(self.sim.snapshot());
                }
                now = interval.tick() => {
                    let delta = now.duration_since(last_frame).as_secs_f32();
                    last_frame = now;
                    let report = self.sim.tick(delta);
                    for id in &report.collected {
                        debug!(id = %id, score = self.sim.score(), "trash collected");
                    }
                    if report.battery_depleted {
                        warn!("robot is running on an empty battery");
                    }
                    telemetry.send_replace(self.sim.snapshot());
                }
            }
        }

        info!(score = self.sim.score(), "frame driver stopped");
        self.sim
    }
}

/// Control and observation handle for a running [`FrameDriver`].
pub struct FrameDriverHandle {
    commands: mpsc::Sender<DriverCommand>,
    telemetry: watch::Receiver<TelemetrySnapshot>,
    task: JoinHandle<Simulation>,
}

impl FrameDriverHandle {
    /// Queue a command for the next frame boundary.
    ///
    /// # Errors
    ///
    /// [`EcoError::DriverStopped`] once the loop has exited.
    pub async fn send(&self, command: DriverCommand) -> Result<(), EcoError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| EcoError::DriverStopped)
    }

    /// A detached command sender, e.g. for a signal handler that cannot hold
    /// the handle itself.
    pub fn commands(&self) -> mpsc::Sender<DriverCommand> {
        self.commands.clone()
    }

    /// Most recently published snapshot.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.telemetry.borrow().clone()
    }

    /// Independent receiver for snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<TelemetrySnapshot> {
        self.telemetry.clone()
    }

    /// Stop the loop and recover the simulation.
    pub async fn shutdown(self) -> Result<Simulation, EcoError> {
        // The loop also exits when every sender is gone, so a failed send
        // here is not an error on its own.
        let _ = self.commands.send(DriverCommand::Shutdown).await;
        drop(self.commands);
        self.task.await.map_err(|_| EcoError::DriverStopped)
    }
}
