//! `ecobot-sim` – the pond-cleaning robot's kinematic core.
//!
//! Everything here runs once per displayed frame on plain values; nothing
//! blocks, allocates across frames, or talks to the outside world.
//!
//! # Modules
//!
//! - [`math`] – yaw rotation and the forward-direction convention shared by
//!   motion and the intake point.
//! - [`navigation`] – [`navigate`][navigation::navigate]: heading easing,
//!   forward displacement, boundary bounce and intake collection for one
//!   frame.
//! - [`battery`] – [`Battery`][battery::Battery]: linear drain floored at 0 %.
//! - [`scatter`] – initial trash placement.
//! - [`simulation`] – [`Simulation`][simulation::Simulation]: the
//!   `idle`/`running` state machine that owns robot, battery, items and score.

pub mod battery;
pub mod math;
pub mod navigation;
pub mod scatter;
pub mod simulation;

pub use battery::Battery;
pub use navigation::{NavParams, NavStep, RobotState, navigate};
pub use simulation::{FrameReport, Simulation, SimulationConfig};
