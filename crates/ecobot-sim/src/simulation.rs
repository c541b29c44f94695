//! [`Simulation`] – owner of all per-instance mutable state.
//!
//! Holds exactly one [`RobotState`], one [`Battery`], the trash set and the
//! score, and drives them through the `idle` / `running` state machine:
//!
//! | Transition | From | To |
//! |---|---|---|
//! | [`start`][Simulation::start] | idle | running |
//! | [`stop`][Simulation::stop] | running | idle |
//! | [`reset`][Simulation::reset] | any | idle |
//!
//! [`tick`][Simulation::tick] is the render driver's once-per-frame entry
//! point.  While idle it changes nothing.
//!
//! # Example
//!
//! ```rust
//! use ecobot_sim::{Simulation, SimulationConfig};
//!
//! let mut sim = Simulation::new(SimulationConfig::seeded(3)).unwrap();
//! sim.start();
//! let report = sim.tick(1.0 / 60.0);
//! assert!(report.collected.len() <= 20);
//! assert!(sim.battery().level() < 100.0);
//! ```

use std::collections::HashSet;

use ecobot_types::{CollectibleItem, EcoError, SimulationState, TelemetrySnapshot, Vec3};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::battery::Battery;
use crate::navigation::{NavParams, RobotState, navigate};
use crate::scatter::scatter_items;

/// Paddle wheel speed shown while the robot is under way, in rad/s.
pub const RUNNING_PADDLE_SPEED: f32 = 5.0;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Everything needed to build a [`Simulation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    #[serde(flatten)]
    pub nav: NavParams,
    /// Number of trash items scattered at start-up.
    pub item_count: usize,
    /// Half-extent of the square the items are scattered over.
    pub scatter_extent: f32,
    /// Seed for item placement and bounce turns.  `None` draws from entropy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            nav: NavParams::default(),
            item_count: 20,
            scatter_extent: 20.0,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Default parameters with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), EcoError> {
        let nav = &self.nav;
        let finite = [
            ("bounds", nav.bounds),
            ("speed", nav.speed),
            ("collection_radius", nav.collection_radius),
            ("intake_offset", nav.intake_offset),
            ("turn_gain", nav.turn_gain),
            ("heading_epsilon", nav.heading_epsilon),
            ("bounce_margin", nav.bounce_margin),
            ("drain_rate", nav.drain_rate),
            ("scatter_extent", self.scatter_extent),
        ];
        for (name, value) in finite {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(name, format!("must be finite and non-negative, got {value}")));
            }
        }
        if nav.bounds <= nav.bounce_margin {
            return Err(invalid(
                "bounds",
                format!("must exceed bounce_margin ({})", nav.bounce_margin),
            ));
        }
        if self.item_count > 0 && self.scatter_extent <= 0.0 {
            return Err(invalid("scatter_extent", "must be positive when items are scattered".into()));
        }
        Ok(())
    }
}

fn invalid(name: &str, details: String) -> EcoError {
    EcoError::InvalidParameter {
        name: name.to_string(),
        details,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Frame report
// ─────────────────────────────────────────────────────────────────────────────

/// What happened during one [`Simulation::tick`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Ids collected this frame, each at most once per reset cycle.
    pub collected: Vec<String>,
    pub bounced: bool,
    /// `true` on the single frame that drained the battery to zero.
    pub battery_depleted: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Simulation
// ─────────────────────────────────────────────────────────────────────────────

pub struct Simulation {
    config: SimulationConfig,
    state: SimulationState,
    robot: RobotState,
    battery: Battery,
    items: Vec<CollectibleItem>,
    score: u32,
    rng: ChaCha8Rng,
}

impl Simulation {
    /// Build an idle simulation with freshly scattered items.
    ///
    /// # Errors
    ///
    /// Returns [`EcoError::InvalidParameter`] for negative or non-finite
    /// parameters, or a pond too small for its bounce margin.
    pub fn new(config: SimulationConfig) -> Result<Self, EcoError> {
        config.validate()?;
        let mut rng = config
            .seed
            .map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64);
        let items = scatter_items(config.item_count, config.scatter_extent, &mut rng);
        info!(
            items = items.len(),
            bounds = config.nav.bounds,
            seeded = config.seed.is_some(),
            "simulation created"
        );
        Ok(Self::assemble(config, items, rng))
    }

    /// Build an idle simulation around a caller-supplied item layout.
    ///
    /// # Errors
    ///
    /// As [`Simulation::new`], plus [`EcoError::InvalidParameter`] naming
    /// `items` when two items share an id.
    pub fn with_items(
        config: SimulationConfig,
        items: Vec<CollectibleItem>,
    ) -> Result<Self, EcoError> {
        config.validate()?;
        let mut seen = HashSet::with_capacity(items.len());
        if let Some(dup) = items.iter().find(|item| !seen.insert(item.id.as_str())) {
            return Err(invalid("items", format!("duplicate item id {:?}", dup.id)));
        }
        let rng = config
            .seed
            .map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64);
        Ok(Self::assemble(config, items, rng))
    }

    fn assemble(config: SimulationConfig, items: Vec<CollectibleItem>, rng: ChaCha8Rng) -> Self {
        let robot = RobotState::new(Vec3::zero(), 0.0, config.nav.speed);
        Self {
            config,
            state: SimulationState::Idle,
            robot,
            battery: Battery::full(),
            items,
            score: 0,
            rng,
        }
    }

    // ── State machine ────────────────────────────────────────────────────────

    pub fn start(&mut self) {
        if self.state == SimulationState::Idle {
            info!("mission started");
        }
        self.state = SimulationState::Running;
    }

    pub fn stop(&mut self) {
        if self.state == SimulationState::Running {
            info!(score = self.score, battery = self.battery.level(), "mission stopped");
        }
        self.state = SimulationState::Idle;
    }

    /// Return to idle with a full battery, zero score, every item back on the
    /// water and the robot at the origin.  Item positions are kept.
    pub fn reset(&mut self) {
        self.state = SimulationState::Idle;
        self.score = 0;
        self.battery.restore();
        for item in &mut self.items {
            item.collected = false;
        }
        self.robot = RobotState::new(Vec3::zero(), 0.0, self.config.nav.speed);
        info!("simulation reset");
    }

    // ── Frame update ─────────────────────────────────────────────────────────

    /// Advance by `delta` seconds of wall-clock time.
    ///
    /// Does nothing while idle.
    pub fn tick(&mut self, delta: f32) -> FrameReport {
        if self.state != SimulationState::Running {
            return FrameReport::default();
        }

        let step = navigate(
            &self.robot,
            &self.items,
            &self.config.nav,
            delta,
            &mut self.rng,
        );
        self.robot = step.robot;
        if step.bounced {
            debug!(
                x = self.robot.position.x,
                z = self.robot.position.z,
                target_heading = self.robot.target_heading,
                "bounced off pond edge"
            );
        }

        let mut collected = Vec::with_capacity(step.collected.len());
        for index in step.collected {
            if let Some(id) = self.mark_collected(index) {
                collected.push(id);
            }
        }

        let battery_depleted = self.battery.drain(delta, self.config.nav.drain_rate);
        if battery_depleted {
            warn!(score = self.score, "battery depleted");
        }

        FrameReport {
            collected,
            bounced: step.bounced,
            battery_depleted,
        }
    }

    /// Flip the item at `index` to collected and bump the score.  Returns its
    /// id, or `None` when the item was already collected.
    fn mark_collected(&mut self, index: usize) -> Option<String> {
        match self.items.get_mut(index) {
            Some(item) if !item.collected => {
                item.collected = true;
                self.score += 1;
                debug!(id = %item.id, score = self.score, "item collected");
                Some(item.id.clone())
            }
            _ => None,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn robot(&self) -> &RobotState {
        &self.robot
    }

    pub fn battery(&self) -> &Battery {
        &self.battery
    }

    pub fn items(&self) -> &[CollectibleItem] {
        &self.items
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn items_remaining(&self) -> usize {
        self.items.iter().filter(|item| !item.collected).count()
    }

    /// Paddle wheel speed for the renderer: spinning only while running.
    pub fn paddle_speed(&self) -> f32 {
        match self.state {
            SimulationState::Running => RUNNING_PADDLE_SPEED,
            SimulationState::Idle => 0.0,
        }
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            state: self.state,
            position_x: self.robot.position.x,
            position_z: self.robot.position.z,
            heading_rad: self.robot.heading,
            target_heading_rad: self.robot.target_heading,
            battery_percent: self.battery.level(),
            score: self.score,
            items_remaining: self.items_remaining(),
            battery_low: self.battery.is_low(),
            paddle_speed: self.paddle_speed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_at_intake() -> Vec<CollectibleItem> {
        vec![CollectibleItem::new("0", Vec3::new(0.0, 0.0, -2.2))]
    }

    #[test]
    fn starts_idle_with_full_battery_and_twenty_items() {
        let sim = Simulation::new(SimulationConfig::seeded(1)).unwrap();
        assert_eq!(sim.state(), SimulationState::Idle);
        assert_eq!(sim.battery().level(), 100.0);
        assert_eq!(sim.items().len(), 20);
        assert_eq!(sim.items_remaining(), 20);
        assert_eq!(sim.score(), 0);
        assert_eq!(sim.paddle_speed(), 0.0);
    }

    #[test]
    fn idle_tick_changes_nothing() {
        let mut sim = Simulation::with_items(SimulationConfig::seeded(1), item_at_intake()).unwrap();
        let before = sim.snapshot();
        let report = sim.tick(1.0);
        assert_eq!(report, FrameReport::default());
        assert_eq!(sim.snapshot(), before);
    }

    #[test]
    fn stop_freezes_battery() {
        let mut sim = Simulation::with_items(SimulationConfig::seeded(1), Vec::new()).unwrap();
        sim.start();
        sim.tick(10.0);
        let level = sim.battery().level();
        assert_eq!(level, 95.0);
        sim.stop();
        sim.tick(10.0);
        assert_eq!(sim.battery().level(), level);
    }

    #[test]
    fn collection_scores_once() {
        let mut config = SimulationConfig::seeded(1);
        config.nav.speed = 0.0;
        let mut sim = Simulation::with_items(config, item_at_intake()).unwrap();
        sim.start();

        let first = sim.tick(1.0);
        assert_eq!(first.collected, vec!["0".to_string()]);
        assert_eq!(sim.score(), 1);

        let second = sim.tick(1.0);
        assert!(second.collected.is_empty());
        assert_eq!(sim.score(), 1);
        assert!(sim.items()[0].collected);
    }

    #[test]
    fn battery_empties_after_two_hundred_seconds() {
        let mut sim = Simulation::with_items(SimulationConfig::seeded(5), Vec::new()).unwrap();
        sim.start();
        let mut depleted = 0;
        let mut previous = sim.battery().level();
        for _ in 0..200 {
            if sim.tick(1.0).battery_depleted {
                depleted += 1;
            }
            let level = sim.battery().level();
            assert!(level <= previous && level >= 0.0);
            previous = level;
        }
        assert_eq!(sim.battery().level(), 0.0);
        assert_eq!(depleted, 1);
        // An empty battery does not halt the mission.
        assert_eq!(sim.state(), SimulationState::Running);
        assert_eq!(sim.paddle_speed(), RUNNING_PADDLE_SPEED);
    }

    #[test]
    fn reset_mid_run_restores_everything() {
        let mut sim = Simulation::new(SimulationConfig::seeded(8)).unwrap();
        sim.start();
        sim.tick(0.5);
        sim.score = 7;
        sim.battery.drain(120.0, 0.5);
        for item in sim.items.iter_mut().take(7) {
            item.collected = true;
        }
        let positions: Vec<Vec3> = sim.items().iter().map(|item| item.position).collect();

        sim.reset();

        assert_eq!(sim.state(), SimulationState::Idle);
        assert_eq!(sim.score(), 0);
        assert_eq!(sim.battery().level(), 100.0);
        assert!(sim.items().iter().all(|item| !item.collected));
        let after: Vec<Vec3> = sim.items().iter().map(|item| item.position).collect();
        assert_eq!(after, positions);
        assert_eq!(sim.robot().position, Vec3::zero());
    }

    #[test]
    fn running_robot_stays_in_pond() {
        let mut sim = Simulation::new(SimulationConfig::seeded(11)).unwrap();
        sim.start();
        for _ in 0..5_000 {
            sim.tick(1.0 / 30.0);
            let p = sim.robot().position;
            assert!(p.x.abs() <= 20.0 && p.z.abs() <= 20.0);
        }
        assert!(sim.score() as usize + sim.items_remaining() == 20);
    }

    #[test]
    fn same_seed_same_trajectory() {
        let run = || {
            let mut sim = Simulation::new(SimulationConfig::seeded(21)).unwrap();
            sim.start();
            for _ in 0..1_000 {
                sim.tick(1.0 / 60.0);
            }
            sim.snapshot()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn snapshot_reflects_running_state() {
        let mut sim = Simulation::with_items(SimulationConfig::seeded(2), Vec::new()).unwrap();
        sim.start();
        sim.tick(170.0);
        let snap = sim.snapshot();
        assert_eq!(snap.state, SimulationState::Running);
        assert_eq!(snap.paddle_speed, RUNNING_PADDLE_SPEED);
        assert!(snap.battery_low);
        assert_eq!(snap.items_remaining, 0);
    }

    #[test]
    fn rejects_pond_smaller_than_margin() {
        let mut config = SimulationConfig::default();
        config.nav.bounds = 0.5;
        let err = Simulation::new(config).err().unwrap();
        assert!(matches!(err, EcoError::InvalidParameter { ref name, .. } if name == "bounds"));
    }

    #[test]
    fn rejects_duplicate_item_ids() {
        let items = vec![
            CollectibleItem::new("0", Vec3::new(0.0, 0.0, -2.2)),
            CollectibleItem::new("0", Vec3::new(0.3, 0.0, -2.0)),
        ];
        let err = Simulation::with_items(SimulationConfig::seeded(1), items).err().unwrap();
        assert!(matches!(err, EcoError::InvalidParameter { ref name, .. } if name == "items"));
    }

    #[test]
    fn neighbouring_items_are_all_collected() {
        let mut config = SimulationConfig::seeded(1);
        config.nav.speed = 0.0;
        let items = vec![
            CollectibleItem::new("a", Vec3::new(0.0, 0.0, -2.2)),
            CollectibleItem::new("b", Vec3::new(0.3, 0.0, -2.0)),
        ];
        let mut sim = Simulation::with_items(config, items).unwrap();
        sim.start();

        let report = sim.tick(1.0 / 60.0);
        assert_eq!(report.collected, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(sim.score(), 2);
        assert_eq!(sim.items_remaining(), 0);
    }

    #[test]
    fn rejects_non_finite_speed() {
        let mut config = SimulationConfig::default();
        config.nav.speed = f32::NAN;
        assert!(Simulation::new(config).is_err());
    }
}
