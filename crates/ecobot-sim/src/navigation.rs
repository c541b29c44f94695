//! Per-frame autonomous navigation and trash collection.
//!
//! [`navigate`] advances a [`RobotState`] by one frame:
//!
//! 1. **Ease** the heading toward the target heading (first-order approach,
//!    snapping once within `heading_epsilon`).
//! 2. **Advance** along the eased heading.  Forward is `-Z` at heading `0`,
//!    so the new position is `(x - sin h · v · dt, z - cos h · v · dt)`.
//! 3. **Bounce** off the pond edge: when either axis leaves `±bounds`, add a
//!    random turn in `[π/2, 3π/2)` to the *target* heading and pull the
//!    offending axis back to `±(bounds - bounce_margin)`.  Both headings are
//!    then shifted by the same multiple of `2π` so the target stays in
//!    `[0, 2π)`.
//! 4. **Commit** the new heading and position.
//! 5. **Collect** every uncollected item within `collection_radius` of the
//!    intake point, which sits `intake_offset` ahead of the hull.  Items are
//!    reported by their index in the slice.
//!
//! Battery drain (step 6) lives in [`Battery`][crate::battery::Battery] and
//! is applied by the [`Simulation`][crate::simulation::Simulation].
//!
//! The only impurity is the injected random source used for the bounce turn,
//! so tests can pass a seeded generator and assert the exact heading change.
//!
//! # Example
//!
//! ```rust
//! use ecobot_sim::navigation::{navigate, NavParams, RobotState};
//! use ecobot_types::{CollectibleItem, Vec3};
//! use rand::SeedableRng;
//!
//! let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(1);
//! let params = NavParams::default();
//! let robot = RobotState::at_rest(Vec3::zero(), 0.0);
//! let items = vec![CollectibleItem::new("0", Vec3::new(0.0, 0.0, -2.2))];
//!
//! let step = navigate(&robot, &items, &params, 1.0, &mut rng);
//! assert_eq!(step.collected, vec![0]);
//! ```

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use ecobot_types::{CollectibleItem, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::math::{forward, rotate_y};

// ─────────────────────────────────────────────────────────────────────────────
// Parameters
// ─────────────────────────────────────────────────────────────────────────────

/// Tunables for the navigation update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavParams {
    /// Half-extent of the square pond; legal positions satisfy `|x|, |z| <= bounds`.
    pub bounds: f32,
    /// Cruise speed in units per second given to a freshly placed robot.
    pub speed: f32,
    /// Intake capture radius.
    pub collection_radius: f32,
    /// Distance from hull centre to the intake point along the forward axis.
    pub intake_offset: f32,
    /// Gain of the exponential heading approach, per second.
    pub turn_gain: f32,
    /// Below this heading error the heading snaps to the target.
    pub heading_epsilon: f32,
    /// How far inside the edge a bouncing robot is placed.
    pub bounce_margin: f32,
    /// Battery percent consumed per second while running.
    pub drain_rate: f32,
}

impl Default for NavParams {
    fn default() -> Self {
        Self {
            bounds: 20.0,
            speed: 3.5,
            collection_radius: 1.8,
            intake_offset: 2.2,
            turn_gain: 2.0,
            heading_epsilon: 0.01,
            bounce_margin: 0.5,
            drain_rate: 0.5,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// Kinematic state of the robot.  `position.y` is always `0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotState {
    pub position: Vec3,
    /// Current yaw in radians.
    pub heading: f32,
    /// Yaw the robot is easing toward.
    pub target_heading: f32,
    /// Forward speed in units per second.
    pub speed: f32,
}

impl RobotState {
    /// A robot at `position` facing `heading`, already settled on that heading.
    pub fn new(position: Vec3, heading: f32, speed: f32) -> Self {
        Self {
            position: Vec3::new(position.x, 0.0, position.z),
            heading,
            target_heading: heading,
            speed,
        }
    }

    /// A stationary robot; handy for exercising collection in isolation.
    pub fn at_rest(position: Vec3, heading: f32) -> Self {
        Self::new(position, heading, 0.0)
    }

    /// World-space position of the collection intake.
    pub fn intake_point(&self, intake_offset: f32) -> Vec3 {
        self.position
            .add(rotate_y(Vec3::new(0.0, 0.0, -intake_offset), self.heading))
    }
}

/// Result of a single [`navigate`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct NavStep {
    /// Committed robot state for the next frame.
    pub robot: RobotState,
    /// Indices into the `items` slice of items that entered the intake this
    /// frame.
    pub collected: Vec<usize>,
    /// `true` when the robot hit the pond edge this frame.
    pub bounced: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Update
// ─────────────────────────────────────────────────────────────────────────────

/// Advance `robot` by `delta` seconds and report newly collected items.
///
/// `delta` must be finite and non-negative; the render driver guarantees
/// this and no further validation happens here.
pub fn navigate<R: Rng + ?Sized>(
    robot: &RobotState,
    items: &[CollectibleItem],
    params: &NavParams,
    delta: f32,
    rng: &mut R,
) -> NavStep {
    // 1. Heading easing.
    let error = robot.target_heading - robot.heading;
    let mut heading = if error.abs() > params.heading_epsilon {
        robot.heading + error * delta * params.turn_gain
    } else {
        robot.target_heading
    };

    // 2. Forward displacement.
    let step = forward(heading);
    let mut next_x = robot.position.x + step.x * robot.speed * delta;
    let mut next_z = robot.position.z + step.z * robot.speed * delta;

    // 3. Boundary bounce.
    let mut target_heading = robot.target_heading;
    let bounds = params.bounds;
    let bounced = next_x.abs() > bounds || next_z.abs() > bounds;
    if bounced {
        let turn = FRAC_PI_2 + rng.gen_range(0.0..1.0_f32) * PI;
        target_heading += turn;

        let inner = bounds - params.bounce_margin;
        if next_x > bounds {
            next_x = inner;
        }
        if next_x < -bounds {
            next_x = -inner;
        }
        if next_z > bounds {
            next_z = inner;
        }
        if next_z < -bounds {
            next_z = -inner;
        }

        // Shift both angles together so the easing error is unchanged.
        let wraps = TAU * (target_heading / TAU).floor();
        target_heading -= wraps;
        heading -= wraps;
    }

    // 4. Commit.
    let next = RobotState {
        position: Vec3::new(next_x, 0.0, next_z),
        heading,
        target_heading,
        speed: robot.speed,
    };

    // 5. Collection against the committed pose.
    let intake = next.intake_point(params.intake_offset);
    let collected = items
        .iter()
        .enumerate()
        .filter(|(_, item)| !item.collected)
        .filter(|(_, item)| item.position.distance(intake) < params.collection_radius)
        .map(|(index, _)| index)
        .collect();

    NavStep {
        robot: next,
        collected,
        bounced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn stationary_robot_collects_item_at_intake() {
        let robot = RobotState::at_rest(Vec3::zero(), 0.0);
        let items = vec![CollectibleItem::new("0", Vec3::new(0.0, 0.0, -2.2))];
        let step = navigate(&robot, &items, &NavParams::default(), 1.0, &mut rng());
        assert_eq!(step.collected, vec![0]);
        assert!(!step.bounced);
    }

    #[test]
    fn item_behind_the_robot_is_not_collected() {
        let robot = RobotState::at_rest(Vec3::zero(), 0.0);
        let items = vec![CollectibleItem::new("0", Vec3::new(0.0, 0.0, 2.2))];
        let step = navigate(&robot, &items, &NavParams::default(), 1.0, &mut rng());
        assert!(step.collected.is_empty());
    }

    #[test]
    fn intake_follows_heading() {
        let robot = RobotState::at_rest(Vec3::new(5.0, 0.0, 5.0), FRAC_PI_2);
        let intake = robot.intake_point(2.2);
        assert!((intake.x - 2.8).abs() < 1e-5);
        assert!((intake.z - 5.0).abs() < 1e-5);
    }

    #[test]
    fn collection_radius_is_exclusive() {
        let params = NavParams::default();
        let robot = RobotState::at_rest(Vec3::zero(), 0.0);
        // Intake at (0, 0, -2.2); one item just inside, one just outside.
        let items = vec![
            CollectibleItem::new("in", Vec3::new(1.79, 0.0, -2.2)),
            CollectibleItem::new("out", Vec3::new(1.81, 0.0, -2.2)),
        ];
        let step = navigate(&robot, &items, &params, 0.016, &mut rng());
        assert_eq!(step.collected, vec![0]);
    }

    #[test]
    fn already_collected_items_are_skipped() {
        let robot = RobotState::at_rest(Vec3::zero(), 0.0);
        let mut item = CollectibleItem::new("0", Vec3::new(0.0, 0.0, -2.2));
        item.collected = true;
        let step = navigate(&robot, &[item], &NavParams::default(), 1.0, &mut rng());
        assert!(step.collected.is_empty());
    }

    #[test]
    fn several_items_can_be_collected_in_one_frame() {
        let robot = RobotState::at_rest(Vec3::zero(), 0.0);
        let items = vec![
            CollectibleItem::new("a", Vec3::new(0.5, 0.0, -2.0)),
            CollectibleItem::new("b", Vec3::new(-0.5, 0.0, -2.5)),
            CollectibleItem::new("c", Vec3::new(10.0, 0.0, 10.0)),
        ];
        let step = navigate(&robot, &items, &NavParams::default(), 0.5, &mut rng());
        assert_eq!(step.collected, vec![0, 1]);
    }

    #[test]
    fn items_sharing_an_id_are_reported_separately() {
        let robot = RobotState::at_rest(Vec3::zero(), 0.0);
        let items = vec![
            CollectibleItem::new("0", Vec3::new(0.0, 0.0, -2.2)),
            CollectibleItem::new("0", Vec3::new(0.3, 0.0, -2.0)),
        ];
        let step = navigate(&robot, &items, &NavParams::default(), 0.016, &mut rng());
        assert_eq!(step.collected, vec![0, 1]);
    }

    #[test]
    fn heading_zero_moves_toward_negative_z() {
        let robot = RobotState::new(Vec3::zero(), 0.0, 3.5);
        let step = navigate(&robot, &[], &NavParams::default(), 1.0, &mut rng());
        assert!(step.robot.position.x.abs() < 1e-6);
        assert!((step.robot.position.z + 3.5).abs() < 1e-5);
    }

    #[test]
    fn displacement_follows_forward_vector() {
        let params = NavParams::default();
        for i in 0..12 {
            let heading = i as f32 * 0.5 - 3.0;
            let robot = RobotState::new(Vec3::new(1.0, 0.0, -2.0), heading, 3.5);
            let step = navigate(&robot, &[], &params, 0.5, &mut rng());
            let travelled = step.robot.position.sub(robot.position);
            let expected = forward(heading);
            assert!((travelled.x - expected.x * 1.75).abs() < 1e-5);
            assert!((travelled.z - expected.z * 1.75).abs() < 1e-5);
        }
    }

    #[test]
    fn positive_quarter_turn_moves_toward_negative_x() {
        let robot = RobotState::new(Vec3::new(19.9, 0.0, 0.0), FRAC_PI_2, 3.5);
        let step = navigate(&robot, &[], &NavParams::default(), 1.0, &mut rng());
        assert!((step.robot.position.x - 16.4).abs() < 1e-4);
        assert!(!step.bounced);
        assert_eq!(step.robot.target_heading, FRAC_PI_2);
    }

    #[test]
    fn heading_eases_without_overshoot() {
        let mut robot = RobotState::new(Vec3::zero(), 0.0, 0.0);
        robot.target_heading = 1.0;
        let params = NavParams::default();
        let mut generator = rng();

        let step = navigate(&robot, &[], &params, 0.1, &mut generator);
        assert!((step.robot.heading - 0.2).abs() < 1e-6);

        let mut previous_error = 1.0_f32;
        let mut state = step.robot;
        for _ in 0..200 {
            state = navigate(&state, &[], &params, 0.05, &mut generator).robot;
            let error = state.target_heading - state.heading;
            assert!(error >= 0.0, "heading must never overshoot the target");
            assert!(error <= previous_error);
            previous_error = error;
        }
        assert_eq!(state.heading, state.target_heading);
    }

    #[test]
    fn heading_snaps_inside_epsilon() {
        let mut robot = RobotState::new(Vec3::zero(), 0.5, 0.0);
        robot.target_heading = 0.505;
        let step = navigate(&robot, &[], &NavParams::default(), 0.016, &mut rng());
        assert_eq!(step.robot.heading, 0.505);
    }

    #[test]
    fn bounce_clamps_to_margin_and_turns_at_least_a_quarter() {
        let params = NavParams::default();
        let heading = -FRAC_PI_2;
        let robot = RobotState::new(Vec3::new(19.9, 0.0, 0.0), heading, 3.5);

        let mut generator = rng();
        let mut replay = generator.clone();
        let expected_turn = FRAC_PI_2 + replay.gen_range(0.0..1.0_f32) * PI;

        let step = navigate(&robot, &[], &params, 1.0, &mut generator);
        assert!(step.bounced);
        assert_eq!(step.robot.position.x, 19.5);
        let turn = step.robot.target_heading - heading;
        assert!((turn - expected_turn).abs() < 1e-6);
        assert!(turn >= FRAC_PI_2 - 1e-6);
        assert!(turn < FRAC_PI_2 + PI + 1e-6);
        // The heading itself is untouched on the bounce frame.
        assert_eq!(step.robot.heading, heading);
    }

    #[test]
    fn bounce_clamps_negative_edges() {
        let params = NavParams::default();
        // Heading π/4 travels toward -x and -z simultaneously.
        let robot = RobotState::new(Vec3::new(-19.8, 0.0, -19.8), PI / 4.0, 3.5);
        let step = navigate(&robot, &[], &params, 1.0, &mut rng());
        assert!(step.bounced);
        assert_eq!(step.robot.position.x, -19.5);
        assert_eq!(step.robot.position.z, -19.5);
    }

    #[test]
    fn one_step_from_inside_stays_within_bounds() {
        let params = NavParams::default();
        let mut generator = rng();
        let inner = params.bounds - params.bounce_margin;
        for i in 0..40 {
            for j in 0..12 {
                let x = -inner + 0.01 + (i as f32) * (2.0 * inner - 0.02) / 39.0;
                let heading = j as f32 * PI / 6.0;
                let robot = RobotState::new(Vec3::new(x, 0.0, -x * 0.7), heading, 3.5);
                let step = navigate(&robot, &[], &params, 0.5, &mut generator);
                assert!(step.robot.position.x.abs() <= params.bounds);
                assert!(step.robot.position.z.abs() <= params.bounds);
            }
        }
    }

    #[test]
    fn bounce_keeps_target_heading_in_one_turn() {
        let params = NavParams::default();
        let mut robot = RobotState::new(Vec3::new(19.9, 0.0, 0.0), -FRAC_PI_2, 3.5);
        robot.target_heading = 40.0 * TAU - FRAC_PI_2 + 0.3;
        robot.heading = robot.target_heading - 0.3;

        let mut generator = rng();
        let mut replay = generator.clone();
        let turn = FRAC_PI_2 + replay.gen_range(0.0..1.0_f32) * PI;

        // Easing over 0.1 s leaves 0.3 * (1 - 0.2) of the error.
        let step = navigate(&robot, &[], &params, 0.1, &mut generator);
        assert!(step.bounced);
        let target = step.robot.target_heading;
        assert!((0.0..TAU).contains(&target), "target {target}");
        let error_after = target - step.robot.heading;
        assert!((error_after - (0.24 + turn)).abs() < 1e-3);
    }

    #[test]
    fn repeated_bounces_do_not_grow_heading() {
        let params = NavParams::default();
        let mut generator = rng();
        let mut robot = RobotState::new(Vec3::new(19.9, 0.0, 0.0), -FRAC_PI_2, 3.5);
        for _ in 0..10_000 {
            robot.position = Vec3::new(19.9, 0.0, 0.0);
            robot = navigate(&robot, &[], &params, 0.1, &mut generator).robot;
            assert!(robot.target_heading < TAU);
            assert!(robot.heading.abs() < 50.0, "heading {}", robot.heading);
        }
    }

    #[test]
    fn split_frames_match_single_frame_without_bounce() {
        let params = NavParams::default();
        let robot = RobotState::new(Vec3::new(1.0, 0.0, 2.0), 0.7, 3.5);
        let mut generator = rng();

        let once = navigate(&robot, &[], &params, 0.9, &mut generator).robot;
        let half = navigate(&robot, &[], &params, 0.35, &mut generator).robot;
        let twice = navigate(&half, &[], &params, 0.55, &mut generator).robot;

        assert!(once.position.distance(twice.position) < 1e-4);
        assert!((once.heading - twice.heading).abs() < 1e-6);
    }
}
