use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A point or displacement in the pond's world frame.
///
/// The pond surface is the X/Z plane; `y` is vertical.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    /// Create a new vector.
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    /// Euclidean length.
    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Euclidean distance between two points.
    pub fn distance(self, other: Self) -> f32 {
        self.sub(other).length()
    }
}

/// A piece of floating trash scattered across the pond.
///
/// `id` and `position` never change after creation; `collected` only ever
/// flips from `false` to `true` until the simulation is reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectibleItem {
    pub id: String,
    pub position: Vec3,
    pub collected: bool,
}

impl CollectibleItem {
    pub fn new(id: impl Into<String>, position: Vec3) -> Self {
        Self {
            id: id.into(),
            position,
            collected: false,
        }
    }

    /// Cosmetic vertical bob for display purposes only.
    ///
    /// Collection always uses [`CollectibleItem::position`].
    pub fn bob_height(&self, elapsed_secs: f32) -> f32 {
        self.position.y + (elapsed_secs * 2.0 + self.position.x).sin() * 0.1
    }
}

/// Lifecycle of a simulation instance.
///
/// `idle` is the initial state; there is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationState {
    #[default]
    Idle,
    Running,
}

impl std::fmt::Display for SimulationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationState::Idle => write!(f, "STANDBY"),
            SimulationState::Running => write!(f, "ACTIVE"),
        }
    }
}

/// Point-in-time view of a simulation, published once per frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub state: SimulationState,
    pub position_x: f32,
    pub position_z: f32,
    pub heading_rad: f32,
    pub target_heading_rad: f32,
    pub battery_percent: f32,
    /// Number of items collected since the last reset.
    pub score: u32,
    pub items_remaining: usize,
    /// `true` when the battery has dropped below 20 %.
    pub battery_low: bool,
    /// Paddle wheel angular speed in rad/s.
    pub paddle_speed: f32,
}

/// Author of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the append-only chat log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Global error type for simulation setup and the frame driver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EcoError {
    #[error("Invalid simulation parameter {name}: {details}")]
    InvalidParameter { name: String, details: String },

    #[error("Frame driver is no longer running")]
    DriverStopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 0.0, -4.0);
        assert!((a.distance(b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn new_item_is_not_collected() {
        let item = CollectibleItem::new("7", Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(item.id, "7");
        assert!(!item.collected);
    }

    #[test]
    fn bob_height_stays_within_amplitude() {
        let item = CollectibleItem::new("0", Vec3::new(3.3, 0.0, -1.0));
        for step in 0..100 {
            let h = item.bob_height(step as f32 * 0.1);
            assert!(h.abs() <= 0.1 + 1e-6);
        }
        assert_eq!(item.position.y, 0.0);
    }

    #[test]
    fn simulation_state_serializes_lowercase() {
        let json = serde_json::to_string(&SimulationState::Running).unwrap();
        assert_eq!(json, "\"running\"");
        assert_eq!(SimulationState::default(), SimulationState::Idle);
    }

    #[test]
    fn simulation_state_display_matches_status_labels() {
        assert_eq!(SimulationState::Idle.to_string(), "STANDBY");
        assert_eq!(SimulationState::Running.to_string(), "ACTIVE");
    }

    #[test]
    fn chat_turn_roundtrip() {
        let turn = ChatTurn::user("How buoyant is styrofoam?");
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("\"user\""));
        let back: ChatTurn = serde_json::from_str(&json).unwrap();
        assert_eq!(back, turn);
    }

    #[test]
    fn eco_error_display() {
        let err = EcoError::InvalidParameter {
            name: "bounds".to_string(),
            details: "must exceed the bounce margin".to_string(),
        };
        assert!(err.to_string().contains("bounds"));
        assert!(EcoError::DriverStopped.to_string().contains("no longer running"));
    }
}
