//! Linear battery model.
//!
//! The level lives in `[0, 100]`, only ever decreases while the simulation
//! runs, and is restored to full by [`Battery::restore`].

/// Charge in percent below which the battery is reported as low.
pub const LOW_BATTERY_THRESHOLD: f32 = 20.0;

const FULL: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Battery {
    level: f32,
}

impl Default for Battery {
    fn default() -> Self {
        Self::full()
    }
}

impl Battery {
    /// A fully charged battery.
    pub fn full() -> Self {
        Self { level: FULL }
    }

    /// Current charge in percent.
    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_empty(&self) -> bool {
        self.level <= 0.0
    }

    pub fn is_low(&self) -> bool {
        self.level < LOW_BATTERY_THRESHOLD
    }

    /// Consume `delta * rate` percent, floored at zero.
    ///
    /// Returns `true` only on the call that empties the battery.
    pub fn drain(&mut self, delta: f32, rate: f32) -> bool {
        let was_empty = self.is_empty();
        self.level = (self.level - delta * rate).max(0.0);
        !was_empty && self.is_empty()
    }

    /// Recharge to 100 %.
    pub fn restore(&mut self) {
        self.level = FULL;
    }
}
