//! Planar rotation helpers.
//!
//! The robot only ever rotates about the vertical axis, so a full quaternion
//! pipeline is unnecessary.  The conventions here match the renderer's
//! right-handed axis-angle rotation about `(0, 1, 0)`: a heading of `0`
//! faces `-Z`, and positive headings turn toward `-X`.
//!
//! ```rust
//! use ecobot_sim::math::{forward, rotate_y};
//! use ecobot_types::Vec3;
//!
//! let f = forward(0.0);
//! assert!((f.z + 1.0).abs() < 1e-6);
//!
//! let nose = rotate_y(Vec3::new(0.0, 0.0, -2.0), std::f32::consts::FRAC_PI_2);
//! assert!((nose.x + 2.0).abs() < 1e-5);
//! ```

use ecobot_types::Vec3;

/// Rotate `v` by `angle` radians about the vertical (Y) axis.
pub fn rotate_y(v: Vec3, angle: f32) -> Vec3 {
    let (sin, cos) = angle.sin_cos();
    Vec3::new(v.x * cos + v.z * sin, v.y, -v.x * sin + v.z * cos)
}

/// Unit vector the robot moves along when facing `heading`.
///
/// Equal to `rotate_y((0, 0, -1), heading)`, i.e. `(-sin h, 0, -cos h)`.
pub fn forward(heading: f32) -> Vec3 {
    let (sin, cos) = heading.sin_cos();
    Vec3::new(-sin, 0.0, -cos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn approx(a: Vec3, b: Vec3) -> bool {
        a.distance(b) < 1e-5
    }

    #[test]
    fn rotate_by_zero_is_identity() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert!(approx(rotate_y(v, 0.0), v));
    }

    #[test]
    fn quarter_turn_maps_minus_z_to_minus_x() {
        let v = rotate_y(Vec3::new(0.0, 0.0, -1.0), FRAC_PI_2);
        assert!(approx(v, Vec3::new(-1.0, 0.0, 0.0)));
    }

    #[test]
    fn half_turn_flips_direction() {
        let v = rotate_y(Vec3::new(0.0, 0.0, -1.0), PI);
        assert!(approx(v, Vec3::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn rotation_preserves_length_and_height() {
        let v = Vec3::new(0.3, 1.5, -2.2);
        let r = rotate_y(v, 1.234);
        assert!((r.length() - v.length()).abs() < 1e-5);
        assert_eq!(r.y, v.y);
    }

    #[test]
    fn forward_matches_rotated_local_axis() {
        for step in 0..16 {
            let h = step as f32 * 0.4 - 3.0;
            assert!(approx(forward(h), rotate_y(Vec3::new(0.0, 0.0, -1.0), h)));
        }
    }
}
