//! Cartesian and polar conversions around the map origin.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Position expressed as a distance and bearing from the map origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PolarPosition {
    /// Distance from the origin in world units.
    pub radius: f32,
    /// Bearing in degrees within `[0, 360)`.
    pub theta: f32,
}

/// Converts a world-space point into polar form around `origin`.
#[must_use]
pub fn to_polar(point: Vec2, origin: Vec2) -> PolarPosition {
    let delta = point - origin;
    let radius = delta.length();
    let mut theta = delta.y.atan2(delta.x).to_degrees();
    if theta < 0.0 {
        theta += 360.0;
    }
    // atan2 can land on exactly 360.0 after the shift for tiny negative angles.
    if theta >= 360.0 {
        theta -= 360.0;
    }
    PolarPosition { radius, theta }
}

/// Converts a polar position around `origin` back into world space.
#[must_use]
pub fn to_cartesian(position: PolarPosition, origin: Vec2) -> Vec2 {
    let radians = position.theta.to_radians();
    origin + Vec2::new(radians.cos(), radians.sin()) * position.radius
}

/// Wraps any angle in degrees into `[0, 360)`.
#[must_use]
pub fn normalize_degrees(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Unit vector pointing along `heading` degrees in screen space.
#[must_use]
pub fn heading_vector(heading: f32) -> Vec2 {
    let radians = heading.to_radians();
    Vec2::new(radians.cos(), radians.sin())
}
