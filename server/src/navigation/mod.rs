//! Movement helpers for server-side creep AI.
//!
//! All movement happens on the XZ plane; Y is carried through unchanged.

use std::f32::consts::PI;

use rand::Rng;

/// A 2D position (x, z in world coordinates)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub z: f32,
}

impl Vec2 {
    pub fn from_3d(pos: [f32; 3]) -> Self {
        Self { x: pos[0], z: pos[2] }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.z * self.z).sqrt()
    }

    pub fn distance_to(&self, other: Vec2) -> f32 {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        (dx * dx + dz * dz).sqrt()
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2 { x: self.x - rhs.x, z: self.z - rhs.z }
    }
}

/// Planar distance between two world positions
pub fn distance_xz(a: [f32; 3], b: [f32; 3]) -> f32 {
    Vec2::from_3d(a).distance_to(Vec2::from_3d(b))
}

/// Heading (radians) that faces from `from` toward `to`
pub fn heading(from: [f32; 3], to: [f32; 3]) -> f32 {
    let dir = Vec2::from_3d(to) - Vec2::from_3d(from);
    dir.z.atan2(dir.x)
}

/// Result of one movement step
#[derive(Debug, Clone, Copy)]
pub struct Step {
    pub position: [f32; 3],
    pub rotation: Option<f32>,
    pub arrived: bool,
}

/// Move from `current` toward `target` by at most `max_distance`.
/// Never overshoots; `arrived` is set once within `tolerance`.
pub fn step_towards(current: [f32; 3], target: [f32; 3], max_distance: f32, tolerance: f32) -> Step {
    let to_target = Vec2::from_3d(target) - Vec2::from_3d(current);
    let dist = to_target.length();

    if dist <= tolerance {
        return Step { position: current, rotation: None, arrived: true };
    }

    let ratio = (max_distance.max(0.0) / dist).min(1.0);
    let position = [
        current[0] + to_target.x * ratio,
        current[1],
        current[2] + to_target.z * ratio,
    ];
    let remaining = dist * (1.0 - ratio);

    Step {
        position,
        rotation: Some(to_target.z.atan2(to_target.x)),
        arrived: remaining <= tolerance,
    }
}

/// Uniformly sample a point inside the disk of `radius` around `center`
pub fn sample_disk<R: Rng>(center: [f32; 3], radius: f32, rng: &mut R) -> [f32; 3] {
    if radius <= 0.0 {
        return center;
    }
    // sqrt of the radius sample, uniform over area
    let r = radius * rng.gen::<f32>().sqrt();
    let theta = rng.gen::<f32>() * 2.0 * PI;
    [center[0] + r * theta.cos(), center[1], center[2] + r * theta.sin()]
}
