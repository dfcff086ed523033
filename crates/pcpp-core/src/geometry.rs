//! Planar geometry helpers shared by the instance model and the solvers.
//!
//! All angles are in radians. Directions are normalized to `[0, 2π)`, turn
//! angles to `[0, π]` where `0` means passing straight through a vertex and
//! `π` is a full U-turn.

use std::f64::consts::PI;

const TWO_PI: f64 = 2.0 * PI;

/// A point in the plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Euclidean distance between two points.
pub fn distance(p0: Point, p1: Point) -> f64 {
    ((p0.x - p1.x).powi(2) + (p0.y - p1.y).powi(2)).sqrt()
}

/// Direction of `to` as seen from `origin`, in `[0, 2π)`.
pub fn direction(to: Point, origin: Point) -> f64 {
    (to.y - origin.y).atan2(to.x - origin.x).rem_euclid(TWO_PI)
}

/// The absolute difference between two angles, in `[0, π]`.
pub fn abs_angle_difference(a0: f64, a1: f64) -> f64 {
    let diff = (a0 - a1).rem_euclid(TWO_PI);
    diff.min(TWO_PI - diff)
}

/// The clockwise angle from `v0` to `v1` around `origin`, in `[0, 2π)`.
pub fn clockwise_angle(v0: Point, v1: Point, origin: Point) -> f64 {
    (direction(v0, origin) - direction(v1, origin)).rem_euclid(TWO_PI)
}

/// The minimum angle between the rays from `origin` through `v0` and `v1`.
pub fn min_angle(v0: Point, v1: Point, origin: Point) -> f64 {
    clockwise_angle(v0, v1, origin).min(clockwise_angle(v1, v0, origin))
}

/// The turn angle when moving from `v0` to `v2` over `v1`.
///
/// `0` if the three points are collinear with `v1` in the middle, `π` for a
/// U-turn (`v0 == v2` up to direction).
pub fn turn_angle(v0: Point, v1: Point, v2: Point) -> f64 {
    PI - min_angle(v0, v2, v1)
}

/// The turn angle from `v0` to `v2` over `v1` when the trajectory at `v1` is
/// constrained to a straight line of the given orientation.
///
/// The passage splits into two turns against the orientation line, one per
/// end; the cheaper of the two end pairings is taken. This is always at least
/// [`turn_angle`], with equality iff `v0`, `v1`, `v2` lie on the orientation.
pub fn forced_turn_angle(v0: Point, v1: Point, v2: Point, orientation: f64) -> f64 {
    let heading_a = direction(v0, v1);
    let heading_b = direction(v2, v1);
    let forward = orientation;
    let backward = orientation + PI;
    let split_a = abs_angle_difference(heading_a, forward) + abs_angle_difference(heading_b, backward);
    let split_b = abs_angle_difference(heading_b, forward) + abs_angle_difference(heading_a, backward);
    split_a.min(split_b)
}
