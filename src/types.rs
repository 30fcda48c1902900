//! Geometric primitives: points, lines, bounding boxes and grid helpers.
//!
//! All coordinates are plain `f64` layout units. Angles passed to public
//! rotation APIs are in degrees; polar helpers work in radians.

use std::fmt;
use std::ops::{Add, Mul, Sub};

use glam::DVec2;
use serde::Serialize;

/// Slack used when quantizing lengths that are already on-grid.
const GRID_EPSILON: f64 = 1e-9;

/// A 2D point
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

pub const fn pt(x: f64, y: f64) -> Point {
    Point { x, y }
}

impl Point {
    pub const ORIGIN: Point = pt(0.0, 0.0);

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point at `rho` from the origin along `angle` (radians)
    pub fn from_polar(rho: f64, angle: f64) -> Self {
        Self::new(rho * angle.cos(), rho * angle.sin())
    }

    /// `(rho, angle)` of this point relative to `origin`, angle in radians
    pub fn to_polar(self, origin: Point) -> (f64, f64) {
        let d = DVec2::from(self) - DVec2::from(origin);
        (d.length(), d.y.atan2(d.x))
    }

    pub fn distance(self, other: Point) -> f64 {
        DVec2::from(self).distance(DVec2::from(other))
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    /// Rigid rotation about `center` by `angle_deg` (counter-clockwise)
    pub fn rotate_around(&mut self, center: Point, angle_deg: f64) {
        *self = self.rotated_around(center, angle_deg);
    }

    pub fn rotated_around(self, center: Point, angle_deg: f64) -> Point {
        let c = DVec2::from(center);
        let rotation = DVec2::from_angle(angle_deg.to_radians());
        (c + rotation.rotate(DVec2::from(self) - c)).into()
    }

    pub fn snap_to_grid(&mut self, grid: f64) {
        self.x = snap_to_grid(self.x, grid);
        self.y = snap_to_grid(self.y, grid);
    }

    pub fn snapped(mut self, grid: f64) -> Point {
        self.snap_to_grid(grid);
        self
    }

    /// Unit vector in the direction of this point, or the origin if it has no length
    pub fn normalize(self) -> Point {
        DVec2::from(self).normalize_or_zero().into()
    }

    pub fn dot(self, other: Point) -> f64 {
        DVec2::from(self).dot(DVec2::from(other))
    }
}

impl From<DVec2> for Point {
    fn from(v: DVec2) -> Self {
        Point::new(v.x, v.y)
    }
}

impl From<Point> for DVec2 {
    fn from(p: Point) -> Self {
        DVec2::new(p.x, p.y)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        pt(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        pt(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        pt(self.x * rhs, self.y * rhs)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.x, self.y)
    }
}

// ============================================================================
// Line
// ============================================================================

/// An ordered pair of points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub p1: Point,
    pub p2: Point,
}

impl Line {
    pub const fn new(p1: Point, p2: Point) -> Self {
        Self { p1, p2 }
    }

    pub fn length(&self) -> f64 {
        self.p1.distance(self.p2)
    }

    pub fn midpoint(&self) -> Point {
        pt((self.p1.x + self.p2.x) / 2.0, (self.p1.y + self.p2.y) / 2.0)
    }

    /// Rise over run; infinite for vertical lines
    pub fn slope(&self) -> f64 {
        let dx = self.p2.x - self.p1.x;
        if dx == 0.0 {
            f64::INFINITY
        } else {
            (self.p2.y - self.p1.y) / dx
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.p1.translate(dx, dy);
        self.p2.translate(dx, dy);
    }

    pub fn rotate_around(&mut self, center: Point, angle_deg: f64) {
        self.p1.rotate_around(center, angle_deg);
        self.p2.rotate_around(center, angle_deg);
    }

    /// Approximates the line with on-grid points at resolution `step`.
    ///
    /// The path walks from `p1` to `p2` in `ceil(max(|dx|, |dy|) / step)`
    /// increments, snapping every intermediate point and merging runs of
    /// collinear points, so the result only has horizontal, vertical and
    /// 45° pieces.
    pub fn staircase(&self, step: f64) -> Vec<Point> {
        let dx = self.p2.x - self.p1.x;
        let dy = self.p2.y - self.p1.y;
        let steps = ((dx.abs().max(dy.abs()) / step).ceil() as usize).max(1);
        let increment = pt(dx / steps as f64, dy / steps as f64);

        let mut points = vec![self.p1];
        let mut cursor = self.p1;
        for _ in 0..steps {
            cursor = cursor + increment;
            let next = cursor.snapped(step);
            let merge = match points.as_slice() {
                [.., a, b] => is_collinear(*a, *b, next, step),
                _ => false,
            };
            if merge {
                let last = points.len() - 1;
                points[last] = next;
            } else if points.last() != Some(&next) {
                points.push(next);
            }
        }
        points
    }
}

/// Collinearity of three on-grid points, tolerant to float noise at `step` scale
fn is_collinear(p1: Point, p2: Point, p3: Point, step: f64) -> bool {
    let cross = (p2.y - p1.y) * (p3.x - p2.x) - (p3.y - p2.y) * (p2.x - p1.x);
    cross.abs() <= GRID_EPSILON * step * step
}

// ============================================================================
// Bounding box
// ============================================================================

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min: Point,
    pub max: Point,
}

impl Default for BBox {
    fn default() -> Self {
        Self::new()
    }
}

impl BBox {
    /// An empty box that any point will expand
    pub fn new() -> Self {
        Self {
            min: pt(f64::INFINITY, f64::INFINITY),
            max: pt(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Self {
        let mut bbox = Self::new();
        for p in points {
            bbox.expand(*p);
        }
        bbox
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn expand(&mut self, p: Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    pub fn union(&mut self, other: &BBox) {
        if !other.is_empty() {
            self.expand(other.min);
            self.expand(other.max);
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        pt(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    /// Corners in the order bottom-left, bottom-right, top-right, top-left
    pub fn corners(&self) -> [Point; 4] {
        [
            self.min,
            pt(self.max.x, self.min.y),
            self.max,
            pt(self.min.x, self.max.y),
        ]
    }
}

// ============================================================================
// Grid helpers
// ============================================================================

/// Number of decimals needed to write `grid` exactly (capped at 12)
fn grid_decimals(grid: f64) -> i32 {
    let mut decimals = 0;
    let mut scaled = grid;
    while decimals < 12 && (scaled - scaled.round()).abs() > GRID_EPSILON * scaled.abs().max(1.0) {
        scaled *= 10.0;
        decimals += 1;
    }
    decimals
}

/// Rounds `value` to the nearest multiple of `grid`.
///
/// Ties go to the even multiple. The result is additionally rounded to the
/// grid's own decimal places so that repeated snapping is a no-op.
pub fn snap_to_grid(value: f64, grid: f64) -> f64 {
    if grid <= 0.0 {
        return value;
    }
    let snapped = (value / grid).round_ties_even() * grid;
    let scale = 10f64.powi(grid_decimals(grid));
    (snapped * scale).round() / scale
}

/// Largest length not exceeding `length` that is an even multiple of `grid·√2`.
///
/// A segment of that length keeps both endpoints on the grid after a 45°
/// rotation about its midpoint.
pub fn grid_adjusted_length(length: f64, grid: f64) -> f64 {
    let step = grid * std::f64::consts::SQRT_2;
    let half_steps = ((length / 2.0) / step + GRID_EPSILON).floor();
    2.0 * half_steps * step
}
