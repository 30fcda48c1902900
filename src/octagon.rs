//! Parametric octagon kernel.
//!
//! A regular octagon has its vertices at radius `apothem / cos(π/8)` and
//! angles `-π/8 + k·π/4`. Side `i` spans vertices `i` and `i + 1`, so the
//! sides run E, NE, N, NW, W, SW, S, SE counter-clockwise from the positive
//! x axis.
//!
//! Edits move the two vertices of one side so that the side's distance from
//! the origin becomes `factor · apothem`. Every edit is computed on a
//! candidate copy of the vertices, validated, and only then committed: the
//! vertex angles must increase strictly around one full turn, otherwise the
//! edit is rejected with [`GeometryBoundaryError`].

use std::f64::consts::{FRAC_PI_4, FRAC_PI_8, PI, TAU};
use std::fmt;

use crate::errors::GeometryBoundaryError;
use crate::polygon::Polygon;
use crate::types::{Point, pt};

const ANGLE_EPSILON: f64 = 1e-9;

/// One of the eight sides, in vertex order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    E,
    NE,
    N,
    NW,
    W,
    SW,
    S,
    SE,
}

impl Side {
    pub const ALL: [Side; 8] = [
        Side::E,
        Side::NE,
        Side::N,
        Side::NW,
        Side::W,
        Side::SW,
        Side::S,
        Side::SE,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Side {
        Side::ALL[index % 8]
    }

    /// E, N, W and S are axis-aligned
    pub fn is_cardinal(self) -> bool {
        self.index() % 2 == 0
    }

    /// Direction of the side's outward normal, in radians
    pub fn ref_angle(self) -> f64 {
        self.index() as f64 * FRAC_PI_4
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Side::E => "E",
            Side::NE => "NE",
            Side::N => "N",
            Side::NW => "NW",
            Side::W => "W",
            Side::SW => "SW",
            Side::S => "S",
            Side::SE => "SE",
        };
        f.write_str(name)
    }
}

/// Axis-aligned sides that can be stretched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardinalSide {
    E,
    N,
    W,
    S,
}

impl CardinalSide {
    fn stretch_index(self) -> usize {
        match self {
            CardinalSide::E => 0,
            CardinalSide::N => 1,
            CardinalSide::W => 2,
            CardinalSide::S => 3,
        }
    }
}

/// Mirror operations about the vertical and horizontal axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardinalMirror {
    EastOntoWest,
    WestOntoEast,
    NorthOntoSouth,
    SouthOntoNorth,
}

/// Mirror operations about the two diagonals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrdinalMirror {
    NorthEastOntoSouthWest,
    SouthWestOntoNorthEast,
    NorthWestOntoSouthEast,
    SouthEastOntoNorthWest,
}

/// Scale factors that keep one side's edit valid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorRange {
    pub min: f64,
    pub max: f64,
}

impl FactorRange {
    pub fn contains(&self, factor: f64) -> bool {
        factor > self.min && factor < self.max
    }
}

/// An octagon centred on the origin
#[derive(Debug, Clone, PartialEq)]
pub struct Octagon {
    apothem: f64,
    vertices: [Point; 8],
    factors: [f64; 8],
    stretch_factors: [f64; 4],
    boundaries_enabled: bool,
}

impl Octagon {
    /// A regular octagon with the given apothem
    pub fn new(apothem: f64) -> Self {
        let radius = apothem / FRAC_PI_8.cos();
        let vertices =
            std::array::from_fn(|k| Point::from_polar(radius, -FRAC_PI_8 + k as f64 * FRAC_PI_4));
        Self {
            apothem,
            vertices,
            factors: [1.0; 8],
            stretch_factors: [1.0; 4],
            boundaries_enabled: true,
        }
    }

    pub fn apothem(&self) -> f64 {
        self.apothem
    }

    pub fn vertices(&self) -> &[Point; 8] {
        &self.vertices
    }

    pub fn vertex(&self, index: usize) -> Point {
        self.vertices[index % 8]
    }

    /// Per-side scale factors applied so far, E first
    pub fn factors(&self) -> &[f64; 8] {
        &self.factors
    }

    /// Stretch factors in E, N, W, S order
    pub fn stretch_factors(&self) -> &[f64; 4] {
        &self.stretch_factors
    }

    pub fn boundaries_enabled(&self) -> bool {
        self.boundaries_enabled
    }

    /// Turn angular-order validation on or off for later edits
    pub fn set_boundaries_enabled(&mut self, enabled: bool) {
        self.boundaries_enabled = enabled;
    }

    pub fn to_polygon(&self) -> Polygon {
        Polygon::new(self.vertices.to_vec())
    }

    pub fn perimeter(&self) -> f64 {
        self.to_polygon().perimeter()
    }

    pub fn area(&self) -> f64 {
        self.to_polygon().area()
    }

    // ========================================================================
    // Side edits
    // ========================================================================

    /// Move `side` so its distance from the origin is `factor · apothem`
    pub fn scale_side(&mut self, side: Side, factor: f64) -> Result<(), GeometryBoundaryError> {
        let candidate = self.side_candidate(&self.vertices, side, factor)?;
        self.commit(candidate, &format!("scaling side {side} by {factor}"))?;
        self.factors[side.index()] = factor;
        Ok(())
    }

    /// Apply all eight side factors (E first) as one edit
    pub fn modify_apothem(&mut self, factors: [f64; 8]) -> Result<(), GeometryBoundaryError> {
        let mut candidate = self.vertices;
        for side in Side::ALL {
            candidate = self.side_candidate(&candidate, side, factors[side.index()])?;
        }
        self.commit(candidate, "modifying all sides")?;
        self.factors = factors;
        Ok(())
    }

    fn side_candidate(
        &self,
        vertices: &[Point; 8],
        side: Side,
        factor: f64,
    ) -> Result<[Point; 8], GeometryBoundaryError> {
        let target = factor * self.apothem;
        let i = side.index();
        let j = (i + 1) % 8;
        let mut candidate = *vertices;
        if side.is_cardinal() {
            // Slide each vertex along the line to its outward neighbour until it
            // reaches the target axis line
            let prev = vertices[(i + 7) % 8];
            let next = vertices[(i + 2) % 8];
            candidate[i] = axis_intersection(vertices[i], prev, side, target)
                .ok_or_else(|| degenerate(side))?;
            candidate[j] = axis_intersection(vertices[j], next, side, target)
                .ok_or_else(|| degenerate(side))?;
        } else {
            // Keep the coordinate shared with the adjacent axis-aligned side and
            // solve for the one that puts the projection on the target
            let (c, s) = (side.ref_angle().cos(), side.ref_angle().sin());
            for k in [i, j] {
                let v = vertices[k];
                candidate[k] = if shares_vertical_side(k) {
                    pt(v.x, (target - v.x * c) / s)
                } else {
                    pt((target - v.y * s) / c, v.y)
                };
            }
        }
        Ok(candidate)
    }

    // ========================================================================
    // Validation
    // ========================================================================

    fn commit(&mut self, candidate: [Point; 8], operation: &str) -> Result<(), GeometryBoundaryError> {
        if self.boundaries_enabled {
            check_angular_order(&candidate, operation)?;
        }
        self.vertices = candidate;
        Ok(())
    }

    /// Per-side factor range (E first) outside of which an edit of that side
    /// alone makes two vertices meet or cross
    pub fn allowed_factors(&self) -> [FactorRange; 8] {
        std::array::from_fn(|i| {
            let side = Side::from_index(i);
            let normal = Point::from_polar(1.0, side.ref_angle());
            let prev = self.vertices[(i + 7) % 8];
            let here = self.vertices[i];
            let there = self.vertices[(i + 1) % 8];
            let next = self.vertices[(i + 2) % 8];

            let min = prev.dot(normal).max(next.dot(normal)) / self.apothem;
            let current = here.dot(normal).max(there.dot(normal));
            let max = match line_intersection(prev, here, there, next) {
                Some(apex) if apex.dot(normal) > current => apex.dot(normal) / self.apothem,
                _ => f64::INFINITY,
            };
            FactorRange { min, max }
        })
    }

    // ========================================================================
    // Symmetry and stretch
    // ========================================================================

    /// Mirror one half of the octagon onto the other about the x or y axis
    pub fn cardinal_symmetry(&mut self, mirror: CardinalMirror) -> Result<(), GeometryBoundaryError> {
        let (sources, index_sum, axis_angle, name) = match mirror {
            CardinalMirror::EastOntoWest => ([7, 0, 1, 2], 5, PI / 2.0, "mirroring E onto W"),
            CardinalMirror::WestOntoEast => ([3, 4, 5, 6], 5, PI / 2.0, "mirroring W onto E"),
            CardinalMirror::NorthOntoSouth => ([1, 2, 3, 4], 1, 0.0, "mirroring N onto S"),
            CardinalMirror::SouthOntoNorth => ([5, 6, 7, 0], 1, 0.0, "mirroring S onto N"),
        };
        self.mirror_half(sources, index_sum, axis_angle, name)
    }

    /// Mirror one half of the octagon onto the other about a diagonal
    pub fn ordinal_symmetry(&mut self, mirror: OrdinalMirror) -> Result<(), GeometryBoundaryError> {
        let (sources, index_sum, axis_angle, name) = match mirror {
            OrdinalMirror::NorthEastOntoSouthWest => {
                ([0, 1, 2, 3], 7, 3.0 * FRAC_PI_4, "mirroring NE onto SW")
            }
            OrdinalMirror::SouthWestOntoNorthEast => {
                ([4, 5, 6, 7], 7, 3.0 * FRAC_PI_4, "mirroring SW onto NE")
            }
            OrdinalMirror::NorthWestOntoSouthEast => {
                ([2, 3, 4, 5], 3, FRAC_PI_4, "mirroring NW onto SE")
            }
            OrdinalMirror::SouthEastOntoNorthWest => {
                ([6, 7, 0, 1], 3, FRAC_PI_4, "mirroring SE onto NW")
            }
        };
        self.mirror_half(sources, index_sum, axis_angle, name)
    }

    /// Vertex `k` lands on vertex `index_sum - k` (mod 8) when reflected about
    /// the axis at `axis_angle`.
    fn mirror_half(
        &mut self,
        sources: [usize; 4],
        index_sum: usize,
        axis_angle: f64,
        operation: &str,
    ) -> Result<(), GeometryBoundaryError> {
        let (c, s) = ((2.0 * axis_angle).cos(), (2.0 * axis_angle).sin());
        let mut candidate = self.vertices;
        for k in sources {
            let v = self.vertices[k];
            candidate[(index_sum + 8 - k) % 8] = pt(c * v.x + s * v.y, s * v.x - c * v.y);
        }
        self.commit(candidate, operation)
    }

    /// Widen `side` by `factor`, shifting every vertex on either half of the
    /// perpendicular axis outward by the same amount
    pub fn cardinal_stretch(&mut self, side: CardinalSide, factor: f64) -> Result<(), GeometryBoundaryError> {
        let v = &self.vertices;
        let mut candidate = self.vertices;
        match side {
            CardinalSide::N | CardinalSide::S => {
                let (a, b) = if side == CardinalSide::N { (3, 2) } else { (7, 6) };
                let delta = (v[a].x - v[b].x).abs() * (factor - 1.0) / 2.0;
                for p in &mut candidate {
                    p.x += if p.x >= 0.0 { delta } else { -delta };
                }
            }
            CardinalSide::E | CardinalSide::W => {
                let (a, b) = if side == CardinalSide::E { (0, 1) } else { (4, 5) };
                let delta = (v[a].y - v[b].y).abs() * (factor - 1.0) / 2.0;
                for p in &mut candidate {
                    p.y += if p.y >= 0.0 { delta } else { -delta };
                }
            }
        }
        self.commit(candidate, &format!("stretching side {side:?} by {factor}"))?;
        self.stretch_factors[side.stretch_index()] = factor;
        Ok(())
    }

    // ========================================================================
    // Offsets
    // ========================================================================

    /// Vertices scaled about the vertex average by `(distance + apothem) / apothem`
    pub fn get_offset_points(&self, distance: f64) -> [Point; 8] {
        let mut polygon = self.to_polygon();
        polygon.scale((distance + self.apothem) / self.apothem);
        std::array::from_fn(|k| polygon.vertices[k])
    }

    /// Vertices of the boundary with every side moved outward by `thickness`
    /// (inward when negative)
    pub fn get_offset_vertices(&self, thickness: f64) -> [Point; 8] {
        let v = &self.vertices;
        let edge_line = |i: usize| {
            let (a, b) = (v[i], v[(i + 1) % 8]);
            let normal = pt(b.y - a.y, a.x - b.x).normalize();
            (a + normal * thickness, b + normal * thickness, normal)
        };
        std::array::from_fn(|i| {
            let (a1, b1, n1) = edge_line((i + 7) % 8);
            let (a2, b2, _) = edge_line(i);
            line_intersection(a1, b1, a2, b2).unwrap_or(v[i] + n1 * thickness)
        })
    }
}

impl fmt::Display for Octagon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "octagon apothem={:.4}", self.apothem)?;
        for (k, v) in self.vertices.iter().enumerate() {
            writeln!(f, "  P{k} = {v}")?;
        }
        write!(
            f,
            "  perimeter={:.4} area={:.4}",
            self.perimeter(),
            self.area()
        )
    }
}

fn degenerate(side: Side) -> GeometryBoundaryError {
    GeometryBoundaryError::Degenerate {
        operation: format!("scaling side {side}"),
        reason: "the neighbouring side is parallel to the target axis",
    }
}

/// Vertices 0, 1, 4 and 5 bound the E and W sides
fn shares_vertical_side(k: usize) -> bool {
    matches!(k, 0 | 1 | 4 | 5)
}

/// Where the line through `p` and `toward` meets the axis line of a cardinal side
fn axis_intersection(p: Point, toward: Point, side: Side, target: f64) -> Option<Point> {
    let d = toward - p;
    match side {
        Side::E | Side::W => {
            let x = if side == Side::E { target } else { -target };
            (d.x.abs() > f64::EPSILON).then(|| pt(x, p.y + d.y * (x - p.x) / d.x))
        }
        _ => {
            let y = if side == Side::N { target } else { -target };
            (d.y.abs() > f64::EPSILON).then(|| pt(p.x + d.x * (y - p.y) / d.y, y))
        }
    }
}

/// Intersection of the infinite lines `a1-b1` and `a2-b2`
fn line_intersection(a1: Point, b1: Point, a2: Point, b2: Point) -> Option<Point> {
    let d1 = b1 - a1;
    let d2 = b2 - a2;
    let denom = d1.x * d2.y - d1.y * d2.x;
    if denom.abs() < 1e-12 {
        return None;
    }
    let t = ((a2.x - a1.x) * d2.y - (a2.y - a1.y) * d2.x) / denom;
    Some(a1 + d1 * t)
}

/// Vertex angles must increase strictly and wind exactly once around the origin
fn check_angular_order(vertices: &[Point; 8], operation: &str) -> Result<(), GeometryBoundaryError> {
    let mut sweep = 0.0;
    for k in 0..8 {
        let a = vertices[k];
        let b = vertices[(k + 1) % 8];
        if a == Point::ORIGIN || b == Point::ORIGIN {
            return Err(GeometryBoundaryError::AngularOrder {
                operation: operation.to_string(),
                vertex: if a == Point::ORIGIN { k } else { (k + 1) % 8 },
            });
        }
        let mut step = b.y.atan2(b.x) - a.y.atan2(a.x);
        if step <= -PI {
            step += TAU;
        } else if step > PI {
            step -= TAU;
        }
        if step <= ANGLE_EPSILON {
            return Err(GeometryBoundaryError::AngularOrder {
                operation: operation.to_string(),
                vertex: (k + 1) % 8,
            });
        }
        sweep += step;
    }
    if (sweep - TAU).abs() > 1e-6 {
        return Err(GeometryBoundaryError::AngularOrder {
            operation: operation.to_string(),
            vertex: 0,
        });
    }
    Ok(())
}
