//! Layer-tagged polygons and the containment/clearance tests the pipeline relies on.

use glam::DVec2;
use serde::Serialize;

use crate::types::{BBox, Line, Point, pt};

/// A GDSII layer/datatype pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GdsLayer {
    pub layer: u16,
    pub datatype: u16,
}

impl GdsLayer {
    pub const fn new(layer: u16, datatype: u16) -> Self {
        Self { layer, datatype }
    }
}

/// A closed polygon; the closing vertex is not repeated.
///
/// Winding depends on how the polygon was built, so nothing here assumes
/// clockwise or counter-clockwise order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Polygon {
    pub vertices: Vec<Point>,
    #[serde(flatten)]
    pub layer: Option<GdsLayer>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self {
            vertices,
            layer: None,
        }
    }

    pub fn with_layer(mut self, layer: GdsLayer) -> Self {
        self.layer = Some(layer);
        self
    }

    /// A copy of this polygon tagged with `layer`
    pub fn on_layer(&self, layer: GdsLayer) -> Self {
        self.clone().with_layer(layer)
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Edges in vertex order, including the closing edge
    pub fn edges(&self) -> impl Iterator<Item = Line> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| Line::new(self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Shoelace area (always non-negative)
    pub fn area(&self) -> f64 {
        let twice: f64 = self
            .edges()
            .map(|e| e.p1.x * e.p2.y - e.p2.x * e.p1.y)
            .sum();
        twice.abs() / 2.0
    }

    pub fn perimeter(&self) -> f64 {
        self.edges().map(|e| e.length()).sum()
    }

    /// Arithmetic mean of the vertices.
    ///
    /// This is not the area centroid; gap and via placement are anchored to it.
    pub fn midpoint(&self) -> Point {
        if self.vertices.is_empty() {
            return Point::ORIGIN;
        }
        let sum = self
            .vertices
            .iter()
            .fold(DVec2::ZERO, |acc, p| acc + DVec2::from(*p));
        (sum / self.vertices.len() as f64).into()
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        for v in &mut self.vertices {
            v.translate(dx, dy);
        }
    }

    pub fn rotate_around(&mut self, center: Point, angle_deg: f64) {
        for v in &mut self.vertices {
            v.rotate_around(center, angle_deg);
        }
    }

    /// Scales about the vertex-average midpoint
    pub fn scale(&mut self, factor: f64) {
        let m = self.midpoint();
        for v in &mut self.vertices {
            *v = m + (*v - m) * factor;
        }
    }

    pub fn snap_to_grid(&mut self, grid: f64) {
        for v in &mut self.vertices {
            v.snap_to_grid(grid);
        }
    }

    /// Ray-casting point-in-polygon test
    pub fn contains_point(&self, p: Point) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut p1 = self.vertices[0];
        for i in 1..=n {
            let p2 = self.vertices[i % n];
            if p.y > p1.y.min(p2.y) && p.y <= p1.y.max(p2.y) && p.x <= p1.x.max(p2.x) && p1.y != p2.y
            {
                let x_inters = (p.y - p1.y) * (p2.x - p1.x) / (p2.y - p1.y) + p1.x;
                if p1.x == p2.x || p.x <= x_inters {
                    inside = !inside;
                }
            }
            p1 = p2;
        }
        inside
    }

    /// True when every vertex of `self` lies inside `other`.
    ///
    /// Only vertices are tested: an edge of `self` may still leave `other`.
    pub fn is_inside(&self, other: &Polygon) -> bool {
        self.vertices.iter().all(|v| other.contains_point(*v))
    }

    /// True when any edge of `self` crosses or touches an edge of `other`
    pub fn intersects(&self, other: &Polygon) -> bool {
        self.edges()
            .any(|a| other.edges().any(|b| segments_intersect(&a, &b)))
    }

    /// True when some vertex of either polygon is within `threshold` of an
    /// edge of the other
    pub fn is_near_edge(&self, other: &Polygon, threshold: f64) -> bool {
        let near = |points: &[Point], poly: &Polygon| {
            points.iter().any(|p| {
                poly.edges()
                    .any(|e| point_segment_distance(*p, e.p1, e.p2) <= threshold)
            })
        };
        near(&self.vertices, other) || near(&other.vertices, self)
    }

    pub fn bounding_box(&self) -> BBox {
        BBox::from_points(&self.vertices)
    }

    /// The bounding box as a 4-vertex polygon (BL, BR, TR, TL)
    pub fn bounding_box_polygon(&self) -> Polygon {
        Polygon::new(self.bounding_box().corners().to_vec())
    }

    /// Replaces every edge with its staircase approximation at `step`
    pub fn generate_staircase_lines(&mut self, step: f64) {
        let mut vertices = Vec::new();
        for edge in self.edges() {
            vertices.extend(edge.staircase(step).into_iter().skip(1));
        }
        self.vertices = vertices;
    }
}

/// Bounding box of a group of polygons
pub fn bounding_box_of(polygons: &[Polygon]) -> BBox {
    let mut bbox = BBox::new();
    for p in polygons {
        bbox.union(&p.bounding_box());
    }
    bbox
}

/// Places a polygon group on `line`.
///
/// The group is translated so that `reference` lands on the line midpoint,
/// shifted by `offset_x` along the line and `offset_y` across it, then
/// rotated about that point to follow the line direction.
pub fn move_polygons_on_line(
    polygons: &mut [Polygon],
    reference: Point,
    line: &Line,
    offset_x: f64,
    offset_y: f64,
) {
    let direction = (line.p2 - line.p1).normalize();
    let angle = (-direction.x).atan2(direction.y).to_degrees();
    let across = pt(direction.y, -direction.x);
    let target = line.midpoint() + direction * offset_x + across * offset_y;
    let shift = target - reference;
    for polygon in polygons {
        polygon.translate(shift.x, shift.y);
        polygon.rotate_around(target, angle - 90.0);
    }
}

/// Distance from `p` to the closed segment `a`-`b`
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let (p, a, b) = (DVec2::from(p), DVec2::from(a), DVec2::from(b));
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

fn orientation(p: Point, q: Point, r: Point) -> i8 {
    let v = (q.y - p.y) * (r.x - q.x) - (q.x - p.x) * (r.y - q.y);
    if v == 0.0 {
        0
    } else if v > 0.0 {
        1
    } else {
        2
    }
}

fn on_segment(p: Point, q: Point, r: Point) -> bool {
    q.x <= p.x.max(r.x) && q.x >= p.x.min(r.x) && q.y <= p.y.max(r.y) && q.y >= p.y.min(r.y)
}

fn segments_intersect(a: &Line, b: &Line) -> bool {
    let o1 = orientation(a.p1, a.p2, b.p1);
    let o2 = orientation(a.p1, a.p2, b.p2);
    let o3 = orientation(b.p1, b.p2, a.p1);
    let o4 = orientation(b.p1, b.p2, a.p2);

    if o1 != o2 && o3 != o4 {
        return true;
    }
    (o1 == 0 && on_segment(a.p1, b.p1, a.p2))
        || (o2 == 0 && on_segment(a.p1, b.p2, a.p2))
        || (o3 == 0 && on_segment(b.p1, a.p1, b.p2))
        || (o4 == 0 && on_segment(b.p1, a.p2, b.p2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
        Polygon::new(vec![pt(x0, y0), pt(x1, y0), pt(x1, y1), pt(x0, y1)])
    }

    fn assert_point_eq(a: Point, b: Point) {
        assert!(
            (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9,
            "expected {b}, got {a}"
        );
    }

    // ==================== Measure tests ====================

    #[test]
    fn area_and_perimeter_of_rectangle() {
        let r = rect(0.0, 0.0, 4.0, 3.0);
        assert_eq!(r.area(), 12.0);
        assert_eq!(r.perimeter(), 14.0);
    }

    #[test]
    fn area_ignores_winding() {
        let mut r = rect(0.0, 0.0, 2.0, 2.0);
        r.vertices.reverse();
        assert_eq!(r.area(), 4.0);
    }

    #[test]
    fn midpoint_is_vertex_average_not_centroid() {
        // Extra collinear vertex pulls the average but not the centroid
        let p = Polygon::new(vec![
            pt(0.0, 0.0),
            pt(1.0, 0.0),
            pt(2.0, 0.0),
            pt(2.0, 2.0),
            pt(0.0, 2.0),
        ]);
        assert_point_eq(p.midpoint(), pt(1.0, 0.8));
    }

    #[test]
    fn scale_about_midpoint() {
        let mut r = rect(-1.0, -1.0, 1.0, 1.0);
        r.scale(2.0);
        assert_eq!(r.bounding_box().corners(), rect(-2.0, -2.0, 2.0, 2.0).vertices[..]);
    }

    // ==================== Containment tests ====================

    #[test]
    fn contains_point_inside_and_outside() {
        let r = rect(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains_point(pt(5.0, 5.0)));
        assert!(!r.contains_point(pt(15.0, 5.0)));
        assert!(!r.contains_point(pt(5.0, -1.0)));
    }

    #[test]
    fn is_inside_checks_vertices_only() {
        // U shape: a bar spanning the notch has its vertices inside but
        // crosses the empty notch
        let u = Polygon::new(vec![
            pt(0.0, 0.0),
            pt(10.0, 0.0),
            pt(10.0, 10.0),
            pt(7.0, 10.0),
            pt(7.0, 3.0),
            pt(3.0, 3.0),
            pt(3.0, 10.0),
            pt(0.0, 10.0),
        ]);
        let bar = rect(1.0, 5.0, 9.0, 6.0);
        assert!(bar.is_inside(&u));
        assert!(bar.intersects(&u));
        let small = rect(1.0, 1.0, 2.0, 2.0);
        assert!(small.is_inside(&u));
    }

    #[test]
    fn intersects_detects_crossing_edges() {
        let a = rect(0.0, 0.0, 4.0, 4.0);
        assert!(a.intersects(&rect(2.0, 2.0, 6.0, 6.0)));
        assert!(!a.intersects(&rect(5.0, 5.0, 6.0, 6.0)));
        // fully nested: no edge crossing
        assert!(!a.intersects(&rect(1.0, 1.0, 2.0, 2.0)));
    }

    #[test]
    fn near_edge_uses_both_directions() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(11.0, 2.0, 12.0, 3.0);
        assert!(b.is_near_edge(&a, 1.0));
        assert!(!b.is_near_edge(&a, 0.5));
        // c's vertices are far from a, but a's top corners sit under c's edge
        let c = rect(-5.0, 10.5, 25.0, 12.0);
        assert!(c.is_near_edge(&a, 0.75));
        assert!(!c.is_near_edge(&a, 0.25));
    }

    #[test]
    fn point_segment_distance_clamps_to_endpoints() {
        let d = point_segment_distance(pt(5.0, 3.0), pt(0.0, 0.0), pt(2.0, 0.0));
        assert!((d - 18f64.sqrt()).abs() < 1e-12);
        assert_eq!(point_segment_distance(pt(1.0, 2.0), pt(0.0, 0.0), pt(2.0, 0.0)), 2.0);
    }

    // ==================== Transform tests ====================

    #[test]
    fn bounding_box_polygon_of_triangle() {
        let t = Polygon::new(vec![pt(0.0, 0.0), pt(4.0, 1.0), pt(1.0, 3.0)]);
        assert_eq!(t.bounding_box_polygon().vertices, rect(0.0, 0.0, 4.0, 3.0).vertices);
    }

    #[test]
    fn staircase_lines_keep_rectangles_intact() {
        let mut r = rect(0.0, 0.0, 2.0, 1.0);
        r.generate_staircase_lines(0.5);
        assert_eq!(r.area(), 2.0);
        assert_eq!(r.len(), 4);
    }

    #[test]
    fn move_polygons_onto_vertical_line() {
        let mut group = vec![rect(-1.0, -0.5, 1.0, 0.5)];
        let line = Line::new(pt(10.0, -5.0), pt(10.0, 5.0));
        move_polygons_on_line(&mut group, Point::ORIGIN, &line, 2.0, 0.0);
        // centred two units up the line, rotated a quarter turn
        assert_point_eq(group[0].midpoint(), pt(10.0, 2.0));
        let bbox = group[0].bounding_box();
        assert!((bbox.width() - 1.0).abs() < 1e-9);
        assert!((bbox.height() - 2.0).abs() < 1e-9);
    }
}
