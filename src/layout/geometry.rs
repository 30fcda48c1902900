//! Octant-local shapes shared by the pipeline stages.
//!
//! Local frames put the octant's axis on +x; shapes are built there and
//! rotated by 45° per octant about the origin.

use crate::octagon::Octagon;
use crate::polygon::Polygon;
use crate::types::{Point, pt};

use super::context::ROTATION_ANGLE_UNIT;

/// Rotation of octant `octant` in degrees
pub fn octant_angle(octant: usize) -> f64 {
    octant as f64 * ROTATION_ANGLE_UNIT
}

/// Trapezoid of one octant of the ring between `apothem` and `apothem + width`.
///
/// Vertex order is inner[s], outer[s], outer[s+1], inner[s+1].
pub fn ring_segment(apothem: f64, width: f64, octant: usize) -> Polygon {
    let inner = Octagon::new(apothem);
    let outer = Octagon::new(apothem + width);
    let next = (octant + 1) % 8;
    Polygon::new(vec![
        inner.vertex(octant),
        outer.vertex(octant),
        outer.vertex(next),
        inner.vertex(next),
    ])
}

/// The ring segment with a gap cut across it.
///
/// The gap is centred on the segment's vertex-average midpoint and extends
/// `gap_ccw` towards the octant's first vertex and `gap_cw` towards its last.
/// The first polygon is the CCW-side remainder, the second the CW-side one.
pub fn split_ring_segment(
    apothem: f64,
    width: f64,
    octant: usize,
    gap_ccw: f64,
    gap_cw: f64,
) -> [Polygon; 2] {
    let segment = ring_segment(apothem, width, octant);
    let m = segment.midpoint();
    let angle = octant_angle(octant);
    let gap = |dx: f64, dy: f64| pt(m.x + dx, m.y + dy).rotated_around(m, angle);

    let half = width / 2.0;
    let ccw = Polygon::new(vec![
        gap(half, -gap_ccw),
        gap(-half, -gap_ccw),
        segment.vertices[0],
        segment.vertices[1],
    ]);
    let cw = Polygon::new(vec![
        gap(half, gap_cw),
        gap(-half, gap_cw),
        segment.vertices[3],
        segment.vertices[2],
    ]);
    [ccw, cw]
}

/// Axis-aligned rectangle in the octant's local frame, rotated into place.
///
/// Vertex order is (x0, y0), (x1, y0), (x1, y1), (x0, y1).
pub fn octant_rect(x0: f64, y0: f64, x1: f64, y1: f64, octant: usize) -> Polygon {
    let mut rect = Polygon::new(vec![pt(x0, y0), pt(x1, y0), pt(x1, y1), pt(x0, y1)]);
    rect.rotate_around(Point::ORIGIN, octant_angle(octant));
    rect
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn assert_point_eq(a: Point, b: Point) {
        assert!(
            (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9,
            "expected {b}, got {a}"
        );
    }

    fn expected_area(apothem: f64, width: f64) -> f64 {
        width * 2.0 * (PI / 8.0).tan() * (apothem + width / 2.0)
    }

    #[test]
    fn segment_area_is_width_times_mid_chord() {
        for octant in 0..8 {
            let s = ring_segment(65.0, 10.0, octant);
            assert!((s.area() - expected_area(65.0, 10.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn adjacent_segments_share_one_edge() {
        for octant in 0..8 {
            let a = ring_segment(50.0, 10.0, octant);
            let b = ring_segment(50.0, 10.0, (octant + 1) % 8);
            assert_point_eq(a.vertices[2], b.vertices[1]);
            assert_point_eq(a.vertices[3], b.vertices[0]);
            let shared = a
                .vertices
                .iter()
                .filter(|p| b.vertices.iter().any(|q| p.distance(*q) < 1e-9))
                .count();
            assert_eq!(shared, 2);
        }
    }

    #[test]
    fn split_removes_a_width_by_gap_rectangle() {
        let full = ring_segment(65.0, 10.0, 0).area();
        let [ccw, cw] = split_ring_segment(65.0, 10.0, 0, 7.5, 2.5);
        assert!((ccw.area() + cw.area() - (full - 10.0 * 10.0)).abs() < 1e-9);
        assert_point_eq(ccw.vertices[0], pt(75.0, -7.5));
        assert_point_eq(cw.vertices[1], pt(65.0, 2.5));
    }

    #[test]
    fn split_follows_the_octant_rotation() {
        for octant in 0..8 {
            let full = ring_segment(80.0, 10.0, octant).area();
            let [ccw, cw] = split_ring_segment(80.0, 10.0, octant, 5.0, 5.0);
            assert!((ccw.area() + cw.area() - (full - 100.0)).abs() < 1e-6);
        }
    }

    #[test]
    fn octant_rect_rotates_about_origin() {
        let r = octant_rect(10.0, -1.0, 20.0, 1.0, 2);
        assert_point_eq(r.vertices[0], pt(1.0, 10.0));
        assert_point_eq(r.vertices[2], pt(-1.0, 20.0));
    }
}
