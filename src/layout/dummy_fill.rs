//! Checkered dummy fill laid along the guard ring's edges, kept clear of the arms.

use crate::description::DummyFillDef;
use crate::errors::{ConfigurationError, LayoutError};
use crate::log::debug;
use crate::octagon::Octagon;
use crate::params::Quantity;
use crate::polygon::{GdsLayer, Polygon, bounding_box_of, move_polygons_on_line};
use crate::types::{Line, Point, grid_adjusted_length, pt};

use super::Layout;
use super::context::LayoutContext;
use super::guard_ring::GuardRing;

#[derive(Debug, Clone, PartialEq)]
pub struct DummyFill {
    /// Gap between neighbouring groups, also the clearance kept to arms
    pub group_spacing: f64,
    pub items: Vec<DummyItem>,
}

/// One rectangle of the prototype group, repeated on each listed layer
#[derive(Debug, Clone, PartialEq)]
pub struct DummyItem {
    pub offset_x: f64,
    pub offset_y: f64,
    pub length: f64,
    pub height: f64,
    pub layers: Vec<GdsLayer>,
}

impl DummyFill {
    pub fn from_def(ctx: &LayoutContext, def: &DummyFillDef) -> Result<Self, LayoutError> {
        if !def.kind.eq_ignore_ascii_case("checkered") {
            return Err(ConfigurationError::UnsupportedTag {
                field: "dummy fill type",
                tag: def.kind.clone(),
                owner: "guardRing.dummyFills".to_string(),
                expected: "checkered",
            }
            .into());
        }
        let items = def
            .items
            .iter()
            .map(|(name, item)| -> Result<DummyItem, LayoutError> {
                let owner = format!("dummy fill item {name}");
                if !item.shape.eq_ignore_ascii_case("rect") {
                    return Err(ConfigurationError::UnsupportedTag {
                        field: "dummy fill shape",
                        tag: item.shape.clone(),
                        owner,
                        expected: "rect",
                    }
                    .into());
                }
                let q = |field: &str, value: &Quantity| ctx.quantity(&format!("{owner}.{field}"), value);
                Ok(DummyItem {
                    offset_x: q("offsetX", &item.offset_x)?,
                    offset_y: q("offsetY", &item.offset_y)?,
                    length: q("length", &item.length)?,
                    height: q("height", &item.height)?,
                    layers: item
                        .layers
                        .iter()
                        .map(|l| ctx.layer(l, &owner))
                        .collect::<Result<_, _>>()?,
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self {
            group_spacing: ctx.quantity("guardRing.dummyFills.groupSpacing", &def.group_spacing)?,
            items,
        })
    }

    /// The prototype group around the origin.
    ///
    /// With `grid` set, item sizes are shrunk to grid-adjusted lengths so the
    /// group stays on grid when placed along a diagonal edge.
    pub fn prototype(&self, grid: Option<f64>) -> Vec<Polygon> {
        let mut group = Vec::new();
        for item in &self.items {
            let (length, height) = match grid {
                Some(g) => (
                    grid_adjusted_length(item.length, g),
                    grid_adjusted_length(item.height, g),
                ),
                None => (item.length, item.height),
            };
            let rect = centered_rect(pt(item.offset_x, item.offset_y), length, height);
            group.extend(item.layers.iter().map(|&layer| rect.on_layer(layer)));
        }
        group
    }
}

fn centered_rect(center: Point, length: f64, height: f64) -> Polygon {
    let (hl, hh) = (length / 2.0, height / 2.0);
    Polygon::new(vec![
        pt(center.x - hl, center.y - hh),
        pt(center.x + hl, center.y - hh),
        pt(center.x + hl, center.y + hh),
        pt(center.x - hl, center.y + hh),
    ])
}

/// True when `poly` shares a layer with an obstacle and is within
/// `threshold` of it, has every vertex inside it, or crosses one of its edges
pub fn collides(poly: &Polygon, obstacles: &[Polygon], threshold: f64) -> bool {
    obstacles.iter().any(|other| {
        poly.layer == other.layer
            && (poly.is_near_edge(other, threshold) || poly.is_inside(other) || poly.intersects(other))
    })
}

/// Copies of `group` spread evenly along `line`, centred on its midpoint.
///
/// The copy count is the edge length over the group pitch; the outermost
/// slot on each side is left empty so groups never overhang the corners.
pub fn fill_line(group: &[Polygon], line: &Line, spacing: f64, obstacles: &[Polygon]) -> Vec<Polygon> {
    if group.is_empty() {
        return Vec::new();
    }
    let pitch = bounding_box_of(group).width() + spacing;
    if pitch <= 0.0 {
        return Vec::new();
    }
    let count = line.length() / pitch;
    let interval = line.length() / count;
    let half = (count / 2.0).floor() as i64;

    let mut placed = Vec::new();
    for i in (-half + 1)..half {
        let mut copy = group.to_vec();
        move_polygons_on_line(&mut copy, Point::ORIGIN, line, i as f64 * interval, 0.0);
        placed.extend(copy.into_iter().filter(|p| !collides(p, obstacles, spacing)));
    }
    placed
}

/// Emit dummy fill along every edge of the guard ring reference octagon.
///
/// Reads the arm polygons already in `layout`, so arms must be generated first.
pub fn generate_dummy_fill(
    ctx: &LayoutContext,
    guard: &GuardRing,
    staircase_step: Option<f64>,
    layout: &mut Layout,
) {
    let Some(fill) = &guard.dummy_fill else {
        return;
    };
    let straight = fill.prototype(None);
    let diagonal = fill.prototype(Some(ctx.grid));
    let octagon = Octagon::new(guard.reference_apothem(ctx));

    for edge in 0..8 {
        let line = Line::new(octagon.vertex(edge), octagon.vertex(edge + 1));
        let group = if edge % 2 == 0 { &straight } else { &diagonal };
        let mut pieces = fill_line(group, &line, fill.group_spacing, &layout.arms);
        if let Some(step) = staircase_step {
            for piece in &mut pieces {
                piece.generate_staircase_lines(step);
            }
        }
        layout.dummy_fills.extend(pieces);
    }
    debug!(count = layout.dummy_fills.len(), "dummy fill polygons");
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILL: GdsLayer = GdsLayer::new(1, 0);

    fn fill() -> DummyFill {
        DummyFill {
            group_spacing: 2.0,
            items: vec![DummyItem {
                offset_x: 0.0,
                offset_y: 0.0,
                length: 4.0,
                height: 2.0,
                layers: vec![FILL, GdsLayer::new(2, 0)],
            }],
        }
    }

    #[test]
    fn prototype_repeats_items_per_layer() {
        let group = fill().prototype(None);
        assert_eq!(group.len(), 2);
        assert_eq!(group[0].vertices, group[1].vertices);
        assert_eq!(bounding_box_of(&group).width(), 4.0);
    }

    #[test]
    fn grid_adjusted_prototype_is_not_larger() {
        let plain = bounding_box_of(&fill().prototype(None));
        let adjusted = bounding_box_of(&fill().prototype(Some(0.005)));
        assert!(adjusted.width() <= plain.width());
        assert!(adjusted.height() <= plain.height());
    }

    #[test]
    fn fill_line_spreads_groups_evenly() {
        // 60 long, pitch 6: ten slots, copies at -4..=4
        let group = vec![centered_rect(Point::ORIGIN, 4.0, 2.0).with_layer(FILL)];
        let line = Line::new(pt(0.0, -30.0), pt(0.0, 30.0));
        let placed = fill_line(&group, &line, 2.0, &[]);
        assert_eq!(placed.len(), 9);
        let ys: Vec<f64> = placed.iter().map(|p| p.midpoint().y).collect();
        assert!((ys[0] + 24.0).abs() < 1e-9);
        assert!((ys[8] - 24.0).abs() < 1e-9);
    }

    #[test]
    fn pieces_near_an_arm_on_the_same_layer_are_dropped() {
        let group = vec![centered_rect(Point::ORIGIN, 4.0, 2.0).with_layer(FILL)];
        let line = Line::new(pt(0.0, -30.0), pt(0.0, 30.0));
        // an arm crossing the line at y = 0
        let arm = centered_rect(pt(0.0, 0.0), 20.0, 3.0).with_layer(FILL);
        let placed = fill_line(&group, &line, 2.0, std::slice::from_ref(&arm));
        assert!(placed.len() < 9);
        assert!(placed.iter().all(|p| !collides(p, std::slice::from_ref(&arm), 2.0)));

        let other_layer = arm.on_layer(GdsLayer::new(9, 0));
        assert_eq!(fill_line(&group, &line, 2.0, &[other_layer]).len(), 9);
    }

    #[test]
    fn collides_detects_containment_without_edge_contact() {
        let arm = centered_rect(Point::ORIGIN, 20.0, 20.0).with_layer(FILL);
        let inner = centered_rect(Point::ORIGIN, 2.0, 2.0).with_layer(FILL);
        assert!(collides(&inner, &[arm], 0.5));
    }
}
