//! Via pad stacks: capture pads on the contact layers plus a grid of via cuts.

use crate::polygon::{GdsLayer, Polygon};
use crate::types::{Point, pt};

/// One via cut type
#[derive(Debug, Clone, PartialEq)]
pub struct Via {
    pub length: f64,
    pub width: f64,
    /// Minimum gap between cuts, and between a cut and the pad edge
    pub spacing: f64,
    /// Rotation of each cut about its own centre, in degrees
    pub angle: f64,
    pub layer: GdsLayer,
}

/// Named stack of vias between two conductor layers
#[derive(Debug, Clone, PartialEq)]
pub struct ViaPadStack {
    pub name: String,
    pub top_layer: GdsLayer,
    pub bottom_layer: GdsLayer,
    /// Clearance kept between cuts and the pad edge
    pub margin: f64,
    pub vias: Vec<Via>,
}

impl ViaPadStack {
    /// Fill `pad` with this stack.
    ///
    /// Both capture pads are always emitted; cuts are emitted per via type
    /// wherever they fit.
    pub fn place_on(&self, pad: &Polygon, out: &mut Vec<Polygon>) {
        out.push(pad.on_layer(self.top_layer));
        out.push(pad.on_layer(self.bottom_layer));
        for via in &self.vias {
            out.extend(via_grid(pad, via, self.margin));
        }
    }
}

/// Regular grid of `via` cuts centred on the pad's midpoint.
///
/// Cuts are laid over the pad's bounding box and kept only when all their
/// vertices are inside the pad and they stay clear of its edges by both
/// `margin` and the via spacing.
pub fn via_grid(pad: &Polygon, via: &Via, margin: f64) -> Vec<Polygon> {
    let bbox = pad.bounding_box();
    let columns = (bbox.width() - via.spacing) / (via.length + via.spacing);
    let rows = (bbox.height() - via.spacing) / (via.width + via.spacing);
    let half_columns = (columns / 2.0).round_ties_even() as i64;
    let half_rows = (rows / 2.0).round_ties_even() as i64;

    let center = pad.midpoint();
    let pitch_x = via.length + via.spacing;
    let pitch_y = via.width + via.spacing;

    let mut cuts = Vec::new();
    for r in (-half_rows + 1)..half_rows {
        for c in (-half_columns + 1)..half_columns {
            let at = pt(center.x + pitch_x * c as f64, center.y + pitch_y * r as f64);
            let cut = cut_at(at, via).with_layer(via.layer);
            if cut.is_inside(pad)
                && !cut.is_near_edge(pad, margin)
                && !cut.is_near_edge(pad, via.spacing)
            {
                cuts.push(cut);
            }
        }
    }
    cuts
}

fn cut_at(center: Point, via: &Via) -> Polygon {
    let (hl, hw) = (via.length / 2.0, via.width / 2.0);
    let mut cut = Polygon::new(vec![
        pt(center.x - hl, center.y - hw),
        pt(center.x + hl, center.y - hw),
        pt(center.x + hl, center.y + hw),
        pt(center.x - hl, center.y + hw),
    ]);
    cut.rotate_around(center, via.angle);
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUT: GdsLayer = GdsLayer::new(30, 0);

    fn square(size: f64) -> Polygon {
        Polygon::new(vec![pt(0.0, 0.0), pt(size, 0.0), pt(size, size), pt(0.0, size)])
    }

    fn via(size: f64, spacing: f64) -> Via {
        Via {
            length: size,
            width: size,
            spacing,
            angle: 0.0,
            layer: CUT,
        }
    }

    fn stack(margin: f64) -> ViaPadStack {
        ViaPadStack {
            name: "VS".to_string(),
            top_layer: GdsLayer::new(2, 0),
            bottom_layer: GdsLayer::new(1, 0),
            margin,
            vias: vec![via(5.0, 2.0)],
        }
    }

    #[test]
    fn full_grid_without_margin() {
        let cuts = via_grid(&square(40.0), &via(5.0, 2.0), 0.0);
        assert_eq!(cuts.len(), 25);
        assert!(cuts.iter().all(|c| c.layer == Some(CUT)));
    }

    #[test]
    fn margin_drops_outer_cuts() {
        let pad = square(40.0);
        let relaxed = via_grid(&pad, &via(5.0, 2.0), 0.0).len();
        let strict = via_grid(&pad, &via(5.0, 2.0), 6.0);
        assert_eq!(strict.len(), 9);
        assert!(strict.len() < relaxed);
        for cut in &strict {
            assert!(!cut.is_near_edge(&pad, 6.0));
        }
    }

    #[test]
    fn pad_smaller_than_one_cut_gets_none() {
        assert!(via_grid(&square(4.0), &via(5.0, 2.0), 0.0).is_empty());
    }

    #[test]
    fn rotated_cuts_stay_inside() {
        let mut v = via(5.0, 2.0);
        v.angle = 45.0;
        let pad = square(40.0);
        let cuts = via_grid(&pad, &v, 0.0);
        assert!(!cuts.is_empty());
        assert!(cuts.iter().all(|c| c.is_inside(&pad)));
    }

    #[test]
    fn stack_emits_capture_pads_first() {
        let mut out = Vec::new();
        stack(0.0).place_on(&square(40.0), &mut out);
        assert_eq!(out.len(), 2 + 25);
        assert_eq!(out[0].layer, Some(GdsLayer::new(2, 0)));
        assert_eq!(out[1].layer, Some(GdsLayer::new(1, 0)));
        assert_eq!(out[0].vertices, square(40.0).vertices);
    }

    #[test]
    fn stack_uses_its_own_margin() {
        let mut out = Vec::new();
        stack(6.0).place_on(&square(40.0), &mut out);
        assert_eq!(out.len(), 2 + 9);
    }
}
