//! Bridges: the crossings that carry a ring across its neighbours inside one
//! segment, with the gap and extension bookkeeping that keeps stacked
//! crossings from colliding.

use crate::description::BridgeDef;
use crate::errors::{ConfigurationError, LayoutError};
use crate::log::debug;
use crate::polygon::{GdsLayer, Polygon};
use crate::types::{Point, pt};

use super::Layout;
use super::cells::{Segment, SegmentCell};
use super::context::LayoutContext;
use super::geometry::{octant_angle, octant_rect};
use super::via_stack::ViaPadStack;

// ============================================================================
// Model
// ============================================================================

/// A bridge definition referenced by BRIDGE cells
#[derive(Debug, Clone, PartialEq)]
pub struct Bridge {
    pub name: String,
    pub layer: GdsLayer,
    pub vias: Option<BridgeVias>,
}

/// Via pads placed beyond the extension stubs on either side of a bridge
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeVias {
    /// Length of the pad along the ring
    pub width: f64,
    pub ccw: ViaPadStack,
    pub cw: ViaPadStack,
}

impl Bridge {
    pub fn from_def(ctx: &LayoutContext, name: &str, def: &BridgeDef) -> Result<Self, LayoutError> {
        let owner = format!("bridge {name}");
        let layer = ctx.layer(&def.layer, &owner)?;
        let vias = match &def.via_width {
            None => None,
            Some(width) => {
                let stack = |field: &'static str, stack: &Option<String>| match stack {
                    Some(s) => ctx.via_stack(s, &owner).cloned(),
                    None => Err(ConfigurationError::MissingField {
                        owner: owner.clone(),
                        field,
                    }),
                };
                Some(BridgeVias {
                    width: ctx.quantity(&format!("{owner}.viaWidth"), width)?,
                    ccw: stack("viaStackCCW", &def.via_stack_ccw)?,
                    cw: stack("viaStackCW", &def.via_stack_cw)?,
                })
            }
        };
        Ok(Self {
            name: name.to_string(),
            layer,
            vias,
        })
    }
}

// ============================================================================
// Jump bookkeeping
// ============================================================================

/// Jumps seen from the landing side.
///
/// For every ring `i` with jump `j`, the ring `i + j` receives `-j`. Targets
/// outside the ring range are skipped; segment construction rejects them
/// before this is ever called on real input.
pub fn cw_jumps(ccw: &[i64]) -> Vec<i64> {
    let mut cw = vec![0; ccw.len()];
    for (i, &jump) in ccw.iter().enumerate() {
        if jump == 0 {
            continue;
        }
        let target = i as i64 + jump;
        match usize::try_from(target) {
            Ok(target) if target < cw.len() => cw[target] = -jump,
            _ => {}
        }
    }
    cw
}

/// Extension needed on each ring, in half-pitch units, so that staggered
/// bridges in one segment clear each other.
///
/// A ring's unit is how much shorter its own gap is than the largest one.
/// Against every other ring whose crossing heads towards it, the extension is
/// the unit difference minus the room the rings in between already provide.
pub fn jump_extensions(jumps: &[i64]) -> Vec<i64> {
    let max = jumps.iter().map(|j| j.abs()).max().unwrap_or(0);
    let unit = |k: usize| max - jumps[k].abs();

    (0..jumps.len())
        .map(|current| {
            (0..jumps.len())
                .filter(|&other| other != current)
                .map(|other| {
                    let diff = unit(current) - unit(other);
                    if diff < 0 {
                        return 0;
                    }
                    let between = (current as i64 - other as i64).abs() - 1;
                    let towards = (current < other && jumps[other] < 0)
                        || (current > other && jumps[other] > 0);
                    if towards { (diff - 2 * between).max(0) } else { 0 }
                })
                .max()
                .unwrap_or(0)
        })
        .collect()
}

/// Jump arrays of one segment and the extensions derived from them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JumpPlan {
    pub ccw: Vec<i64>,
    pub cw: Vec<i64>,
    pub ccw_extension: Vec<i64>,
    pub cw_extension: Vec<i64>,
}

/// Gap and extension lengths on both sides of one ring
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GapInfo {
    pub ccw_gap: f64,
    pub cw_gap: f64,
    pub ccw_ext: f64,
    pub cw_ext: f64,
}

impl GapInfo {
    /// Total cut on the CCW side of the segment midpoint
    pub fn ccw_cut(&self) -> f64 {
        self.ccw_gap + self.ccw_ext
    }

    pub fn cw_cut(&self) -> f64 {
        self.cw_gap + self.cw_ext
    }
}

impl JumpPlan {
    pub fn new(ccw: Vec<i64>) -> Self {
        let cw = cw_jumps(&ccw);
        Self {
            ccw_extension: jump_extensions(&ccw),
            cw_extension: jump_extensions(&cw),
            ccw,
            cw,
        }
    }

    pub fn max_jump(&self) -> i64 {
        self.ccw.iter().map(|j| j.abs()).max().unwrap_or(0)
    }

    /// Gaps and extensions of `ring`.
    ///
    /// Aligned mode pads every gap out to half the segment's largest
    /// crossing so all bridges of the segment line up.
    pub fn gaps(&self, ring: usize, pitch: f64, aligned: bool) -> GapInfo {
        let half = |units: i64| units.abs() as f64 * pitch / 2.0;
        let ccw_gap = self.ccw.get(ring).map_or(0.0, |&j| half(j));
        let cw_gap = self.cw.get(ring).map_or(0.0, |&j| half(j));
        if aligned {
            let max_half = half(self.max_jump());
            GapInfo {
                ccw_gap,
                cw_gap,
                ccw_ext: max_half - ccw_gap,
                cw_ext: max_half - cw_gap,
            }
        } else {
            GapInfo {
                ccw_gap,
                cw_gap,
                ccw_ext: self.ccw_extension.get(ring).map_or(0.0, |&u| half(u)),
                cw_ext: self.cw_extension.get(ring).map_or(0.0, |&u| half(u)),
            }
        }
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// The crossing itself: a parallelogram from `ring` to `ring + jump`
pub fn bridge_polygon(ctx: &LayoutContext, octant: usize, ring: usize, jump: i64) -> Option<Polygon> {
    if jump == 0 {
        return None;
    }
    let dx = ctx.ring_apothem(ring);
    let dy = jump.abs() as f64 * ctx.pitch();
    let t = ctx.width;
    // the far edge leans outward for positive jumps and inward for negative ones
    let lean = if jump > 0 { dy } else { -dy };
    let mut poly = Polygon::new(vec![
        pt(dx, -dy / 2.0),
        pt(dx + t, -dy / 2.0),
        pt(dx + t + lean, dy / 2.0),
        pt(dx + lean, dy / 2.0),
    ]);
    poly.rotate_around(Point::ORIGIN, octant_angle(octant));
    Some(poly)
}

/// Emit bridges, extension stubs and their via pads for every BRIDGE cell
pub fn generate_bridges(ctx: &LayoutContext, segments: &[Segment], layout: &mut Layout) {
    for segment in segments {
        for (ring, cell) in segment.cells.iter().enumerate() {
            let SegmentCell::Bridge(cell) = cell else {
                continue;
            };
            if let Some(poly) = bridge_polygon(ctx, segment.octant, ring, cell.jump) {
                layout.bridges.push(poly.with_layer(cell.bridge.layer));
            }
        }
    }

    for segment in segments {
        for (ring, cell) in segment.cells.iter().enumerate() {
            if let SegmentCell::Bridge(cell) = cell {
                extensions(ctx, segment, ring, cell.jump, &cell.bridge, layout);
            }
        }
    }
    debug!(count = layout.bridges.len(), "bridge polygons");
}

fn extensions(
    ctx: &LayoutContext,
    segment: &Segment,
    ring: usize,
    jump: i64,
    bridge: &Bridge,
    layout: &mut Layout,
) {
    let octant = segment.octant;
    let t = ctx.width;
    let aligned = ctx.bridge_extension_aligned;

    let dx = ctx.ring_apothem(ring);
    let gaps = segment.jumps.gaps(ring, ctx.pitch(), aligned);
    let ccw_end = -gaps.ccw_cut();
    if gaps.ccw_ext > 0.0 {
        let stub = octant_rect(dx, -gaps.ccw_gap, dx + t, ccw_end, octant);
        layout.bridges.push(stub.with_layer(bridge.layer));
    }
    if let Some(vias) = &bridge.vias {
        let pad = octant_rect(dx, ccw_end, dx + t, ccw_end - vias.width, octant);
        vias.ccw.place_on(&pad, &mut layout.vias);
    }

    // the CW side belongs to the ring the bridge lands on
    if jump == 0 {
        return;
    }
    let Some(landing) = ring.checked_add_signed(jump as isize) else {
        return;
    };
    let dx = ctx.ring_apothem(landing);
    let gaps = segment.jumps.gaps(landing, ctx.pitch(), aligned);
    let cw_end = gaps.cw_cut();
    if gaps.cw_ext > 0.0 {
        let stub = octant_rect(dx, gaps.cw_gap, dx + t, cw_end, octant);
        layout.bridges.push(stub.with_layer(bridge.layer));
    }
    if let Some(vias) = &bridge.vias {
        let pad = octant_rect(dx, cw_end, dx + t, cw_end + vias.width, octant);
        vias.cw.place_on(&pad, &mut layout.vias);
    }
}
