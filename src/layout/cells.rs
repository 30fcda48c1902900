//! Segment cells: one ring of one octant, tagged DEFAULT, BRIDGE or PORT.
//!
//! Tags are normalized here, once, into [`SegmentCell`]; every later stage
//! matches on the enum instead of re-reading strings.

use enum_dispatch::enum_dispatch;
use indexmap::IndexMap;

use crate::description::{CellDef, SegmentsDef};
use crate::errors::{ConfigurationError, LayoutError, ValidationError};
use crate::log::debug;
use crate::polygon::{GdsLayer, Polygon};

use super::Layout;
use super::arms::Arm;
use super::bridges::{Bridge, JumpPlan};
use super::context::LayoutContext;
use super::geometry::{ring_segment, split_ring_segment};

/// Ring conductor of one octant, as drawn for each cell type
#[enum_dispatch]
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentCell {
    Default(DefaultCell),
    Bridge(BridgeCell),
    Port(PortCell),
}

#[enum_dispatch(SegmentCell)]
pub trait CellLayout {
    /// Conductor layer of the ring polygons
    fn layer(&self) -> GdsLayer;

    /// Rings crossed towards the CW side; zero unless the cell is a bridge
    fn jump(&self) -> i64 {
        0
    }

    /// Ring polygons this cell contributes at `ring` of `segment`
    fn ring_polygons(&self, ctx: &LayoutContext, segment: &Segment, ring: usize) -> Vec<Polygon>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefaultCell {
    pub layer: GdsLayer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeCell {
    pub layer: GdsLayer,
    pub jump: i64,
    pub bridge: Bridge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortCell {
    pub layer: GdsLayer,
    pub arm: Arm,
}

impl CellLayout for DefaultCell {
    fn layer(&self) -> GdsLayer {
        self.layer
    }

    fn ring_polygons(&self, ctx: &LayoutContext, segment: &Segment, ring: usize) -> Vec<Polygon> {
        let poly = ring_segment(ctx.ring_apothem(ring), ctx.width, segment.octant);
        vec![poly.with_layer(self.layer)]
    }
}

impl CellLayout for BridgeCell {
    fn layer(&self) -> GdsLayer {
        self.layer
    }

    fn jump(&self) -> i64 {
        self.jump
    }

    fn ring_polygons(&self, ctx: &LayoutContext, segment: &Segment, ring: usize) -> Vec<Polygon> {
        let gaps = segment
            .jumps
            .gaps(ring, ctx.pitch(), ctx.bridge_extension_aligned);
        split_ring_segment(
            ctx.ring_apothem(ring),
            ctx.width,
            segment.octant,
            gaps.ccw_cut(),
            gaps.cw_cut(),
        )
        .into_iter()
        .map(|p| p.with_layer(self.layer))
        .collect()
    }
}

impl CellLayout for PortCell {
    fn layer(&self) -> GdsLayer {
        self.layer
    }

    fn ring_polygons(&self, ctx: &LayoutContext, segment: &Segment, ring: usize) -> Vec<Polygon> {
        let apothem = ctx.ring_apothem(ring);
        match self.arm.ring_gap() {
            None => vec![ring_segment(apothem, ctx.width, segment.octant).with_layer(self.layer)],
            Some(gap) => split_ring_segment(apothem, ctx.width, segment.octant, gap, gap)
                .into_iter()
                .map(|p| p.with_layer(self.layer))
                .collect(),
        }
    }
}

/// One octant of every ring
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub name: String,
    pub octant: usize,
    /// Indexed by ring, innermost first
    pub cells: Vec<SegmentCell>,
    pub jumps: JumpPlan,
}

/// Normalize the `segments` section, resolving every bridge and arm reference
pub fn build_segments(
    ctx: &LayoutContext,
    def: &SegmentsDef,
    bridges: &IndexMap<String, Bridge>,
    arms: &IndexMap<String, Arm>,
) -> Result<Vec<Segment>, LayoutError> {
    let mut segments = Vec::with_capacity(def.data.len());
    for (name, segment) in &def.data {
        if !(0..8).contains(&segment.id) {
            return Err(ValidationError::SegmentId {
                segment: name.clone(),
                id: segment.id,
            }
            .into());
        }
        if segment.group.len() > ctx.rings {
            return Err(ConfigurationError::InvalidValue {
                name: format!("segment {name}"),
                reason: format!(
                    "{} cells for {} rings",
                    segment.group.len(),
                    ctx.rings
                ),
            }
            .into());
        }

        let cells = segment
            .group
            .iter()
            .enumerate()
            .map(|(ring, cell)| build_cell(ctx, name, ring, cell, bridges, arms))
            .collect::<Result<Vec<_>, _>>()?;

        let ccw: Vec<i64> = cells.iter().map(|c| c.jump()).collect();
        for (ring, &jump) in ccw.iter().enumerate() {
            let lands = (ring as i64)
                .checked_add(jump)
                .is_some_and(|target| (0..ccw.len() as i64).contains(&target));
            if !lands {
                return Err(ValidationError::JumpOutOfRange {
                    segment: name.clone(),
                    ring,
                    jump,
                    rings: ccw.len(),
                }
                .into());
            }
        }

        segments.push(Segment {
            name: name.clone(),
            octant: segment.id as usize,
            cells,
            jumps: JumpPlan::new(ccw),
        });
    }
    Ok(segments)
}

fn build_cell(
    ctx: &LayoutContext,
    segment: &str,
    ring: usize,
    def: &CellDef,
    bridges: &IndexMap<String, Bridge>,
    arms: &IndexMap<String, Arm>,
) -> Result<SegmentCell, LayoutError> {
    let owner = format!("segment {segment} ring {ring}");
    let data = &def.data;
    let missing = |field: &'static str| ConfigurationError::MissingField {
        owner: owner.clone(),
        field,
    };
    let unknown = |kind: &'static str, name: &str| ConfigurationError::UnknownReference {
        kind,
        name: name.to_string(),
        owner: owner.clone(),
    };

    let layer_name = data.layer.as_deref().ok_or_else(|| missing("layer"))?;
    let layer = ctx.layer(layer_name, &owner)?;

    let cell: SegmentCell = match def.kind.to_ascii_lowercase().as_str() {
        "default" => DefaultCell { layer }.into(),
        "bridge" => {
            let bridge_name = data.bridge.as_deref().ok_or_else(|| missing("bridge"))?;
            let bridge = bridges
                .get(bridge_name)
                .cloned()
                .ok_or_else(|| unknown("bridge", bridge_name))?;
            let jump = data.jump.as_ref().ok_or_else(|| missing("jump"))?;
            let jump = ctx.quantity(&format!("{owner}.jump"), jump)?;
            if jump.fract() != 0.0 {
                return Err(ConfigurationError::InvalidValue {
                    name: format!("{owner}.jump"),
                    reason: format!("{jump} is not a whole number of rings"),
                }
                .into());
            }
            BridgeCell {
                layer,
                jump: jump as i64,
                bridge,
            }
            .into()
        }
        "port" => {
            let arm_name = data.arm.as_deref().ok_or_else(|| missing("arm"))?;
            let arm = arms
                .get(arm_name)
                .cloned()
                .ok_or_else(|| unknown("arm", arm_name))?;
            PortCell { layer, arm }.into()
        }
        _ => {
            return Err(ConfigurationError::UnsupportedTag {
                field: "segment cell type",
                tag: def.kind.clone(),
                owner,
                expected: "DEFAULT, BRIDGE, PORT",
            }
            .into());
        }
    };
    Ok(cell)
}

/// Emit ring polygons for every cell of every segment
pub fn generate_segments(ctx: &LayoutContext, segments: &[Segment], layout: &mut Layout) {
    for segment in segments {
        for (ring, cell) in segment.cells.iter().enumerate() {
            layout
                .segments
                .extend(cell.ring_polygons(ctx, segment, ring));
        }
    }
    debug!(count = layout.segments.len(), "segment polygons");
}
