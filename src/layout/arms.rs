//! Arms: radial feed lines from a ring out to the pads, with their port labels.

use indexmap::IndexMap;
use serde::Serialize;

use crate::description::{ArmDef, PortDef};
use crate::errors::{ConfigurationError, LayoutError};
use crate::log::debug;
use crate::polygon::GdsLayer;
use crate::types::{Line, Point, grid_adjusted_length, pt, snap_to_grid};

use super::Layout;
use super::cells::{Segment, SegmentCell};
use super::context::LayoutContext;
use super::geometry::{octant_angle, octant_rect};
use super::via_stack::ViaPadStack;

/// A named port and the label text written at its terminal
#[derive(Debug, Clone, PartialEq)]
pub struct PortRef {
    pub name: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArmKind {
    Single { port: PortRef },
    /// Two parallel conductors `spacing` apart; the first port is on the CCW side
    Double { ports: [PortRef; 2], spacing: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arm {
    pub name: String,
    pub kind: ArmKind,
    pub length: f64,
    pub width: f64,
    pub layer: GdsLayer,
    pub via_stack: Option<ViaPadStack>,
}

/// Text label at an arm terminal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortLabel {
    pub name: String,
    pub text: String,
    pub position: Point,
    #[serde(flatten)]
    pub layer: GdsLayer,
}

impl Arm {
    pub fn from_def(
        ctx: &LayoutContext,
        ports: &IndexMap<String, PortDef>,
        name: &str,
        def: &ArmDef,
    ) -> Result<Self, LayoutError> {
        let owner = format!("arm {name}");
        let port = |port_name: &str| -> Result<PortRef, ConfigurationError> {
            ports
                .get(port_name)
                .map(|p| PortRef {
                    name: port_name.to_string(),
                    label: p.label.clone(),
                })
                .ok_or_else(|| ConfigurationError::UnknownReference {
                    kind: "port",
                    name: port_name.to_string(),
                    owner: owner.clone(),
                })
        };
        let names = def.port.names();

        let kind = match def.kind.to_ascii_lowercase().as_str() {
            "single" => {
                let &[first, ..] = names.as_slice() else {
                    return Err(missing(&owner, "port").into());
                };
                ArmKind::Single { port: port(first)? }
            }
            "double" => {
                let &[first, second, ..] = names.as_slice() else {
                    return Err(ConfigurationError::InvalidValue {
                        name: format!("{owner}.port"),
                        reason: "a double arm needs two port names".to_string(),
                    }
                    .into());
                };
                let spacing = def.spacing.as_ref().ok_or_else(|| missing(&owner, "spacing"))?;
                ArmKind::Double {
                    ports: [port(first)?, port(second)?],
                    spacing: ctx.quantity(&format!("{owner}.spacing"), spacing)?,
                }
            }
            _ => {
                return Err(ConfigurationError::UnsupportedTag {
                    field: "arm type",
                    tag: def.kind.clone(),
                    owner,
                    expected: "SINGLE, DOUBLE",
                }
                .into());
            }
        };

        Ok(Self {
            name: name.to_string(),
            kind,
            length: ctx.quantity(&format!("{owner}.length"), &def.length)?,
            width: ctx.quantity(&format!("{owner}.width"), &def.width)?,
            layer: ctx.layer(&def.layer, &owner)?,
            via_stack: def
                .via_stack
                .as_deref()
                .map(|s| ctx.via_stack(s, &owner).cloned())
                .transpose()?,
        })
    }

    /// Split distance the arm needs cut into the ring it starts from
    pub fn ring_gap(&self) -> Option<f64> {
        match &self.kind {
            ArmKind::Single { .. } => None,
            ArmKind::Double { spacing, .. } => Some(spacing / 2.0),
        }
    }
}

fn missing(owner: &str, field: &'static str) -> ConfigurationError {
    ConfigurationError::MissingField {
        owner: owner.to_string(),
        field,
    }
}

/// Radial extent of an arm and its conductor width, after grid adjustment
#[derive(Debug, Clone, Copy, PartialEq)]
struct ArmExtent {
    start: f64,
    end: f64,
    width: f64,
}

fn arm_extent(ctx: &LayoutContext, arm: &Arm, octant: usize, ring: usize, snap: bool) -> ArmExtent {
    let mut extent = ArmExtent {
        start: ctx.ring_apothem(ring) + ctx.width,
        end: ctx.outer_apothem() + arm.length,
        width: arm.width,
    };
    // diagonal arms only land on grid after rotation if their lengths are
    // even multiples of grid·√2
    if snap && octant % 2 == 1 {
        let g = ctx.grid;
        extent.width = grid_adjusted_length(arm.width, g);
        extent.start = snap_to_grid(grid_adjusted_length(extent.start, g), g);
        extent.end = snap_to_grid(grid_adjusted_length(extent.end, g), g);
    }
    extent
}

/// Emit arm conductors, port labels and arm via stacks for every PORT cell
pub fn generate_arms(ctx: &LayoutContext, segments: &[Segment], snap: bool, layout: &mut Layout) {
    for segment in segments {
        for (ring, cell) in segment.cells.iter().enumerate() {
            let SegmentCell::Port(cell) = cell else {
                continue;
            };
            let arm = &cell.arm;
            let extent = arm_extent(ctx, arm, segment.octant, ring, snap);
            match &arm.kind {
                ArmKind::Single { port } => {
                    conductor(ctx, arm, extent, 0.0, port, segment.octant, layout);
                }
                ArmKind::Double { ports, spacing } => {
                    let offset = (spacing + extent.width) / 2.0;
                    conductor(ctx, arm, extent, offset, &ports[0], segment.octant, layout);
                    conductor(ctx, arm, extent, -offset, &ports[1], segment.octant, layout);
                }
            }
        }
    }
    debug!(
        arms = layout.arms.len(),
        ports = layout.ports.len(),
        "arm polygons"
    );
}

fn conductor(
    ctx: &LayoutContext,
    arm: &Arm,
    extent: ArmExtent,
    offset: f64,
    port: &PortRef,
    octant: usize,
    layout: &mut Layout,
) {
    let top = offset + extent.width / 2.0;
    let bottom = offset - extent.width / 2.0;
    let body = octant_rect(extent.start, top, extent.end, bottom, octant);
    layout.arms.push(body.with_layer(arm.layer));

    let mut terminal = Line::new(pt(extent.end, top), pt(extent.end, bottom));
    terminal.rotate_around(Point::ORIGIN, octant_angle(octant));
    layout.ports.push(PortLabel {
        name: port.name.clone(),
        text: port.label.clone(),
        position: terminal.midpoint(),
        layer: arm.layer,
    });

    if let Some(stack) = &arm.via_stack {
        let pad = octant_rect(extent.start, top, extent.start - ctx.width, bottom, octant);
        stack.place_on(&pad, &mut layout.vias);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::Description;
    use crate::layout::model::LayoutModel;

    fn build(arm: &str, segment_id: usize, snap: bool) -> Layout {
        let json = format!(
            r#"{{
                "parameters": {{"apothem": 50, "width": 10, "spacing": 5, "rings": 2}},
                "layer": {{"M1": {{"gdsLayer": 1, "gdsDatatype": 0}}}},
                "segments": {{"data": {{
                    "S{segment_id}": {{"id": {segment_id}, "group": [
                        {{"type": "DEFAULT", "data": {{"layer": "M1"}}}},
                        {{"type": "PORT", "data": {{"layer": "M1", "arm": "A1"}}}}
                    ]}}
                }}}},
                "arms": {{"A1": {arm}}},
                "ports": {{"data": {{"P1": {{"label": "IN"}}, "P2": {{"label": "OUT"}}}}}}
            }}"#
        );
        let description = Description::from_json(&json).unwrap();
        let ctx = LayoutContext::new(&description).unwrap();
        let model = LayoutModel::new(&ctx, &description).unwrap();
        let mut layout = Layout::default();
        generate_arms(&ctx, &model.segments, snap, &mut layout);
        layout
    }

    #[test]
    fn single_arm_runs_from_ring_to_pad() {
        let layout = build(
            r#"{"type": "SINGLE", "length": 20, "width": 4, "layer": "M1", "port": "P1"}"#,
            0,
            true,
        );
        assert_eq!(layout.arms.len(), 1);
        let bbox = layout.arms[0].bounding_box();
        // ring 1 outer edge at 75, outermost edge at 75, plus 20
        assert!((bbox.min.x - 75.0).abs() < 1e-9);
        assert!((bbox.max.x - 95.0).abs() < 1e-9);
        assert!((bbox.height() - 4.0).abs() < 1e-9);
        assert_eq!(layout.ports.len(), 1);
        assert_eq!(layout.ports[0].text, "IN");
        assert!((layout.ports[0].position.x - 95.0).abs() < 1e-9);
    }

    #[test]
    fn double_arm_places_two_conductors_and_ports() {
        let layout = build(
            r#"{"type": "double", "length": 20, "width": 4, "spacing": 6, "layer": "M1", "port": ["P1", "P2"]}"#,
            2,
            true,
        );
        assert_eq!(layout.arms.len(), 2);
        let labels: Vec<_> = layout.ports.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(labels, ["IN", "OUT"]);
        // north-pointing: the first conductor is offset towards -x after rotation
        let first = layout.arms[0].bounding_box().center();
        let second = layout.arms[1].bounding_box().center();
        assert!((first.x + 5.0).abs() < 1e-9);
        assert!((second.x - 5.0).abs() < 1e-9);
    }

    #[test]
    fn diagonal_arm_is_grid_adjusted() {
        let layout = build(
            r#"{"type": "SINGLE", "length": 20, "width": 4, "layer": "M1", "port": "P1"}"#,
            1,
            true,
        );
        let g = 0.005;
        let step = g * std::f64::consts::SQRT_2;
        let width = grid_adjusted_length(4.0, g);
        assert!(((width / 2.0) / step - ((width / 2.0) / step).round()).abs() < 1e-6);
        let raw = build(
            r#"{"type": "SINGLE", "length": 20, "width": 4, "layer": "M1", "port": "P1"}"#,
            1,
            false,
        );
        assert_ne!(layout.arms[0].vertices, raw.arms[0].vertices);
    }

    #[test]
    fn unknown_port_is_rejected() {
        let description = Description::from_json(
            r#"{
                "parameters": {"apothem": 50, "width": 10, "spacing": 5, "rings": 1},
                "layer": {"M1": {"gdsLayer": 1, "gdsDatatype": 0}},
                "segments": {"data": {}},
                "arms": {"A1": {"type": "SINGLE", "length": 1, "width": 1, "layer": "M1", "port": "P9"}}
            }"#,
        )
        .unwrap();
        let ctx = LayoutContext::new(&description).unwrap();
        let err = LayoutModel::new(&ctx, &description).unwrap_err();
        assert!(matches!(
            err,
            LayoutError::Configuration(ConfigurationError::UnknownReference { kind: "port", .. })
        ));
    }
}
