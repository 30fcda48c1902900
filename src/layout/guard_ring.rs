//! Guard ring around the outermost winding, with optional partial cuts and
//! substrate contacts.

use crate::description::{GuardRingDef, GuardSegmentDef, PartialCutDef};
use crate::errors::{ConfigurationError, LayoutError};
use crate::log::debug;
use crate::octagon::Octagon;
use crate::params::ParamValue;
use crate::polygon::{GdsLayer, Polygon};

use super::Layout;
use super::context::LayoutContext;
use super::dummy_fill::DummyFill;
use super::geometry::{ring_segment, split_ring_segment};
use super::via_stack::ViaPadStack;

#[derive(Debug, Clone, PartialEq)]
pub struct GuardRing {
    /// Gap between the outermost ring's outer edge and the guard ring
    pub distance: f64,
    pub segments: Vec<GuardSegment>,
    pub dummy_fill: Option<DummyFill>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuardSegment {
    pub name: String,
    /// Extra apothem on top of the guard ring reference
    pub offset: f64,
    pub layer: GdsLayer,
    pub shape: GuardShape,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuardShape {
    /// A filled octagon
    Octagon,
    /// One trapezoid per drawn octant
    OctagonRing {
        width: f64,
        partial_cut: Option<PartialCut>,
        contacts: Option<ViaPadStack>,
    },
}

/// Octants whose ring trapezoid gets a centred gap of `spacing`
#[derive(Debug, Clone, PartialEq)]
pub struct PartialCut {
    pub octants: Vec<usize>,
    pub spacing: f64,
}

impl GuardRing {
    pub fn from_def(ctx: &LayoutContext, def: &GuardRingDef) -> Result<Self, LayoutError> {
        let data = &def.data;
        let segments = data
            .segments
            .iter()
            .map(|(name, segment)| GuardSegment::from_def(ctx, name, segment))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            distance: ctx.quantity("guardRing.distance", &data.distance)?,
            segments,
            dummy_fill: data
                .dummy_fills
                .as_ref()
                .map(|d| DummyFill::from_def(ctx, d))
                .transpose()?,
        })
    }

    /// Apothem the guard ring segments and the dummy fill are measured from
    pub fn reference_apothem(&self, ctx: &LayoutContext) -> f64 {
        ctx.outer_apothem() + self.distance
    }
}

impl GuardSegment {
    fn from_def(ctx: &LayoutContext, name: &str, def: &GuardSegmentDef) -> Result<Self, LayoutError> {
        let owner = format!("guard ring segment {name}");
        let shape = match def.shape.to_ascii_lowercase().as_str() {
            "octagon" => GuardShape::Octagon,
            "octagonring" => {
                let width = def.width.as_ref().ok_or_else(|| ConfigurationError::MissingField {
                    owner: owner.clone(),
                    field: "width",
                })?;
                let partial_cut = match &def.partial_cut {
                    Some(cut) if cut.enabled => Some(partial_cut(ctx, &owner, cut)?),
                    _ => None,
                };
                let contacts = match &def.contacts {
                    Some(contacts) if contacts.enabled => {
                        let stack = contacts.via_stack.as_deref().ok_or_else(|| {
                            ConfigurationError::MissingField {
                                owner: owner.clone(),
                                field: "contacts.viaStack",
                            }
                        })?;
                        Some(ctx.via_stack(stack, &owner)?.clone())
                    }
                    _ => None,
                };
                GuardShape::OctagonRing {
                    width: ctx.quantity(&format!("{owner}.width"), width)?,
                    partial_cut,
                    contacts,
                }
            }
            _ => {
                return Err(ConfigurationError::UnsupportedTag {
                    field: "guard ring shape",
                    tag: def.shape.clone(),
                    owner,
                    expected: "octagon, octagonRing",
                }
                .into());
            }
        };
        Ok(Self {
            name: name.to_string(),
            offset: ctx.quantity(&format!("{owner}.offset"), &def.offset)?,
            layer: ctx.layer(&def.layer, &owner)?,
            shape,
        })
    }
}

/// `segment` may name one octant or a list of them
fn partial_cut(ctx: &LayoutContext, owner: &str, def: &PartialCutDef) -> Result<PartialCut, LayoutError> {
    let name = format!("{owner}.partialCut.segment");
    let octant = |value: f64| -> Result<usize, ConfigurationError> {
        if value.fract() != 0.0 || !(0.0..8.0).contains(&value) {
            return Err(ConfigurationError::InvalidValue {
                name: name.clone(),
                reason: format!("{value} is not an octant index"),
            });
        }
        Ok(value as usize)
    };
    let octants = match ctx.params.resolve_value(&name, &def.segment)? {
        ParamValue::Number(n) => vec![octant(n)?],
        ParamValue::List(items) => items
            .iter()
            .map(|item| match item {
                ParamValue::Number(n) => octant(*n),
                ParamValue::List(_) => Err(ConfigurationError::InvalidValue {
                    name: name.clone(),
                    reason: "nested sequences are not octant indices".to_string(),
                }),
            })
            .collect::<Result<_, _>>()?,
    };
    Ok(PartialCut {
        octants,
        spacing: ctx.quantity(&format!("{owner}.partialCut.spacing"), &def.spacing)?,
    })
}

/// Emit guard ring polygons and contact via stacks
pub fn generate_guard_ring(ctx: &LayoutContext, guard: &GuardRing, layout: &mut Layout) {
    let reference = guard.reference_apothem(ctx);
    for segment in &guard.segments {
        let apothem = reference + segment.offset;
        match &segment.shape {
            GuardShape::Octagon => {
                let poly = Octagon::new(apothem).to_polygon();
                layout.guard_ring.push(poly.with_layer(segment.layer));
            }
            GuardShape::OctagonRing {
                width,
                partial_cut,
                contacts,
            } => {
                for octant in 0..ctx.corners {
                    let pieces: Vec<Polygon> = match partial_cut {
                        Some(cut) if cut.octants.contains(&octant) => {
                            let half = cut.spacing / 2.0;
                            split_ring_segment(apothem, *width, octant, half, half).into()
                        }
                        _ => vec![ring_segment(apothem, *width, octant)],
                    };
                    for piece in pieces {
                        if let Some(stack) = contacts {
                            stack.place_on(&piece, &mut layout.vias);
                        }
                        layout.guard_ring.push(piece.with_layer(segment.layer));
                    }
                }
            }
        }
    }
    debug!(
        reference,
        count = layout.guard_ring.len(),
        "guard ring polygons"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::Description;
    use crate::layout::model::LayoutModel;

    fn guard(segments: &str, corners: usize) -> (LayoutContext, GuardRing) {
        let json = format!(
            r#"{{
                "parameters": {{"apothem": 50, "width": 10, "spacing": 5, "rings": 2, "corners": {corners}, "cut": [1, 5]}},
                "layer": {{"M1": {{"gdsLayer": 1, "gdsDatatype": 0}}, "SUB": {{"gdsLayer": 5, "gdsDatatype": 0}}, "CO": {{"gdsLayer": 6, "gdsDatatype": 0}}}},
                "via": {{"C": {{"length": 1, "width": 1, "spacing": 1, "layer": "CO"}}}},
                "viaPadStack": {{"SUBCON": {{"topLayer": "M1", "bottomLayer": "SUB", "margin": 0.5, "vias": ["C"]}}}},
                "segments": {{"data": {{}}}},
                "guardRing": {{"config": {{"useGuardRing": 1}}, "data": {{"distance": 20, "segments": {segments}}}}}
            }}"#
        );
        let description = Description::from_json(&json).unwrap();
        let ctx = LayoutContext::new(&description).unwrap();
        let model = LayoutModel::new(&ctx, &description).unwrap();
        (ctx, model.guard_ring.unwrap())
    }

    #[test]
    fn octagon_shape_is_one_polygon_at_offset_apothem() {
        let (ctx, g) = guard(r#"{"G": {"shape": "octagon", "offset": 5, "layer": "SUB"}}"#, 8);
        let mut layout = Layout::default();
        generate_guard_ring(&ctx, &g, &mut layout);
        assert_eq!(layout.guard_ring.len(), 1);
        // outer edge 50 + 20 + 5 = 75, plus distance 20 and offset 5
        let expected = Octagon::new(100.0).area();
        assert!((layout.guard_ring[0].area() - expected).abs() < 1e-9);
    }

    #[test]
    fn octagon_ring_draws_the_configured_corners() {
        let (ctx, g) = guard(
            r#"{"G": {"shape": "octagonRing", "layer": "SUB", "width": 4}}"#,
            6,
        );
        let mut layout = Layout::default();
        generate_guard_ring(&ctx, &g, &mut layout);
        assert_eq!(layout.guard_ring.len(), 6);
        assert!(layout.vias.is_empty());
    }

    #[test]
    fn partial_cut_splits_listed_octants() {
        let (ctx, g) = guard(
            r#"{"G": {"shape": "OctagonRing", "layer": "SUB", "width": 4, "partialCut": {"use": true, "segment": "cut", "spacing": 6}}}"#,
            8,
        );
        let GuardShape::OctagonRing { partial_cut: Some(cut), .. } = &g.segments[0].shape else {
            panic!("expected a partial cut");
        };
        assert_eq!(cut.octants, [1, 5]);
        let mut layout = Layout::default();
        generate_guard_ring(&ctx, &g, &mut layout);
        assert_eq!(layout.guard_ring.len(), 8 + 2);
    }

    #[test]
    fn contacts_fill_every_piece() {
        let (ctx, g) = guard(
            r#"{"G": {"shape": "octagonRing", "layer": "SUB", "width": 4, "partialCut": {"use": 1, "segment": 0, "spacing": 6}, "contacts": {"use": true, "viaStack": "SUBCON"}}}"#,
            8,
        );
        let mut layout = Layout::default();
        generate_guard_ring(&ctx, &g, &mut layout);
        let pads = layout
            .vias
            .iter()
            .filter(|p| p.layer == Some(GdsLayer::new(5, 0)))
            .count();
        assert_eq!(pads, layout.guard_ring.len());
        assert!(layout.vias.iter().any(|p| p.layer == Some(GdsLayer::new(6, 0))));
    }

    #[test]
    fn unsupported_shape_is_rejected() {
        let description = Description::from_json(
            r#"{
                "parameters": {"apothem": 50, "width": 10, "spacing": 5, "rings": 2},
                "layer": {"SUB": {"gdsLayer": 5, "gdsDatatype": 0}},
                "segments": {"data": {}},
                "guardRing": {"config": {"useGuardRing": true}, "data": {"distance": 20, "segments": {"G": {"shape": "circle", "layer": "SUB"}}}}
            }"#,
        )
        .unwrap();
        let ctx = LayoutContext::new(&description).unwrap();
        assert!(matches!(
            LayoutModel::new(&ctx, &description),
            Err(LayoutError::Configuration(ConfigurationError::UnsupportedTag { field: "guard ring shape", .. }))
        ));
    }

    #[test]
    fn disabled_guard_ring_is_skipped() {
        let description = Description::from_json(
            r#"{
                "parameters": {"apothem": 50, "width": 10, "spacing": 5, "rings": 2},
                "segments": {"data": {}},
                "guardRing": {"config": {"useGuardRing": false}, "data": {"distance": 20}}
            }"#,
        )
        .unwrap();
        let ctx = LayoutContext::new(&description).unwrap();
        assert!(LayoutModel::new(&ctx, &description).unwrap().guard_ring.is_none());
    }
}
