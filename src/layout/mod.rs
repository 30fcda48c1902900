//! The layout pipeline
//!
//! This module is organized into submodules:
//! - `context`: resolved parameters, dimensions, layers and via stacks
//! - `model`: the normalized description every stage reads
//! - `cells`: per-(segment, ring) cells and ring segment polygons
//! - `bridges`: jump bookkeeping, bridge polygons and extensions
//! - `arms`: arm conductors and port labels
//! - `guard_ring`: guard ring shapes and contacts
//! - `dummy_fill`: fill groups along the guard ring
//! - `via_stack`: via tiling inside a pad
//! - `geometry`: octant-local shapes shared by the stages above

pub mod arms;
pub mod bridges;
pub mod cells;
pub mod context;
pub mod dummy_fill;
pub mod geometry;
pub mod guard_ring;
pub mod model;
pub mod via_stack;

pub use arms::PortLabel;
pub use context::LayoutContext;
pub use model::LayoutModel;

use serde::Serialize;

use crate::description::Description;
use crate::errors::{ConfigurationError, LayoutError};
use crate::log::{debug, info};
use crate::polygon::Polygon;

/// Everything one build produces, grouped by category
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub name: String,
    pub segments: Vec<Polygon>,
    pub bridges: Vec<Polygon>,
    pub arms: Vec<Polygon>,
    pub vias: Vec<Polygon>,
    pub guard_ring: Vec<Polygon>,
    pub dummy_fills: Vec<Polygon>,
    pub ports: Vec<PortLabel>,
}

impl Layout {
    /// Total number of polygons over all categories
    pub fn polygon_count(&self) -> usize {
        self.categories().map(|(_, polys)| polys.len()).sum()
    }

    /// Polygon lists by their output name
    pub fn categories(&self) -> impl Iterator<Item = (&'static str, &[Polygon])> {
        [
            ("segments", self.segments.as_slice()),
            ("bridges", self.bridges.as_slice()),
            ("arms", self.arms.as_slice()),
            ("vias", self.vias.as_slice()),
            ("guardRing", self.guard_ring.as_slice()),
            ("dummyFills", self.dummy_fills.as_slice()),
        ]
        .into_iter()
    }

    /// Round every vertex and port position to the nearest multiple of `grid`
    pub fn snap_to_grid(&mut self, grid: f64) {
        for list in [
            &mut self.segments,
            &mut self.bridges,
            &mut self.arms,
            &mut self.vias,
            &mut self.guard_ring,
            &mut self.dummy_fills,
        ] {
            for poly in list.iter_mut() {
                poly.snap_to_grid(grid);
            }
        }
        for port in &mut self.ports {
            port.position.snap_to_grid(grid);
        }
    }
}

/// Per-run switches that are not part of the description
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    /// Snap every output vertex to the `precision` grid
    pub snap_to_grid: bool,
    /// Replace dummy fill polygons by staircase approximations at this step
    pub staircase_step: Option<f64>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            snap_to_grid: true,
            staircase_step: None,
        }
    }
}

/// Build every polygon for `description`.
///
/// Stages run in a fixed order: ring segments, bridges, arms, then the guard
/// ring and its dummy fill. Dummy fill reads the finished arm polygons for
/// clearance, so it always runs last.
pub fn generate(description: &Description, options: &LayoutOptions) -> Result<Layout, LayoutError> {
    if let Some(step) = options.staircase_step {
        if !(step.is_finite() && step > 0.0) {
            return Err(ConfigurationError::InvalidValue {
                name: "staircase step".to_string(),
                reason: format!("{step} must be a positive finite length"),
            }
            .into());
        }
    }
    let ctx = LayoutContext::new(description)?;
    let model = LayoutModel::new(&ctx, description)?;

    let mut layout = Layout {
        name: description.metadata.name.clone(),
        ..Layout::default()
    };

    cells::generate_segments(&ctx, &model.segments, &mut layout);
    bridges::generate_bridges(&ctx, &model.segments, &mut layout);
    arms::generate_arms(&ctx, &model.segments, options.snap_to_grid, &mut layout);

    if let Some(guard) = &model.guard_ring {
        guard_ring::generate_guard_ring(&ctx, guard, &mut layout);
        dummy_fill::generate_dummy_fill(&ctx, guard, options.staircase_step, &mut layout);
    }

    if options.snap_to_grid {
        layout.snap_to_grid(ctx.grid);
    }

    info!(
        name = %layout.name,
        polygons = layout.polygon_count(),
        ports = layout.ports.len(),
        "layout generated"
    );
    debug!(
        segments = layout.segments.len(),
        bridges = layout.bridges.len(),
        arms = layout.arms.len(),
        vias = layout.vias.len(),
        guard_ring = layout.guard_ring.len(),
        dummy_fills = layout.dummy_fills.len(),
        "polygons per category"
    );
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn description(extra: &str) -> Description {
        Description::from_json(&format!(
            r#"{{
                "metadata": {{"name": "L1"}},
                "parameters": {{"apothem": 50, "width": 10, "spacing": 5, "rings": 2}},
                "layer": {{"M1": {{"gdsLayer": 1, "gdsDatatype": 0}}}},
                "segments": {{"data": {{}}}}
                {extra}
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn empty_segments_produce_an_empty_layout() {
        let layout = generate(&description(""), &LayoutOptions::default()).unwrap();
        assert_eq!(layout.name, "L1");
        assert_eq!(layout.polygon_count(), 0);
        assert!(layout.ports.is_empty());
    }

    #[test]
    fn snapping_rounds_port_positions() {
        let mut layout = Layout {
            ports: vec![PortLabel {
                name: "P".to_string(),
                text: "IN".to_string(),
                position: crate::types::pt(1.0012, -2.0031),
                layer: crate::polygon::GdsLayer::new(1, 0),
            }],
            ..Layout::default()
        };
        layout.snap_to_grid(0.005);
        assert_eq!(layout.ports[0].position, crate::types::pt(1.0, -2.005));
    }

    #[test]
    fn staircase_step_must_be_positive() {
        for step in [0.0, -0.5, f64::NAN, f64::INFINITY] {
            let options = LayoutOptions {
                staircase_step: Some(step),
                ..LayoutOptions::default()
            };
            let err = generate(&description(""), &options).unwrap_err();
            assert!(
                matches!(
                    err,
                    LayoutError::Configuration(ConfigurationError::InvalidValue { .. })
                ),
                "step {step}: {err}"
            );
        }
    }

    #[test]
    fn serializes_categories_in_camel_case() {
        let layout = Layout::default();
        let json = serde_json::to_value(&layout).unwrap();
        for key in ["name", "segments", "guardRing", "dummyFills", "ports"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
