//! Layout context: resolved parameters, structural dimensions and the named
//! layers and via stacks every stage looks up.

use indexmap::IndexMap;

use crate::description::{Description, LayerDef};
use crate::errors::{ConfigurationError, LayoutError, ValidationError};
use crate::log::debug;
use crate::params::{Parameters, Quantity, resolve_parameters};
use crate::polygon::GdsLayer;

use super::via_stack::{Via, ViaPadStack};

/// Fabrication grid used when the description sets no `precision`
pub const DEFAULT_GRID_PRECISION: f64 = 0.005;

/// Degrees between consecutive octants
pub const ROTATION_ANGLE_UNIT: f64 = 45.0;

/// Read-only state shared by all pipeline stages
#[derive(Debug, Clone)]
pub struct LayoutContext {
    pub params: Parameters,
    /// Apothem of the innermost ring's inner edge
    pub apothem: f64,
    /// Conductor width of every ring
    pub width: f64,
    /// Gap between neighbouring rings
    pub spacing: f64,
    pub rings: usize,
    /// Number of octants drawn for octagon-ring guard segments
    pub corners: usize,
    pub grid: f64,
    pub bridge_extension_aligned: bool,
    layers: IndexMap<String, GdsLayer>,
    via_stacks: IndexMap<String, ViaPadStack>,
}

impl LayoutContext {
    pub fn new(description: &Description) -> Result<Self, LayoutError> {
        let params = resolve_parameters(&description.parameters)?;
        debug!(count = params.len(), "resolved parameters");

        let apothem = required(&params, "apothem")?;
        let width = required(&params, "width")?;
        let spacing = required(&params, "spacing")?;
        let rings = count(required(&params, "rings")?, "rings")?;
        if rings == 0 {
            return Err(invalid("rings", "at least one ring is required").into());
        }
        let corners = match optional(&params, "corners")? {
            Some(c) => {
                let c = c.round() as i64;
                if !(1..=8).contains(&c) {
                    return Err(ValidationError::Corners { corners: c }.into());
                }
                c as usize
            }
            None => 8,
        };
        let grid = optional(&params, "precision")?.unwrap_or(DEFAULT_GRID_PRECISION);
        if grid <= 0.0 {
            return Err(invalid("precision", "the grid must be positive").into());
        }

        let mut ctx = Self {
            params,
            apothem,
            width,
            spacing,
            rings,
            corners,
            grid,
            bridge_extension_aligned: description.segments.config.bridge_extension_aligned,
            layers: IndexMap::new(),
            via_stacks: IndexMap::new(),
        };

        for (name, def) in &description.layer {
            let layer = ctx.gds_layer(name, def)?;
            ctx.layers.insert(name.clone(), layer);
        }

        let mut vias = IndexMap::new();
        for (name, def) in &description.via {
            let owner = format!("via {name}");
            let via = Via {
                length: ctx.quantity(&format!("{owner}.length"), &def.length)?,
                width: ctx.quantity(&format!("{owner}.width"), &def.width)?,
                spacing: ctx.quantity(&format!("{owner}.spacing"), &def.spacing)?,
                angle: ctx.quantity(&format!("{owner}.angle"), &def.angle)?,
                layer: ctx.layer(&def.layer, &owner)?,
            };
            vias.insert(name.clone(), via);
        }

        for (name, def) in &description.via_pad_stack {
            let owner = format!("viaPadStack {name}");
            let stack = ViaPadStack {
                name: name.clone(),
                top_layer: ctx.layer(&def.top_layer, &owner)?,
                bottom_layer: ctx.layer(&def.bottom_layer, &owner)?,
                margin: ctx.quantity(&format!("{owner}.margin"), &def.margin)?,
                vias: def
                    .vias
                    .iter()
                    .map(|v| {
                        vias.get(v.trim()).cloned().ok_or_else(|| {
                            ConfigurationError::UnknownReference {
                                kind: "via",
                                name: v.clone(),
                                owner: owner.clone(),
                            }
                        })
                    })
                    .collect::<Result<_, _>>()?,
            };
            ctx.via_stacks.insert(name.clone(), stack);
        }

        debug!(
            apothem = ctx.apothem,
            width = ctx.width,
            spacing = ctx.spacing,
            rings = ctx.rings,
            layers = ctx.layers.len(),
            via_stacks = ctx.via_stacks.len(),
            "layout context ready"
        );
        Ok(ctx)
    }

    /// Evaluate a numeric field; `name` labels it in diagnostics
    pub fn quantity(&self, name: &str, quantity: &Quantity) -> Result<f64, LayoutError> {
        Ok(self.params.quantity(name, quantity)?)
    }

    pub fn layer(&self, name: &str, owner: &str) -> Result<GdsLayer, ConfigurationError> {
        self.layers
            .get(name)
            .copied()
            .ok_or_else(|| ConfigurationError::UnknownReference {
                kind: "layer",
                name: name.to_string(),
                owner: owner.to_string(),
            })
    }

    pub fn via_stack(&self, name: &str, owner: &str) -> Result<&ViaPadStack, ConfigurationError> {
        self.via_stacks
            .get(name)
            .ok_or_else(|| ConfigurationError::UnknownReference {
                kind: "viaPadStack",
                name: name.to_string(),
                owner: owner.to_string(),
            })
    }

    /// Centre-to-centre distance between neighbouring rings
    pub fn pitch(&self) -> f64 {
        self.width + self.spacing
    }

    /// Inner apothem of `ring`
    pub fn ring_apothem(&self, ring: usize) -> f64 {
        self.apothem + ring as f64 * self.pitch()
    }

    /// Apothem of the outermost ring's outer edge
    pub fn outer_apothem(&self) -> f64 {
        let n = self.rings as f64;
        self.apothem + n * self.width + (n - 1.0) * self.spacing
    }

    fn gds_layer(&self, name: &str, def: &LayerDef) -> Result<GdsLayer, LayoutError> {
        let owner = format!("layer {name}");
        let number = |field: &str, q: &Quantity| -> Result<u16, LayoutError> {
            let value = self.quantity(&format!("{owner}.{field}"), q)?;
            if value.fract() != 0.0 || !(0.0..=f64::from(u16::MAX)).contains(&value) {
                return Err(invalid(
                    &format!("{owner}.{field}"),
                    &format!("{value} is not a GDS number"),
                )
                .into());
            }
            Ok(value as u16)
        };
        Ok(GdsLayer::new(
            number("gdsLayer", &def.gds_layer)?,
            number("gdsDatatype", &def.gds_datatype)?,
        ))
    }
}

fn invalid(name: &str, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

fn optional(params: &Parameters, name: &'static str) -> Result<Option<f64>, ConfigurationError> {
    match params.get(name) {
        None => Ok(None),
        Some(value) => value
            .as_number()
            .map(Some)
            .ok_or_else(|| invalid(name, "expected a number, found a sequence")),
    }
}

fn required(params: &Parameters, name: &'static str) -> Result<f64, ConfigurationError> {
    optional(params, name)?.ok_or(ConfigurationError::MissingParameter { name })
}

fn count(value: f64, name: &'static str) -> Result<usize, ConfigurationError> {
    if value.fract() != 0.0 || value < 0.0 {
        return Err(invalid(name, &format!("{value} is not a whole number")));
    }
    Ok(value as usize)
}
