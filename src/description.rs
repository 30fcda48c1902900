//! Declarative layout description, as decoded from JSON.
//!
//! These types mirror the input document one-to-one: names are still names
//! and tags are still strings. [`crate::layout::LayoutContext`] turns them
//! into the typed model the pipeline runs on.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

use crate::errors::LayoutError;
use crate::params::{Quantity, RawParam};

/// The whole input document
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Description {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub parameters: IndexMap<String, RawParam>,
    #[serde(default)]
    pub layer: IndexMap<String, LayerDef>,
    #[serde(default)]
    pub via: IndexMap<String, ViaDef>,
    #[serde(default)]
    pub via_pad_stack: IndexMap<String, ViaPadStackDef>,
    pub segments: SegmentsDef,
    #[serde(default)]
    pub bridges: IndexMap<String, BridgeDef>,
    #[serde(default)]
    pub arms: IndexMap<String, ArmDef>,
    #[serde(default)]
    pub ports: PortsDef,
    #[serde(default)]
    pub guard_ring: Option<GuardRingDef>,
}

impl Description {
    pub fn from_json(json: &str) -> Result<Self, LayoutError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDef {
    pub gds_layer: Quantity,
    pub gds_datatype: Quantity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViaDef {
    pub length: Quantity,
    pub width: Quantity,
    pub spacing: Quantity,
    #[serde(default = "zero")]
    pub angle: Quantity,
    pub layer: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViaPadStackDef {
    pub top_layer: String,
    pub bottom_layer: String,
    #[serde(default = "zero")]
    pub margin: Quantity,
    #[serde(default)]
    pub vias: Vec<String>,
}

// ============================================================================
// Segments
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentsDef {
    #[serde(default)]
    pub config: SegmentsConfig,
    pub data: IndexMap<String, SegmentDef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentsConfig {
    #[serde(
        default,
        alias = "bridge_extension_aligned",
        deserialize_with = "deserialize_flag"
    )]
    pub bridge_extension_aligned: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentDef {
    pub id: i64,
    pub group: Vec<CellDef>,
}

/// One ring of a segment: `{"type": "BRIDGE", "data": {...}}`
#[derive(Debug, Clone, Deserialize)]
pub struct CellDef {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: CellData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CellData {
    #[serde(default)]
    pub layer: Option<String>,
    #[serde(default)]
    pub jump: Option<Quantity>,
    #[serde(default)]
    pub bridge: Option<String>,
    #[serde(default)]
    pub arm: Option<String>,
}

// ============================================================================
// Bridges, arms and ports
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeDef {
    pub layer: String,
    #[serde(default, alias = "ViaWidth")]
    pub via_width: Option<Quantity>,
    #[serde(default, rename = "viaStackCCW", alias = "ViaStackCCW")]
    pub via_stack_ccw: Option<String>,
    #[serde(default, rename = "viaStackCW", alias = "ViaStackCW")]
    pub via_stack_cw: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmDef {
    #[serde(rename = "type")]
    pub kind: String,
    pub length: Quantity,
    pub width: Quantity,
    #[serde(default)]
    pub spacing: Option<Quantity>,
    pub layer: String,
    pub port: PortNames,
    #[serde(default)]
    pub via_stack: Option<String>,
}

/// A single port name, or one per conductor for double arms
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PortNames {
    One(String),
    Many(Vec<String>),
}

impl PortNames {
    pub fn names(&self) -> Vec<&str> {
        match self {
            PortNames::One(name) => vec![name.as_str()],
            PortNames::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortsDef {
    #[serde(default)]
    pub data: IndexMap<String, PortDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortDef {
    pub label: String,
}

// ============================================================================
// Guard ring and dummy fill
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GuardRingDef {
    #[serde(default)]
    pub config: GuardRingConfig,
    pub data: GuardRingData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardRingConfig {
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub use_guard_ring: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardRingData {
    pub distance: Quantity,
    #[serde(default)]
    pub segments: IndexMap<String, GuardSegmentDef>,
    #[serde(default)]
    pub dummy_fills: Option<DummyFillDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardSegmentDef {
    pub shape: String,
    #[serde(default = "zero")]
    pub offset: Quantity,
    pub layer: String,
    #[serde(default)]
    pub width: Option<Quantity>,
    #[serde(default)]
    pub partial_cut: Option<PartialCutDef>,
    #[serde(default)]
    pub contacts: Option<ContactsDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartialCutDef {
    #[serde(rename = "use", default, deserialize_with = "deserialize_flag")]
    pub enabled: bool,
    /// One octant index or a list of them
    pub segment: RawParam,
    pub spacing: Quantity,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactsDef {
    #[serde(rename = "use", default, deserialize_with = "deserialize_flag")]
    pub enabled: bool,
    #[serde(default)]
    pub via_stack: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DummyFillDef {
    #[serde(rename = "type", default = "checkered")]
    pub kind: String,
    #[serde(default = "zero")]
    pub group_spacing: Quantity,
    #[serde(default)]
    pub items: IndexMap<String, DummyItemDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DummyItemDef {
    #[serde(default = "rect")]
    pub shape: String,
    #[serde(default = "zero", rename = "offsetX")]
    pub offset_x: Quantity,
    #[serde(default = "zero", rename = "offsetY")]
    pub offset_y: Quantity,
    pub length: Quantity,
    pub height: Quantity,
    #[serde(default)]
    pub layers: Vec<String>,
}

fn zero() -> Quantity {
    Quantity::Number(0.0)
}

fn checkered() -> String {
    "checkered".to_string()
}

fn rect() -> String {
    "rect".to_string()
}

/// Flags are written as booleans or as 0/1
fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(f64),
    }
    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Number(n) => n != 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_description_decodes() {
        let d = Description::from_json(
            r#"{
                "metadata": {"name": "L1"},
                "parameters": {"width": 10},
                "segments": {"data": {"S0": {"id": 0, "group": [{"type": "DEFAULT", "data": {"layer": "M1"}}]}}}
            }"#,
        )
        .unwrap();
        assert_eq!(d.metadata.name, "L1");
        assert!(!d.segments.config.bridge_extension_aligned);
        assert_eq!(d.segments.data["S0"].group[0].kind, "DEFAULT");
        assert!(d.guard_ring.is_none());
    }

    #[test]
    fn legacy_key_spellings_are_accepted() {
        let bridge: BridgeDef = serde_json::from_str(
            r#"{"layer": "M9", "ViaWidth": 2, "ViaStackCCW": "VS1", "ViaStackCW": "VS2"}"#,
        )
        .unwrap();
        assert_eq!(bridge.via_width, Some(Quantity::Number(2.0)));
        assert_eq!(bridge.via_stack_ccw.as_deref(), Some("VS1"));
        assert_eq!(bridge.via_stack_cw.as_deref(), Some("VS2"));

        let config: SegmentsConfig =
            serde_json::from_str(r#"{"bridge_extension_aligned": 1}"#).unwrap();
        assert!(config.bridge_extension_aligned);
    }

    #[test]
    fn arm_ports_accept_one_or_many() {
        let single: ArmDef = serde_json::from_str(
            r#"{"type": "SINGLE", "length": 20, "width": "w", "layer": "M1", "port": "P1"}"#,
        )
        .unwrap();
        assert_eq!(single.port.names(), ["P1"]);
        let double: ArmDef = serde_json::from_str(
            r#"{"type": "DOUBLE", "length": 20, "width": 5, "spacing": 4, "layer": "M1", "port": ["P1", "P2"]}"#,
        )
        .unwrap();
        assert_eq!(double.port.names(), ["P1", "P2"]);
    }

    #[test]
    fn malformed_json_is_a_description_error() {
        assert!(matches!(
            Description::from_json("{\"segments\": 3}"),
            Err(LayoutError::Description(_))
        ));
    }
}
