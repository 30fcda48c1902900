//! Parametric layout generator for octagonal multi-ring RF inductors and transformers.
//!
//! A JSON [`Description`] names the parameters, layers, via stacks, segment
//! cells, bridges, arms, ports and guard ring of a structure; [`generate`]
//! turns it into layer-tagged polygons grouped by category, ready for a
//! GDSII or SVG writer.

use pest_derive::Parser;

pub mod ast;
pub mod description;
pub mod errors;
pub mod eval;
pub mod layout;
pub mod log;
pub mod octagon;
pub mod params;
pub mod parse;
pub mod polygon;
pub mod types;

pub use description::Description;
pub use errors::{
    ConfigurationError, ExprError, GeometryBoundaryError, LayoutError, ParameterResolutionError,
    ValidationError,
};
pub use layout::{Layout, LayoutOptions, PortLabel, generate};
pub use octagon::Octagon;
pub use params::{ParamValue, Parameters, RawParam, resolve_parameters};
pub use polygon::{GdsLayer, Polygon};
pub use types::{Line, Point};

#[derive(Parser)]
#[grammar = "expr.pest"]
pub struct ExprParser;

/// Decode a JSON description and build its layout.
pub fn generate_from_json(json: &str, options: &LayoutOptions) -> Result<Layout, LayoutError> {
    let description = Description::from_json(json)?;
    generate(&description, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pest::Parser;

    #[test]
    fn parse_number() {
        let result = ExprParser::parse(Rule::expression, "1.5e3");
        assert!(result.is_ok(), "Failed to parse: {:?}", result.err());
    }

    #[test]
    fn parse_precedence() {
        let result = ExprParser::parse(Rule::expression, "a + b * -(c - 2) / 4");
        assert!(result.is_ok(), "Failed to parse: {:?}", result.err());
    }

    #[test]
    fn parse_calls() {
        let result = ExprParser::parse(Rule::expression, "max(width, sqrt(2) * spacing, 3)");
        assert!(result.is_ok(), "Failed to parse: {:?}", result.err());
    }

    #[test]
    fn parse_empty_call() {
        let result = ExprParser::parse(Rule::expression, "f()");
        assert!(result.is_ok(), "Failed to parse: {:?}", result.err());
    }

    #[test]
    fn reject_dangling_operator() {
        assert!(ExprParser::parse(Rule::expression, "1 +").is_err());
    }

    #[test]
    fn reject_attribute_access() {
        assert!(ExprParser::parse(Rule::expression, "a.b").is_err());
    }

    #[test]
    fn generate_from_json_reports_bad_json() {
        let err = generate_from_json("{", &LayoutOptions::default()).unwrap_err();
        assert!(matches!(err, LayoutError::Description(_)));
    }
}
