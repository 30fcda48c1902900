//! Error types with rich diagnostics using miette
//!
//! Expression errors carry source spans into the expression text that failed,
//! layout errors name the offending parameter, side or reference.

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Byte offset and length of a token inside an expression string.
pub type Span = (usize, usize);

/// Source context for error reporting
#[derive(Debug, Clone, Copy)]
pub struct SourceContext<'a> {
    /// Name of the field or parameter that owns the expression
    pub name: &'a str,
    /// The expression text
    pub source: &'a str,
}

impl<'a> SourceContext<'a> {
    pub fn new(name: &'a str, source: &'a str) -> Self {
        Self { name, source }
    }

    /// Create a NamedSource for miette
    pub fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(self.name, self.source.to_string())
    }
}

// ============================================================================
// Expression Errors
// ============================================================================

/// Errors raised while parsing or evaluating a parameter expression
#[derive(Error, Diagnostic, Debug)]
pub enum ExprError {
    #[error("invalid expression: {message}")]
    #[diagnostic(code(octagen::expr::syntax))]
    Syntax {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("unknown function: {name}")]
    #[diagnostic(
        code(octagen::expr::unknown_function),
        help("available functions: sqrt, log, sin, cos, tan, floor, ceil, abs, max, min, round")
    )]
    UnknownFunction {
        name: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("not an allowed function")]
        span: SourceSpan,
    },

    #[error("undefined name: {name}")]
    #[diagnostic(code(octagen::expr::undefined_name))]
    UndefinedName {
        name: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("not resolved")]
        span: SourceSpan,
    },

    #[error("{function} takes {expected} argument(s), got {got}")]
    #[diagnostic(code(octagen::expr::arity))]
    Arity {
        function: &'static str,
        expected: &'static str,
        got: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("in this call")]
        span: SourceSpan,
    },

    #[error("math domain error in {function}")]
    #[diagnostic(code(octagen::expr::domain))]
    Domain {
        function: &'static str,
        #[source_code]
        src: NamedSource<String>,
        #[label("argument outside the domain of {function}")]
        span: SourceSpan,
    },

    #[error("division by zero")]
    #[diagnostic(code(octagen::expr::division_by_zero))]
    DivisionByZero {
        #[source_code]
        src: NamedSource<String>,
        #[label("divisor is zero")]
        span: SourceSpan,
    },

    #[error("expected a number, found a sequence")]
    #[diagnostic(code(octagen::expr::not_a_number))]
    NotANumber {
        #[source_code]
        src: NamedSource<String>,
        #[label("this is a sequence")]
        span: SourceSpan,
    },

    #[error("invalid numeric value")]
    #[diagnostic(code(octagen::expr::non_finite))]
    NonFinite {
        #[source_code]
        src: NamedSource<String>,
        #[label("this value is NaN or infinite")]
        span: SourceSpan,
    },
}

// ============================================================================
// Parameter Resolution Errors
// ============================================================================

/// Parameters left unresolved after the bounded fixed-point loop
#[derive(Error, Diagnostic, Debug)]
#[error("could not resolve parameters after {passes} passes: {}", .names.join(", "))]
#[diagnostic(
    code(octagen::params::unresolved),
    help("check for cyclic or undefined references between parameters")
)]
pub struct ParameterResolutionError {
    /// Every parameter still unresolved, in document order
    pub names: Vec<String>,
    pub passes: usize,
    /// The last failure recorded for each unresolved parameter
    #[related]
    pub causes: Vec<ExprError>,
}

// ============================================================================
// Geometry Errors
// ============================================================================

/// An octagon edit that would break the strictly increasing vertex angles
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum GeometryBoundaryError {
    #[error("{operation} breaks the octagon's angular order at vertex P{vertex}")]
    #[diagnostic(
        code(octagen::geometry::angular_order),
        help("use a factor inside the range reported by allowed_factors()")
    )]
    AngularOrder { operation: String, vertex: usize },

    #[error("{operation} has no solution: {reason}")]
    #[diagnostic(code(octagen::geometry::degenerate))]
    Degenerate {
        operation: String,
        reason: &'static str,
    },
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Problems with the layout description itself
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("{owner} references unknown {kind} `{name}`")]
    #[diagnostic(code(octagen::config::unknown_reference))]
    UnknownReference {
        kind: &'static str,
        name: String,
        owner: String,
    },

    #[error("unsupported {field} `{tag}` in {owner}")]
    #[diagnostic(code(octagen::config::unsupported_tag), help("expected one of: {expected}"))]
    UnsupportedTag {
        field: &'static str,
        tag: String,
        owner: String,
        expected: &'static str,
    },

    #[error("{owner} is missing required field `{field}`")]
    #[diagnostic(code(octagen::config::missing_field))]
    MissingField { owner: String, field: &'static str },

    #[error("missing required parameter `{name}`")]
    #[diagnostic(code(octagen::config::missing_parameter))]
    MissingParameter { name: &'static str },

    #[error("invalid value for {name}: {reason}")]
    #[diagnostic(code(octagen::config::invalid_value))]
    InvalidValue { name: String, reason: String },
}

// ============================================================================
// Validation Errors
// ============================================================================

/// Structurally valid input whose geometry cannot be built
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error(
        "bridge at segment {segment} ring {ring} jumps {jump} rings, landing outside 0..{rings}"
    )]
    #[diagnostic(code(octagen::validation::jump_out_of_range))]
    JumpOutOfRange {
        segment: String,
        ring: usize,
        jump: i64,
        rings: usize,
    },

    #[error("segment {segment} has id {id}, expected 0..=7")]
    #[diagnostic(code(octagen::validation::segment_id))]
    SegmentId { segment: String, id: i64 },

    #[error("corners must be between 1 and 8, got {corners}")]
    #[diagnostic(code(octagen::validation::corners))]
    Corners { corners: i64 },
}

// ============================================================================
// Layout Errors
// ============================================================================

/// Everything that can abort a single layout build
#[derive(Error, Diagnostic, Debug)]
pub enum LayoutError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parameters(#[from] ParameterResolutionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Geometry(#[from] GeometryBoundaryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Expression(#[from] ExprError),

    #[error("invalid layout description: {0}")]
    #[diagnostic(code(octagen::description))]
    Description(#[from] serde_json::Error),
}
