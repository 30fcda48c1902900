//! Parameter values and the bounded fixed-point resolver.
//!
//! Parameters may be numbers, sequences or expression strings referring to
//! other parameters. Resolution runs at most one pass per unresolved
//! parameter; each pass evaluates whatever can be evaluated against the
//! parameters resolved so far. Whatever is left afterwards is either cyclic
//! or refers to a name that does not exist.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::{ExprError, ParameterResolutionError, SourceContext};
use crate::eval::evaluate_source;
use crate::log::debug;

/// A parameter as written in the layout description
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawParam {
    Number(f64),
    Expr(String),
    List(Vec<RawParam>),
}

/// A resolved parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    List(Vec<ParamValue>),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            ParamValue::List(_) => None,
        }
    }
}

/// A numeric field that may also be written as an expression
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Number(f64),
    Expr(String),
}

impl From<f64> for Quantity {
    fn from(value: f64) -> Self {
        Quantity::Number(value)
    }
}

/// Resolved parameters in document order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Parameters {
    values: IndexMap<String, ParamValue>,
}

impl Parameters {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ParamValue::as_number)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.values.insert(name.into(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Evaluate a raw value (number, expression or sequence) against these parameters
    pub fn resolve_value(&self, name: &str, raw: &RawParam) -> Result<ParamValue, ExprError> {
        match raw {
            RawParam::Number(n) => Ok(ParamValue::Number(*n)),
            RawParam::Expr(source) => evaluate_source(SourceContext::new(name, source), self),
            RawParam::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.resolve_value(&format!("{name}[{i}]"), item))
                .collect::<Result<Vec<_>, _>>()
                .map(ParamValue::List),
        }
    }

    /// Evaluate a quantity that must produce a single number
    pub fn quantity(&self, name: &str, quantity: &Quantity) -> Result<f64, ExprError> {
        match quantity {
            Quantity::Number(n) => Ok(*n),
            Quantity::Expr(source) => {
                let ctx = SourceContext::new(name, source);
                match evaluate_source(ctx, self)? {
                    ParamValue::Number(n) => Ok(n),
                    ParamValue::List(_) => Err(ExprError::NotANumber {
                        src: ctx.named_source(),
                        span: (0, source.len()).into(),
                    }),
                }
            }
        }
    }
}

/// Resolve every parameter, or name all the ones that cannot be resolved
pub fn resolve_parameters(
    raw: &IndexMap<String, RawParam>,
) -> Result<Parameters, ParameterResolutionError> {
    let mut resolved = Parameters::default();
    let mut pending: IndexMap<&str, &RawParam> =
        raw.iter().map(|(name, value)| (name.as_str(), value)).collect();
    let mut failures: IndexMap<&str, ExprError> = IndexMap::new();

    let max_passes = pending.len();
    let mut passes = 0;
    while !pending.is_empty() && passes < max_passes {
        passes += 1;
        pending.retain(|name, value| match resolved.resolve_value(name, *value) {
            Ok(v) => {
                resolved.insert(*name, v);
                failures.shift_remove(*name);
                false
            }
            Err(e) => {
                failures.insert(*name, e);
                true
            }
        });
        debug!(pass = passes, remaining = pending.len(), "parameter resolution pass");
    }

    if pending.is_empty() {
        return Ok(resolved);
    }

    let names: Vec<String> = pending.keys().map(|n| n.to_string()).collect();
    let causes = pending
        .keys()
        .filter_map(|n| failures.shift_remove(*n))
        .collect();
    Err(ParameterResolutionError {
        names,
        passes,
        causes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> IndexMap<String, RawParam> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn chained_expressions_resolve() {
        let params = resolve_parameters(&raw(r#"{"a": 2, "b": "a+1", "c": "b*2"}"#)).unwrap();
        assert_eq!(params.number("a"), Some(2.0));
        assert_eq!(params.number("b"), Some(3.0));
        assert_eq!(params.number("c"), Some(6.0));
    }

    #[test]
    fn out_of_order_references_resolve_in_later_passes() {
        let params = resolve_parameters(&raw(r#"{"c": "b*2", "b": "a+1", "a": 2}"#)).unwrap();
        assert_eq!(params.number("c"), Some(6.0));
        let order: Vec<_> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(order, ["a", "b", "c"]);
    }

    #[test]
    fn cycle_is_reported_with_all_names() {
        let err = resolve_parameters(&raw(r#"{"a": "b", "b": "a"}"#)).unwrap_err();
        assert_eq!(err.names, ["a", "b"]);
        assert_eq!(err.passes, 2);
        assert_eq!(err.causes.len(), 2);
    }

    #[test]
    fn undefined_reference_is_reported() {
        let err = resolve_parameters(&raw(r#"{"a": 1, "b": "a + missing"}"#)).unwrap_err();
        assert_eq!(err.names, ["b"]);
        assert!(matches!(
            &err.causes[0],
            ExprError::UndefinedName { name, .. } if name == "missing"
        ));
    }

    #[test]
    fn sequences_resolve_element_wise() {
        let params =
            resolve_parameters(&raw(r#"{"w": 3, "jumps": [1, "w - 4", [0, "w"]]}"#)).unwrap();
        assert_eq!(
            params.get("jumps"),
            Some(&ParamValue::List(vec![
                ParamValue::Number(1.0),
                ParamValue::Number(-1.0),
                ParamValue::List(vec![ParamValue::Number(0.0), ParamValue::Number(3.0)]),
            ]))
        );
    }

    #[test]
    fn empty_input_resolves_without_passes() {
        assert!(resolve_parameters(&IndexMap::new()).unwrap().is_empty());
    }

    #[test]
    fn quantity_rejects_sequences() {
        let params = resolve_parameters(&raw(r#"{"seq": [1, 2]}"#)).unwrap();
        let q = Quantity::Expr("seq".to_string());
        assert!(matches!(params.quantity("field", &q), Err(ExprError::NotANumber { .. })));
        assert_eq!(params.quantity("field", &Quantity::from(4.0)).unwrap(), 4.0);
    }
}
