//! Parser: converts pest pairs into the expression AST

use pest::Parser;
use pest::error::InputLocation;
use pest::iterators::Pair;

use crate::ast::*;
use crate::errors::{ExprError, SourceContext, Span};
use crate::{ExprParser, Rule};

/// Parse an expression. `ctx.name` names the parameter or field it belongs to.
pub fn parse_expression(ctx: SourceContext<'_>) -> Result<Expr, ExprError> {
    let mut pairs = ExprParser::parse(Rule::expression, ctx.source).map_err(|e| {
        let span = match e.location {
            InputLocation::Pos(p) => (p, 0),
            InputLocation::Span((start, end)) => (start, end - start),
        };
        ExprError::Syntax {
            message: e.variant.message().into_owned(),
            src: ctx.named_source(),
            span: span.into(),
        }
    })?;

    let expression = next_pair(&mut pairs, ctx, (0, ctx.source.len()))?;
    let mut inner = expression.into_inner();
    let sum = next_pair(&mut inner, ctx, (0, ctx.source.len()))?;
    parse_sum(sum, ctx)
}

fn span_of(pair: &Pair<Rule>) -> Span {
    let s = pair.as_span();
    (s.start(), s.end() - s.start())
}

/// The grammar guarantees these children exist; a missing one is still
/// reported as a syntax error rather than a panic.
fn next_pair<'i>(
    pairs: &mut impl Iterator<Item = Pair<'i, Rule>>,
    ctx: SourceContext<'_>,
    at: Span,
) -> Result<Pair<'i, Rule>, ExprError> {
    pairs.next().ok_or_else(|| ExprError::Syntax {
        message: "incomplete expression".to_string(),
        src: ctx.named_source(),
        span: at.into(),
    })
}

fn parse_sum(pair: Pair<Rule>, ctx: SourceContext<'_>) -> Result<Expr, ExprError> {
    let at = span_of(&pair);
    let mut inner = pair.into_inner();
    let mut lhs = parse_product(next_pair(&mut inner, ctx, at)?, ctx)?;
    while let Some(op) = inner.next() {
        let op = match op.as_str() {
            "-" => BinaryOp::Sub,
            _ => BinaryOp::Add,
        };
        let rhs = parse_product(next_pair(&mut inner, ctx, at)?, ctx)?;
        lhs = Expr::Binary {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
            span: at,
        };
    }
    Ok(lhs)
}

fn parse_product(pair: Pair<Rule>, ctx: SourceContext<'_>) -> Result<Expr, ExprError> {
    let at = span_of(&pair);
    let mut inner = pair.into_inner();
    let mut lhs = parse_unary(next_pair(&mut inner, ctx, at)?, ctx)?;
    while let Some(op) = inner.next() {
        let op_span = span_of(&op);
        let op = match op.as_str() {
            "/" => BinaryOp::Div,
            _ => BinaryOp::Mul,
        };
        let rhs_pair = next_pair(&mut inner, ctx, at)?;
        let rhs_span = span_of(&rhs_pair);
        let rhs = parse_unary(rhs_pair, ctx)?;
        lhs = Expr::Binary {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
            // divisions point at the divisor
            span: if op == BinaryOp::Div { rhs_span } else { op_span },
        };
    }
    Ok(lhs)
}

fn parse_unary(pair: Pair<Rule>, ctx: SourceContext<'_>) -> Result<Expr, ExprError> {
    let mut signs = Vec::new();
    let mut primary = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::sign => signs.push(if inner.as_str() == "-" {
                UnaryOp::Neg
            } else {
                UnaryOp::Pos
            }),
            _ => primary = Some(parse_primary(inner, ctx)?),
        }
    }
    let mut expr = primary.ok_or_else(|| ExprError::Syntax {
        message: "expected a value".to_string(),
        src: ctx.named_source(),
        span: (0, ctx.source.len()).into(),
    })?;
    for op in signs.into_iter().rev() {
        expr = Expr::Unary {
            op,
            operand: Box::new(expr),
        };
    }
    Ok(expr)
}

fn parse_primary(pair: Pair<Rule>, ctx: SourceContext<'_>) -> Result<Expr, ExprError> {
    let at = span_of(&pair);
    let inner = next_pair(&mut pair.into_inner(), ctx, at)?;
    match inner.as_rule() {
        Rule::number => parse_number(inner, ctx),
        Rule::ident => Ok(Expr::Ident {
            name: inner.as_str().to_string(),
            span: span_of(&inner),
        }),
        Rule::call => parse_call(inner, ctx),
        _ => parse_sum(inner, ctx),
    }
}

fn parse_number(pair: Pair<Rule>, ctx: SourceContext<'_>) -> Result<Expr, ExprError> {
    pair.as_str()
        .parse::<f64>()
        .map(Expr::Number)
        .map_err(|e| ExprError::Syntax {
            message: e.to_string(),
            src: ctx.named_source(),
            span: span_of(&pair).into(),
        })
}

fn parse_call(pair: Pair<Rule>, ctx: SourceContext<'_>) -> Result<Expr, ExprError> {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();
    let name = next_pair(&mut inner, ctx, span)?;
    let function = Function::from_name(name.as_str()).ok_or_else(|| ExprError::UnknownFunction {
        name: name.as_str().to_string(),
        src: ctx.named_source(),
        span: span_of(&name).into(),
    })?;

    let args = match inner.next() {
        Some(arguments) => arguments
            .into_inner()
            .map(|arg| parse_sum(arg, ctx))
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    let (min, max) = function.arity();
    if args.len() < min || args.len() > max {
        return Err(ExprError::Arity {
            function: function.name(),
            expected: function.arity_description(),
            got: args.len(),
            src: ctx.named_source(),
            span: span.into(),
        });
    }

    Ok(Expr::Call {
        function,
        args,
        span,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<Expr, ExprError> {
        parse_expression(SourceContext::new("test", source))
    }

    fn ident(name: &str, offset: usize) -> Expr {
        Expr::Ident {
            name: name.to_string(),
            span: (offset, name.len()),
        }
    }

    #[test]
    fn number_literals() {
        assert_eq!(parse("42").unwrap(), Expr::Number(42.0));
        assert_eq!(parse("1.5e3").unwrap(), Expr::Number(1500.0));
        assert_eq!(parse(".25").unwrap(), Expr::Number(0.25));
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let Expr::Binary { op, rhs, .. } = parse("a + b * 2").unwrap() else {
            panic!("expected a binary expression");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn operators_are_left_associative() {
        let Expr::Binary { lhs, op, .. } = parse("8 - 4 - 2").unwrap() else {
            panic!("expected a binary expression");
        };
        assert_eq!(op, BinaryOp::Sub);
        assert!(matches!(*lhs, Expr::Binary { op: BinaryOp::Sub, .. }));
    }

    #[test]
    fn unary_minus_wraps_operand() {
        assert_eq!(
            parse("-x").unwrap(),
            Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(ident("x", 1)),
            }
        );
    }

    #[test]
    fn calls_resolve_against_allowlist() {
        let Expr::Call { function, args, .. } = parse("max(a, 2, sqrt(4))").unwrap() else {
            panic!("expected a call");
        };
        assert_eq!(function, Function::Max);
        assert_eq!(args.len(), 3);
        assert_eq!(args[0], ident("a", 4));
    }

    #[test]
    fn unknown_function_is_rejected() {
        let err = parse("exp(1)").unwrap_err();
        assert!(matches!(err, ExprError::UnknownFunction { ref name, .. } if name == "exp"));
    }

    #[test]
    fn wrong_arity_is_rejected() {
        assert!(matches!(parse("sqrt(1, 2)"), Err(ExprError::Arity { got: 2, .. })));
        assert!(matches!(parse("min()"), Err(ExprError::Arity { got: 0, .. })));
    }

    #[test]
    fn syntax_errors_are_reported() {
        for bad in ["", "1 +", "(a", "a b", "2 ** 3", "__import__('os')"] {
            assert!(parse(bad).is_err(), "{bad:?} should not parse");
        }
    }
}
