//! Expression evaluation against a set of resolved parameters

use crate::ast::{BinaryOp, Expr, Function, UnaryOp};
use crate::errors::{ExprError, SourceContext, Span};
use crate::params::{ParamValue, Parameters};
use crate::parse::parse_expression;

/// Parse and evaluate `ctx.source` against `scope`
pub fn evaluate_source(ctx: SourceContext<'_>, scope: &Parameters) -> Result<ParamValue, ExprError> {
    let expr = parse_expression(ctx)?;
    evaluate(&expr, scope, ctx)
}

/// Evaluate a parsed expression. Sequences only pass through bare names and
/// `max`/`min`; arithmetic needs numbers.
pub fn evaluate(expr: &Expr, scope: &Parameters, ctx: SourceContext<'_>) -> Result<ParamValue, ExprError> {
    match expr {
        Expr::Ident { name, span } => scope.get(name).cloned().ok_or_else(|| ExprError::UndefinedName {
            name: name.clone(),
            src: ctx.named_source(),
            span: (*span).into(),
        }),
        _ => eval_number(expr, scope, ctx).map(ParamValue::Number),
    }
}

fn expr_span(expr: &Expr, ctx: SourceContext<'_>) -> Span {
    match expr {
        Expr::Ident { span, .. } | Expr::Binary { span, .. } | Expr::Call { span, .. } => *span,
        Expr::Unary { operand, .. } => expr_span(operand, ctx),
        Expr::Number(_) => (0, ctx.source.len()),
    }
}

fn finite(value: f64, span: Span, ctx: SourceContext<'_>) -> Result<f64, ExprError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ExprError::NonFinite {
            src: ctx.named_source(),
            span: span.into(),
        })
    }
}

fn eval_number(expr: &Expr, scope: &Parameters, ctx: SourceContext<'_>) -> Result<f64, ExprError> {
    let value = match expr {
        Expr::Number(n) => *n,
        Expr::Ident { span, .. } => match evaluate(expr, scope, ctx)? {
            ParamValue::Number(n) => n,
            ParamValue::List(_) => {
                return Err(ExprError::NotANumber {
                    src: ctx.named_source(),
                    span: (*span).into(),
                });
            }
        },
        Expr::Unary { op, operand } => {
            let v = eval_number(operand, scope, ctx)?;
            match op {
                UnaryOp::Pos => v,
                UnaryOp::Neg => -v,
            }
        }
        Expr::Binary { lhs, op, rhs, span } => {
            let l = eval_number(lhs, scope, ctx)?;
            let r = eval_number(rhs, scope, ctx)?;
            match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::Div => {
                    if r == 0.0 {
                        return Err(ExprError::DivisionByZero {
                            src: ctx.named_source(),
                            span: (*span).into(),
                        });
                    }
                    l / r
                }
            }
        }
        Expr::Call {
            function,
            args,
            span,
        } => call(*function, args, *span, scope, ctx)?,
    };
    finite(value, expr_span(expr, ctx), ctx)
}

fn call(
    function: Function,
    args: &[Expr],
    span: Span,
    scope: &Parameters,
    ctx: SourceContext<'_>,
) -> Result<f64, ExprError> {
    let domain = || ExprError::Domain {
        function: function.name(),
        src: ctx.named_source(),
        span: span.into(),
    };

    let numbers = if matches!(function, Function::Max | Function::Min) {
        extremum_operands(args, scope, ctx)?
    } else {
        args.iter()
            .map(|a| eval_number(a, scope, ctx))
            .collect::<Result<Vec<_>, _>>()?
    };
    let x = numbers.first().copied().ok_or_else(domain)?;
    let second = numbers.get(1).copied();

    Ok(match function {
        Function::Sqrt => {
            if x < 0.0 {
                return Err(domain());
            }
            x.sqrt()
        }
        Function::Log => {
            if x <= 0.0 {
                return Err(domain());
            }
            match second {
                Some(base) if base <= 0.0 || base == 1.0 => return Err(domain()),
                Some(base) => x.ln() / base.ln(),
                None => x.ln(),
            }
        }
        Function::Sin => x.sin(),
        Function::Cos => x.cos(),
        Function::Tan => x.tan(),
        Function::Floor => x.floor(),
        Function::Ceil => x.ceil(),
        Function::Abs => x.abs(),
        Function::Round => match second {
            Some(digits) => {
                let scale = 10f64.powi(digits.round() as i32);
                (x * scale).round_ties_even() / scale
            }
            None => x.round_ties_even(),
        },
        Function::Max => numbers.into_iter().reduce(f64::max).ok_or_else(domain)?,
        Function::Min => numbers.into_iter().reduce(f64::min).ok_or_else(domain)?,
    })
}

/// `max(a, b, ...)` takes numbers; `max(seq)` takes the elements of one sequence
fn extremum_operands(args: &[Expr], scope: &Parameters, ctx: SourceContext<'_>) -> Result<Vec<f64>, ExprError> {
    if let [single] = args {
        let span = expr_span(single, ctx);
        return match evaluate(single, scope, ctx)? {
            ParamValue::Number(n) => Ok(vec![n]),
            ParamValue::List(items) => items
                .iter()
                .map(|item| match item {
                    ParamValue::Number(n) => Ok(*n),
                    ParamValue::List(_) => Err(ExprError::NotANumber {
                        src: ctx.named_source(),
                        span: span.into(),
                    }),
                })
                .collect(),
        };
    }
    args.iter().map(|a| eval_number(a, scope, ctx)).collect()
}
