//! Abstract syntax tree for parameter expressions.

use crate::errors::Span;

/// A parsed expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// Reference to another parameter
    Ident { name: String, span: Span },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        lhs: Box<Expr>,
        op: BinaryOp,
        rhs: Box<Expr>,
        span: Span,
    },
    Call {
        function: Function,
        args: Vec<Expr>,
        span: Span,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Pos,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// The functions an expression may call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sqrt,
    Log,
    Sin,
    Cos,
    Tan,
    Floor,
    Ceil,
    Abs,
    Max,
    Min,
    Round,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Function> {
        Some(match name {
            "sqrt" => Function::Sqrt,
            "log" => Function::Log,
            "sin" => Function::Sin,
            "cos" => Function::Cos,
            "tan" => Function::Tan,
            "floor" => Function::Floor,
            "ceil" => Function::Ceil,
            "abs" => Function::Abs,
            "max" => Function::Max,
            "min" => Function::Min,
            "round" => Function::Round,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Sqrt => "sqrt",
            Function::Log => "log",
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Floor => "floor",
            Function::Ceil => "ceil",
            Function::Abs => "abs",
            Function::Max => "max",
            Function::Min => "min",
            Function::Round => "round",
        }
    }

    /// Accepted argument counts as (min, max)
    pub fn arity(self) -> (usize, usize) {
        match self {
            Function::Log | Function::Round => (1, 2),
            Function::Max | Function::Min => (1, usize::MAX),
            _ => (1, 1),
        }
    }

    pub fn arity_description(self) -> &'static str {
        match self {
            Function::Log | Function::Round => "1 or 2",
            Function::Max | Function::Min => "at least 1",
            _ => "exactly 1",
        }
    }
}
