//! Abstract syntax tree for orgq queries.

use crate::tokens::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Ast {
    // ── Literals ──
    Int(i64, Span),
    Float(f64, Span),
    Str(String, Span),
    Bool(bool, Span),
    NoneLit(Span),

    /// `.`
    Identity(Span),
    /// `$name`
    Variable(String, Span),

    // ── Access chains ──
    /// `expr.name`
    FieldAccess(Box<Ast>, String, Span),
    /// `expr[key]` with a string-literal key
    BracketAccess(Box<Ast>, Box<Ast>, Span),
    /// `expr[key]` with any other key; the distinction from `BracketAccess`
    /// is syntactic only, both lower to the same runtime dispatch
    Index(Box<Ast>, Box<Ast>, Span),
    /// `expr[a:b]`, either bound optional
    Slice(Box<Ast>, Option<Box<Ast>>, Option<Box<Ast>>, Span),
    /// `expr[]`
    Iterate(Box<Ast>, Span),

    // ── Functions ──
    FunctionCall(String, Vec<Ast>, Span),
    /// A bare identifier: a nullary function if the registry knows the name,
    /// otherwise a string literal
    NullaryFunctionRef(String, Span),

    // ── Operators ──
    Binary(BinOp, Box<Ast>, Box<Ast>, Span),
    UnaryMinus(Box<Ast>, Span),

    // ── Structure ──
    /// `a, b, c` flattened to N-ary
    Tuple(Vec<Ast>, Span),
    /// `[ subquery ]`; `None` is the empty-list literal `[]`
    Fold(Option<Box<Ast>>, Span),
    /// `left | right`
    Pipe(Box<Ast>, Box<Ast>, Span),
    /// `left ; right`
    Sequence(Box<Ast>, Box<Ast>, Span),
    /// `value as $name | body`, where body is the rest of the pipeline
    AsBinding(Box<Ast>, String, Box<Ast>, Span),
    /// `let value as $name in body`
    LetBinding(Box<Ast>, String, Box<Ast>, Span),
    /// `if cond then a else b`; elif chains desugar to nested if/else
    IfThenElse(Box<Ast>, Box<Ast>, Box<Ast>, Span),

    // ── Assignment ──
    /// `target.name = value`
    AssignField(Box<Ast>, String, Box<Ast>, Span),
    /// `target[key] = value`
    AssignBracket(Box<Ast>, Box<Ast>, Box<Ast>, Span),
}

impl Ast {
    pub fn span(&self) -> Span {
        match self {
            Ast::Int(_, s)
            | Ast::Float(_, s)
            | Ast::Str(_, s)
            | Ast::Bool(_, s)
            | Ast::NoneLit(s)
            | Ast::Identity(s)
            | Ast::Variable(_, s)
            | Ast::FieldAccess(_, _, s)
            | Ast::BracketAccess(_, _, s)
            | Ast::Index(_, _, s)
            | Ast::Slice(_, _, _, s)
            | Ast::Iterate(_, s)
            | Ast::FunctionCall(_, _, s)
            | Ast::NullaryFunctionRef(_, s)
            | Ast::Binary(_, _, _, s)
            | Ast::UnaryMinus(_, s)
            | Ast::Tuple(_, s)
            | Ast::Fold(_, s)
            | Ast::Pipe(_, _, s)
            | Ast::Sequence(_, _, s)
            | Ast::AsBinding(_, _, _, s)
            | Ast::LetBinding(_, _, _, s)
            | Ast::IfThenElse(_, _, _, s)
            | Ast::AssignField(_, _, _, s)
            | Ast::AssignBracket(_, _, _, s) => *s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Rem,
    Quot,
    Pow,
    Eq,
    NotEq,
    Gt,
    Lt,
    GtEq,
    LtEq,
    And,
    Or,
    In,
    Matches,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinOp::Add => write!(f, "+"),
            BinOp::Sub => write!(f, "-"),
            BinOp::Mul => write!(f, "*"),
            BinOp::Div => write!(f, "/"),
            BinOp::Mod => write!(f, "mod"),
            BinOp::Rem => write!(f, "rem"),
            BinOp::Quot => write!(f, "quot"),
            BinOp::Pow => write!(f, "**"),
            BinOp::Eq => write!(f, "=="),
            BinOp::NotEq => write!(f, "!="),
            BinOp::Gt => write!(f, ">"),
            BinOp::Lt => write!(f, "<"),
            BinOp::GtEq => write!(f, ">="),
            BinOp::LtEq => write!(f, "<="),
            BinOp::And => write!(f, "and"),
            BinOp::Or => write!(f, "or"),
            BinOp::In => write!(f, "in"),
            BinOp::Matches => write!(f, "matches"),
        }
    }
}
