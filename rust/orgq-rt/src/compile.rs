//! Lowering from the AST to the executable stage program.
//!
//! A [`Stage`] is pure, reentrant data with the uniform signature
//! `(stream, context) -> stream`; compiling never evaluates anything. The
//! lowering resolves function names against the registry, checks arities,
//! folds negated numeric literals, pre-compiles literal `matches` patterns,
//! and turns bare identifiers outside the registry into constant strings.

use crate::builtins::Builtin;
use crate::registry::Registry;
use orgq_compiler::{Ast, BinOp};
use orgq_core::Value;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("unknown function '{name}' at line {line}, col {col}")]
    UnknownFunction {
        name: String,
        line: usize,
        col: usize,
    },
    #[error(
        "function '{name}' takes {expected} argument(s), got {got} at line {line}, col {col}"
    )]
    ArityMismatch {
        name: String,
        expected: String,
        got: usize,
        line: usize,
        col: usize,
    },
    #[error("invalid regex pattern {pattern:?}: {message}")]
    InvalidRegex { pattern: String, message: String },
}

/// The compiled form of one AST node.
#[derive(Debug, Clone)]
pub enum Stage {
    Identity,
    Const(Value),
    Variable(String),
    Field(Box<Stage>, String),
    /// Bracket access; key-kind dispatch happens at runtime
    BracketGet(Box<Stage>, Box<Stage>),
    Slice(Box<Stage>, Option<Box<Stage>>, Option<Box<Stage>>),
    Iterate(Box<Stage>),
    Binary(BinOp, Box<Stage>, Box<Stage>),
    /// `matches` with a literal pattern, compiled once
    MatchesLit(Box<Stage>, Regex),
    Neg(Box<Stage>),
    Tuple(Vec<Stage>),
    /// `[ subquery ]`; `None` is the empty-list literal
    Fold(Option<Box<Stage>>),
    Pipe(Box<Stage>, Box<Stage>),
    Sequence(Box<Stage>, Box<Stage>),
    /// `as` and `let…in` share one binding discipline
    Bind(Box<Stage>, String, Box<Stage>),
    IfThenElse(Box<Stage>, Box<Stage>, Box<Stage>),
    AssignField(Box<Stage>, String, Box<Stage>),
    AssignBracket(Box<Stage>, Box<Stage>, Box<Stage>),
    Call(Builtin),
}

/// Lower an AST against a function registry.
pub fn compile(ast: &Ast, registry: &Registry) -> Result<Stage, CompileError> {
    Ok(match ast {
        Ast::Int(n, _) => Stage::Const(Value::Int(*n)),
        Ast::Float(f, _) => Stage::Const(Value::Float(*f)),
        Ast::Str(s, _) => Stage::Const(Value::Str(s.clone())),
        Ast::Bool(b, _) => Stage::Const(Value::Bool(*b)),
        Ast::NoneLit(_) => Stage::Const(Value::None),
        Ast::Identity(_) => Stage::Identity,
        Ast::Variable(name, _) => Stage::Variable(name.clone()),
        Ast::FieldAccess(inner, name, _) => {
            Stage::Field(boxed(inner, registry)?, name.clone())
        }
        Ast::BracketAccess(inner, key, _) | Ast::Index(inner, key, _) => {
            Stage::BracketGet(boxed(inner, registry)?, boxed(key, registry)?)
        }
        Ast::Slice(inner, start, end, _) => Stage::Slice(
            boxed(inner, registry)?,
            start.as_deref().map(|s| boxed(s, registry)).transpose()?,
            end.as_deref().map(|e| boxed(e, registry)).transpose()?,
        ),
        Ast::Iterate(inner, _) => Stage::Iterate(boxed(inner, registry)?),
        Ast::UnaryMinus(inner, _) => match inner.as_ref() {
            // Negative literals fold at compile time.
            Ast::Int(n, _) => Stage::Const(Value::Int(-n)),
            Ast::Float(f, _) => Stage::Const(Value::Float(-f)),
            other => Stage::Neg(boxed(other, registry)?),
        },
        Ast::Binary(BinOp::Matches, left, right, _) => match right.as_ref() {
            Ast::Str(pattern, _) => {
                let regex = Regex::new(pattern).map_err(|e| CompileError::InvalidRegex {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
                Stage::MatchesLit(boxed(left, registry)?, regex)
            }
            _ => Stage::Binary(
                BinOp::Matches,
                boxed(left, registry)?,
                boxed(right, registry)?,
            ),
        },
        Ast::Binary(op, left, right, _) => {
            Stage::Binary(*op, boxed(left, registry)?, boxed(right, registry)?)
        }
        Ast::Tuple(items, _) => Stage::Tuple(
            items
                .iter()
                .map(|i| compile(i, registry))
                .collect::<Result<_, _>>()?,
        ),
        Ast::Fold(inner, _) => Stage::Fold(
            inner
                .as_deref()
                .map(|i| boxed(i, registry))
                .transpose()?,
        ),
        Ast::Pipe(left, right, _) => {
            Stage::Pipe(boxed(left, registry)?, boxed(right, registry)?)
        }
        Ast::Sequence(left, right, _) => {
            Stage::Sequence(boxed(left, registry)?, boxed(right, registry)?)
        }
        Ast::AsBinding(value, name, body, _) | Ast::LetBinding(value, name, body, _) => {
            Stage::Bind(boxed(value, registry)?, name.clone(), boxed(body, registry)?)
        }
        Ast::IfThenElse(cond, then_branch, else_branch, _) => Stage::IfThenElse(
            boxed(cond, registry)?,
            boxed(then_branch, registry)?,
            boxed(else_branch, registry)?,
        ),
        Ast::AssignField(target, name, value, _) => Stage::AssignField(
            boxed(target, registry)?,
            name.clone(),
            boxed(value, registry)?,
        ),
        Ast::AssignBracket(target, key, value, _) => Stage::AssignBracket(
            boxed(target, registry)?,
            boxed(key, registry)?,
            boxed(value, registry)?,
        ),
        Ast::FunctionCall(name, args, span) => {
            let spec = registry.get(name).ok_or_else(|| CompileError::UnknownFunction {
                name: name.clone(),
                line: span.line,
                col: span.col,
            })?;
            if !spec.accepts(args.len()) {
                return Err(CompileError::ArityMismatch {
                    name: name.clone(),
                    expected: spec.arity_label(),
                    got: args.len(),
                    line: span.line,
                    col: span.col,
                });
            }
            let args = args
                .iter()
                .map(|a| compile(a, registry))
                .collect::<Result<Vec<_>, _>>()?;
            let builtin = Builtin::lower(name, args).ok_or_else(|| {
                CompileError::UnknownFunction {
                    name: name.clone(),
                    line: span.line,
                    col: span.col,
                }
            })?;
            Stage::Call(builtin)
        }
        Ast::NullaryFunctionRef(name, span) => {
            match registry.get(name) {
                Some(spec) if spec.accepts(0) => {
                    let builtin = Builtin::lower(name, Vec::new()).ok_or_else(|| {
                        CompileError::UnknownFunction {
                            name: name.clone(),
                            line: span.line,
                            col: span.col,
                        }
                    })?;
                    Stage::Call(builtin)
                }
                Some(spec) => {
                    return Err(CompileError::ArityMismatch {
                        name: name.clone(),
                        expected: spec.arity_label(),
                        got: 0,
                        line: span.line,
                        col: span.col,
                    })
                }
                // A bare identifier the registry does not know evaluates as
                // its quoted-string literal.
                None => Stage::Const(Value::Str(name.clone())),
            }
        }
    })
}

fn boxed(ast: &Ast, registry: &Registry) -> Result<Box<Stage>, CompileError> {
    Ok(Box::new(compile(ast, registry)?))
}
