//! orgq runtime: function registry, stage compiler, and streaming
//! evaluator for the orgq query language.
//!
//! The three entry points mirror the pipeline: [`parse`] (re-exported from
//! `orgq-compiler`) turns query text into an AST, [`compile`] lowers the
//! AST into a reentrant [`Stage`] program, and [`execute`] runs a stage
//! against an input stream and a variable [`Context`]. [`run_query`] chains
//! all three for callers that compile once and execute once.

pub mod builtins;
pub mod compile;
pub mod eval;
pub mod ops;
pub mod registry;

pub use compile::{compile, CompileError, Stage};
pub use eval::{execute, Context, DebugSink, LogSink, RuntimeError};
pub use orgq_compiler::{parse, Ast, ParseError};
pub use orgq_core::{OrgDate, OrgDateClock, OrgDateRepeatedTask, OrgNode, OrgRootNode, Value};
pub use registry::{FunctionSpec, Registry};

use thiserror::Error;

/// Any failure along the parse → compile → execute pipeline.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Parse, compile against the standard registry, and execute in one call.
pub fn run_query(
    source: &str,
    input: &[Value],
    ctx: &mut Context,
) -> Result<Vec<Value>, QueryError> {
    let ast = parse(source)?;
    let stage = compile(&ast, Registry::standard())?;
    Ok(execute(&stage, input, ctx)?)
}
