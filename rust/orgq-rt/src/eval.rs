//! Stage evaluator: executes a compiled query against an input stream and
//! an evaluation context.
//!
//! Streams are eager: every stage consumes and returns a fully materialized
//! `Vec<Value>`. Within one stage, output order equals input order; stages
//! with several sub-expressions combine their per-item outputs as the
//! left-to-right cartesian product.

use crate::builtins;
use crate::compile::Stage;
use crate::ops;
use orgq_compiler::BinOp;
use orgq_core::{OrgRootNode, Value};
use regex::Regex;
use std::collections::HashMap;
use std::rc::Rc;
use std::slice;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("undefined variable ${0}")]
    UndefinedVariable(String),
    #[error("cannot iterate over {0}")]
    NotIterable(&'static str),
    #[error("cannot index {container} with {key}")]
    BadIndex {
        container: &'static str,
        key: &'static str,
    },
    #[error("cannot slice {0}")]
    NotSliceable(&'static str),
    #[error("slice bound must be Int, got {0}")]
    BadSliceBound(&'static str),
    #[error("'{op}' not supported between {left} and {right}")]
    BinaryType {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("'{op}' not supported for {kind}")]
    UnaryType {
        op: &'static str,
        kind: &'static str,
    },
    #[error("cannot compare {0} with {1}")]
    Incomparable(&'static str, &'static str),
    #[error("assignment target must be a Dict, got {0}")]
    AssignTarget(&'static str),
    #[error("bracket assignment key must be a Str, got {0}")]
    AssignKey(&'static str),
    #[error("invalid regex pattern {pattern:?}: {message}")]
    InvalidRegex { pattern: String, message: String },
    #[error("{name} expects {expected}, got {got}")]
    BadArgument {
        name: &'static str,
        expected: &'static str,
        got: String,
    },
    #[error("{0} is not hashable and cannot be a set element")]
    NotHashable(&'static str),
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow in '{0}'")]
    Overflow(&'static str),
}

/// Receiver for the `debug` built-in, the external logger collaborator.
pub trait DebugSink {
    fn debug(&self, value: &Value);
}

/// Default sink: forwards to the `log` facade.
pub struct LogSink;

impl DebugSink for LogSink {
    fn debug(&self, value: &Value) {
        log::debug!("{}", value.render());
    }
}

/// Evaluation context: a stack of variable frames plus the debug sink.
///
/// The seed frame comes from the caller; `as` and `let…in` push one-binding
/// frames that shadow outer scopes and are popped on exit.
pub struct Context {
    frames: Vec<HashMap<String, Value>>,
    sink: Rc<dyn DebugSink>,
}

impl Context {
    pub fn new(vars: HashMap<String, Value>) -> Self {
        Self {
            frames: vec![vars],
            sink: Rc::new(LogSink),
        }
    }

    pub fn empty() -> Self {
        Self::new(HashMap::new())
    }

    pub fn with_sink(mut self, sink: Rc<dyn DebugSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    pub(crate) fn push(&mut self, name: String, value: Value) {
        let mut frame = HashMap::new();
        frame.insert(name, value);
        self.frames.push(frame);
    }

    pub(crate) fn pop(&mut self) {
        self.frames.pop();
    }

    pub(crate) fn sink(&self) -> Rc<dyn DebugSink> {
        self.sink.clone()
    }
}

/// Run a compiled stage over an input stream.
pub fn execute(
    stage: &Stage,
    input: &[Value],
    ctx: &mut Context,
) -> Result<Vec<Value>, RuntimeError> {
    match stage {
        Stage::Identity => Ok(input.to_vec()),
        Stage::Const(v) => Ok(vec![v.clone(); input.len()]),
        Stage::Variable(name) => {
            let value = ctx
                .lookup(name)
                .cloned()
                .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone()))?;
            Ok(vec![value; input.len()])
        }
        Stage::Field(inner, name) => {
            let mut out = Vec::new();
            for item in input {
                for v in eval_item(inner, item, ctx)? {
                    out.push(v.attr(name).unwrap_or(Value::None));
                }
            }
            Ok(out)
        }
        Stage::BracketGet(inner, key) => {
            let mut out = Vec::new();
            for item in input {
                let containers = eval_item(inner, item, ctx)?;
                let keys = eval_item(key, item, ctx)?;
                for c in &containers {
                    for k in &keys {
                        out.push(bracket_get(c, k)?);
                    }
                }
            }
            Ok(out)
        }
        Stage::Slice(inner, start, end) => {
            let mut out = Vec::new();
            for item in input {
                let containers = eval_item(inner, item, ctx)?;
                let starts = eval_bound(start.as_deref(), item, ctx)?;
                let ends = eval_bound(end.as_deref(), item, ctx)?;
                for c in &containers {
                    for s in &starts {
                        for e in &ends {
                            out.push(slice_value(c, s, e)?);
                        }
                    }
                }
            }
            Ok(out)
        }
        Stage::Iterate(inner) => {
            let mut out = Vec::new();
            for item in input {
                for v in eval_item(inner, item, ctx)? {
                    out.extend(iterate_value(&v)?);
                }
            }
            Ok(out)
        }
        Stage::Neg(inner) => {
            let mut out = Vec::new();
            for item in input {
                for v in eval_item(inner, item, ctx)? {
                    out.push(negate(&v)?);
                }
            }
            Ok(out)
        }
        Stage::Binary(op, left, right) => eval_binary(*op, left, right, input, ctx),
        Stage::MatchesLit(left, regex) => {
            let mut out = Vec::new();
            for item in input {
                for v in eval_item(left, item, ctx)? {
                    out.push(Value::Bool(regex_subject(&v, regex)?));
                }
            }
            Ok(out)
        }
        Stage::Tuple(children) => {
            let mut out = Vec::new();
            for item in input {
                let parts = children
                    .iter()
                    .map(|c| eval_item(c, item, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                for combo in cartesian(&parts) {
                    out.push(Value::new_tuple(combo));
                }
            }
            Ok(out)
        }
        Stage::Fold(inner) => {
            let mut out = Vec::new();
            for item in input {
                let collected = match inner {
                    Some(q) => eval_item(q, item, ctx)?,
                    None => Vec::new(),
                };
                out.push(Value::new_list(collected));
            }
            Ok(out)
        }
        Stage::Pipe(left, right) => {
            let mid = execute(left, input, ctx)?;
            execute(right, &mid, ctx)
        }
        Stage::Sequence(left, right) => {
            execute(left, input, ctx)?;
            execute(right, input, ctx)
        }
        Stage::Bind(value, name, body) => {
            let mut out = Vec::new();
            for item in input {
                for bound in eval_item(value, item, ctx)? {
                    ctx.push(name.clone(), bound);
                    let result = eval_item(body, item, ctx);
                    ctx.pop();
                    out.extend(result?);
                }
            }
            Ok(out)
        }
        Stage::IfThenElse(cond, then_branch, else_branch) => {
            let mut out = Vec::new();
            for item in input {
                for cv in eval_item(cond, item, ctx)? {
                    let branch = if cv.is_truthy() { then_branch } else { else_branch };
                    out.extend(eval_item(branch, item, ctx)?);
                }
            }
            Ok(out)
        }
        Stage::AssignField(target, name, value) => {
            let mut out = Vec::new();
            for item in input {
                let targets = eval_item(target, item, ctx)?;
                let values = eval_item(value, item, ctx)?;
                for t in &targets {
                    for v in &values {
                        out.push(assign_into(t, name.clone(), v.clone())?);
                    }
                }
            }
            Ok(out)
        }
        Stage::AssignBracket(target, key, value) => {
            let mut out = Vec::new();
            for item in input {
                let targets = eval_item(target, item, ctx)?;
                let keys = eval_item(key, item, ctx)?;
                let values = eval_item(value, item, ctx)?;
                for t in &targets {
                    for k in &keys {
                        let name = match k {
                            Value::Str(s) => s.clone(),
                            other => return Err(RuntimeError::AssignKey(other.type_name())),
                        };
                        for v in &values {
                            out.push(assign_into(t, name.clone(), v.clone())?);
                        }
                    }
                }
            }
            Ok(out)
        }
        Stage::Call(builtin) => builtins::call(builtin, input, ctx),
    }
}

/// Evaluate a stage over the singleton stream of one item.
pub(crate) fn eval_item(
    stage: &Stage,
    item: &Value,
    ctx: &mut Context,
) -> Result<Vec<Value>, RuntimeError> {
    execute(stage, slice::from_ref(item), ctx)
}

fn eval_bound(
    bound: Option<&Stage>,
    item: &Value,
    ctx: &mut Context,
) -> Result<Vec<Value>, RuntimeError> {
    match bound {
        Some(stage) => eval_item(stage, item, ctx),
        None => Ok(vec![Value::None]),
    }
}

/// Left-to-right cartesian product of per-child output streams.
fn cartesian(parts: &[Vec<Value>]) -> Vec<Vec<Value>> {
    let mut combos: Vec<Vec<Value>> = vec![Vec::new()];
    for part in parts {
        let mut next = Vec::with_capacity(combos.len() * part.len());
        for combo in &combos {
            for v in part {
                let mut extended = combo.clone();
                extended.push(v.clone());
                next.push(extended);
            }
        }
        combos = next;
    }
    combos
}

fn eval_binary(
    op: BinOp,
    left: &Stage,
    right: &Stage,
    input: &[Value],
    ctx: &mut Context,
) -> Result<Vec<Value>, RuntimeError> {
    let mut out = Vec::new();
    for item in input {
        match op {
            // `and` yields the boolean conjunction of truthy evaluations;
            // `or` is value-preserving and short-circuits per left output.
            BinOp::And => {
                for lv in eval_item(left, item, ctx)? {
                    if !lv.is_truthy() {
                        out.push(Value::Bool(false));
                    } else {
                        for rv in eval_item(right, item, ctx)? {
                            out.push(Value::Bool(rv.is_truthy()));
                        }
                    }
                }
            }
            BinOp::Or => {
                for lv in eval_item(left, item, ctx)? {
                    if lv.is_truthy() {
                        out.push(lv);
                    } else {
                        out.extend(eval_item(right, item, ctx)?);
                    }
                }
            }
            _ => {
                let lhs = eval_item(left, item, ctx)?;
                let rhs = eval_item(right, item, ctx)?;
                for lv in &lhs {
                    for rv in &rhs {
                        out.push(apply_binary(op, lv, rv)?);
                    }
                }
            }
        }
    }
    Ok(out)
}

fn apply_binary(op: BinOp, a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    match op {
        BinOp::Add
        | BinOp::Sub
        | BinOp::Mul
        | BinOp::Div
        | BinOp::Mod
        | BinOp::Rem
        | BinOp::Quot
        | BinOp::Pow => ops::arith(op, a, b),
        BinOp::Eq => Ok(Value::Bool(a == b)),
        BinOp::NotEq => Ok(Value::Bool(a != b)),
        BinOp::Gt | BinOp::Lt | BinOp::GtEq | BinOp::LtEq => ops::compare(op, a, b),
        BinOp::In => ops::membership(a, b),
        BinOp::Matches => {
            let pattern = b.as_str().ok_or(RuntimeError::BinaryType {
                op: "matches",
                left: a.type_name(),
                right: b.type_name(),
            })?;
            let regex = Regex::new(pattern).map_err(|e| RuntimeError::InvalidRegex {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
            Ok(Value::Bool(regex_subject(a, &regex)?))
        }
        BinOp::And | BinOp::Or => Err(RuntimeError::BinaryType {
            op: "boolean",
            left: a.type_name(),
            right: b.type_name(),
        }),
    }
}

fn regex_subject(v: &Value, regex: &Regex) -> Result<bool, RuntimeError> {
    match v {
        Value::Str(s) => Ok(regex.is_match(s)),
        other => Err(RuntimeError::BinaryType {
            op: "matches",
            left: other.type_name(),
            right: "Str",
        }),
    }
}

fn negate(v: &Value) -> Result<Value, RuntimeError> {
    match v {
        Value::Int(n) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or(RuntimeError::Overflow("-")),
        Value::Float(f) => Ok(Value::Float(-f)),
        other => Err(RuntimeError::UnaryType {
            op: "-",
            kind: other.type_name(),
        }),
    }
}

/// Runtime dispatch for `expr[key]`: string keys read as field access on
/// any kind, integer keys index positional containers.
fn bracket_get(container: &Value, key: &Value) -> Result<Value, RuntimeError> {
    match key {
        Value::Str(name) => Ok(container.attr(name).unwrap_or(Value::None)),
        Value::Int(i) => match container {
            Value::List(items) | Value::Tuple(items) => Ok(index_slice(items, *i)),
            Value::Root(root) => {
                let nodes: Vec<Value> =
                    root.children.iter().map(|c| Value::Node(c.clone())).collect();
                Ok(index_slice(&nodes, *i))
            }
            Value::Str(s) => {
                if *i < 0 {
                    return Ok(Value::None);
                }
                Ok(s.chars()
                    .nth(*i as usize)
                    .map(|c| Value::Str(c.to_string()))
                    .unwrap_or(Value::None))
            }
            other => Err(RuntimeError::BadIndex {
                container: other.type_name(),
                key: "Int",
            }),
        },
        other => Err(RuntimeError::BadIndex {
            container: container.type_name(),
            key: other.type_name(),
        }),
    }
}

fn index_slice(items: &[Value], i: i64) -> Value {
    if i < 0 {
        return Value::None;
    }
    items.get(i as usize).cloned().unwrap_or(Value::None)
}

fn slice_value(container: &Value, start: &Value, end: &Value) -> Result<Value, RuntimeError> {
    let len = match container {
        Value::List(items) | Value::Tuple(items) => items.len(),
        Value::Str(s) => s.chars().count(),
        Value::Root(root) => root.children.len(),
        other => return Err(RuntimeError::NotSliceable(other.type_name())),
    };
    let lo = slice_bound(start, 0, len)?;
    let hi = slice_bound(end, len, len)?;
    let (lo, hi) = (lo, hi.max(lo));
    Ok(match container {
        Value::List(items) => Value::new_list(items[lo..hi].to_vec()),
        Value::Tuple(items) => Value::new_tuple(items[lo..hi].to_vec()),
        Value::Str(s) => Value::Str(s.chars().skip(lo).take(hi - lo).collect()),
        Value::Root(root) => Value::Root(Rc::new(OrgRootNode::new(
            root.filename.clone(),
            root.children[lo..hi].to_vec(),
        ))),
        _ => Value::None,
    })
}

fn slice_bound(bound: &Value, default: usize, len: usize) -> Result<usize, RuntimeError> {
    match bound {
        Value::None => Ok(default),
        Value::Int(n) => Ok((*n).clamp(0, len as i64) as usize),
        other => Err(RuntimeError::BadSliceBound(other.type_name())),
    }
}

pub(crate) fn iterate_value(v: &Value) -> Result<Vec<Value>, RuntimeError> {
    match v {
        Value::List(items) | Value::Tuple(items) | Value::Set(items) => Ok(items.to_vec()),
        Value::Dict(d) => Ok(d.borrow().values().cloned().collect()),
        Value::Root(root) => Ok(root.children.iter().map(|c| Value::Node(c.clone())).collect()),
        Value::Node(node) => Ok(node.children.iter().map(|c| Value::Node(c.clone())).collect()),
        other => Err(RuntimeError::NotIterable(other.type_name())),
    }
}

fn assign_into(target: &Value, key: String, value: Value) -> Result<Value, RuntimeError> {
    match target {
        Value::Dict(d) => {
            d.borrow_mut().insert(key, value);
            Ok(Value::Dict(d.clone()))
        }
        other => Err(RuntimeError::AssignTarget(other.type_name())),
    }
}
