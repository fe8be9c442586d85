//! Built-in function implementations.
//!
//! `reverse`, `unique`, and `sort_by` act on the whole stream; everything
//! else acts per input item. Sub-expression arguments are compiled stages
//! carried inside the [`Builtin`] and re-executed per item.

use crate::compile::Stage;
use crate::eval::{eval_item, Context, RuntimeError};
use crate::ops::{ord_key, OrdKey};
use orgq_core::org::{parse_ts, OrgDate, OrgDateClock, OrgDateRepeatedTask};
use orgq_core::values::dedupe;
use orgq_core::Value;
use chrono::NaiveDateTime;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use uuid::Uuid;

/// A resolved built-in call with its compiled argument stages.
#[derive(Debug, Clone)]
pub enum Builtin {
    Reverse,
    Unique,
    Length,
    Sum,
    Max,
    Min,
    Type,
    Sha256,
    Uuid,
    Debug,
    Select(Box<Stage>),
    SortBy(Box<Stage>),
    Join(Box<Stage>),
    Map(Box<Stage>),
    Not(Box<Stage>),
    Match(Box<Stage>),
    Str(Box<Stage>),
    Int(Box<Stage>),
    Float(Box<Stage>),
    Bool(Box<Stage>),
    Ts(Box<Stage>),
    Timestamp(Vec<Stage>),
    Clock(Vec<Stage>),
    RepeatedTask(Vec<Stage>),
}

impl Builtin {
    /// Map a registered name plus compiled arguments onto its variant.
    /// Arity has already been validated against the registry.
    pub fn lower(name: &str, mut args: Vec<Stage>) -> Option<Builtin> {
        let unary = |args: &mut Vec<Stage>| Box::new(args.remove(0));
        Some(match name {
            "reverse" => Builtin::Reverse,
            "unique" => Builtin::Unique,
            "length" => Builtin::Length,
            "sum" => Builtin::Sum,
            "max" => Builtin::Max,
            "min" => Builtin::Min,
            "type" => Builtin::Type,
            "sha256" => Builtin::Sha256,
            "uuid" => Builtin::Uuid,
            "debug" => Builtin::Debug,
            "select" => Builtin::Select(unary(&mut args)),
            "sort_by" => Builtin::SortBy(unary(&mut args)),
            "join" => Builtin::Join(unary(&mut args)),
            "map" => Builtin::Map(unary(&mut args)),
            "not" => Builtin::Not(unary(&mut args)),
            "match" => Builtin::Match(unary(&mut args)),
            "str" => Builtin::Str(unary(&mut args)),
            "int" => Builtin::Int(unary(&mut args)),
            "float" => Builtin::Float(unary(&mut args)),
            "bool" => Builtin::Bool(unary(&mut args)),
            "ts" => Builtin::Ts(unary(&mut args)),
            "timestamp" => Builtin::Timestamp(args),
            "clock" => Builtin::Clock(args),
            "repeated_task" => Builtin::RepeatedTask(args),
            _ => return None,
        })
    }
}

/// Execute one built-in over the input stream.
pub fn call(
    builtin: &Builtin,
    input: &[Value],
    ctx: &mut Context,
) -> Result<Vec<Value>, RuntimeError> {
    match builtin {
        Builtin::Reverse => Ok(reverse(input)),
        Builtin::Unique => Ok(dedupe(input.to_vec())),
        Builtin::SortBy(key) => sort_by(key, input, ctx),
        Builtin::Length => Ok(input.iter().map(length).collect()),
        Builtin::Type => Ok(input
            .iter()
            .map(|v| Value::Str(v.type_name().to_string()))
            .collect()),
        Builtin::Sum => input.iter().map(sum).collect(),
        Builtin::Max => input.iter().map(|v| extreme(v, "max", true)).collect(),
        Builtin::Min => input.iter().map(|v| extreme(v, "min", false)).collect(),
        Builtin::Sha256 => input.iter().map(sha256_hex).collect(),
        Builtin::Uuid => Ok(input
            .iter()
            .map(|_| Value::Str(Uuid::new_v4().to_string()))
            .collect()),
        Builtin::Debug => {
            let sink = ctx.sink();
            for item in input {
                sink.debug(item);
            }
            Ok(input.to_vec())
        }
        Builtin::Select(cond) => {
            let mut out = Vec::new();
            for item in input {
                if any_truthy(cond, item, ctx)? {
                    out.push(item.clone());
                }
            }
            Ok(out)
        }
        Builtin::Not(cond) => {
            let mut out = Vec::new();
            for item in input {
                out.push(Value::Bool(!any_truthy(cond, item, ctx)?));
            }
            Ok(out)
        }
        Builtin::Map(sub) => {
            let mut out = Vec::new();
            for item in input {
                let elems = collection_elems(item, "map")?;
                let mut mapped = Vec::with_capacity(elems.len());
                for elem in elems {
                    mapped.extend(eval_item(sub, &elem, ctx)?);
                }
                out.push(Value::new_list(mapped));
            }
            Ok(out)
        }
        Builtin::Join(sep) => {
            let mut out = Vec::new();
            for item in input {
                let sep = match single(sep, item, ctx)? {
                    Value::Str(s) => s,
                    other => {
                        return Err(RuntimeError::BadArgument {
                            name: "join",
                            expected: "a Str separator",
                            got: other.type_name().to_string(),
                        })
                    }
                };
                let elems = collection_elems(item, "join")?;
                let parts: Vec<String> = elems.iter().map(Value::render).collect();
                out.push(Value::Str(parts.join(&sep)));
            }
            Ok(out)
        }
        Builtin::Match(pat) => {
            let mut out = Vec::new();
            for item in input {
                out.push(match_captures(pat, item, ctx)?);
            }
            Ok(out)
        }
        Builtin::Str(arg) => per_arg(arg, input, ctx, |v| Ok(Value::Str(v.render()))),
        Builtin::Int(arg) => per_arg(arg, input, ctx, coerce_int),
        Builtin::Float(arg) => per_arg(arg, input, ctx, coerce_float),
        Builtin::Bool(arg) => per_arg(arg, input, ctx, coerce_bool),
        Builtin::Ts(arg) => per_arg(arg, input, ctx, coerce_ts),
        Builtin::Timestamp(args) => {
            let mut out = Vec::new();
            for item in input {
                let start = required_ts("timestamp", ctor_arg(args, 0, item, ctx)?)?;
                let end = optional_ts("timestamp", ctor_arg(args, 1, item, ctx)?)?;
                let active = active_flag("timestamp", ctor_arg(args, 2, item, ctx)?)?;
                out.push(Value::Date(OrgDate::new(start, end, active)));
            }
            Ok(out)
        }
        Builtin::Clock(args) => {
            let mut out = Vec::new();
            for item in input {
                let start = required_ts("clock", ctor_arg(args, 0, item, ctx)?)?;
                let end = required_ts("clock", ctor_arg(args, 1, item, ctx)?)?;
                let active = active_flag("clock", ctor_arg(args, 2, item, ctx)?)?;
                out.push(Value::Clock(OrgDateClock::new(start, end, active)));
            }
            Ok(out)
        }
        Builtin::RepeatedTask(args) => {
            let mut out = Vec::new();
            for item in input {
                let ts = required_ts("repeated_task", ctor_arg(args, 0, item, ctx)?)?;
                let before = required_str("repeated_task", ctor_arg(args, 1, item, ctx)?)?;
                let after = required_str("repeated_task", ctor_arg(args, 2, item, ctx)?)?;
                let active = active_flag("repeated_task", ctor_arg(args, 3, item, ctx)?)?;
                out.push(Value::RepeatedTask(OrgDateRepeatedTask::new(
                    ts, before, after, active,
                )));
            }
            Ok(out)
        }
    }
}

// ── Stream-level helpers ──

/// Reverses the stream; a stream whose only element is a list, tuple, or
/// string reverses that container instead.
fn reverse(input: &[Value]) -> Vec<Value> {
    if input.len() == 1 {
        match &input[0] {
            Value::List(items) => {
                return vec![Value::new_list(items.iter().rev().cloned().collect())]
            }
            Value::Tuple(items) => {
                return vec![Value::new_tuple(items.iter().rev().cloned().collect())]
            }
            Value::Str(s) => return vec![Value::Str(s.chars().rev().collect())],
            _ => {}
        }
    }
    input.iter().rev().cloned().collect()
}

fn sort_by(key: &Stage, input: &[Value], ctx: &mut Context) -> Result<Vec<Value>, RuntimeError> {
    if input.len() == 1 {
        match &input[0] {
            Value::List(items) => {
                return Ok(vec![Value::new_list(sort_values(items.to_vec(), key, ctx)?)])
            }
            Value::Tuple(items) => {
                return Ok(vec![Value::new_tuple(sort_values(
                    items.to_vec(),
                    key,
                    ctx,
                )?)])
            }
            _ => {}
        }
    }
    sort_values(input.to_vec(), key, ctx)
}

/// Stable descending sort with `None` keys strictly last. The key query's
/// first output is the sort key; an empty key stream counts as `None`.
fn sort_values(
    items: Vec<Value>,
    key: &Stage,
    ctx: &mut Context,
) -> Result<Vec<Value>, RuntimeError> {
    let mut keyed: Vec<(Option<OrdKey>, Value)> = Vec::with_capacity(items.len());
    for item in items {
        let produced = eval_item(key, &item, ctx)?.into_iter().next();
        let k = match produced {
            None | Some(Value::None) => None,
            Some(v) => Some(ord_key(&v).ok_or(RuntimeError::BadArgument {
                name: "sort_by",
                expected: "comparable keys (numbers, strings, or dates)",
                got: v.type_name().to_string(),
            })?),
        };
        keyed.push((k, item));
    }
    let mut categories = keyed.iter().filter_map(|(k, _)| k.as_ref());
    if let Some(first) = categories.next() {
        for k in categories {
            if !first.same_category(k) {
                return Err(RuntimeError::Incomparable(first.category(), k.category()));
            }
        }
    }
    keyed.sort_by(|(ka, _), (kb, _)| match (ka, kb) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => b.compare(a).unwrap_or(Ordering::Equal),
    });
    Ok(keyed.into_iter().map(|(_, v)| v).collect())
}

// ── Per-item helpers ──

fn length(v: &Value) -> Value {
    match v {
        Value::List(items) | Value::Tuple(items) | Value::Set(items) => {
            Value::Int(items.len() as i64)
        }
        Value::Dict(d) => Value::Int(d.borrow().len() as i64),
        Value::Str(s) => Value::Int(s.chars().count() as i64),
        Value::Root(root) => Value::Int(root.children.len() as i64),
        _ => Value::None,
    }
}

fn sum(v: &Value) -> Result<Value, RuntimeError> {
    let elems = collection_elems(v, "sum")?;
    let mut int_total: i64 = 0;
    let mut float_total = 0.0;
    let mut seen_float = false;
    for e in &elems {
        match e {
            Value::Int(n) => {
                int_total = int_total
                    .checked_add(*n)
                    .ok_or(RuntimeError::Overflow("sum"))?;
            }
            Value::Float(f) => {
                seen_float = true;
                float_total += f;
            }
            other => {
                return Err(RuntimeError::BadArgument {
                    name: "sum",
                    expected: "a collection of numbers",
                    got: other.type_name().to_string(),
                })
            }
        }
    }
    if seen_float {
        Ok(Value::Float(float_total + int_total as f64))
    } else {
        Ok(Value::Int(int_total))
    }
}

/// `max`/`min` over one collection, ignoring `None` entries; an empty or
/// all-`None` collection yields `None`.
fn extreme(v: &Value, name: &'static str, want_max: bool) -> Result<Value, RuntimeError> {
    let elems = collection_elems(v, name)?;
    let mut best: Option<(OrdKey, Value)> = None;
    for e in elems {
        if matches!(e, Value::None) {
            continue;
        }
        let k = ord_key(&e).ok_or(RuntimeError::BadArgument {
            name,
            expected: "comparable values (numbers, strings, or dates)",
            got: e.type_name().to_string(),
        })?;
        match &best {
            None => best = Some((k, e)),
            Some((bk, _)) => {
                if !bk.same_category(&k) {
                    return Err(RuntimeError::Incomparable(bk.category(), k.category()));
                }
                let ord = k.compare(bk).unwrap_or(Ordering::Equal);
                if (want_max && ord == Ordering::Greater)
                    || (!want_max && ord == Ordering::Less)
                {
                    best = Some((k, e));
                }
            }
        }
    }
    Ok(best.map(|(_, v)| v).unwrap_or(Value::None))
}

fn sha256_hex(v: &Value) -> Result<Value, RuntimeError> {
    match v {
        Value::Str(s) => Ok(Value::Str(format!("{:x}", Sha256::digest(s.as_bytes())))),
        other => Err(RuntimeError::BadArgument {
            name: "sha256",
            expected: "Str input",
            got: other.type_name().to_string(),
        }),
    }
}

fn match_captures(
    pat: &Stage,
    item: &Value,
    ctx: &mut Context,
) -> Result<Value, RuntimeError> {
    let subject = match item {
        Value::Str(s) => s.clone(),
        other => {
            return Err(RuntimeError::BadArgument {
                name: "match",
                expected: "Str input",
                got: other.type_name().to_string(),
            })
        }
    };
    let pattern = match single(pat, item, ctx)? {
        Value::Str(p) => p,
        other => {
            return Err(RuntimeError::BadArgument {
                name: "match",
                expected: "a Str pattern",
                got: other.type_name().to_string(),
            })
        }
    };
    let regex = Regex::new(&pattern).map_err(|e| RuntimeError::InvalidRegex {
        pattern: pattern.clone(),
        message: e.to_string(),
    })?;
    Ok(match regex.captures(&subject) {
        Some(caps) => Value::new_list(
            caps.iter()
                .map(|group| {
                    group
                        .map(|m| Value::Str(m.as_str().to_string()))
                        .unwrap_or(Value::None)
                })
                .collect(),
        ),
        None => Value::None,
    })
}

/// Evaluate a unary argument per item and apply `f` to each produced value.
fn per_arg(
    arg: &Stage,
    input: &[Value],
    ctx: &mut Context,
    f: impl Fn(&Value) -> Result<Value, RuntimeError>,
) -> Result<Vec<Value>, RuntimeError> {
    let mut out = Vec::new();
    for item in input {
        for v in eval_item(arg, item, ctx)? {
            out.push(f(&v)?);
        }
    }
    Ok(out)
}

fn any_truthy(cond: &Stage, item: &Value, ctx: &mut Context) -> Result<bool, RuntimeError> {
    Ok(eval_item(cond, item, ctx)?.iter().any(Value::is_truthy))
}

fn single(stage: &Stage, item: &Value, ctx: &mut Context) -> Result<Value, RuntimeError> {
    Ok(eval_item(stage, item, ctx)?
        .into_iter()
        .next()
        .unwrap_or(Value::None))
}

fn collection_elems(v: &Value, name: &'static str) -> Result<Vec<Value>, RuntimeError> {
    match v {
        Value::List(items) | Value::Tuple(items) | Value::Set(items) => Ok(items.to_vec()),
        other => Err(RuntimeError::BadArgument {
            name,
            expected: "a collection",
            got: other.type_name().to_string(),
        }),
    }
}

// ── Coercions ──

fn coerce_int(v: &Value) -> Result<Value, RuntimeError> {
    match v {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Float(f) => {
            let t = f.trunc();
            if t.is_finite() && t >= i64::MIN as f64 && t <= i64::MAX as f64 {
                Ok(Value::Int(t as i64))
            } else {
                Err(bad_coercion("int", v))
            }
        }
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| bad_coercion("int", v)),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        _ => Err(bad_coercion("int", v)),
    }
}

fn coerce_float(v: &Value) -> Result<Value, RuntimeError> {
    match v {
        Value::Int(n) => Ok(Value::Float(*n as f64)),
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| bad_coercion("float", v)),
        Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        _ => Err(bad_coercion("float", v)),
    }
}

fn coerce_bool(v: &Value) -> Result<Value, RuntimeError> {
    match v {
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::Str(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
        Value::Str(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
        _ => Err(bad_coercion("bool", v)),
    }
}

fn coerce_ts(v: &Value) -> Result<Value, RuntimeError> {
    match v {
        Value::None => Ok(Value::None),
        Value::Str(s) => parse_ts(s)
            .map(|dt| Value::Date(OrgDate::new(dt, None, false)))
            .ok_or_else(|| bad_coercion("ts", v)),
        Value::Date(d) => Ok(Value::Date(d.clone())),
        Value::Clock(c) => Ok(Value::Date(OrgDate::new(c.start, Some(c.end), c.active))),
        Value::RepeatedTask(r) => Ok(Value::Date(OrgDate::new(r.timestamp, None, r.active))),
        _ => Err(bad_coercion("ts", v)),
    }
}

fn bad_coercion(name: &'static str, v: &Value) -> RuntimeError {
    RuntimeError::BadArgument {
        name,
        expected: "a coercible value",
        got: v.render(),
    }
}

// ── Date constructor helpers ──

fn ctor_arg(
    args: &[Stage],
    idx: usize,
    item: &Value,
    ctx: &mut Context,
) -> Result<Value, RuntimeError> {
    match args.get(idx) {
        Some(stage) => single(stage, item, ctx),
        None => Ok(Value::None),
    }
}

fn required_ts(name: &'static str, v: Value) -> Result<NaiveDateTime, RuntimeError> {
    match &v {
        Value::Str(s) => parse_ts(s).ok_or(RuntimeError::BadArgument {
            name,
            expected: "a timestamp string",
            got: v.render(),
        }),
        other => Err(RuntimeError::BadArgument {
            name,
            expected: "a timestamp string",
            got: other.type_name().to_string(),
        }),
    }
}

fn optional_ts(name: &'static str, v: Value) -> Result<Option<NaiveDateTime>, RuntimeError> {
    match v {
        Value::None => Ok(None),
        other => required_ts(name, other).map(Some),
    }
}

fn active_flag(name: &'static str, v: Value) -> Result<bool, RuntimeError> {
    match v {
        Value::None => Ok(false),
        Value::Bool(b) => Ok(b),
        other => Err(RuntimeError::BadArgument {
            name,
            expected: "a Bool active flag",
            got: other.type_name().to_string(),
        }),
    }
}

fn required_str(name: &'static str, v: Value) -> Result<String, RuntimeError> {
    match v {
        Value::Str(s) => Ok(s),
        other => Err(RuntimeError::BadArgument {
            name,
            expected: "a Str",
            got: other.type_name().to_string(),
        }),
    }
}
