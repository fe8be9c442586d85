//! Binary operator semantics: arithmetic with numeric promotion and
//! container overloads, ordering with comparable categories, membership.

use crate::eval::RuntimeError;
use chrono::NaiveDateTime;
use orgq_compiler::BinOp;
use orgq_core::values::dedupe;
use orgq_core::Value;
use std::cmp::Ordering;

/// Apply one of the arithmetic operators.
pub fn arith(op: BinOp, a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    match op {
        BinOp::Add => add(a, b),
        BinOp::Sub => sub(a, b),
        BinOp::Mul => mul(a, b),
        BinOp::Div => div(a, b),
        BinOp::Mod => modulo(a, b),
        BinOp::Rem => remainder(a, b),
        BinOp::Quot => quotient(a, b),
        BinOp::Pow => power(a, b),
        _ => Err(type_error(op, a, b)),
    }
}

fn add(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x
            .checked_add(*y)
            .map(Value::Int)
            .ok_or(RuntimeError::Overflow("+")),
        (Value::Str(x), Value::Str(y)) => Ok(Value::Str(format!("{}{}", x, y))),
        (Value::List(x), Value::List(y)) => {
            let mut items = x.to_vec();
            items.extend(y.iter().cloned());
            Ok(Value::new_list(items))
        }
        (Value::Tuple(x), Value::Tuple(y)) => {
            let mut items = x.to_vec();
            items.extend(y.iter().cloned());
            Ok(Value::new_tuple(items))
        }
        (Value::Set(x), Value::Set(y)) => {
            let mut items = x.to_vec();
            items.extend(y.iter().cloned());
            Ok(Value::Set(std::rc::Rc::new(dedupe(items))))
        }
        (Value::List(x), y) => {
            let mut items = x.to_vec();
            items.push(y.clone());
            Ok(Value::new_list(items))
        }
        (Value::Tuple(x), y) => {
            let mut items = x.to_vec();
            items.push(y.clone());
            Ok(Value::new_tuple(items))
        }
        (Value::Set(x), y) => {
            if !y.is_hashable() {
                return Err(RuntimeError::NotHashable(y.type_name()));
            }
            let mut items = x.to_vec();
            if !items.contains(y) {
                items.push(y.clone());
            }
            Ok(Value::Set(std::rc::Rc::new(items)))
        }
        _ => numeric(BinOp::Add, a, b, |x, y| x + y),
    }
}

fn sub(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x
            .checked_sub(*y)
            .map(Value::Int)
            .ok_or(RuntimeError::Overflow("-")),
        (Value::List(x), _) => Ok(Value::new_list(remove_from(x, b))),
        (Value::Tuple(x), _) => Ok(Value::new_tuple(remove_from(x, b))),
        (Value::Set(x), _) => Ok(Value::Set(std::rc::Rc::new(remove_from(x, b)))),
        _ => numeric(BinOp::Sub, a, b, |x, y| x - y),
    }
}

/// `container - container` removes every element of the right side;
/// `container - elem` removes all occurrences of that element.
fn remove_from(items: &[Value], removed: &Value) -> Vec<Value> {
    match removed {
        Value::List(r) | Value::Tuple(r) | Value::Set(r) => items
            .iter()
            .filter(|v| !r.contains(v))
            .cloned()
            .collect(),
        elem => items.iter().filter(|v| *v != elem).cloned().collect(),
    }
}

fn mul(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x
            .checked_mul(*y)
            .map(Value::Int)
            .ok_or(RuntimeError::Overflow("*")),
        (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
            Ok(Value::Str(s.repeat((*n).max(0) as usize)))
        }
        _ => numeric(BinOp::Mul, a, b, |x, y| x * y),
    }
}

/// `/` always produces a Float.
fn div(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    let (x, y) = float_pair(BinOp::Div, a, b)?;
    Ok(Value::Float(x / y))
}

/// Mathematical modulo: the result takes the sign of the divisor.
fn modulo(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    match (a, b) {
        (Value::Int(_), Value::Int(0)) => Err(RuntimeError::DivisionByZero),
        (Value::Int(x), Value::Int(y)) => {
            let r = ((*x as i128 % *y as i128) + *y as i128) % *y as i128;
            Ok(Value::Int(r as i64))
        }
        _ => {
            let (x, y) = float_pair(BinOp::Mod, a, b)?;
            Ok(Value::Float(x - y * (x / y).floor()))
        }
    }
}

/// Remainder: the result takes the sign of the dividend.
fn remainder(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    match (a, b) {
        (Value::Int(_), Value::Int(0)) => Err(RuntimeError::DivisionByZero),
        (Value::Int(x), Value::Int(y)) => x
            .checked_rem(*y)
            .map(Value::Int)
            .ok_or(RuntimeError::Overflow("rem")),
        _ => {
            let (x, y) = float_pair(BinOp::Rem, a, b)?;
            Ok(Value::Float(x % y))
        }
    }
}

/// Integer quotient, truncated toward zero.
fn quotient(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    match (a, b) {
        (Value::Int(_), Value::Int(0)) => Err(RuntimeError::DivisionByZero),
        (Value::Int(x), Value::Int(y)) => x
            .checked_div(*y)
            .map(Value::Int)
            .ok_or(RuntimeError::Overflow("quot")),
        _ => {
            let (x, y) = float_pair(BinOp::Quot, a, b)?;
            Ok(Value::Float((x / y).trunc()))
        }
    }
}

fn power(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) if *y >= 0 => u32::try_from(*y)
            .ok()
            .and_then(|exp| x.checked_pow(exp))
            .map(Value::Int)
            .ok_or(RuntimeError::Overflow("**")),
        _ => {
            let (x, y) = float_pair(BinOp::Pow, a, b)?;
            Ok(Value::Float(x.powf(y)))
        }
    }
}

/// Mixed Int/Float arithmetic promotes to Float.
fn numeric(
    op: BinOp,
    a: &Value,
    b: &Value,
    f: impl Fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    let (x, y) = float_pair(op, a, b)?;
    Ok(Value::Float(f(x, y)))
}

fn float_pair(op: BinOp, a: &Value, b: &Value) -> Result<(f64, f64), RuntimeError> {
    match (a.as_float(), b.as_float()) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(type_error(op, a, b)),
    }
}

fn type_error(op: BinOp, a: &Value, b: &Value) -> RuntimeError {
    RuntimeError::BinaryType {
        op: op_name(op),
        left: a.type_name(),
        right: b.type_name(),
    }
}

fn op_name(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "mod",
        BinOp::Rem => "rem",
        BinOp::Quot => "quot",
        BinOp::Pow => "**",
        BinOp::Eq => "==",
        BinOp::NotEq => "!=",
        BinOp::Gt => ">",
        BinOp::Lt => "<",
        BinOp::GtEq => ">=",
        BinOp::LtEq => "<=",
        BinOp::And => "and",
        BinOp::Or => "or",
        BinOp::In => "in",
        BinOp::Matches => "matches",
    }
}

/// Key extracted from a value for ordering. The three comparable categories
/// are numbers, strings, and Org date values (compared by their start).
#[derive(Debug, Clone, PartialEq)]
pub enum OrdKey {
    Number(f64),
    Text(String),
    Date(NaiveDateTime),
}

impl OrdKey {
    pub fn category(&self) -> &'static str {
        match self {
            OrdKey::Number(_) => "numbers",
            OrdKey::Text(_) => "strings",
            OrdKey::Date(_) => "dates",
        }
    }

    pub fn same_category(&self, other: &OrdKey) -> bool {
        matches!(
            (self, other),
            (OrdKey::Number(_), OrdKey::Number(_))
                | (OrdKey::Text(_), OrdKey::Text(_))
                | (OrdKey::Date(_), OrdKey::Date(_))
        )
    }

    pub fn compare(&self, other: &OrdKey) -> Option<Ordering> {
        match (self, other) {
            (OrdKey::Number(a), OrdKey::Number(b)) => Some(a.total_cmp(b)),
            (OrdKey::Text(a), OrdKey::Text(b)) => Some(a.cmp(b)),
            (OrdKey::Date(a), OrdKey::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// The ordering key of a value, or `None` for kinds outside the comparable
/// categories.
pub fn ord_key(v: &Value) -> Option<OrdKey> {
    match v {
        Value::Int(n) => Some(OrdKey::Number(*n as f64)),
        Value::Float(f) => Some(OrdKey::Number(*f)),
        Value::Str(s) => Some(OrdKey::Text(s.clone())),
        Value::Date(d) => Some(OrdKey::Date(d.start)),
        Value::Clock(c) => Some(OrdKey::Date(c.start)),
        Value::RepeatedTask(r) => Some(OrdKey::Date(r.timestamp)),
        _ => None,
    }
}

/// Ordering comparisons. `none` never orders before or after anything:
/// strict comparisons with `none` are false, and `>=`/`<=` hold only when
/// both operands are `none`.
pub fn compare(op: BinOp, a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    let a_none = matches!(a, Value::None);
    let b_none = matches!(b, Value::None);
    if a_none || b_none {
        let result = match op {
            BinOp::Gt | BinOp::Lt => false,
            BinOp::GtEq | BinOp::LtEq => a_none && b_none,
            _ => return Err(type_error(op, a, b)),
        };
        return Ok(Value::Bool(result));
    }
    let ka = ord_key(a).ok_or(RuntimeError::Incomparable(a.type_name(), b.type_name()))?;
    let kb = ord_key(b).ok_or(RuntimeError::Incomparable(a.type_name(), b.type_name()))?;
    let ord = ka
        .compare(&kb)
        .ok_or(RuntimeError::Incomparable(a.type_name(), b.type_name()))?;
    let result = match op {
        BinOp::Gt => ord == Ordering::Greater,
        BinOp::Lt => ord == Ordering::Less,
        BinOp::GtEq => ord != Ordering::Less,
        BinOp::LtEq => ord != Ordering::Greater,
        _ => return Err(type_error(op, a, b)),
    };
    Ok(Value::Bool(result))
}

/// The `in` operator. Dicts test key membership, strings test substrings,
/// positional containers test element membership.
pub fn membership(elem: &Value, container: &Value) -> Result<Value, RuntimeError> {
    match container {
        Value::List(items) | Value::Tuple(items) | Value::Set(items) => {
            Ok(Value::Bool(items.contains(elem)))
        }
        Value::Dict(d) => Ok(Value::Bool(
            elem.as_str()
                .map(|k| d.borrow().contains_key(k))
                .unwrap_or(false),
        )),
        Value::Str(s) => match elem {
            Value::Str(sub) => Ok(Value::Bool(s.contains(sub.as_str()))),
            other => Err(RuntimeError::BinaryType {
                op: "in",
                left: other.type_name(),
                right: "Str",
            }),
        },
        other => Err(RuntimeError::BinaryType {
            op: "in",
            left: elem.type_name(),
            right: other.type_name(),
        }),
    }
}
