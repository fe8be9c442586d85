//! Tagged value representation for the orgq evaluator.

use crate::org::{OrgDate, OrgDateClock, OrgDateRepeatedTask, OrgNode, OrgRootNode};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared, interiorly mutable dictionary. Insertion order is preserved for
/// iteration; assignment through `=` mutates the map in place, so every
/// value holding the same handle observes the write.
pub type DictHandle = Rc<RefCell<IndexMap<String, Value>>>;

/// Runtime values flowing through a query pipeline.
///
/// Container variants are wrapped in `Rc` for cheap cloning; Org values are
/// shared, read-only descendants of the externally owned tree. The one
/// exception to immutability is `Dict`, whose `RefCell` backs the `=`
/// assignment operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Rc<Vec<Value>>),
    Tuple(Rc<Vec<Value>>),
    /// Unique elements in insertion order. Uniqueness is maintained at every
    /// construction and insertion point; elements are restricted to hashable
    /// scalars by the runtime.
    Set(Rc<Vec<Value>>),
    Dict(DictHandle),
    Node(Rc<OrgNode>),
    Root(Rc<OrgRootNode>),
    Date(OrgDate),
    Clock(OrgDateClock),
    RepeatedTask(OrgDateRepeatedTask),
}

impl Value {
    // ── Constructors ──

    pub fn new_list(v: Vec<Value>) -> Self {
        Value::List(Rc::new(v))
    }

    pub fn new_tuple(v: Vec<Value>) -> Self {
        Value::Tuple(Rc::new(v))
    }

    /// Build a set from the given elements, keeping the first occurrence of
    /// each distinct value.
    pub fn new_set(v: Vec<Value>) -> Self {
        Value::Set(Rc::new(dedupe(v)))
    }

    pub fn new_dict(m: IndexMap<String, Value>) -> Self {
        Value::Dict(Rc::new(RefCell::new(m)))
    }

    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    // ── Predicates and accessors ──

    /// `none` and `false` are falsy; everything else is truthy, including
    /// zero and empty containers.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::None | Value::Bool(false))
    }

    /// Whether the value may be used as a set element or dict key.
    pub fn is_hashable(&self) -> bool {
        matches!(
            self,
            Value::None | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_)
        )
    }

    /// The kind name used by the `type` built-in and in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "None",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Str(_) => "Str",
            Value::List(_) => "List",
            Value::Tuple(_) => "Tuple",
            Value::Set(_) => "Set",
            Value::Dict(_) => "Dict",
            Value::Node(_) => "OrgNode",
            Value::Root(_) => "OrgRootNode",
            Value::Date(_) => "OrgDate",
            Value::Clock(_) => "OrgDateClock",
            Value::RepeatedTask(_) => "OrgDateRepeatedTask",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Attribute lookup for dicts and Org values. Returns `None` both for a
    /// missing attribute and for kinds without attributes, so that access
    /// stays forgiving everywhere.
    pub fn attr(&self, name: &str) -> Option<Value> {
        match self {
            Value::Dict(d) => d.borrow().get(name).cloned(),
            Value::Node(n) => n.attr(name),
            Value::Root(r) => r.attr(name),
            Value::Date(d) => d.attr(name),
            Value::Clock(c) => c.attr(name),
            Value::RepeatedTask(r) => r.attr(name),
            _ => None,
        }
    }

    // ── Rendering ──

    /// User-facing rendering: scalars by their natural representation,
    /// containers bracketed with strings quoted inside.
    pub fn render(&self) -> String {
        match self {
            Value::None => "none".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Str(s) => s.clone(),
            Value::List(l) => {
                let items: Vec<String> = l.iter().map(|v| v.render_quoted()).collect();
                format!("[{}]", items.join(", "))
            }
            Value::Tuple(t) => {
                let items: Vec<String> = t.iter().map(|v| v.render_quoted()).collect();
                format!("({})", items.join(", "))
            }
            Value::Set(s) => {
                let items: Vec<String> = s.iter().map(|v| v.render_quoted()).collect();
                format!("{{{}}}", items.join(", "))
            }
            Value::Dict(d) => {
                let entries: Vec<String> = d
                    .borrow()
                    .iter()
                    .map(|(k, v)| format!("\"{}\": {}", k, v.render_quoted()))
                    .collect();
                format!("{{{}}}", entries.join(", "))
            }
            Value::Node(n) => n.heading_line(),
            Value::Root(r) => r.filename.clone(),
            Value::Date(d) => d.render(),
            Value::Clock(c) => c.render(),
            Value::RepeatedTask(r) => r.render(),
        }
    }

    /// Like [`render`](Self::render) but quotes strings, for use inside
    /// container renderings.
    fn render_quoted(&self) -> String {
        match self {
            Value::Str(s) => format!("\"{}\"", s),
            _ => self.render(),
        }
    }
}

/// Remove structural duplicates, keeping first occurrences.
pub fn dedupe(values: Vec<Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(values.len());
    for v in values {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

/// Format a float without spurious trailing digits but always with a
/// decimal point, so `Float` output stays distinguishable from `Int`.
fn format_float(f: f64) -> String {
    if f == f.floor() && f.abs() < 1e15 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            // Compare floats by bit pattern so equality stays reflexive for
            // NaN; mixed Int/Float comparisons are numeric.
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Int(a), Value::Float(b)) => (*a as f64) == *b,
            (Value::Float(a), Value::Int(b)) => *a == (*b as f64),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => **a == **b,
            (Value::Tuple(a), Value::Tuple(b)) => **a == **b,
            // Sets compare regardless of insertion order.
            (Value::Set(a), Value::Set(b)) => {
                a.len() == b.len() && a.iter().all(|v| b.contains(v))
            }
            (Value::Dict(a), Value::Dict(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (Value::Node(a), Value::Node(b)) => Rc::ptr_eq(a, b) || **a == **b,
            (Value::Root(a), Value::Root(b)) => Rc::ptr_eq(a, b) || **a == **b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Clock(a), Value::Clock(b)) => a == b,
            (Value::RepeatedTask(a), Value::RepeatedTask(b)) => a == b,
            _ => false,
        }
    }
}
