//! Org domain values: task-tree nodes and timestamp structures.
//!
//! Instances are built by the file-parsing collaborator and treated as
//! read-only by the evaluator (node `properties` dicts excepted, since dict
//! assignment is the language's one mutation).

use crate::values::{DictHandle, Value};
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

const TS_FORMAT: &str = "%Y-%m-%d %H:%M";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse an Org timestamp body, with or without a time of day.
pub fn parse_ts(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, TS_FORMAT) {
        return Some(dt);
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Render a timestamp body in the canonical `%Y-%m-%d %H:%M` form.
pub fn format_ts(dt: &NaiveDateTime) -> String {
    dt.format(TS_FORMAT).to_string()
}

fn wrap(body: String, active: bool) -> String {
    if active {
        format!("<{}>", body)
    } else {
        format!("[{}]", body)
    }
}

/// A plain Org timestamp, possibly a range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgDate {
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
    pub active: bool,
}

impl OrgDate {
    pub fn new(start: NaiveDateTime, end: Option<NaiveDateTime>, active: bool) -> Self {
        Self { start, end, active }
    }

    pub fn attr(&self, name: &str) -> Option<Value> {
        match name {
            "start" => Some(Value::Str(format_ts(&self.start))),
            "end" => Some(
                self.end
                    .as_ref()
                    .map(|e| Value::Str(format_ts(e)))
                    .unwrap_or(Value::None),
            ),
            "active" => Some(Value::Bool(self.active)),
            _ => None,
        }
    }

    pub fn render(&self) -> String {
        match &self.end {
            Some(end) => format!(
                "{}--{}",
                wrap(format_ts(&self.start), self.active),
                wrap(format_ts(end), self.active)
            ),
            None => wrap(format_ts(&self.start), self.active),
        }
    }
}

/// A `CLOCK:` entry from a logbook drawer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgDateClock {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub active: bool,
}

impl OrgDateClock {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, active: bool) -> Self {
        Self { start, end, active }
    }

    /// Clocked minutes.
    pub fn duration(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn attr(&self, name: &str) -> Option<Value> {
        match name {
            "start" => Some(Value::Str(format_ts(&self.start))),
            "end" => Some(Value::Str(format_ts(&self.end))),
            "active" => Some(Value::Bool(self.active)),
            "duration" => Some(Value::Int(self.duration())),
            _ => None,
        }
    }

    pub fn render(&self) -> String {
        format!(
            "{}--{}",
            wrap(format_ts(&self.start), self.active),
            wrap(format_ts(&self.end), self.active)
        )
    }
}

/// A logged TODO-state transition, e.g. `- State "DONE" from "TODO" [ts]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgDateRepeatedTask {
    pub timestamp: NaiveDateTime,
    pub before: String,
    pub after: String,
    pub active: bool,
}

impl OrgDateRepeatedTask {
    pub fn new(timestamp: NaiveDateTime, before: String, after: String, active: bool) -> Self {
        Self {
            timestamp,
            before,
            after,
            active,
        }
    }

    pub fn attr(&self, name: &str) -> Option<Value> {
        match name {
            "timestamp" => Some(Value::Str(format_ts(&self.timestamp))),
            "before" => Some(Value::Str(self.before.clone())),
            "after" => Some(Value::Str(self.after.clone())),
            "active" => Some(Value::Bool(self.active)),
            _ => None,
        }
    }

    pub fn render(&self) -> String {
        format!(
            "State \"{}\" from \"{}\" {}",
            self.after,
            self.before,
            wrap(format_ts(&self.timestamp), self.active)
        )
    }
}

/// A heading in the task tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgNode {
    pub heading: String,
    pub todo: Option<String>,
    pub priority: Option<String>,
    pub tags: Vec<String>,
    pub level: i64,
    pub body: String,
    pub children: Vec<Rc<OrgNode>>,
    pub properties: DictHandle,
    pub scheduled: Option<OrgDate>,
    pub deadline: Option<OrgDate>,
    pub closed: Option<OrgDate>,
    pub repeated_tasks: Vec<OrgDateRepeatedTask>,
    pub clocks: Vec<OrgDateClock>,
}

impl OrgNode {
    pub fn new(level: i64, heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            todo: None,
            priority: None,
            tags: Vec::new(),
            level,
            body: String::new(),
            children: Vec::new(),
            properties: Rc::new(RefCell::new(IndexMap::new())),
            scheduled: None,
            deadline: None,
            closed: None,
            repeated_tasks: Vec::new(),
            clocks: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<Value> {
        match name {
            "heading" => Some(Value::Str(self.heading.clone())),
            "todo" => Some(opt_str(&self.todo)),
            "priority" => Some(opt_str(&self.priority)),
            "tags" => Some(Value::new_set(
                self.tags.iter().map(|t| Value::Str(t.clone())).collect(),
            )),
            "level" => Some(Value::Int(self.level)),
            "body" => Some(Value::Str(self.body.clone())),
            "children" => Some(Value::new_list(
                self.children.iter().map(|c| Value::Node(c.clone())).collect(),
            )),
            "properties" => Some(Value::Dict(self.properties.clone())),
            "scheduled" => Some(opt_date(&self.scheduled)),
            "deadline" => Some(opt_date(&self.deadline)),
            "closed" => Some(opt_date(&self.closed)),
            "repeated_tasks" => Some(Value::new_list(
                self.repeated_tasks
                    .iter()
                    .map(|r| Value::RepeatedTask(r.clone()))
                    .collect(),
            )),
            "clocks" => Some(Value::new_list(
                self.clocks.iter().map(|c| Value::Clock(c.clone())).collect(),
            )),
            _ => None,
        }
    }

    /// The one-line summary used when a node appears inside a container
    /// rendering: stars, TODO keyword, priority cookie, heading, tags.
    pub fn heading_line(&self) -> String {
        let mut line = "*".repeat(self.level.max(1) as usize);
        if let Some(todo) = &self.todo {
            line.push(' ');
            line.push_str(todo);
        }
        if let Some(p) = &self.priority {
            line.push_str(&format!(" [#{}]", p));
        }
        line.push(' ');
        line.push_str(&self.heading);
        if !self.tags.is_empty() {
            line.push_str(&format!(" :{}:", self.tags.join(":")));
        }
        line
    }
}

/// A file-rooted collection of top-level nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgRootNode {
    pub filename: String,
    pub children: Vec<Rc<OrgNode>>,
}

impl OrgRootNode {
    pub fn new(filename: impl Into<String>, children: Vec<Rc<OrgNode>>) -> Self {
        Self {
            filename: filename.into(),
            children,
        }
    }

    pub fn attr(&self, name: &str) -> Option<Value> {
        match name {
            "filename" => Some(Value::Str(self.filename.clone())),
            "children" => Some(Value::new_list(
                self.children.iter().map(|c| Value::Node(c.clone())).collect(),
            )),
            _ => None,
        }
    }
}

fn opt_str(v: &Option<String>) -> Value {
    v.as_ref().map(|s| Value::Str(s.clone())).unwrap_or(Value::None)
}

fn opt_date(v: &Option<OrgDate>) -> Value {
    v.as_ref().map(|d| Value::Date(d.clone())).unwrap_or(Value::None)
}
