//! Line-oriented Org-mode parser building the task tree the query core
//! consumes.
//!
//! Covers the archive subset orgq queries over: headings with TODO
//! keywords, priority cookies and tag lists, planning lines, property
//! drawers, logbook drawers with clocks and state transitions, and body
//! text. Anything unrecognized inside a node becomes body text; text
//! before the first heading is ignored.

use once_cell::sync::Lazy;
use orgq_core::org::parse_ts;
use orgq_core::{OrgDate, OrgDateClock, OrgDateRepeatedTask, OrgNode, OrgRootNode, Value};
use regex::Regex;
use std::rc::Rc;

static STATE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^- State "([^"]+)"\s+from\s+"([^"]+)"\s+([\[<].*[\]>])\s*$"#)
        .expect("state line pattern is valid")
});

static TAG_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+(:[A-Za-z0-9_@#%]+(?::[A-Za-z0-9_@#%]+)*:)\s*$")
        .expect("tag suffix pattern is valid")
});

pub struct OrgParser {
    todo_keys: Vec<String>,
    done_keys: Vec<String>,
}

#[derive(PartialEq)]
enum Drawer {
    None,
    Properties,
    Logbook,
}

impl OrgParser {
    pub fn new(todo_keys: Vec<String>, done_keys: Vec<String>) -> Self {
        Self {
            todo_keys,
            done_keys,
        }
    }

    /// Parse one file into its root node.
    pub fn parse(&self, filename: &str, text: &str) -> OrgRootNode {
        let mut roots: Vec<Rc<OrgNode>> = Vec::new();
        let mut stack: Vec<OrgNode> = Vec::new();
        let mut drawer = Drawer::None;

        for line in text.lines() {
            if let Some(node) = self.parse_heading(line) {
                while stack
                    .last()
                    .map(|top| top.level >= node.level)
                    .unwrap_or(false)
                {
                    let finished = finalize(stack.pop());
                    attach(finished, &mut stack, &mut roots);
                }
                stack.push(node);
                drawer = Drawer::None;
                continue;
            }
            let Some(current) = stack.last_mut() else {
                continue;
            };
            let trimmed = line.trim();
            match drawer {
                Drawer::Properties => {
                    if trimmed.eq_ignore_ascii_case(":END:") {
                        drawer = Drawer::None;
                    } else if let Some((key, value)) = parse_property(trimmed) {
                        current
                            .properties
                            .borrow_mut()
                            .insert(key, Value::Str(value));
                    }
                }
                Drawer::Logbook => {
                    if trimmed.eq_ignore_ascii_case(":END:") {
                        drawer = Drawer::None;
                    } else if let Some(clock) = parse_clock(trimmed) {
                        current.clocks.push(clock);
                    } else if let Some(task) = parse_state_line(trimmed) {
                        current.repeated_tasks.push(task);
                    }
                }
                Drawer::None => {
                    if trimmed.eq_ignore_ascii_case(":PROPERTIES:") {
                        drawer = Drawer::Properties;
                    } else if trimmed.eq_ignore_ascii_case(":LOGBOOK:") {
                        drawer = Drawer::Logbook;
                    } else if is_planning_line(trimmed) {
                        apply_planning(current, trimmed);
                    } else {
                        if !current.body.is_empty() {
                            current.body.push('\n');
                        }
                        current.body.push_str(line);
                    }
                }
            }
        }
        while let Some(node) = stack.pop() {
            let finished = finalize(Some(node));
            attach(finished, &mut stack, &mut roots);
        }
        OrgRootNode::new(filename, roots)
    }

    fn parse_heading(&self, line: &str) -> Option<OrgNode> {
        let stars = line.chars().take_while(|c| *c == '*').count();
        if stars == 0 || !line[stars..].starts_with(' ') {
            return None;
        }
        let mut rest = line[stars..].trim().to_string();

        let mut tags = Vec::new();
        if let Some(caps) = TAG_SUFFIX.captures(&rest) {
            let tag_text = caps.get(1).map(|m| m.as_str().to_string());
            if let Some(tag_text) = tag_text {
                tags = tag_text
                    .trim_matches(':')
                    .split(':')
                    .map(str::to_string)
                    .collect();
                let start = caps.get(0).map(|m| m.start()).unwrap_or(rest.len());
                rest.truncate(start);
            }
        }

        let mut node = OrgNode::new(stars as i64, "");
        if let Some(word) = rest.split_whitespace().next() {
            if self.todo_keys.iter().any(|k| k == word)
                || self.done_keys.iter().any(|k| k == word)
            {
                node.todo = Some(word.to_string());
                rest = rest[word.len()..].trim_start().to_string();
            }
        }
        if rest.starts_with("[#") {
            if let Some(close) = rest.find(']') {
                node.priority = Some(rest[2..close].to_string());
                rest = rest[close + 1..].trim_start().to_string();
            }
        }
        node.heading = rest.trim().to_string();
        node.tags = tags;
        Some(node)
    }
}

fn finalize(node: Option<OrgNode>) -> Option<OrgNode> {
    node.map(|mut n| {
        n.body = n.body.trim_end().to_string();
        n
    })
}

fn attach(node: Option<OrgNode>, stack: &mut Vec<OrgNode>, roots: &mut Vec<Rc<OrgNode>>) {
    let Some(node) = node else { return };
    match stack.last_mut() {
        Some(parent) => parent.children.push(Rc::new(node)),
        None => roots.push(Rc::new(node)),
    }
}

fn parse_property(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix(':')?;
    let close = rest.find(':')?;
    let key = &rest[..close];
    if key.is_empty() {
        return None;
    }
    let value = rest[close + 1..].trim();
    Some((key.to_string(), value.to_string()))
}

fn is_planning_line(line: &str) -> bool {
    ["SCHEDULED:", "DEADLINE:", "CLOSED:"]
        .iter()
        .any(|k| line.contains(k))
}

fn apply_planning(node: &mut OrgNode, line: &str) {
    for (key, slot) in [
        ("SCHEDULED:", 0usize),
        ("DEADLINE:", 1),
        ("CLOSED:", 2),
    ] {
        let Some(at) = line.find(key) else { continue };
        let rest = line[at + key.len()..].trim_start();
        let Some(date) = parse_org_timestamp_prefix(rest) else {
            continue;
        };
        match slot {
            0 => node.scheduled = Some(date),
            1 => node.deadline = Some(date),
            _ => node.closed = Some(date),
        }
    }
}

/// Parse the timestamp (or `--` range) at the start of `s`.
fn parse_org_timestamp_prefix(s: &str) -> Option<OrgDate> {
    let (first, first_len) = parse_single_timestamp(s)?;
    let rest = &s[first_len..];
    if let Some(range_rest) = rest.strip_prefix("--") {
        if let Some((second, _)) = parse_single_timestamp(range_rest) {
            return Some(OrgDate::new(first.start, Some(second.start), first.active));
        }
    }
    Some(first)
}

/// One `<...>` or `[...]` timestamp; returns the parsed date and how many
/// bytes of `s` it consumed.
fn parse_single_timestamp(s: &str) -> Option<(OrgDate, usize)> {
    let (close, active) = match s.chars().next() {
        Some('<') => ('>', true),
        Some('[') => (']', false),
        _ => return None,
    };
    let end = s.find(close)?;
    let inner = &s[1..end];
    let start = parse_timestamp_body(inner)?;
    Some((OrgDate::new(start, None, active), end + 1))
}

/// The inside of a timestamp: date, optional weekday, optional time.
/// Repeater and delay cookies are ignored.
fn parse_timestamp_body(inner: &str) -> Option<chrono::NaiveDateTime> {
    let mut date = None;
    let mut time = None;
    for token in inner.split_whitespace() {
        if date.is_none() && token.len() == 10 && token.as_bytes()[4] == b'-' {
            date = Some(token);
        } else if time.is_none() && token.contains(':') && !token.starts_with(['+', '-', '.']) {
            time = Some(token);
        }
    }
    let date = date?;
    match time {
        Some(t) => parse_ts(&format!("{} {}", date, t)),
        None => parse_ts(date),
    }
}

/// `CLOCK: [start]--[end] => H:MM`; a running clock has no end and stays
/// active.
fn parse_clock(line: &str) -> Option<OrgDateClock> {
    let rest = line.strip_prefix("CLOCK:")?.trim_start();
    let (first, first_len) = parse_single_timestamp(rest)?;
    let tail = &rest[first_len..];
    if let Some(range_rest) = tail.strip_prefix("--") {
        let (second, _) = parse_single_timestamp(range_rest)?;
        return Some(OrgDateClock::new(first.start, second.start, false));
    }
    Some(OrgDateClock::new(first.start, first.start, true))
}

fn parse_state_line(line: &str) -> Option<OrgDateRepeatedTask> {
    let caps = STATE_LINE.captures(line)?;
    let after = caps.get(1)?.as_str().to_string();
    let before = caps.get(2)?.as_str().to_string();
    let stamp = caps.get(3)?.as_str();
    let (date, _) = parse_single_timestamp(stamp)?;
    Some(OrgDateRepeatedTask::new(date.start, before, after, date.active))
}
