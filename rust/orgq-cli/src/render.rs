//! Result-stream printing: Org blocks for node values, one element per
//! line for containers, natural representations for scalars, and an
//! optional JSON mode.

use orgq_core::{OrgNode, OrgRootNode, Value};

/// Render a whole output stream; the empty stream prints `No results`.
pub fn render_stream(values: &[Value]) -> String {
    if values.is_empty() {
        return "No results".to_string();
    }
    values
        .iter()
        .map(render_value)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_value(value: &Value) -> String {
    match value {
        Value::Node(node) => {
            let mut out = String::new();
            render_node(node, &mut out);
            out.trim_end().to_string()
        }
        Value::Root(root) => render_root(root),
        Value::List(items) | Value::Tuple(items) | Value::Set(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Dict(d) => d
            .borrow()
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v.render()))
            .collect::<Vec<_>>()
            .join("\n"),
        scalar => scalar.render(),
    }
}

fn render_root(root: &OrgRootNode) -> String {
    let mut out = String::new();
    for child in &root.children {
        render_node(child, &mut out);
    }
    out.trim_end().to_string()
}

/// Re-format one node as an Org block, children included.
pub fn render_node(node: &OrgNode, out: &mut String) {
    out.push_str(&node.heading_line());
    out.push('\n');

    let mut planning = Vec::new();
    if let Some(d) = &node.scheduled {
        planning.push(format!("SCHEDULED: {}", d.render()));
    }
    if let Some(d) = &node.deadline {
        planning.push(format!("DEADLINE: {}", d.render()));
    }
    if let Some(d) = &node.closed {
        planning.push(format!("CLOSED: {}", d.render()));
    }
    if !planning.is_empty() {
        out.push_str("  ");
        out.push_str(&planning.join(" "));
        out.push('\n');
    }

    let properties = node.properties.borrow();
    if !properties.is_empty() {
        out.push_str("  :PROPERTIES:\n");
        for (key, value) in properties.iter() {
            out.push_str(&format!("  :{}: {}\n", key, value.render()));
        }
        out.push_str("  :END:\n");
    }
    drop(properties);

    if !node.clocks.is_empty() || !node.repeated_tasks.is_empty() {
        out.push_str("  :LOGBOOK:\n");
        for clock in &node.clocks {
            out.push_str(&format!("  CLOCK: {}\n", clock.render()));
        }
        for task in &node.repeated_tasks {
            out.push_str(&format!("  - {}\n", task.render()));
        }
        out.push_str("  :END:\n");
    }

    if !node.body.is_empty() {
        out.push_str(&node.body);
        out.push('\n');
    }

    for child in &node.children {
        render_node(child, out);
    }
}

/// JSON projection of a value for `--format json`.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    use serde_json::json;
    match value {
        Value::None => serde_json::Value::Null,
        Value::Bool(b) => json!(b),
        Value::Int(n) => json!(n),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => json!(s),
        Value::List(items) | Value::Tuple(items) | Value::Set(items) => {
            serde_json::Value::Array(items.iter().map(value_to_json).collect())
        }
        Value::Dict(d) => serde_json::Value::Object(
            d.borrow()
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
        Value::Node(node) => node_to_json(node),
        Value::Root(root) => json!({
            "filename": root.filename,
            "children": root.children.iter().map(|c| node_to_json(c)).collect::<Vec<_>>(),
        }),
        Value::Date(d) => json!(d.render()),
        Value::Clock(c) => json!(c.render()),
        Value::RepeatedTask(r) => json!(r.render()),
    }
}

fn node_to_json(node: &OrgNode) -> serde_json::Value {
    use serde_json::json;
    json!({
        "heading": node.heading,
        "todo": node.todo,
        "priority": node.priority,
        "tags": node.tags,
        "level": node.level,
        "body": node.body,
        "properties": node
            .properties
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), value_to_json(v)))
            .collect::<serde_json::Map<_, _>>(),
        "scheduled": node.scheduled.as_ref().map(|d| d.render()),
        "deadline": node.deadline.as_ref().map(|d| d.render()),
        "closed": node.closed.as_ref().map(|d| d.render()),
        "repeated_tasks": node.repeated_tasks.iter().map(|r| r.render()).collect::<Vec<_>>(),
        "clocks": node.clocks.iter().map(|c| c.render()).collect::<Vec<_>>(),
        "children": node.children.iter().map(|c| node_to_json(c)).collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgq_core::org::parse_ts;
    use orgq_core::OrgDate;
    use std::rc::Rc;

    #[test]
    fn empty_streams_say_no_results() {
        assert_eq!(render_stream(&[]), "No results");
    }

    #[test]
    fn scalars_and_containers() {
        assert_eq!(render_stream(&[Value::Int(1), Value::str("x")]), "1\nx");
        assert_eq!(
            render_value(&Value::new_list(vec![Value::Int(1), Value::Int(2)])),
            "1\n2"
        );
    }

    #[test]
    fn nodes_render_as_org_blocks() {
        let mut node = OrgNode::new(1, "Fix bug");
        node.todo = Some("TODO".to_string());
        node.tags = vec!["debug".to_string()];
        node.scheduled = Some(OrgDate::new(parse_ts("2024-03-01").unwrap(), None, true));
        node.body = "  Steps to reproduce attached.".to_string();
        let mut child = OrgNode::new(2, "Write test");
        child.todo = Some("DONE".to_string());
        node.children = vec![Rc::new(child)];

        let rendered = render_value(&Value::Node(Rc::new(node)));
        let expected = "\
* TODO Fix bug :debug:
  SCHEDULED: <2024-03-01 00:00>
  Steps to reproduce attached.
** DONE Write test";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn json_projection() {
        let v = Value::new_list(vec![Value::Int(1), Value::None, Value::str("a")]);
        assert_eq!(
            value_to_json(&v),
            serde_json::json!([1, null, "a"])
        );
    }
}
