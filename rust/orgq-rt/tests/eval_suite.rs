//! End-to-end evaluation suite: conformance scenarios, universal
//! invariants, built-in coverage, and the runtime error taxonomy.

use indexmap::IndexMap;
use orgq_rt::eval::DebugSink;
use orgq_rt::{
    run_query, Context, OrgDate, OrgNode, OrgRootNode, QueryError, RuntimeError, Value,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

// ── Helpers ──

fn int(n: i64) -> Value {
    Value::Int(n)
}

fn s(v: &str) -> Value {
    Value::str(v)
}

fn list(items: Vec<Value>) -> Value {
    Value::new_list(items)
}

fn tuple(items: Vec<Value>) -> Value {
    Value::new_tuple(items)
}

fn dict(pairs: Vec<(&str, Value)>) -> Value {
    let mut m = IndexMap::new();
    for (k, v) in pairs {
        m.insert(k.to_string(), v);
    }
    Value::new_dict(m)
}

fn run(source: &str, input: Vec<Value>) -> Vec<Value> {
    run_query(source, &input, &mut Context::empty())
        .unwrap_or_else(|e| panic!("query {:?} failed: {}", source, e))
}

fn run_with(source: &str, input: Vec<Value>, vars: Vec<(&str, Value)>) -> Vec<Value> {
    let seed: HashMap<String, Value> =
        vars.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    run_query(source, &input, &mut Context::new(seed))
        .unwrap_or_else(|e| panic!("query {:?} failed: {}", source, e))
}

fn run_err(source: &str, input: Vec<Value>) -> RuntimeError {
    match run_query(source, &input, &mut Context::empty()) {
        Err(QueryError::Runtime(e)) => e,
        Ok(out) => panic!("query {:?} unexpectedly produced {:?}", source, out),
        Err(other) => panic!("query {:?} failed before execution: {}", source, other),
    }
}

// ── Conformance scenarios ──

#[test]
fn scenario_unique_over_iterated_list() {
    let input = vec![list(vec![int(1), int(1), int(2), int(3), int(2)])];
    assert_eq!(run(".[] | unique", input), vec![int(1), int(2), int(3)]);
}

#[test]
fn scenario_select_by_field_then_project() {
    let input = vec![list(vec![
        dict(vec![("todo", s("DONE")), ("h", s("a"))]),
        dict(vec![("todo", s("TODO")), ("h", s("b"))]),
        dict(vec![("todo", s("DONE")), ("h", s("c"))]),
    ])];
    assert_eq!(
        run(".[] | select(.todo == \"DONE\") | .h", input),
        vec![s("a"), s("c")]
    );
}

#[test]
fn scenario_slice_with_variables() {
    let input = vec![list(vec![int(1), int(2), int(3), int(4), int(5)])];
    let out = run_with(
        ".[ $offset : $offset + $limit ]",
        input,
        vec![("offset", int(1)), ("limit", int(3))],
    );
    assert_eq!(out, vec![list(vec![int(2), int(3), int(4)])]);
}

#[test]
fn scenario_sha256_digest() {
    assert_eq!(
        run("sha256", vec![s("abc")]),
        vec![s("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")]
    );
}

#[test]
fn scenario_signed_division_family() {
    let out = run("-7 mod 3, -7 rem 3, -7 quot 3", vec![int(7)]);
    assert_eq!(out, vec![tuple(vec![int(2), int(-1), int(-2)])]);
}

#[test]
fn scenario_sort_by_identity_descending() {
    let input = vec![list(vec![
        int(3),
        int(1),
        int(4),
        int(1),
        int(5),
        int(9),
        int(2),
    ])];
    assert_eq!(
        run("sort_by(.)", input),
        vec![list(vec![
            int(9),
            int(5),
            int(4),
            int(3),
            int(2),
            int(1),
            int(1)
        ])]
    );
}

#[test]
fn scenario_assignment_is_visible_through_the_original_item() {
    let input = vec![dict(vec![("p", dict(vec![]))])];
    assert_eq!(run(".p[\"k\"] = \"v\"; .p.k", input), vec![s("v")]);
}

#[test]
fn scenario_fold_collects_subquery_outputs() {
    let input = vec![list(vec![int(10), int(20), int(30)])];
    assert_eq!(
        run("[ .[] | . * 2 ]", input),
        vec![list(vec![int(20), int(40), int(60)])]
    );
}

#[test]
fn scenario_if_then_else() {
    assert_eq!(run("if . == 2 then \"yes\" else \"no\"", vec![int(2)]), vec![s("yes")]);
    assert_eq!(run("if . == 2 then \"yes\" else \"no\"", vec![int(3)]), vec![s("no")]);
}

#[test]
fn scenario_matches_and_membership_inside_select() {
    let input = vec![dict(vec![
        ("heading", s("Fix bug")),
        ("tags", list(vec![s("debug")])),
    ])];
    assert_eq!(
        run(
            "select(.heading matches \"^Fix\" and \"debug\" in .tags) | .heading",
            input
        ),
        vec![s("Fix bug")]
    );
}

// ── Universal invariants ──

#[test]
fn identity_round_trips_every_value() {
    let values = vec![
        Value::None,
        int(42),
        Value::Float(1.5),
        s("x"),
        list(vec![int(1)]),
        tuple(vec![int(1), s("a")]),
        Value::new_set(vec![s("t")]),
        dict(vec![("k", int(1))]),
    ];
    for v in values {
        assert_eq!(run(".", vec![v.clone()]), vec![v]);
    }
}

#[test]
fn missing_access_yields_none() {
    assert_eq!(run(".nope", vec![int(5)]), vec![Value::None]);
    assert_eq!(run(".nope", vec![dict(vec![("a", int(1))])]), vec![Value::None]);
    assert_eq!(run(".[99]", vec![list(vec![int(1)])]), vec![Value::None]);
    assert_eq!(run(".[-1]", vec![list(vec![int(1)])]), vec![Value::None]);
    assert_eq!(run(".[5]", vec![s("abc")]), vec![Value::None]);
}

#[test]
fn slices_never_error_and_clamp() {
    let input = || vec![list(vec![int(1), int(2), int(3)])];
    assert_eq!(run(".[0:99]", input()), vec![list(vec![int(1), int(2), int(3)])]);
    assert_eq!(run(".[2:1]", input()), vec![list(vec![])]);
    assert_eq!(run(".[-5:2]", input()), vec![list(vec![int(1), int(2)])]);
    assert_eq!(run(".[1:]", input()), vec![list(vec![int(2), int(3)])]);
    assert_eq!(run(".[:1]", input()), vec![list(vec![int(1)])]);
    assert_eq!(run(".[:]", input()), vec![list(vec![int(1), int(2), int(3)])]);
    // kind preservation
    assert_eq!(
        run(".[0:2]", vec![tuple(vec![int(1), int(2), int(3)])]),
        vec![tuple(vec![int(1), int(2)])]
    );
    assert_eq!(run(".[1:3]", vec![s("abcd")]), vec![s("bc")]);
}

#[test]
fn pipeline_composition_is_associative() {
    let input = || vec![list(vec![int(1), int(2), int(3)])];
    assert_eq!(
        run("(.[] | . * 2) | . + 1", input()),
        run(".[] | (. * 2 | . + 1)", input())
    );
}

#[test]
fn fold_law_collects_everything() {
    let input = vec![list(vec![int(1), int(2)])];
    assert_eq!(
        run("[ .[] ]", input.clone()),
        vec![list(vec![int(1), int(2)])]
    );
    assert_eq!(run("[]", vec![int(1)]), vec![list(vec![])]);
    // one list per input item
    assert_eq!(
        run("[ . ]", vec![int(1), int(2)]),
        vec![list(vec![int(1)]), list(vec![int(2)])]
    );
}

#[test]
fn sort_by_is_stable_with_none_keys_last() {
    let input = vec![list(vec![
        dict(vec![("k", int(2)), ("id", s("a"))]),
        dict(vec![("k", Value::None), ("id", s("b"))]),
        dict(vec![("k", int(1)), ("id", s("c"))]),
        dict(vec![("k", int(2)), ("id", s("d"))]),
    ])];
    let out = run("sort_by(.k) | .[] | .id", input);
    assert_eq!(out, vec![s("a"), s("d"), s("c"), s("b")]);
}

#[test]
fn or_preserves_truthy_left_values() {
    assert_eq!(run("\"L\" or \"R\"", vec![int(0)]), vec![s("L")]);
    assert_eq!(run("false or \"R\"", vec![int(0)]), vec![s("R")]);
    assert_eq!(run("none or 5", vec![int(0)]), vec![int(5)]);
    // empty containers are truthy
    assert_eq!(run("\"\" or \"R\"", vec![int(0)]), vec![s("")]);
    // `and` yields booleans
    assert_eq!(run("1 and \"x\"", vec![int(0)]), vec![Value::Bool(true)]);
    assert_eq!(run("1 and none", vec![int(0)]), vec![Value::Bool(false)]);
}

#[test]
fn container_kind_is_preserved_by_plus_and_minus() {
    assert!(matches!(
        run(". + 4", vec![list(vec![int(1)])])[0],
        Value::List(_)
    ));
    assert!(matches!(
        run(". + 4", vec![tuple(vec![int(1)])])[0],
        Value::Tuple(_)
    ));
    assert!(matches!(
        run(". - 1", vec![Value::new_set(vec![int(1), int(2)])])[0],
        Value::Set(_)
    ));
}

#[test]
fn none_never_orders_against_values() {
    for q in ["1 > none", "1 < none", "none > 1", "none < 1", "1 >= none"] {
        assert_eq!(run(q, vec![int(0)]), vec![Value::Bool(false)], "query {}", q);
    }
    assert_eq!(run("none <= none", vec![int(0)]), vec![Value::Bool(true)]);
    assert_eq!(run("none == none", vec![int(0)]), vec![Value::Bool(true)]);
}

// ── Language features ──

#[test]
fn tuples_take_the_cartesian_product_left_to_right() {
    let input = vec![list(vec![int(1), int(2)])];
    assert_eq!(
        run(".[] , 0", input),
        vec![tuple(vec![int(1), int(0)]), tuple(vec![int(2), int(0)])]
    );
}

#[test]
fn as_binding_scopes_the_pipeline_tail() {
    assert_eq!(run(". as $x | $x + 1", vec![int(41)]), vec![int(42)]);
    assert_eq!(
        run(". + 1 as $x | . as $y | $x * 10 + $y", vec![int(2)]),
        vec![int(32)]
    );
}

#[test]
fn let_binding_shadows_and_unwinds() {
    assert_eq!(
        run_with(
            "let $limit + 1 as $limit in $limit",
            vec![int(0)],
            vec![("limit", int(9))]
        ),
        vec![int(10)]
    );
    // outer binding is restored after the let body
    assert_eq!(
        run_with(
            "(let 1 as $v in $v) + $v",
            vec![int(0)],
            vec![("v", int(40))]
        ),
        vec![int(41)]
    );
}

#[test]
fn undefined_variables_are_runtime_errors() {
    assert!(matches!(
        run_err("$nope", vec![int(1)]),
        RuntimeError::UndefinedVariable(name) if name == "nope"
    ));
}

#[test]
fn bare_identifiers_read_as_strings() {
    let input = vec![dict(vec![("todo", s("DONE"))])];
    assert_eq!(run(".todo == DONE", input), vec![Value::Bool(true)]);
}

#[test]
fn bracket_string_keys_are_field_access() {
    let input = vec![dict(vec![("k", int(7))])];
    assert_eq!(run(".[\"k\"]", input), vec![int(7)]);
    // string keys are forgiving on any kind
    assert_eq!(run(".[\"k\"]", vec![int(3)]), vec![Value::None]);
}

#[test]
fn dynamic_bracket_keys_dispatch_at_runtime() {
    let input = vec![dict(vec![("cat", s("work"))])];
    assert_eq!(
        run_with(".[ $key ]", input, vec![("key", s("cat"))]),
        vec![s("work")]
    );
    assert_eq!(
        run_with(".[ $i ]", vec![list(vec![int(9), int(8)])], vec![("i", int(1))]),
        vec![int(8)]
    );
}

#[test]
fn iteration_covers_every_container_kind() {
    assert_eq!(
        run(".[]", vec![dict(vec![("a", int(1)), ("b", int(2))])]),
        vec![int(1), int(2)]
    );
    assert_eq!(
        run(".[]", vec![Value::new_set(vec![int(1), int(2)])]),
        vec![int(1), int(2)]
    );
    assert_eq!(
        run(".[]", vec![tuple(vec![int(1), int(2)])]),
        vec![int(1), int(2)]
    );
}

#[test]
fn sequence_discards_left_output_but_keeps_effects() {
    let input = vec![dict(vec![("p", dict(vec![("x", int(1))]))])];
    assert_eq!(run(".p.y = 2; .p | length", input), vec![int(2)]);
}

#[test]
fn assignment_emits_the_mutated_dict() {
    let out = run(".k = 1", vec![dict(vec![])]);
    assert_eq!(out, vec![dict(vec![("k", int(1))])]);
    // existing keys keep their position
    let out = run(".a = 9", vec![dict(vec![("a", int(1)), ("b", int(2))])]);
    match &out[0] {
        Value::Dict(d) => {
            let keys: Vec<String> = d.borrow().keys().cloned().collect();
            assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
        }
        other => panic!("expected dict, got {:?}", other),
    }
}

#[test]
fn if_conditions_run_per_output() {
    // empty condition stream contributes nothing
    assert_eq!(run("if .[] then 1 else 2", vec![list(vec![])]), vec![]);
    assert_eq!(
        run("if .[] then 1 else 2", vec![list(vec![Value::Bool(true), Value::Bool(false)])]),
        vec![int(1), int(2)]
    );
}

#[test]
fn elif_chains_evaluate_in_order() {
    let q = "if . == 1 then \"one\" elif . == 2 then \"two\" else \"many\"";
    assert_eq!(run(q, vec![int(1)]), vec![s("one")]);
    assert_eq!(run(q, vec![int(2)]), vec![s("two")]);
    assert_eq!(run(q, vec![int(5)]), vec![s("many")]);
}

// ── Built-ins ──

#[test]
fn reverse_handles_streams_and_single_containers() {
    assert_eq!(
        run("reverse", vec![list(vec![int(1), int(2), int(3)])]),
        vec![list(vec![int(3), int(2), int(1)])]
    );
    assert_eq!(run("reverse", vec![s("abc")]), vec![s("cba")]);
    assert_eq!(
        run(".[] | reverse", vec![list(vec![int(1), int(2)])]),
        vec![int(2), int(1)]
    );
}

#[test]
fn length_per_kind() {
    assert_eq!(run("length", vec![s("abcd")]), vec![int(4)]);
    assert_eq!(run("length", vec![list(vec![int(1), int(2)])]), vec![int(2)]);
    assert_eq!(run("length", vec![dict(vec![("a", int(1))])]), vec![int(1)]);
    assert_eq!(run("length", vec![int(7)]), vec![Value::None]);
}

#[test]
fn sum_max_min() {
    let nums = || vec![list(vec![int(3), int(1), int(2)])];
    assert_eq!(run("sum", nums()), vec![int(6)]);
    assert_eq!(run("max", nums()), vec![int(3)]);
    assert_eq!(run("min", nums()), vec![int(1)]);
    assert_eq!(
        run("sum", vec![list(vec![int(1), Value::Float(0.5)])]),
        vec![Value::Float(1.5)]
    );
    assert_eq!(
        run("max", vec![list(vec![Value::None, int(2), Value::None])]),
        vec![int(2)]
    );
    assert_eq!(run("max", vec![list(vec![])]), vec![Value::None]);
    assert_eq!(
        run("max", vec![list(vec![s("a"), s("c"), s("b")])]),
        vec![s("c")]
    );
}

#[test]
fn map_join_not() {
    assert_eq!(
        run("map(. * 2)", vec![list(vec![int(1), int(2)])]),
        vec![list(vec![int(2), int(4)])]
    );
    assert_eq!(
        run("join(\", \")", vec![list(vec![s("a"), s("b")])]),
        vec![s("a, b")]
    );
    assert_eq!(
        run("join(\"-\")", vec![list(vec![int(1), int(2)])]),
        vec![s("1-2")]
    );
    assert_eq!(run("not(.)", vec![Value::Bool(false)]), vec![Value::Bool(true)]);
    assert_eq!(run("not(.)", vec![int(0)]), vec![Value::Bool(false)]);
}

#[test]
fn type_reports_kind_names() {
    assert_eq!(run("type", vec![int(1)]), vec![s("Int")]);
    assert_eq!(run("type", vec![Value::None]), vec![s("None")]);
    assert_eq!(run("type", vec![list(vec![])]), vec![s("List")]);
}

#[test]
fn coercions() {
    assert_eq!(run("int(\"42\")", vec![int(0)]), vec![int(42)]);
    assert_eq!(run("int(3.9)", vec![int(0)]), vec![int(3)]);
    assert_eq!(run("int(true)", vec![int(0)]), vec![int(1)]);
    assert_eq!(run("float(\"2.5\")", vec![int(0)]), vec![Value::Float(2.5)]);
    assert_eq!(run("bool(\"TRUE\")", vec![int(0)]), vec![Value::Bool(true)]);
    assert_eq!(run("bool(\"False\")", vec![int(0)]), vec![Value::Bool(false)]);
    assert_eq!(run("str(42)", vec![int(0)]), vec![s("42")]);
    assert_eq!(run("str(.)", vec![Value::Float(2.0)]), vec![s("2.0")]);
    assert!(matches!(
        run_err("int(\"nope\")", vec![int(0)]),
        RuntimeError::BadArgument { name: "int", .. }
    ));
    assert!(matches!(
        run_err("bool(\"maybe\")", vec![int(0)]),
        RuntimeError::BadArgument { name: "bool", .. }
    ));
}

#[test]
fn ts_and_date_constructors() {
    let out = run("ts(\"2024-01-15 10:30\")", vec![int(0)]);
    match &out[0] {
        Value::Date(d) => {
            assert!(!d.active);
            assert!(d.end.is_none());
        }
        other => panic!("expected date, got {:?}", other),
    }
    let out = run(
        "timestamp(\"2024-01-15 10:30\", \"2024-01-15 11:00\", true)",
        vec![int(0)],
    );
    match &out[0] {
        Value::Date(d) => {
            assert!(d.active);
            assert!(d.end.is_some());
        }
        other => panic!("expected date, got {:?}", other),
    }
    let out = run(
        "clock(\"2024-01-15 10:00\", \"2024-01-15 11:30\")",
        vec![int(0)],
    );
    match &out[0] {
        Value::Clock(c) => assert_eq!(c.duration(), 90),
        other => panic!("expected clock, got {:?}", other),
    }
    let out = run(
        "repeated_task(\"2024-01-15 10:00\", TODO, DONE)",
        vec![int(0)],
    );
    match &out[0] {
        Value::RepeatedTask(r) => {
            assert_eq!(r.before, "TODO");
            assert_eq!(r.after, "DONE");
            assert!(!r.active);
        }
        other => panic!("expected repeated task, got {:?}", other),
    }
}

#[test]
fn match_returns_captures_or_none() {
    assert_eq!(
        run("match(\"(a+)(b*)\")", vec![s("xxaab")]),
        vec![list(vec![s("aab"), s("aa"), s("b")])]
    );
    assert_eq!(run("match(\"z\")", vec![s("abc")]), vec![Value::None]);
}

#[test]
fn uuid_emits_fresh_v4_strings() {
    let out = run("uuid", vec![int(1), int(2)]);
    assert_eq!(out.len(), 2);
    for v in &out {
        let text = v.as_str().expect("uuid output is a string");
        assert_eq!(text.len(), 36);
        assert_eq!(text.matches('-').count(), 4);
    }
    assert_ne!(out[0], out[1]);
}

struct Recorder(RefCell<Vec<String>>);

impl DebugSink for Recorder {
    fn debug(&self, value: &Value) {
        self.0.borrow_mut().push(value.render());
    }
}

#[test]
fn debug_logs_through_the_sink_and_passes_values_unchanged() {
    let sink = Rc::new(Recorder(RefCell::new(Vec::new())));
    let mut ctx = Context::empty().with_sink(sink.clone());
    let input = vec![int(1), s("x")];
    let out = run_query("debug", &input, &mut ctx).unwrap();
    assert_eq!(out, input);
    assert_eq!(*sink.0.borrow(), vec!["1".to_string(), "x".to_string()]);
}

// ── Org values ──

fn sample_root() -> Value {
    let mut done = OrgNode::new(2, "Ship release");
    done.todo = Some("DONE".to_string());
    done.tags = vec!["work".to_string()];
    done.closed = Some(OrgDate::new(
        orgq_core::org::parse_ts("2024-02-01 12:00").unwrap(),
        None,
        false,
    ));
    let mut open = OrgNode::new(2, "Fix login bug");
    open.todo = Some("TODO".to_string());
    open.tags = vec!["work".to_string(), "debug".to_string()];
    open.scheduled = Some(OrgDate::new(
        orgq_core::org::parse_ts("2024-03-01").unwrap(),
        None,
        true,
    ));
    let mut parent = OrgNode::new(1, "Projects");
    parent.children = vec![Rc::new(done), Rc::new(open)];
    Value::Root(Rc::new(OrgRootNode::new("tasks.org", vec![Rc::new(parent)])))
}

#[test]
fn org_trees_are_queryable() {
    let input = vec![sample_root()];
    assert_eq!(run(".filename", input.clone()), vec![s("tasks.org")]);
    assert_eq!(run(".[] | .heading", input.clone()), vec![s("Projects")]);
    assert_eq!(
        run(".[] | .[] | select(.todo == \"TODO\") | .heading", input.clone()),
        vec![s("Fix login bug")]
    );
    assert_eq!(
        run(".[] | .[] | select(\"debug\" in .tags) | .level", input.clone()),
        vec![int(2)]
    );
    // missing attributes are forgiving on org nodes too
    assert_eq!(run(".[] | .nope", input), vec![Value::None]);
}

#[test]
fn todo_key_sets_drive_selection() {
    let input = vec![sample_root()];
    let out = run_with(
        ".[] | .[] | select(.todo in $done_keys) | .heading",
        input,
        vec![("done_keys", Value::new_set(vec![s("DONE"), s("CANCELLED")]))],
    );
    assert_eq!(out, vec![s("Ship release")]);
}

#[test]
fn org_dates_compare_by_start() {
    let early = Value::Date(OrgDate::new(
        orgq_core::org::parse_ts("2024-01-01").unwrap(),
        None,
        true,
    ));
    let late = Value::Date(OrgDate::new(
        orgq_core::org::parse_ts("2024-06-01").unwrap(),
        None,
        false,
    ));
    let input = vec![tuple(vec![early, late])];
    assert_eq!(run(".[0] < .[1]", input.clone()), vec![Value::Bool(true)]);
    assert_eq!(run(".[0] >= .[1]", input), vec![Value::Bool(false)]);
}

#[test]
fn scheduled_comparisons_treat_missing_as_none() {
    let input = vec![sample_root()];
    // the DONE node has no scheduled date: never greater, never less
    let out = run(
        ".[] | .[] | select(.scheduled > ts(\"2024-01-01\")) | .heading",
        input,
    );
    assert_eq!(out, vec![s("Fix login bug")]);
}

// ── Error taxonomy ──

#[test]
fn runtime_errors_name_the_offending_kind() {
    assert!(matches!(
        run_err(".[]", vec![int(5)]),
        RuntimeError::NotIterable("Int")
    ));
    assert!(matches!(
        run_err(".a = 1", vec![int(5)]),
        RuntimeError::AssignTarget("Int")
    ));
    assert!(matches!(
        run_err(".[ $k ] = 1", vec![dict(vec![("x", dict(vec![]))])]),
        RuntimeError::UndefinedVariable(_)
    ));
    assert!(matches!(
        run_err("sum", vec![int(5)]),
        RuntimeError::BadArgument { name: "sum", .. }
    ));
    assert!(matches!(
        run_err("1 + \"a\"", vec![int(0)]),
        RuntimeError::BinaryType { op: "+", .. }
    ));
    assert!(matches!(
        run_err("1 in 2", vec![int(0)]),
        RuntimeError::BinaryType { op: "in", .. }
    ));
    assert!(matches!(
        run_err("1 quot 0", vec![int(0)]),
        RuntimeError::DivisionByZero
    ));
    assert!(matches!(
        run_err(". matches .", vec![int(0)]),
        RuntimeError::BinaryType { op: "matches", .. }
    ));
}

#[test]
fn dynamic_invalid_regex_is_a_runtime_error() {
    let input = vec![dict(vec![("pat", s("[unclosed"))])];
    assert!(matches!(
        run_err("\"abc\" matches .pat", input),
        RuntimeError::InvalidRegex { .. }
    ));
}

#[test]
fn mixed_sort_categories_are_rejected() {
    assert!(matches!(
        run_err("sort_by(.)", vec![list(vec![int(1), s("a")])]),
        RuntimeError::Incomparable(_, _)
    ));
    assert!(matches!(
        run_err("max", vec![list(vec![int(1), s("a")])]),
        RuntimeError::Incomparable(_, _)
    ));
}

#[test]
fn bracket_assignment_requires_string_keys() {
    let input = vec![dict(vec![("p", dict(vec![]))])];
    assert!(matches!(
        run_err(".p[1] = 2", input),
        RuntimeError::AssignKey("Int")
    ));
}

#[test]
fn integer_keys_reject_non_indexable_containers() {
    assert!(matches!(
        run_err(".[0]", vec![dict(vec![("a", int(1))])]),
        RuntimeError::BadIndex { container: "Dict", key: "Int" }
    ));
}

#[test]
fn select_with_empty_condition_stream_filters_out() {
    // the condition produces no values: the item is dropped, not an error
    assert_eq!(run("select(.[])", vec![list(vec![])]), vec![]);
}
