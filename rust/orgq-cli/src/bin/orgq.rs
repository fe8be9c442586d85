//! The orgq binary: loads Org archives, binds CLI flags to query
//! variables, evaluates the query, and prints the result stream.

use clap::{Parser, ValueEnum};
use orgq_cli::org::OrgParser;
use orgq_cli::render;
use orgq_core::Value;
use orgq_rt::{run_query, Context};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Plain,
    Json,
}

#[derive(Parser)]
#[command(
    name = "orgq",
    version,
    about = "Query Org-mode task archives with a jq-inspired language"
)]
struct Cli {
    /// Query to evaluate
    query: String,

    /// Org files to load; their roots form the initial stream
    files: Vec<PathBuf>,

    /// Value bound to $offset
    #[arg(long, default_value_t = 0)]
    offset: i64,

    /// Value bound to $limit
    #[arg(long, default_value_t = 0)]
    limit: i64,

    /// TODO keywords, bound to $todo_keys
    #[arg(long, value_delimiter = ',', default_value = "TODO")]
    todo_keys: Vec<String>,

    /// DONE keywords, bound to $done_keys
    #[arg(long, value_delimiter = ',', default_value = "DONE")]
    done_keys: Vec<String>,

    /// Property name bound to $category_property
    #[arg(long)]
    category_property: Option<String>,

    /// Extra string variables, repeatable
    #[arg(long = "var", value_name = "NAME=VALUE")]
    vars: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "plain")]
    format: Format,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<String, String> {
    let parser = OrgParser::new(cli.todo_keys.clone(), cli.done_keys.clone());
    let mut roots = Vec::new();
    for path in &cli.files {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        roots.push(Value::Root(Rc::new(parser.parse(&name, &text))));
    }

    // The initial stream holds exactly one value: the list of file roots.
    let input = vec![Value::new_list(roots)];
    let mut ctx = Context::new(seed_vars(cli)?);
    let output = run_query(&cli.query, &input, &mut ctx).map_err(|e| e.to_string())?;

    Ok(match cli.format {
        Format::Plain => render::render_stream(&output),
        Format::Json => {
            let array =
                serde_json::Value::Array(output.iter().map(render::value_to_json).collect());
            serde_json::to_string_pretty(&array).map_err(|e| e.to_string())?
        }
    })
}

fn seed_vars(cli: &Cli) -> Result<HashMap<String, Value>, String> {
    let mut vars = HashMap::new();
    vars.insert("offset".to_string(), Value::Int(cli.offset));
    vars.insert("limit".to_string(), Value::Int(cli.limit));
    vars.insert("todo_keys".to_string(), key_set(&cli.todo_keys));
    vars.insert("done_keys".to_string(), key_set(&cli.done_keys));
    if let Some(property) = &cli.category_property {
        vars.insert(
            "category_property".to_string(),
            Value::Str(property.clone()),
        );
    }
    for spec in &cli.vars {
        let (name, value) = spec
            .split_once('=')
            .ok_or_else(|| format!("--var expects NAME=VALUE, got {:?}", spec))?;
        vars.insert(name.to_string(), Value::Str(value.to_string()));
    }
    Ok(vars)
}

fn key_set(keys: &[String]) -> Value {
    Value::new_set(keys.iter().map(|k| Value::Str(k.clone())).collect())
}
