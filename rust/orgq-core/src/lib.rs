//! Shared value model for the orgq query language.
//!
//! Defines the runtime [`Value`] universe the evaluator manipulates and the
//! Org domain values (nodes, roots, dates) supplied by the file parser.

pub mod org;
pub mod values;

pub use org::{OrgDate, OrgDateClock, OrgDateRepeatedTask, OrgNode, OrgRootNode};
pub use values::{DictHandle, Value};
