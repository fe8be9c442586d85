//! The built-in function registry.
//!
//! Consulted at compile time for name resolution and arity checking; the
//! lowered [`Builtin`](crate::builtins::Builtin) carries the compiled
//! argument stages.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Declared signature of a built-in function.
#[derive(Debug, Clone, Copy)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub min_arity: usize,
    pub max_arity: usize,
}

impl FunctionSpec {
    pub fn accepts(&self, arity: usize) -> bool {
        (self.min_arity..=self.max_arity).contains(&arity)
    }

    /// Human-readable arity for error messages: "0", "1", "1 to 3", ...
    pub fn arity_label(&self) -> String {
        if self.min_arity == self.max_arity {
            self.min_arity.to_string()
        } else {
            format!("{} to {}", self.min_arity, self.max_arity)
        }
    }
}

pub struct Registry {
    specs: HashMap<&'static str, FunctionSpec>,
}

const SPECS: &[FunctionSpec] = &[
    FunctionSpec { name: "reverse", min_arity: 0, max_arity: 0 },
    FunctionSpec { name: "unique", min_arity: 0, max_arity: 0 },
    FunctionSpec { name: "length", min_arity: 0, max_arity: 0 },
    FunctionSpec { name: "sum", min_arity: 0, max_arity: 0 },
    FunctionSpec { name: "max", min_arity: 0, max_arity: 0 },
    FunctionSpec { name: "min", min_arity: 0, max_arity: 0 },
    FunctionSpec { name: "type", min_arity: 0, max_arity: 0 },
    FunctionSpec { name: "sha256", min_arity: 0, max_arity: 0 },
    FunctionSpec { name: "uuid", min_arity: 0, max_arity: 0 },
    FunctionSpec { name: "debug", min_arity: 0, max_arity: 0 },
    FunctionSpec { name: "select", min_arity: 1, max_arity: 1 },
    FunctionSpec { name: "sort_by", min_arity: 1, max_arity: 1 },
    FunctionSpec { name: "join", min_arity: 1, max_arity: 1 },
    FunctionSpec { name: "map", min_arity: 1, max_arity: 1 },
    FunctionSpec { name: "not", min_arity: 1, max_arity: 1 },
    FunctionSpec { name: "match", min_arity: 1, max_arity: 1 },
    FunctionSpec { name: "str", min_arity: 1, max_arity: 1 },
    FunctionSpec { name: "int", min_arity: 1, max_arity: 1 },
    FunctionSpec { name: "float", min_arity: 1, max_arity: 1 },
    FunctionSpec { name: "bool", min_arity: 1, max_arity: 1 },
    FunctionSpec { name: "ts", min_arity: 1, max_arity: 1 },
    FunctionSpec { name: "timestamp", min_arity: 1, max_arity: 3 },
    FunctionSpec { name: "clock", min_arity: 2, max_arity: 3 },
    FunctionSpec { name: "repeated_task", min_arity: 3, max_arity: 4 },
];

static STANDARD: Lazy<Registry> = Lazy::new(|| Registry {
    specs: SPECS.iter().map(|s| (s.name, *s)).collect(),
});

impl Registry {
    /// The full built-in table.
    pub fn standard() -> &'static Registry {
        &STANDARD
    }

    pub fn get(&self, name: &str) -> Option<&FunctionSpec> {
        self.specs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_knows_the_builtins() {
        let registry = Registry::standard();
        assert!(registry.contains("select"));
        assert!(registry.contains("repeated_task"));
        assert!(!registry.contains("DONE"));
    }

    #[test]
    fn arity_ranges() {
        let spec = Registry::standard().get("timestamp").unwrap();
        assert!(spec.accepts(1));
        assert!(spec.accepts(3));
        assert!(!spec.accepts(4));
        assert_eq!(spec.arity_label(), "1 to 3");
        assert_eq!(Registry::standard().get("select").unwrap().arity_label(), "1");
    }
}
