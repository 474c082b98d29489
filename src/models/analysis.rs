use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Dotted module references found in a script, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportTable {
    names: Vec<String>,
}

/// A call argument: either a literal constant or something that can only be
/// known by running the script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgValue {
    Literal(Value),
    Opaque,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSite {
    pub name: String,
    pub positional_args: Vec<ArgValue>,
    pub keyword_args: Vec<(String, ArgValue)>,
    pub line: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptAnalysis {
    pub imports: ImportTable,
    pub calls: Vec<CallSite>,
}

impl ImportTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: String) {
        if !self.names.contains(&name) {
            self.names.push(name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// True if `module` itself or any of its submodules is imported.
    pub fn references(&self, module: &str) -> bool {
        self.names.iter().any(|n| {
            n == module
                || n
                    .strip_prefix(module)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl ArgValue {
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            ArgValue::Literal(value) => Some(value),
            ArgValue::Opaque => None,
        }
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self, ArgValue::Opaque)
    }
}

impl CallSite {
    pub fn new(name: String, line: usize) -> Self {
        Self {
            name,
            positional_args: Vec::new(),
            keyword_args: Vec::new(),
            line,
        }
    }

    pub fn keyword(&self, name: &str) -> Option<&ArgValue> {
        self.keyword_args
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

impl ScriptAnalysis {
    pub fn calls_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a CallSite> {
        self.calls.iter().filter(move |call| call.name == name)
    }
}
