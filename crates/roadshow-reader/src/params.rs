//! `$name` parameter substitution.
//!
//! The scenario document may declare named parameters and reference them
//! from any attribute by writing the parameter name (including the `$`
//! prefix) as the attribute value. Substitution is a single-level
//! name-to-string lookup at attribute-read time: no recursive expansion,
//! no scoping beyond last-declaration-wins.

use tracing::{debug, warn};

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Parameter name as declared, including any `$` prefix.
    pub name: String,
    /// Declared type token; informational only, values stay strings.
    pub kind: String,
    /// The substituted string value.
    pub value: String,
}

/// Ordered parameter declarations with back-to-front lookup.
///
/// Declarations append; lookups scan from the most recent declaration, so
/// re-declaring a name shadows the earlier value. The reader injects
/// `$owner` while parsing each story.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterTable {
    entries: Vec<Parameter>,
}

impl ParameterTable {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Declare a parameter. A repeated name shadows the earlier value.
    pub fn add(&mut self, name: &str, kind: &str, value: &str) {
        debug!(name, value, "parameter declared");
        self.entries.push(Parameter {
            name: name.to_owned(),
            kind: kind.to_owned(),
            value: value.to_owned(),
        });
    }

    /// Look up a parameter by its exact declared name.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    /// Resolve a raw attribute value.
    ///
    /// Values starting with `$` are replaced by the named parameter's
    /// value; an unresolved reference yields an empty string and a
    /// diagnostic. Anything else passes through unchanged.
    pub fn resolve(&self, raw: &str) -> String {
        if !raw.starts_with('$') {
            return raw.to_owned();
        }
        self.lookup(raw).map_or_else(
            || {
                warn!(parameter = raw, "unresolved parameter reference");
                String::new()
            },
            ToOwned::to_owned,
        )
    }

    /// Number of declarations, counting shadowed ones.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no declarations.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
