//! Target keys naming dispatchable methods.

use std::fmt;

/// Stable identifier for a dispatchable method, formatted `"<Type>.<method>"`.
///
/// Keys are declared explicitly when a method is wrapped, never derived from
/// runtime type names, so they stay stable across renames. A key must be
/// unique per method across the process; executors use it to look up
/// transport configuration, client handles and queue bindings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetKey(String);

impl TargetKey {
    /// Build a key from a declaring type name and a method name.
    pub fn new(type_name: &str, method_name: &str) -> Self {
        Self(format!("{}.{}", type_name, method_name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for TargetKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}
