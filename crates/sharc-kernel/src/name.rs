//! Qualified names
//!
//! Every global entity (datatype, constructor, definition) is addressed by a
//! qualified identifier: a module path plus a local name. Identifiers compare
//! by value and are totally ordered, so they can key sorted maps directly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A dotted module path, e.g. `Prelude` or `Data.Vec`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleName(String);

impl ModuleName {
    pub fn new(path: impl Into<String>) -> Self {
        ModuleName(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A qualified identifier: `(module, local name)`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ident {
    pub module: ModuleName,
    pub name: String,
}

impl Ident {
    pub fn new(module: ModuleName, name: impl Into<String>) -> Self {
        Ident {
            module,
            name: name.into(),
        }
    }

    /// Parse a dotted identifier; everything before the last dot is the
    /// module path. An undotted name goes into an empty module path.
    pub fn parse(s: &str) -> Self {
        match s.rsplit_once('.') {
            Some((module, name)) => Ident::new(ModuleName::new(module), name),
            None => Ident::new(ModuleName::new(""), s),
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.module.as_str().is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}.{}", self.module, self.name)
        }
    }
}

/// Record field names are plain strings; they live in terms as string
/// literals and only become `FieldName`s once a selector is resolved.
pub type FieldName = String;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qualified() {
        let id = Ident::parse("Prelude.Nat");
        assert_eq!(id.module.as_str(), "Prelude");
        assert_eq!(id.name, "Nat");
        assert_eq!(id.to_string(), "Prelude.Nat");
    }

    #[test]
    fn test_parse_nested_module() {
        let id = Ident::parse("Data.Vec.replicate");
        assert_eq!(id.module.as_str(), "Data.Vec");
        assert_eq!(id.name, "replicate");
    }

    #[test]
    fn test_parse_unqualified() {
        let id = Ident::parse("x");
        assert_eq!(id.module.as_str(), "");
        assert_eq!(id.to_string(), "x");
    }

    #[test]
    fn test_ordering_is_by_value() {
        let a = Ident::parse("A.x");
        let b = Ident::parse("B.x");
        assert!(a < b);
        assert_eq!(a, Ident::parse("A.x"));
    }
}
