//! Schema description: what kind of node lives at a schema path.

use crate::error::{Error, Result};
use crate::value::{TypeSpec, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a schema node.
///
/// Anything the navigation layer has no rule for is kept as `Other` and rejected
/// when a node of that kind is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SchemaKind {
    Container,
    List,
    Leaf,
    LeafList,
    Choice,
    Case,
    Other(String),
}

impl SchemaKind {
    /// Map a numeric node-type code onto a kind.
    #[must_use]
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => SchemaKind::Container,
            2 => SchemaKind::Choice,
            4 => SchemaKind::Leaf,
            8 => SchemaKind::LeafList,
            16 => SchemaKind::List,
            64 => SchemaKind::Case,
            other => SchemaKind::Other(format!("code-{}", other)),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            SchemaKind::Container => "container",
            SchemaKind::List => "list",
            SchemaKind::Leaf => "leaf",
            SchemaKind::LeafList => "leaf-list",
            SchemaKind::Choice => "choice",
            SchemaKind::Case => "case",
            SchemaKind::Other(name) => name,
        }
    }

    /// Choice and case nodes shape the schema but never appear in data paths.
    #[must_use]
    pub fn is_schema_only(&self) -> bool {
        matches!(self, SchemaKind::Choice | SchemaKind::Case)
    }
}

impl From<String> for SchemaKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "container" => SchemaKind::Container,
            "list" => SchemaKind::List,
            "leaf" => SchemaKind::Leaf,
            "leaf-list" | "leaflist" | "leaf_list" => SchemaKind::LeafList,
            "choice" => SchemaKind::Choice,
            "case" => SchemaKind::Case,
            _ => SchemaKind::Other(name),
        }
    }
}

impl From<SchemaKind> for String {
    fn from(kind: SchemaKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One key of a list, in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDef {
    pub name: String,
    pub key_type: TypeSpec,
}

/// Resolved description of one schema path. Immutable once handed out.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    /// Name as spelled in the schema (may contain hyphens)
    pub name: String,
    pub module: String,
    /// Schema path that matched, with the module prefix on every step
    pub path: String,
    pub kind: SchemaKind,
    pub presence: bool,
    pub keys: Vec<KeyDef>,
    pub leaf_type: Option<TypeSpec>,
    pub default: Option<Value>,
    pub description: Option<String>,
    pub children: Vec<String>,
    /// True when this leaf is one of its parent list's keys
    pub is_key: bool,
    /// True when resolution needed the underscore-to-hyphen retry
    pub fallback: bool,
}

impl SchemaNode {
    /// The node standing for the module itself, at the empty schema path.
    #[must_use]
    pub fn root<S: Into<String>>(module: S, children: Vec<String>) -> Self {
        let module = module.into();
        Self {
            name: module.clone(),
            module,
            path: String::new(),
            kind: SchemaKind::Container,
            presence: false,
            keys: Vec::new(),
            leaf_type: None,
            default: None,
            description: None,
            children,
            is_key: false,
            fallback: false,
        }
    }

    #[must_use]
    pub fn key_names(&self) -> Vec<String> {
        self.keys.iter().map(|k| k.name.clone()).collect()
    }
}

/// The schema description service consulted by the navigation layer.
pub trait SchemaProvider: Send + Sync {
    /// Name of the module this provider describes.
    fn module(&self) -> &str;

    /// Every module contributing nodes, starting with [`SchemaProvider::module`].
    fn modules(&self) -> Vec<String> {
        vec![self.module().to_string()]
    }

    /// Look up the node at an exact schema path (`/mod:a/mod:b`).
    fn resolve(&self, schema_path: &str) -> Result<SchemaNode>;

    /// Names of the children at a schema path; the empty path lists top-level nodes.
    fn children_of(&self, schema_path: &str) -> Result<Vec<String>>;

    /// Look up the node a data path addresses.
    ///
    /// The default spelling simply erases predicates and prefixes every step
    /// with the module, which is only correct when no choice or case sits on
    /// the way.
    fn resolve_data_path(&self, data_path: &str) -> Result<SchemaNode> {
        let schema_path = crate::path::data_to_schema_path(self.module(), data_path)?;
        self.resolve(&schema_path)
    }
}

pub(crate) fn missing(path: &str) -> Error {
    Error::no_such_schema_node(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes() {
        assert_eq!(SchemaKind::from_code(1), SchemaKind::Container);
        assert_eq!(SchemaKind::from_code(16), SchemaKind::List);
        assert_eq!(SchemaKind::from_code(64), SchemaKind::Case);
        assert!(matches!(SchemaKind::from_code(32), SchemaKind::Other(_)));
    }

    #[test]
    fn test_kind_names_round_trip_through_serde() {
        let kinds: Vec<SchemaKind> =
            serde_json::from_str(r#"["container", "leaf-list", "anydata"]"#).expect("parse");
        assert_eq!(kinds[0], SchemaKind::Container);
        assert_eq!(kinds[1], SchemaKind::LeafList);
        assert_eq!(kinds[2], SchemaKind::Other("anydata".to_string()));
    }
}
