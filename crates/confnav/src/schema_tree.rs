//! A schema provider loaded from a YAML or JSON module description.
//!
//! ```yaml
//! module: integrationtest
//! children:
//!   - name: simpleleaf
//!     kind: leaf
//!     type: string
//!   - name: twokeylist
//!     kind: list
//!     keys: [primary, secondary]
//!     children:
//!       - { name: primary, kind: leaf, type: boolean }
//!       - { name: secondary, kind: leaf, type: boolean }
//! augments:
//!   - module: vendor
//!     target: /integrationtest:twokeylist
//!     children:
//!       - { name: weight, kind: leaf, type: uint32 }
//! ```
//!
//! Augment entries graft nodes from another module below an existing node;
//! an empty target augments the top level.

use crate::error::{Error, Result};
use crate::path::split_steps;
use crate::schema::{KeyDef, SchemaKind, SchemaNode, SchemaProvider, missing};
use crate::value::{LeafType, TypeSpec, Value};
use diagnostics::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path as FsPath;

/// Serialized form of a module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDefinition {
    pub module: String,
    #[serde(default)]
    pub children: Vec<NodeDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub augments: Vec<AugmentDefinition>,
}

/// Nodes another module adds below `target`, a schema path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AugmentDefinition {
    pub module: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub children: Vec<NodeDefinition>,
}

/// Serialized form of one schema node and its subtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub name: String,
    pub kind: SchemaKind,
    #[serde(default)]
    pub presence: bool,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub leaf_type: Option<TypeDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeDefinition>,
}

/// A type written either as a bare name (`type: int32`) or in full.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeDefinition {
    Name(LeafType),
    Full(TypeSpec),
}

impl From<TypeDefinition> for TypeSpec {
    fn from(def: TypeDefinition) -> Self {
        match def {
            TypeDefinition::Name(base) => TypeSpec::from(base),
            TypeDefinition::Full(spec) => spec,
        }
    }
}

/// Resolved schema, indexed by schema path.
#[derive(Debug, Clone)]
pub struct SchemaTree {
    module: String,
    /// The module itself, then every augmenting module in declaration order
    modules: Vec<String>,
    top_level: Vec<String>,
    nodes: HashMap<String, SchemaNode>,
    /// Schema paths of the children of each node; the empty path is the top level
    child_paths: HashMap<String, Vec<String>>,
}

impl SchemaTree {
    pub fn from_definition(definition: ModuleDefinition) -> Result<Self> {
        let mut tree = Self {
            module: definition.module.clone(),
            modules: vec![definition.module.clone()],
            top_level: Vec::new(),
            nodes: HashMap::new(),
            child_paths: HashMap::new(),
        };
        for child in &definition.children {
            tree.index(&definition.module, child, "", &[])?;
        }
        for augment in &definition.augments {
            tree.augment(augment)?;
        }
        debug!(
            "Loaded schema for module {module} with {count} nodes",
            module: tree.module.as_str(),
            count: tree.nodes.len()
        );
        Ok(tree)
    }

    fn augment(&mut self, augment: &AugmentDefinition) -> Result<()> {
        let target = match augment.target.as_str() {
            "/" => "",
            other => other,
        };
        let parent_keys = if target.is_empty() {
            Vec::new()
        } else {
            self.nodes
                .get(target)
                .ok_or_else(|| missing(target))?
                .key_names()
        };
        if !self.modules.contains(&augment.module) {
            self.modules.push(augment.module.clone());
        }
        for child in &augment.children {
            self.index(&augment.module, child, target, &parent_keys)?;
        }
        Ok(())
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let definition: ModuleDefinition = serde_yaml_ng::from_str(text)?;
        Self::from_definition(definition)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let definition: ModuleDefinition = serde_json::from_str(text)?;
        Self::from_definition(definition)
    }

    /// Load a module description, choosing JSON for `.json` files and YAML otherwise.
    pub fn from_file<P: AsRef<FsPath>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
    }

    /// Number of schema nodes below the module root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn index(
        &mut self,
        module: &str,
        def: &NodeDefinition,
        parent: &str,
        parent_keys: &[String],
    ) -> Result<()> {
        let path = format!("{}/{}:{}", parent, module, def.name);

        let mut keys = Vec::with_capacity(def.keys.len());
        for key in &def.keys {
            let key_def = def
                .children
                .iter()
                .find(|c| c.name == *key && c.kind == SchemaKind::Leaf)
                .ok_or_else(|| {
                    Error::no_such_schema_node(format!("{}/{}:{}", path, module, key))
                })?;
            keys.push(KeyDef {
                name: key.clone(),
                key_type: key_def
                    .leaf_type
                    .clone()
                    .map(TypeSpec::from)
                    .unwrap_or_else(|| TypeSpec::from(LeafType::String)),
            });
        }

        let leaf_type = match def.kind {
            SchemaKind::Leaf | SchemaKind::LeafList => Some(
                def.leaf_type
                    .clone()
                    .map(TypeSpec::from)
                    .unwrap_or_else(|| TypeSpec::from(LeafType::String)),
            ),
            _ => None,
        };

        let node = SchemaNode {
            name: def.name.clone(),
            module: module.to_string(),
            path: path.clone(),
            kind: def.kind.clone(),
            presence: def.presence,
            keys,
            leaf_type,
            default: def.default.clone(),
            description: def.description.clone(),
            children: def.children.iter().map(|c| c.name.clone()).collect(),
            is_key: def.kind == SchemaKind::Leaf && parent_keys.contains(&def.name),
            fallback: false,
        };
        if self.nodes.contains_key(&path) {
            return Ok(());
        }
        self.nodes.insert(path.clone(), node);
        self.child_paths
            .entry(parent.to_string())
            .or_default()
            .push(path.clone());
        if parent.is_empty() {
            self.top_level.push(def.name.clone());
        } else if let Some(parent_node) = self.nodes.get_mut(parent) {
            if !parent_node.children.contains(&def.name) {
                parent_node.children.push(def.name.clone());
            }
        }

        for child in &def.children {
            self.index(module, child, &path, &def.keys)?;
        }
        Ok(())
    }

    /// Find `module:name` below `parent`, looking through choice and case nodes.
    fn find_data_child(&self, parent: &str, module: &str, name: &str) -> Option<&SchemaNode> {
        for child_path in self.child_paths.get(parent)? {
            let Some(node) = self.nodes.get(child_path) else {
                continue;
            };
            if node.kind.is_schema_only() {
                if let Some(found) = self.find_data_child(child_path, module, name) {
                    return Some(found);
                }
            } else if node.name == name && node.module == module {
                return Some(node);
            }
        }
        None
    }
}

impl SchemaProvider for SchemaTree {
    fn module(&self) -> &str {
        &self.module
    }

    fn modules(&self) -> Vec<String> {
        self.modules.clone()
    }

    fn resolve(&self, schema_path: &str) -> Result<SchemaNode> {
        self.nodes
            .get(schema_path)
            .cloned()
            .ok_or_else(|| missing(schema_path))
    }

    fn children_of(&self, schema_path: &str) -> Result<Vec<String>> {
        if schema_path.is_empty() {
            return Ok(self.top_level.clone());
        }
        self.nodes
            .get(schema_path)
            .map(|n| n.children.clone())
            .ok_or_else(|| missing(schema_path))
    }

    fn resolve_data_path(&self, data_path: &str) -> Result<SchemaNode> {
        let mut current = String::new();
        for step in split_steps(data_path)? {
            let node = self
                .find_data_child(&current, &step.module, &step.name)
                .ok_or_else(|| missing(data_path))?;
            current = node.path.clone();
        }
        self.resolve(&current)
    }
}
