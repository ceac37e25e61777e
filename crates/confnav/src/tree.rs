//! In-memory data tree shared by the bundled backends.

use crate::dal::{Document, Entry, PathDump};
use crate::error::{Error, Result};
use crate::keys;
use crate::value::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
enum Stored {
    Leaf(Value),
    Container,
    Element { list: String },
    LeafList(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    seq: u64,
    stored: Stored,
}

/// Flat map of data path to stored node.
///
/// Insertion order is tracked with a sequence number so list iteration and
/// serialization follow creation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTree {
    nodes: HashMap<String, Slot>,
    next_seq: u64,
}

/// Is `candidate` at or below `path`.
fn within(path: &str, candidate: &str) -> bool {
    match candidate.strip_prefix(path) {
        Some("") => true,
        Some(rest) => rest.starts_with('/') || rest.starts_with('['),
        None => false,
    }
}

impl DataTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    fn insert(&mut self, path: &str, stored: Stored) {
        if let Some(slot) = self.nodes.get_mut(path) {
            slot.stored = stored;
            return;
        }
        self.next_seq += 1;
        self.nodes.insert(
            path.to_string(),
            Slot {
                seq: self.next_seq,
                stored,
            },
        );
    }

    fn remove_subtree(&mut self, path: &str) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|candidate, _| !within(path, candidate));
        before - self.nodes.len()
    }

    pub fn get(&self, path: &str) -> Result<Option<Value>> {
        match self.nodes.get(path).map(|s| &s.stored) {
            None => Ok(None),
            Some(Stored::Leaf(value)) => Ok(Some(value.clone())),
            Some(Stored::Container) => Err(Error::node_has_no_value("container", path)),
            Some(Stored::Element { .. }) => Err(Error::node_has_no_value("list element", path)),
            Some(Stored::LeafList(_)) => Err(Error::node_has_no_value("leaf-list", path)),
        }
    }

    pub fn set(&mut self, path: &str, value: Option<Value>) -> Result<()> {
        match value {
            Some(value) => {
                if let Some(Stored::Element { .. } | Stored::Container | Stored::LeafList(_)) =
                    self.nodes.get(path).map(|s| &s.stored)
                {
                    return Err(Error::backend("Cannot set a value on a non-leaf node", path));
                }
                self.insert(path, Stored::Leaf(value));
            }
            None => {
                _ = self.remove_subtree(path);
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn exists(&self, path: &str) -> bool {
        self.nodes.keys().any(|candidate| within(path, candidate))
    }

    pub fn create_container(&mut self, path: &str) {
        if !self.nodes.contains_key(path) {
            self.insert(path, Stored::Container);
        }
    }

    pub fn create_element(&mut self, path: &str, keys: &[String], values: &[Value]) -> Result<()> {
        if self.nodes.contains_key(path) {
            return Ok(());
        }
        let (list, _) = keys::decode_last_predicates(path)?;
        self.insert(path, Stored::Element { list });
        for (key, value) in keys.iter().zip(values) {
            let key_path = format!("{}/{}", path, key);
            if !self.nodes.contains_key(&key_path) {
                self.insert(&key_path, Stored::Leaf(value.clone()));
            }
        }
        Ok(())
    }

    pub fn uncreate(&mut self, path: &str) -> Result<()> {
        match self.nodes.get(path).map(|s| &s.stored) {
            Some(Stored::Element { .. }) => {
                _ = self.remove_subtree(path);
                Ok(())
            }
            _ => Err(Error::backend("List element does not exist", path)),
        }
    }

    pub fn delete(&mut self, path: &str) -> Result<()> {
        if self.remove_subtree(path) == 0 {
            return Err(Error::backend("Node does not exist", path));
        }
        Ok(())
    }

    /// Element paths of `list_path` in creation order.
    #[must_use]
    pub fn elements(&self, list_path: &str) -> Vec<String> {
        let mut found: Vec<(u64, &String)> = self
            .nodes
            .iter()
            .filter_map(|(path, slot)| match &slot.stored {
                Stored::Element { list } if list == list_path => Some((slot.seq, path)),
                _ => None,
            })
            .collect();
        found.sort_by_key(|(seq, _)| *seq);
        found.into_iter().map(|(_, path)| path.clone()).collect()
    }

    pub fn add(&mut self, path: &str, value: Value) -> Result<()> {
        match self.nodes.get_mut(path).map(|s| &mut s.stored) {
            Some(Stored::LeafList(values)) => {
                if !values.contains(&value) {
                    values.push(value);
                }
                Ok(())
            }
            Some(_) => Err(Error::backend("Node is not a leaf-list", path)),
            None => {
                self.insert(path, Stored::LeafList(vec![value]));
                Ok(())
            }
        }
    }

    pub fn remove(&mut self, path: &str, value: &Value) -> Result<()> {
        let emptied = match self.nodes.get_mut(path).map(|s| &mut s.stored) {
            Some(Stored::LeafList(values)) => {
                let before = values.len();
                values.retain(|v| v != value);
                if values.len() == before {
                    return Err(Error::backend(
                        format!("Leaf-list does not contain {}", value),
                        path,
                    ));
                }
                values.is_empty()
            }
            _ => {
                return Err(Error::backend(
                    format!("Leaf-list does not contain {}", value),
                    path,
                ));
            }
        };
        if emptied {
            self.nodes.remove(path);
        }
        Ok(())
    }

    #[must_use]
    pub fn leaf_list(&self, path: &str) -> Vec<Value> {
        match self.nodes.get(path).map(|s| &s.stored) {
            Some(Stored::LeafList(values)) => values.clone(),
            _ => Vec::new(),
        }
    }

    fn ordered(&self) -> Vec<(&String, &Slot)> {
        let mut all: Vec<(&String, &Slot)> = self.nodes.iter().collect();
        all.sort_by_key(|(_, slot)| slot.seq);
        all
    }

    /// Every stored path; leaf-list entries appear as `path[.='value']`.
    #[must_use]
    pub fn dump_paths(&self) -> PathDump {
        let mut dump = PathDump::new();
        for (path, slot) in self.ordered() {
            match &slot.stored {
                Stored::Leaf(value) => {
                    dump.insert(path.clone(), Some(value.clone()));
                }
                Stored::Container | Stored::Element { .. } => {
                    dump.insert(path.clone(), None);
                }
                Stored::LeafList(values) => {
                    for value in values {
                        let item = format!(
                            "{}{}",
                            path,
                            keys::format_predicates(&[(".".to_string(), value.to_literal())])
                        );
                        dump.insert(item, Some(value.clone()));
                    }
                }
            }
        }
        dump
    }

    #[must_use]
    pub fn to_document(&self, module: &str) -> Document {
        let entries = self
            .ordered()
            .into_iter()
            .map(|(path, slot)| match &slot.stored {
                Stored::Leaf(value) => Entry::Leaf {
                    path: path.clone(),
                    value: value.clone(),
                },
                Stored::Container => Entry::Container { path: path.clone() },
                Stored::Element { list } => Entry::ListElement {
                    path: path.clone(),
                    list: list.clone(),
                },
                Stored::LeafList(values) => Entry::LeafList {
                    path: path.clone(),
                    values: values.clone(),
                },
            })
            .collect();
        Document {
            module: module.to_string(),
            entries,
        }
    }

    #[must_use]
    pub fn from_document(document: &Document) -> Self {
        let mut tree = Self::new();
        for entry in &document.entries {
            let stored = match entry {
                Entry::Leaf { value, .. } => Stored::Leaf(value.clone()),
                Entry::Container { .. } => Stored::Container,
                Entry::ListElement { list, .. } => Stored::Element { list: list.clone() },
                Entry::LeafList { values, .. } => Stored::LeafList(values.clone()),
            };
            tree.insert(entry.path(), stored);
        }
        tree
    }

    /// Overlay `document` on this tree.
    ///
    /// Fails without touching the tree when an entry would change the kind
    /// of a stored node.
    pub fn merge(&mut self, document: &Document) -> Result<()> {
        let mut merged = self.clone();
        for entry in &document.entries {
            let path = entry.path();
            let existing = merged.nodes.get(path).map(|s| s.stored.clone());
            match (entry, existing) {
                (Entry::Leaf { value, .. }, None | Some(Stored::Leaf(_))) => {
                    merged.insert(path, Stored::Leaf(value.clone()));
                }
                (Entry::Container { .. }, None) => merged.insert(path, Stored::Container),
                (Entry::Container { .. }, Some(Stored::Container)) => {}
                (Entry::ListElement { list, .. }, None) => {
                    merged.insert(path, Stored::Element { list: list.clone() });
                }
                (Entry::ListElement { .. }, Some(Stored::Element { .. })) => {}
                (Entry::LeafList { values, .. }, None | Some(Stored::LeafList(_))) => {
                    for value in values {
                        merged.add(path, value.clone())?;
                    }
                }
                (_, Some(_)) => {
                    return Err(Error::backend("Cannot merge over a node of another kind", path));
                }
            }
        }
        *self = merged;
        Ok(())
    }

    /// Stored entries, for validation against a schema.
    #[must_use]
    pub fn entries(&self) -> Vec<Entry> {
        self.to_document("").entries
    }
}
