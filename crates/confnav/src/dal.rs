//! The backend contract every data store implements.

use crate::error::Result;
use crate::value::{LeafType, Value};
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::pin::Pin;

/// Element paths produced by list iteration.
pub type PathStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Entries of a leaf-list.
pub type ValueStream = Pin<Box<dyn Stream<Item = Result<Value>> + Send>>;

/// Every stored path mapped to its value; containers and list elements map to `None`.
pub type PathDump = BTreeMap<String, Option<Value>>;

/// Pure data access: no schema knowledge, no caching.
///
/// All paths are data paths. Implementations own their interior mutability so
/// a single handle can be shared by every node of a session.
#[async_trait]
pub trait DataAccessLayer: Send + Sync {
    /// Short identifier of the implementation, used in diagnostics.
    fn id(&self) -> &'static str;

    async fn connect(&self, module: &str) -> Result<()>;
    async fn disconnect(&self) -> Result<()>;

    /// Make pending changes authoritative.
    async fn commit(&self) -> Result<()>;
    async fn validate(&self) -> Result<()>;

    /// Value of the leaf at `path`, `None` if nothing is stored there.
    async fn get(&self, path: &str) -> Result<Option<Value>>;

    /// Store a leaf value; `None` deletes, tolerating a missing leaf.
    async fn set(&self, path: &str, value: Option<Value>, leaf_type: LeafType) -> Result<()>;

    /// Does the container at `path` exist, explicitly or through descendants.
    async fn container(&self, path: &str) -> Result<bool>;
    async fn create_container(&self, path: &str) -> Result<()>;

    /// Create the list element at `path` if absent, storing its key leaves.
    async fn create(&self, path: &str, keys: &[String], values: &[Value]) -> Result<()>;

    /// Remove a list element and its subtree.
    async fn uncreate(&self, path: &str) -> Result<()>;

    /// Remove any node and its subtree; fails when nothing is stored at `path`.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Element paths of a list in insertion order.
    ///
    /// An empty list is an error unless `ignore_empty_lists` is set.
    async fn gets_unsorted(&self, list_path: &str, ignore_empty_lists: bool) -> Result<PathStream>;

    /// Element paths of a list in lexicographic order.
    async fn gets_sorted(&self, list_path: &str, ignore_empty_lists: bool) -> Result<PathStream>;

    async fn gets_len(&self, list_path: &str) -> Result<usize>;
    async fn has_item(&self, path: &str) -> Result<bool>;

    /// Append to a leaf-list; values already present are left in place.
    async fn add(&self, path: &str, value: Value, leaf_type: LeafType) -> Result<()>;
    async fn remove(&self, path: &str, value: &Value) -> Result<()>;
    async fn gets(&self, path: &str) -> Result<ValueStream>;

    /// Resynchronize with the authoritative state.
    async fn refresh(&self) -> Result<()>;

    /// Has this session changed data since it connected, last committed or
    /// last refreshed.
    async fn is_dirty(&self) -> Result<bool>;

    /// Has another session committed since this one connected, committed or
    /// refreshed.
    async fn has_datastore_changed(&self) -> Result<bool>;

    /// Remove every stored node.
    async fn empty(&self) -> Result<()>;

    async fn dump_paths(&self) -> Result<PathDump>;

    /// Serialize the whole tree as a [`Document`].
    async fn dumps(&self) -> Result<String>;

    /// Replace the whole tree from a serialized [`Document`].
    async fn loads(&self, payload: &str) -> Result<()>;

    /// Apply a serialized [`Document`] on top of the stored tree.
    ///
    /// Leaves take the incoming value, containers and list elements are
    /// created when missing and leaf-list entries are added.
    async fn merges(&self, payload: &str) -> Result<()>;

    async fn dump(&self, file: &std::path::Path) -> Result<()> {
        let payload = self.dumps().await?;
        tokio::fs::write(file, payload).await?;
        Ok(())
    }

    async fn load(&self, file: &std::path::Path) -> Result<()> {
        let payload = tokio::fs::read_to_string(file).await?;
        self.loads(&payload).await
    }

    async fn merge(&self, file: &std::path::Path) -> Result<()> {
        let payload = tokio::fs::read_to_string(file).await?;
        self.merges(&payload).await
    }
}

/// One stored node in serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Entry {
    Leaf { path: String, value: Value },
    Container { path: String },
    ListElement { path: String, list: String },
    LeafList { path: String, values: Vec<Value> },
}

impl Entry {
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Entry::Leaf { path, .. }
            | Entry::Container { path }
            | Entry::ListElement { path, .. }
            | Entry::LeafList { path, .. } => path,
        }
    }
}

/// Serialized data tree: every stored node in creation order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    pub module: String,
    #[serde(default)]
    pub entries: Vec<Entry>,
}
