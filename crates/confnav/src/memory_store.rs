//! Non-persistent backend for tests and offline use.

use crate::dal::{DataAccessLayer, Document, PathDump, PathStream, ValueStream};
use crate::error::{Error, Result};
use crate::tree::DataTree;
use crate::value::{LeafType, Value};
use async_trait::async_trait;
use diagnostics::*;
use futures::stream;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    module: Option<String>,
    tree: DataTree,
    dirty: bool,
}

impl State {
    fn connected(&mut self) -> Result<&mut DataTree> {
        match self.module {
            Some(_) => Ok(&mut self.tree),
            None => Err(Error::NotConnected),
        }
    }

    /// Like `connected`, marking the session dirty.
    fn changing(&mut self) -> Result<&mut DataTree> {
        if self.module.is_none() {
            return Err(Error::NotConnected);
        }
        self.dirty = true;
        Ok(&mut self.tree)
    }
}

/// In-memory backend honouring the full [`DataAccessLayer`] contract.
///
/// Clones share the same tree. Commit and validate always succeed; commit
/// only clears the dirty flag. Nothing else writes to the tree, so the
/// datastore never changes underneath a session.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore(Arc<Mutex<State>>);

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn path_stream(paths: Vec<String>) -> PathStream {
        Box::pin(stream::iter(paths.into_iter().map(Ok)))
    }

    pub(crate) fn value_stream(values: Vec<Value>) -> ValueStream {
        Box::pin(stream::iter(values.into_iter().map(Ok)))
    }

    async fn list_elements(
        &self,
        list_path: &str,
        ignore_empty_lists: bool,
        sorted: bool,
    ) -> Result<PathStream> {
        let mut state = self.0.lock().await;
        let mut elements = state.connected()?.elements(list_path);
        if elements.is_empty() && !ignore_empty_lists {
            return Err(Error::list_does_not_contain_element(list_path));
        }
        if sorted {
            elements.sort();
        }
        Ok(Self::path_stream(elements))
    }
}

#[async_trait]
impl DataAccessLayer for MemoryStore {
    fn id(&self) -> &'static str {
        "memory"
    }

    async fn connect(&self, module: &str) -> Result<()> {
        let mut state = self.0.lock().await;
        debug!("MemoryStore: connected to module {module}", module);
        state.module = Some(module.to_string());
        state.dirty = false;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.0.lock().await.module = None;
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        let mut state = self.0.lock().await;
        let count = state.connected()?.len();
        state.dirty = false;
        debug!("MemoryStore: commit with {count} nodes", count);
        Ok(())
    }

    async fn validate(&self) -> Result<()> {
        let mut state = self.0.lock().await;
        _ = state.connected()?;
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Value>> {
        let mut state = self.0.lock().await;
        state.connected()?.get(path)
    }

    async fn set(&self, path: &str, value: Option<Value>, _leaf_type: LeafType) -> Result<()> {
        let mut state = self.0.lock().await;
        state.changing()?.set(path, value)
    }

    async fn container(&self, path: &str) -> Result<bool> {
        let mut state = self.0.lock().await;
        Ok(state.connected()?.exists(path))
    }

    async fn create_container(&self, path: &str) -> Result<()> {
        let mut state = self.0.lock().await;
        state.changing()?.create_container(path);
        Ok(())
    }

    async fn create(&self, path: &str, keys: &[String], values: &[Value]) -> Result<()> {
        let mut state = self.0.lock().await;
        state.changing()?.create_element(path, keys, values)
    }

    async fn uncreate(&self, path: &str) -> Result<()> {
        let mut state = self.0.lock().await;
        state.changing()?.uncreate(path)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let mut state = self.0.lock().await;
        state.changing()?.delete(path)
    }

    async fn gets_unsorted(&self, list_path: &str, ignore_empty_lists: bool) -> Result<PathStream> {
        self.list_elements(list_path, ignore_empty_lists, false).await
    }

    async fn gets_sorted(&self, list_path: &str, ignore_empty_lists: bool) -> Result<PathStream> {
        self.list_elements(list_path, ignore_empty_lists, true).await
    }

    async fn gets_len(&self, list_path: &str) -> Result<usize> {
        let mut state = self.0.lock().await;
        Ok(state.connected()?.elements(list_path).len())
    }

    async fn has_item(&self, path: &str) -> Result<bool> {
        let mut state = self.0.lock().await;
        Ok(state.connected()?.exists(path))
    }

    async fn add(&self, path: &str, value: Value, _leaf_type: LeafType) -> Result<()> {
        let mut state = self.0.lock().await;
        state.changing()?.add(path, value)
    }

    async fn remove(&self, path: &str, value: &Value) -> Result<()> {
        let mut state = self.0.lock().await;
        state.changing()?.remove(path, value)
    }

    async fn gets(&self, path: &str) -> Result<ValueStream> {
        let mut state = self.0.lock().await;
        Ok(Self::value_stream(state.connected()?.leaf_list(path)))
    }

    async fn refresh(&self) -> Result<()> {
        Ok(())
    }

    async fn is_dirty(&self) -> Result<bool> {
        let mut state = self.0.lock().await;
        _ = state.connected()?;
        Ok(state.dirty)
    }

    async fn has_datastore_changed(&self) -> Result<bool> {
        let mut state = self.0.lock().await;
        _ = state.connected()?;
        Ok(false)
    }

    async fn empty(&self) -> Result<()> {
        let mut state = self.0.lock().await;
        state.changing()?.clear();
        Ok(())
    }

    async fn dump_paths(&self) -> Result<PathDump> {
        let mut state = self.0.lock().await;
        Ok(state.connected()?.dump_paths())
    }

    async fn dumps(&self) -> Result<String> {
        let mut state = self.0.lock().await;
        let module = state.module.clone().unwrap_or_default();
        let document = state.connected()?.to_document(&module);
        Ok(serde_json::to_string_pretty(&document)?)
    }

    async fn loads(&self, payload: &str) -> Result<()> {
        let document: Document = serde_json::from_str(payload)?;
        let mut state = self.0.lock().await;
        *state.changing()? = DataTree::from_document(&document);
        Ok(())
    }

    async fn merges(&self, payload: &str) -> Result<()> {
        let document: Document = serde_json::from_str(payload)?;
        let mut state = self.0.lock().await;
        state.changing()?.merge(&document)
    }
}
