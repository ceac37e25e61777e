//! Authoritative backend persisting the data tree as a JSON document.
//!
//! Reads and writes go to a working copy. `commit` validates the working copy,
//! checks that nobody else committed to the file since it was loaded, then
//! replaces the file atomically.

use crate::dal::{DataAccessLayer, Document, Entry, PathDump, PathStream, ValueStream};
use crate::error::{Error, Result};
use crate::memory_store::MemoryStore;
use crate::schema::{SchemaKind, SchemaNode, SchemaProvider};
use crate::tree::DataTree;
use crate::value::{LeafType, Value};
use async_trait::async_trait;
use diagnostics::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    module: Option<String>,
    committed: DataTree,
    working: DataTree,
    /// File content as last read or written by this store
    baseline: Option<String>,
}

impl State {
    fn working(&mut self) -> Result<&mut DataTree> {
        match self.module {
            Some(_) => Ok(&mut self.working),
            None => Err(Error::NotConnected),
        }
    }
}

pub struct FileStore {
    location: PathBuf,
    schema: Option<Arc<dyn SchemaProvider>>,
    state: Mutex<State>,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(location: P) -> Self {
        Self {
            location: location.into(),
            schema: None,
            state: Mutex::new(State::default()),
        }
    }

    /// Validate against `schema` on `validate` and `commit`.
    #[must_use]
    pub fn with_schema(mut self, schema: Arc<dyn SchemaProvider>) -> Self {
        self.schema = Some(schema);
        self
    }

    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Discard uncommitted changes.
    pub async fn rollback(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        _ = state.working()?;
        state.working = state.committed.clone();
        debug!("FileStore: rolled back uncommitted changes");
        Ok(())
    }

    async fn read_file(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.location).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn parse(module: &str, content: Option<&str>) -> Result<DataTree> {
        let Some(content) = content else {
            return Ok(DataTree::new());
        };
        let document: Document = serde_json::from_str(content)?;
        if !document.module.is_empty() && document.module != module {
            return Err(Error::backend(
                format!("Datastore holds data for module {}", document.module),
                "/",
            ));
        }
        Ok(DataTree::from_document(&document))
    }

    fn write_file(&self, content: &str) -> Result<()> {
        let dir = match self.location.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
        temp.write_all(content.as_bytes())?;
        temp.flush()?;
        _ = temp.persist(&self.location).map_err(|e| e.error)?;
        Ok(())
    }

    fn check_entry(schema: &dyn SchemaProvider, entry: &Entry) -> std::result::Result<(), String> {
        let node = schema
            .resolve_data_path(entry.path())
            .map_err(|e| e.to_string())?;
        let expect = |kind: SchemaKind, node: &SchemaNode| {
            if node.kind == kind {
                Ok(())
            } else {
                Err(format!("Stored as {} but the schema defines a {}", kind, node.kind))
            }
        };
        match entry {
            Entry::Leaf { value, path } => {
                expect(SchemaKind::Leaf, &node)?;
                if let Some(spec) = &node.leaf_type {
                    _ = spec.check(path, value).map_err(|e| e.to_string())?;
                }
            }
            Entry::Container { .. } => expect(SchemaKind::Container, &node)?,
            Entry::ListElement { .. } => expect(SchemaKind::List, &node)?,
            Entry::LeafList { values, path } => {
                expect(SchemaKind::LeafList, &node)?;
                if let Some(spec) = &node.leaf_type {
                    for value in values {
                        _ = spec.check(path, value).map_err(|e| e.to_string())?;
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_tree(&self, tree: &DataTree) -> Result<()> {
        let Some(schema) = &self.schema else {
            return Ok(());
        };
        let problems: Vec<String> = tree
            .entries()
            .iter()
            .filter_map(|entry| {
                Self::check_entry(schema.as_ref(), entry)
                    .err()
                    .map(|msg| format!("{}: {}", entry.path(), msg))
            })
            .collect();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::ValidationFailed(problems.join("\n")))
        }
    }
}

#[async_trait]
impl DataAccessLayer for FileStore {
    fn id(&self) -> &'static str {
        "file"
    }

    async fn connect(&self, module: &str) -> Result<()> {
        let content = self.read_file().await?;
        let tree = Self::parse(module, content.as_deref())?;
        let mut state = self.state.lock().await;
        let location = self.location.display().to_string();
        info!(
            "Opened datastore {location} with {count} nodes",
            location: location.as_str(),
            count: tree.len()
        );
        state.module = Some(module.to_string());
        state.committed = tree.clone();
        state.working = tree;
        state.baseline = content;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        *self.state.lock().await = State::default();
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let module = state.module.clone().ok_or(Error::NotConnected)?;
        if state.working == state.committed {
            debug!("FileStore: nothing to commit");
            return Ok(());
        }
        self.validate_tree(&state.working)?;

        let on_disk = self.read_file().await?;
        if on_disk != state.baseline {
            return Err(Error::CommitFailed(format!(
                "{} was changed by another session",
                self.location.display()
            )));
        }

        let content = serde_json::to_string_pretty(&state.working.to_document(&module))?;
        self.write_file(&content)?;
        state.committed = state.working.clone();
        state.baseline = Some(content);
        let count = state.committed.len();
        info!("Committed {count} nodes", count);
        Ok(())
    }

    async fn validate(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let tree = state.working()?.clone();
        self.validate_tree(&tree)
    }

    async fn get(&self, path: &str) -> Result<Option<Value>> {
        self.state.lock().await.working()?.get(path)
    }

    async fn set(&self, path: &str, value: Option<Value>, _leaf_type: LeafType) -> Result<()> {
        self.state.lock().await.working()?.set(path, value)
    }

    async fn container(&self, path: &str) -> Result<bool> {
        Ok(self.state.lock().await.working()?.exists(path))
    }

    async fn create_container(&self, path: &str) -> Result<()> {
        self.state.lock().await.working()?.create_container(path);
        Ok(())
    }

    async fn create(&self, path: &str, keys: &[String], values: &[Value]) -> Result<()> {
        self.state
            .lock()
            .await
            .working()?
            .create_element(path, keys, values)
    }

    async fn uncreate(&self, path: &str) -> Result<()> {
        self.state.lock().await.working()?.uncreate(path)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.state.lock().await.working()?.delete(path)
    }

    async fn gets_unsorted(&self, list_path: &str, ignore_empty_lists: bool) -> Result<PathStream> {
        let elements = self.state.lock().await.working()?.elements(list_path);
        if elements.is_empty() && !ignore_empty_lists {
            return Err(Error::list_does_not_contain_element(list_path));
        }
        Ok(MemoryStore::path_stream(elements))
    }

    async fn gets_sorted(&self, list_path: &str, ignore_empty_lists: bool) -> Result<PathStream> {
        let mut elements = self.state.lock().await.working()?.elements(list_path);
        if elements.is_empty() && !ignore_empty_lists {
            return Err(Error::list_does_not_contain_element(list_path));
        }
        elements.sort();
        Ok(MemoryStore::path_stream(elements))
    }

    async fn gets_len(&self, list_path: &str) -> Result<usize> {
        Ok(self.state.lock().await.working()?.elements(list_path).len())
    }

    async fn has_item(&self, path: &str) -> Result<bool> {
        Ok(self.state.lock().await.working()?.exists(path))
    }

    async fn add(&self, path: &str, value: Value, _leaf_type: LeafType) -> Result<()> {
        self.state.lock().await.working()?.add(path, value)
    }

    async fn remove(&self, path: &str, value: &Value) -> Result<()> {
        self.state.lock().await.working()?.remove(path, value)
    }

    async fn gets(&self, path: &str) -> Result<ValueStream> {
        let values = self.state.lock().await.working()?.leaf_list(path);
        Ok(MemoryStore::value_stream(values))
    }

    /// Pick up commits made by other sessions when nothing is pending locally.
    async fn refresh(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let module = state.module.clone().ok_or(Error::NotConnected)?;
        if state.working != state.committed {
            return Ok(());
        }
        let content = self.read_file().await?;
        if content == state.baseline {
            return Ok(());
        }
        let tree = Self::parse(&module, content.as_deref())?;
        debug!("FileStore: reloaded datastore after external commit");
        state.committed = tree.clone();
        state.working = tree;
        state.baseline = content;
        Ok(())
    }

    async fn is_dirty(&self) -> Result<bool> {
        let mut state = self.state.lock().await;
        _ = state.working()?;
        Ok(state.working != state.committed)
    }

    /// Compare the file with the content last read or written here.
    async fn has_datastore_changed(&self) -> Result<bool> {
        let baseline = {
            let mut state = self.state.lock().await;
            _ = state.working()?;
            state.baseline.clone()
        };
        Ok(self.read_file().await? != baseline)
    }

    async fn empty(&self) -> Result<()> {
        self.state.lock().await.working()?.clear();
        Ok(())
    }

    async fn dump_paths(&self) -> Result<PathDump> {
        Ok(self.state.lock().await.working()?.dump_paths())
    }

    async fn dumps(&self) -> Result<String> {
        let mut state = self.state.lock().await;
        let module = state.module.clone().unwrap_or_default();
        let document = state.working()?.to_document(&module);
        Ok(serde_json::to_string_pretty(&document)?)
    }

    async fn loads(&self, payload: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let module = state.module.clone().ok_or(Error::NotConnected)?;
        let tree = Self::parse(&module, Some(payload))?;
        *state.working()? = tree;
        Ok(())
    }

    async fn merges(&self, payload: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let module = state.module.clone().ok_or(Error::NotConnected)?;
        let document: Document = serde_json::from_str(payload)?;
        if !document.module.is_empty() && document.module != module {
            return Err(Error::backend(
                format!("Document holds data for module {}", document.module),
                "/",
            ));
        }
        state.working()?.merge(&document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema_tree::SchemaTree;
    use tempfile::TempDir;

    const SCHEMA: &str = r#"
module: store
children:
  - { name: name, kind: leaf, type: string }
  - { name: count, kind: leaf, type: uint8 }
"#;

    fn schema() -> Arc<dyn SchemaProvider> {
        Arc::new(SchemaTree::from_yaml_str(SCHEMA).expect("schema"))
    }

    #[tokio::test]
    async fn test_commit_persists_and_reloads() {
        let dir = TempDir::new().expect("tempdir");
        let file = dir.path().join("data.json");

        let store = FileStore::new(&file).with_schema(schema());
        store.connect("store").await.expect("connect");
        store
            .set("/store:name", Some(Value::from("alpha")), LeafType::String)
            .await
            .expect("set");
        assert!(store.is_dirty().await.expect("dirty"));
        store.commit().await.expect("commit");
        assert!(!store.is_dirty().await.expect("dirty"));

        let reopened = FileStore::new(&file);
        reopened.connect("store").await.expect("connect");
        assert_eq!(
            reopened.get("/store:name").await.expect("get"),
            Some(Value::from("alpha"))
        );
    }

    #[tokio::test]
    async fn test_rollback_discards_changes() {
        let dir = TempDir::new().expect("tempdir");
        let store = FileStore::new(dir.path().join("data.json"));
        store.connect("store").await.expect("connect");
        store
            .set("/store:name", Some(Value::from("x")), LeafType::String)
            .await
            .expect("set");
        store.rollback().await.expect("rollback");
        assert_eq!(store.get("/store:name").await.expect("get"), None);
    }

    #[tokio::test]
    async fn test_validation_rejects_out_of_range() {
        let dir = TempDir::new().expect("tempdir");
        let store = FileStore::new(dir.path().join("data.json")).with_schema(schema());
        store.connect("store").await.expect("connect");
        store
            .set("/store:count", Some(Value::Int(300)), LeafType::Uint8)
            .await
            .expect("set");
        assert!(matches!(
            store.commit().await,
            Err(Error::ValidationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_commit_detected() {
        let dir = TempDir::new().expect("tempdir");
        let file = dir.path().join("data.json");

        let first = FileStore::new(&file);
        let second = FileStore::new(&file);
        first.connect("store").await.expect("connect");
        second.connect("store").await.expect("connect");

        first
            .set("/store:name", Some(Value::from("a")), LeafType::String)
            .await
            .expect("set");
        first.commit().await.expect("first commit");

        second
            .set("/store:name", Some(Value::from("b")), LeafType::String)
            .await
            .expect("set");
        assert!(matches!(
            second.commit().await,
            Err(Error::CommitFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_picks_up_external_commit() {
        let dir = TempDir::new().expect("tempdir");
        let file = dir.path().join("data.json");

        let reader = FileStore::new(&file);
        reader.connect("store").await.expect("connect");

        let writer = FileStore::new(&file);
        writer.connect("store").await.expect("connect");
        writer
            .set("/store:name", Some(Value::from("new")), LeafType::String)
            .await
            .expect("set");
        writer.commit().await.expect("commit");

        assert_eq!(reader.get("/store:name").await.expect("get"), None);
        assert!(reader.has_datastore_changed().await.expect("changed"));
        assert!(!writer.has_datastore_changed().await.expect("changed"));
        reader.refresh().await.expect("refresh");
        assert!(!reader.has_datastore_changed().await.expect("changed"));
        assert_eq!(
            reader.get("/store:name").await.expect("get"),
            Some(Value::from("new"))
        );
    }

    #[tokio::test]
    async fn test_empty_then_commit_clears_the_file() {
        let dir = TempDir::new().expect("tempdir");
        let file = dir.path().join("data.json");
        let store = FileStore::new(&file).with_schema(schema());
        store.connect("store").await.expect("connect");
        store
            .set("/store:name", Some(Value::from("a")), LeafType::String)
            .await
            .expect("set");
        store.commit().await.expect("commit");

        store.empty().await.expect("empty");
        assert!(store.is_dirty().await.expect("dirty"));
        store.commit().await.expect("commit");

        let reopened = FileStore::new(&file);
        reopened.connect("store").await.expect("connect");
        assert!(reopened.dump_paths().await.expect("dump").is_empty());
    }

    #[tokio::test]
    async fn test_merges_keeps_existing_data() {
        let dir = TempDir::new().expect("tempdir");
        let store = FileStore::new(dir.path().join("data.json")).with_schema(schema());
        store.connect("store").await.expect("connect");
        store
            .set("/store:name", Some(Value::from("a")), LeafType::String)
            .await
            .expect("set");

        let payload = r#"{"module": "store", "entries": [
            {"kind": "leaf", "path": "/store:count", "value": 4}
        ]}"#;
        store.merges(payload).await.expect("merges");
        assert_eq!(store.get("/store:name").await.expect("get"), Some(Value::from("a")));
        assert_eq!(store.get("/store:count").await.expect("get"), Some(Value::Int(4)));

        let foreign = r#"{"module": "other", "entries": []}"#;
        assert!(matches!(
            store.merges(foreign).await,
            Err(Error::BackendDatastore(_))
        ));
    }

    #[tokio::test]
    async fn test_module_mismatch() {
        let dir = TempDir::new().expect("tempdir");
        let file = dir.path().join("data.json");
        let store = FileStore::new(&file);
        store.connect("store").await.expect("connect");
        store
            .set("/store:name", Some(Value::from("a")), LeafType::String)
            .await
            .expect("set");
        store.commit().await.expect("commit");

        let other = FileStore::new(&file);
        assert!(matches!(
            other.connect("different").await,
            Err(Error::BackendDatastore(_))
        ));
    }
}
