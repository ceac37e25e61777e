//! Scenario tests running the navigation layer against the bundled backends.

mod caching;

use crate::dal::{DataAccessLayer, PathDump, PathStream, ValueStream};
use crate::error::Result;
use crate::memory_store::MemoryStore;
use crate::schema::{SchemaNode, SchemaProvider};
use crate::schema_tree::SchemaTree;
use crate::session::{Session, SessionConfig};
use crate::value::{LeafType, Value};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) const MODULE: &str = "integrationtest";

pub(crate) const SCHEMA: &str = r#"
module: integrationtest
children:
  - { name: simpleleaf, kind: leaf, type: string, description: "A plain string leaf" }
  - { name: default, kind: leaf, type: string, default: statusquo }
  - { name: hyphen-leaf, kind: leaf, type: string }
  - { name: empty, kind: leaf, type: empty }
  - name: simpleenum
    kind: leaf
    type: { base: enumeration, enums: [A, B, C] }
  - name: numbers
    kind: leaf
    type:
      base: union
      members:
        - { base: uint8 }
        - { base: enumeration, enums: [none] }
  - name: simplecontainer
    kind: container
    presence: true
    children:
      - { name: leafinside, kind: leaf, type: string }
  - name: bronze
    kind: container
    children:
      - name: silver
        kind: container
        children:
          - { name: gold, kind: leaf, type: string }
  - name: morecomplex
    kind: container
    children:
      - { name: leaf2, kind: leaf, type: boolean }
      - name: inner
        kind: container
        presence: true
        children:
          - { name: leaf666, kind: leaf, type: string }
      - name: leaflists
        kind: container
        children:
          - { name: simple, kind: leaf-list, type: string }
          - { name: numbers, kind: leaf-list, type: uint16 }
      - name: beer-type
        kind: choice
        children:
          - name: craft
            kind: case
            children:
              - { name: brewery, kind: leaf, type: string }
          - name: mass
            kind: case
            children:
              - { name: brand, kind: leaf, type: string }
  - name: simplelist
    kind: list
    keys: [simplekey]
    children:
      - { name: simplekey, kind: leaf, type: string }
      - { name: nonleafkey, kind: leaf, type: uint32 }
  - name: twokeylist
    kind: list
    keys: [primary, secondary]
    children:
      - { name: primary, kind: leaf, type: boolean }
      - { name: secondary, kind: leaf, type: boolean }
      - { name: tertiary, kind: leaf, type: boolean }
  - name: outsidelist
    kind: list
    keys: [leafo]
    children:
      - { name: leafo, kind: leaf, type: string }
      - name: insidelist
        kind: list
        keys: [leafi]
        children:
          - { name: leafi, kind: leaf, type: string }
  - { name: anydata-node, kind: anydata }
"#;

pub(crate) fn schema() -> Arc<SchemaTree> {
    Arc::new(SchemaTree::from_yaml_str(SCHEMA).unwrap())
}

pub(crate) async fn memory_session(config: SessionConfig) -> Session {
    Session::connect(schema(), MemoryStore::new(), config)
        .await
        .unwrap()
}

/// Schema provider that counts lookups reaching it.
pub(crate) struct CountingProvider {
    inner: SchemaTree,
    resolves: AtomicUsize,
}

impl CountingProvider {
    pub(crate) fn new() -> Self {
        Self {
            inner: SchemaTree::from_yaml_str(SCHEMA).unwrap(),
            resolves: AtomicUsize::new(0),
        }
    }

    pub(crate) fn resolves(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }
}

impl SchemaProvider for CountingProvider {
    fn module(&self) -> &str {
        self.inner.module()
    }

    fn modules(&self) -> Vec<String> {
        self.inner.modules()
    }

    fn resolve(&self, schema_path: &str) -> Result<SchemaNode> {
        _ = self.resolves.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve(schema_path)
    }

    fn children_of(&self, schema_path: &str) -> Result<Vec<String>> {
        self.inner.children_of(schema_path)
    }
}

/// Backend that counts every call before delegating to a [`MemoryStore`].
///
/// Clones share the counters, so a test can keep one clone while the
/// session owns another.
#[derive(Clone, Default)]
pub(crate) struct CountingStore {
    inner: MemoryStore,
    calls: Arc<Mutex<HashMap<&'static str, usize>>>,
}

impl CountingStore {
    pub(crate) fn calls(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    fn bump(&self, operation: &'static str) {
        *self.calls.lock().unwrap().entry(operation).or_insert(0) += 1;
    }
}

#[async_trait]
impl DataAccessLayer for CountingStore {
    fn id(&self) -> &'static str {
        "counting"
    }

    async fn connect(&self, module: &str) -> Result<()> {
        self.bump("connect");
        self.inner.connect(module).await
    }

    async fn disconnect(&self) -> Result<()> {
        self.bump("disconnect");
        self.inner.disconnect().await
    }

    async fn commit(&self) -> Result<()> {
        self.bump("commit");
        self.inner.commit().await
    }

    async fn validate(&self) -> Result<()> {
        self.bump("validate");
        self.inner.validate().await
    }

    async fn get(&self, path: &str) -> Result<Option<Value>> {
        self.bump("get");
        self.inner.get(path).await
    }

    async fn set(&self, path: &str, value: Option<Value>, leaf_type: LeafType) -> Result<()> {
        self.bump("set");
        self.inner.set(path, value, leaf_type).await
    }

    async fn container(&self, path: &str) -> Result<bool> {
        self.bump("container");
        self.inner.container(path).await
    }

    async fn create_container(&self, path: &str) -> Result<()> {
        self.bump("create_container");
        self.inner.create_container(path).await
    }

    async fn create(&self, path: &str, keys: &[String], values: &[Value]) -> Result<()> {
        self.bump("create");
        self.inner.create(path, keys, values).await
    }

    async fn uncreate(&self, path: &str) -> Result<()> {
        self.bump("uncreate");
        self.inner.uncreate(path).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.bump("delete");
        self.inner.delete(path).await
    }

    async fn gets_unsorted(&self, list_path: &str, ignore_empty_lists: bool) -> Result<PathStream> {
        self.bump("gets_unsorted");
        self.inner.gets_unsorted(list_path, ignore_empty_lists).await
    }

    async fn gets_sorted(&self, list_path: &str, ignore_empty_lists: bool) -> Result<PathStream> {
        self.bump("gets_sorted");
        self.inner.gets_sorted(list_path, ignore_empty_lists).await
    }

    async fn gets_len(&self, list_path: &str) -> Result<usize> {
        self.bump("gets_len");
        self.inner.gets_len(list_path).await
    }

    async fn has_item(&self, path: &str) -> Result<bool> {
        self.bump("has_item");
        self.inner.has_item(path).await
    }

    async fn add(&self, path: &str, value: Value, leaf_type: LeafType) -> Result<()> {
        self.bump("add");
        self.inner.add(path, value, leaf_type).await
    }

    async fn remove(&self, path: &str, value: &Value) -> Result<()> {
        self.bump("remove");
        self.inner.remove(path, value).await
    }

    async fn gets(&self, path: &str) -> Result<ValueStream> {
        self.bump("gets");
        self.inner.gets(path).await
    }

    async fn refresh(&self) -> Result<()> {
        self.bump("refresh");
        self.inner.refresh().await
    }

    async fn is_dirty(&self) -> Result<bool> {
        self.bump("is_dirty");
        self.inner.is_dirty().await
    }

    async fn has_datastore_changed(&self) -> Result<bool> {
        self.bump("has_datastore_changed");
        self.inner.has_datastore_changed().await
    }

    async fn empty(&self) -> Result<()> {
        self.bump("empty");
        self.inner.empty().await
    }

    async fn dump_paths(&self) -> Result<PathDump> {
        self.bump("dump_paths");
        self.inner.dump_paths().await
    }

    async fn dumps(&self) -> Result<String> {
        self.bump("dumps");
        self.inner.dumps().await
    }

    async fn loads(&self, payload: &str) -> Result<()> {
        self.bump("loads");
        self.inner.loads(payload).await
    }

    async fn merges(&self, payload: &str) -> Result<()> {
        self.bump("merges");
        self.inner.merges(payload).await
    }
}
