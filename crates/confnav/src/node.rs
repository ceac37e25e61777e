//! Navigation handles, one type per schema kind.
//!
//! Every handle carries the same context: the session's backend and schema
//! cache, plus its own position as a [`Path`]. Which operations are available
//! depends on the variant; asking a variant for something it does not support
//! yields [`Error::UnsupportedOperationForVariant`].

use crate::dal::{DataAccessLayer, ValueStream};
use crate::error::{Error, Result};
use crate::factory;
use crate::keys;
use crate::path::Path;
use crate::schema::{SchemaKind, SchemaNode};
use crate::schema_cache::SchemaCache;
use crate::value::{LeafType, Value};
use async_trait::async_trait;
use futures::{Stream, StreamExt, TryStreamExt};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

/// List elements produced by iteration.
pub type ElementStream = Pin<Box<dyn Stream<Item = Result<ListElement>> + Send>>;

/// Shared by every node of a session.
pub(crate) struct Context {
    pub(crate) dal: Arc<dyn DataAccessLayer>,
    pub(crate) schema: Arc<SchemaCache>,
    pub(crate) readonly: bool,
}

/// Position of a node plus the session context.
#[derive(Clone)]
pub struct Handle {
    ctx: Arc<Context>,
    path: Path,
    schema: Arc<SchemaNode>,
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("data_path", &self.path.data_path())
            .field("schema_path", &self.path.schema_path())
            .field("kind", &self.schema.kind)
            .finish()
    }
}

impl Handle {
    pub(crate) fn new(ctx: Arc<Context>, path: Path, schema: Arc<SchemaNode>) -> Self {
        Self { ctx, path, schema }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn data_path(&self) -> String {
        self.path.data_path()
    }

    #[must_use]
    pub fn schema_path(&self) -> String {
        self.path.schema_path()
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<SchemaNode> {
        &self.schema
    }

    #[must_use]
    pub fn module(&self) -> &str {
        self.ctx.schema.module()
    }

    pub(crate) fn dal(&self) -> &Arc<dyn DataAccessLayer> {
        &self.ctx.dal
    }

    pub(crate) fn cache(&self) -> &SchemaCache {
        &self.ctx.schema
    }

    fn writable(&self) -> Result<()> {
        if self.ctx.readonly {
            Err(Error::ReadOnly)
        } else {
            Ok(())
        }
    }

    fn with_path(&self, path: Path) -> Self {
        Self {
            ctx: self.ctx.clone(),
            path,
            schema: self.schema.clone(),
        }
    }

    async fn child(&self, name: &str) -> Result<Node> {
        let (path, schema) = self.path.extend(self.cache(), name).await?;
        factory::dispatch(&self.ctx, path, schema).await
    }

    async fn set_child(&self, name: &str, value: Option<Value>) -> Result<()> {
        self.writable()?;
        let (path, schema) = self.path.extend(self.cache(), name).await?;
        if schema.kind != SchemaKind::Leaf {
            return Err(Error::CannotAssignValueToContainingNode(name.to_string()));
        }
        if schema.is_key {
            return Err(Error::ListKeyCannotBeChanged {
                path: path.data_path(),
                key: name.to_string(),
            });
        }
        let data_path = path.data_path();
        let spec = schema
            .leaf_type
            .clone()
            .unwrap_or_else(|| LeafType::String.into());
        match value {
            None => self.dal().set(&data_path, None, spec.base).await,
            Some(value) => {
                let concrete = spec.check(&data_path, &value)?;
                self.dal().set(&data_path, Some(value), concrete).await
            }
        }
    }

    async fn children(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .cache()
            .children_of(&self.path.schema_path())
            .await?
            .into_iter()
            .map(|n| n.replace('-', "_"))
            .collect();
        names.sort();
        Ok(names)
    }
}

/// Operations shared by the variants that contain children.
#[async_trait]
pub trait Navigate: Send + Sync {
    fn handle(&self) -> &Handle;

    /// Navigate to a child by name; underscores may stand in for hyphens.
    async fn child(&self, name: &str) -> Result<Node> {
        self.handle().child(name).await
    }

    /// Assign a leaf child; `None` deletes it.
    async fn set(&self, name: &str, value: Option<Value>) -> Result<()> {
        self.handle().set_child(name, value).await
    }

    /// Child names, hyphens shown as underscores, sorted.
    async fn children(&self) -> Result<Vec<String>> {
        self.handle().children().await
    }
}

/// A non-presence container, or the module root.
#[derive(Debug, Clone)]
pub struct Container(Handle);

/// A container whose existence carries meaning.
#[derive(Debug, Clone)]
pub struct PresenceContainer(Handle);

/// A keyed list. Its children are only reachable through an element.
#[derive(Debug, Clone)]
pub struct List(Handle);

/// One element of a list, addressed by its full key set.
#[derive(Debug, Clone)]
pub struct ListElement(Handle);

#[derive(Debug, Clone)]
pub struct LeafList(Handle);

#[derive(Debug, Clone)]
pub struct Choice(Handle);

#[derive(Debug, Clone)]
pub struct Case(Handle);

/// A leaf of type `empty`: it either exists or it does not.
#[derive(Debug, Clone)]
pub struct EmptyLeaf(Handle);

impl Container {
    pub(crate) fn new(handle: Handle) -> Self {
        Self(handle)
    }
}

impl PresenceContainer {
    pub(crate) fn new(handle: Handle) -> Self {
        Self(handle)
    }

    #[must_use]
    pub fn handle(&self) -> &Handle {
        &self.0
    }

    pub async fn exists(&self) -> Result<bool> {
        self.0.dal().container(&self.0.data_path()).await
    }

    pub async fn create(&self) -> Result<()> {
        self.0.writable()?;
        self.0.dal().create_container(&self.0.data_path()).await
    }

    /// Remove the container and everything below it.
    pub async fn delete(&self) -> Result<()> {
        self.0.writable()?;
        self.0.dal().delete(&self.0.data_path()).await
    }
}

impl Choice {
    pub(crate) fn new(handle: Handle) -> Self {
        Self(handle)
    }
}

impl Case {
    pub(crate) fn new(handle: Handle) -> Self {
        Self(handle)
    }
}

impl Navigate for Container {
    fn handle(&self) -> &Handle {
        &self.0
    }
}

impl Navigate for PresenceContainer {
    fn handle(&self) -> &Handle {
        &self.0
    }
}

impl Navigate for ListElement {
    fn handle(&self) -> &Handle {
        &self.0
    }
}

impl Navigate for Choice {
    fn handle(&self) -> &Handle {
        &self.0
    }
}

impl Navigate for Case {
    fn handle(&self) -> &Handle {
        &self.0
    }
}

impl List {
    pub(crate) fn new(handle: Handle) -> Self {
        Self(handle)
    }

    #[must_use]
    pub fn handle(&self) -> &Handle {
        &self.0
    }

    /// Key names in schema order, hyphens shown as underscores.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.0
            .schema
            .keys
            .iter()
            .map(|k| k.name.replace('-', "_"))
            .collect()
    }

    fn element_path(&self, keys: &[Value]) -> Result<Path> {
        let predicates = keys::key_predicates(&self.0.schema, keys)?;
        Ok(self.0.path.with_predicates(predicates))
    }

    fn element(&self, path: Path) -> ListElement {
        ListElement(self.0.with_path(path))
    }

    /// Create the element with these key values, or return it if present.
    pub async fn create(&self, keys: &[Value]) -> Result<ListElement> {
        self.0.writable()?;
        let path = self.element_path(keys)?;
        let names = self.0.schema.key_names();
        self.0.dal().create(&path.data_path(), &names, keys).await?;
        Ok(self.element(path))
    }

    pub async fn get(&self, keys: &[Value]) -> Result<ListElement> {
        let path = self.element_path(keys)?;
        let data_path = path.data_path();
        if !self.0.dal().has_item(&data_path).await? {
            return Err(Error::list_does_not_contain_element(data_path));
        }
        Ok(self.element(path))
    }

    pub async fn contains(&self, keys: &[Value]) -> Result<bool> {
        let path = self.element_path(keys)?;
        self.0.dal().has_item(&path.data_path()).await
    }

    pub async fn remove(&self, keys: &[Value]) -> Result<()> {
        self.0.writable()?;
        let path = self.element_path(keys)?;
        self.0.dal().uncreate(&path.data_path()).await
    }

    pub async fn len(&self) -> Result<usize> {
        self.0.dal().gets_len(&self.0.data_path()).await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Iterate elements, in creation order or sorted by element path.
    pub async fn elements(&self, sorted: bool) -> Result<ElementStream> {
        let list_path = self.0.data_path();
        let paths = if sorted {
            self.0.dal().gets_sorted(&list_path, true).await?
        } else {
            self.0.dal().gets_unsorted(&list_path, true).await?
        };
        let list = self.clone();
        Ok(Box::pin(paths.map(move |item| {
            item.and_then(|element_path| list.element_from_data_path(&element_path))
        })))
    }

    fn element_from_data_path(&self, element_path: &str) -> Result<ListElement> {
        let (list_path, predicates) = keys::decode_last_predicates(element_path)?;
        if list_path != self.0.data_path() {
            return Err(Error::path_decoding(element_path));
        }
        Ok(self.element(self.0.path.with_predicates(predicates)))
    }
}

impl ListElement {
    #[must_use]
    pub fn handle(&self) -> &Handle {
        &self.0
    }

    /// `(key, literal)` pairs identifying this element.
    #[must_use]
    pub fn keys(&self) -> Vec<(String, String)> {
        self.0
            .path
            .steps()
            .last()
            .map(|s| s.predicates.clone())
            .unwrap_or_default()
    }
}

impl LeafList {
    pub(crate) fn new(handle: Handle) -> Self {
        Self(handle)
    }

    #[must_use]
    pub fn handle(&self) -> &Handle {
        &self.0
    }

    fn checked(&self, value: &Value) -> Result<LeafType> {
        let data_path = self.0.data_path();
        if value.is_blank() || *value == Value::Empty {
            return Err(Error::ListItemCannotBeBlank(data_path));
        }
        match &self.0.schema.leaf_type {
            Some(spec) => spec.check(&data_path, value),
            None => Ok(LeafType::String),
        }
    }

    pub async fn add<V: Into<Value> + Send>(&self, value: V) -> Result<()> {
        self.0.writable()?;
        let value = value.into();
        let concrete = self.checked(&value)?;
        self.0.dal().add(&self.0.data_path(), value, concrete).await
    }

    pub async fn remove<V: Into<Value> + Send>(&self, value: V) -> Result<()> {
        self.0.writable()?;
        let value = value.into();
        _ = self.checked(&value)?;
        self.0.dal().remove(&self.0.data_path(), &value).await
    }

    pub async fn values(&self) -> Result<ValueStream> {
        self.0.dal().gets(&self.0.data_path()).await
    }

    pub async fn len(&self) -> Result<usize> {
        let values: Vec<Value> = self.values().await?.try_collect().await?;
        Ok(values.len())
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    pub async fn contains<V: Into<Value> + Send>(&self, value: V) -> Result<bool> {
        let value = value.into();
        let values: Vec<Value> = self.values().await?.try_collect().await?;
        Ok(values.contains(&value))
    }
}

impl EmptyLeaf {
    pub(crate) fn new(handle: Handle) -> Self {
        Self(handle)
    }

    #[must_use]
    pub fn handle(&self) -> &Handle {
        &self.0
    }

    pub async fn exists(&self) -> Result<bool> {
        Ok(self.0.dal().get(&self.0.data_path()).await?.is_some())
    }

    pub async fn create(&self) -> Result<()> {
        self.0.writable()?;
        self.0
            .dal()
            .set(&self.0.data_path(), Some(Value::Empty), LeafType::Empty)
            .await
    }

    pub async fn remove(&self) -> Result<()> {
        self.0.writable()?;
        self.0
            .dal()
            .set(&self.0.data_path(), None, LeafType::Empty)
            .await
    }
}

/// Result of navigating one step.
#[derive(Debug, Clone)]
pub enum Node {
    Container(Container),
    PresenceContainer(PresenceContainer),
    List(List),
    ListElement(ListElement),
    LeafList(LeafList),
    Choice(Choice),
    Case(Case),
    Empty(EmptyLeaf),
    /// A leaf resolves straight to its value, or its default when unset
    Leaf(Option<Value>),
}

impl Node {
    #[must_use]
    pub fn variant(&self) -> &'static str {
        match self {
            Node::Container(_) => "container",
            Node::PresenceContainer(_) => "presence container",
            Node::List(_) => "list",
            Node::ListElement(_) => "list element",
            Node::LeafList(_) => "leaf-list",
            Node::Choice(_) => "choice",
            Node::Case(_) => "case",
            Node::Empty(_) => "empty leaf",
            Node::Leaf(_) => "leaf",
        }
    }

    /// Position of this node; a leaf value carries none.
    #[must_use]
    pub fn handle(&self) -> Option<&Handle> {
        match self {
            Node::Container(n) => Some(&n.0),
            Node::PresenceContainer(n) => Some(&n.0),
            Node::List(n) => Some(&n.0),
            Node::ListElement(n) => Some(&n.0),
            Node::LeafList(n) => Some(&n.0),
            Node::Choice(n) => Some(&n.0),
            Node::Case(n) => Some(&n.0),
            Node::Empty(n) => Some(&n.0),
            Node::Leaf(_) => None,
        }
    }

    #[must_use]
    pub fn data_path(&self) -> Option<String> {
        self.handle().map(Handle::data_path)
    }

    fn unsupported(&self, operation: &str) -> Error {
        Error::unsupported(
            operation,
            self.variant(),
            self.data_path().unwrap_or_default(),
        )
    }

    fn navigable(&self, operation: &str) -> Result<&dyn Navigate> {
        match self {
            Node::Container(n) => Ok(n as &dyn Navigate),
            Node::PresenceContainer(n) => Ok(n as &dyn Navigate),
            Node::ListElement(n) => Ok(n as &dyn Navigate),
            Node::Choice(n) => Ok(n as &dyn Navigate),
            Node::Case(n) => Ok(n as &dyn Navigate),
            Node::List(n) => Err(Error::list_items_must_be_accessed_by_element(
                n.0.data_path(),
                operation,
            )),
            _ => Err(self.unsupported(operation)),
        }
    }

    pub async fn child(&self, name: &str) -> Result<Node> {
        self.navigable(name)?.child(name).await
    }

    pub async fn set(&self, name: &str, value: Option<Value>) -> Result<()> {
        self.navigable(name)?.set(name, value).await
    }

    pub async fn children(&self) -> Result<Vec<String>> {
        match self {
            Node::List(n) => n.0.children().await,
            _ => self.navigable("children")?.children().await,
        }
    }

    /// The value of a leaf.
    pub fn into_value(self) -> Result<Option<Value>> {
        match self {
            Node::Leaf(value) => Ok(value),
            other => Err(Error::node_has_no_value(
                other.variant(),
                other.data_path().unwrap_or_default(),
            )),
        }
    }

    pub fn into_container(self) -> Result<Container> {
        match self {
            Node::Container(n) => Ok(n),
            other => Err(other.unsupported("into_container")),
        }
    }

    pub fn into_presence_container(self) -> Result<PresenceContainer> {
        match self {
            Node::PresenceContainer(n) => Ok(n),
            other => Err(other.unsupported("into_presence_container")),
        }
    }

    pub fn into_list(self) -> Result<List> {
        match self {
            Node::List(n) => Ok(n),
            other => Err(other.unsupported("into_list")),
        }
    }

    pub fn into_list_element(self) -> Result<ListElement> {
        match self {
            Node::ListElement(n) => Ok(n),
            other => Err(other.unsupported("into_list_element")),
        }
    }

    pub fn into_leaf_list(self) -> Result<LeafList> {
        match self {
            Node::LeafList(n) => Ok(n),
            other => Err(other.unsupported("into_leaf_list")),
        }
    }

    pub fn into_empty(self) -> Result<EmptyLeaf> {
        match self {
            Node::Empty(n) => Ok(n),
            other => Err(other.unsupported("into_empty")),
        }
    }
}

impl From<ListElement> for Node {
    fn from(element: ListElement) -> Self {
        Node::ListElement(element)
    }
}

impl From<Container> for Node {
    fn from(container: Container) -> Self {
        Node::Container(container)
    }
}
