//! A connected navigation session: one module, one backend, one schema cache.

use crate::caching_proxy::CachingProxy;
use crate::dal::{DataAccessLayer, PathDump};
use crate::error::{Error, Result};
use crate::node::{Container, Context, Handle, Node};
use crate::path::Path;
use crate::schema::{SchemaKind, SchemaNode, SchemaProvider};
use crate::schema_cache::SchemaCache;
use crate::value::{LeafType, Value};
use diagnostics::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Options applied when a session connects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Reject every write made through the navigation handles
    #[serde(default)]
    pub readonly: bool,
    /// Put a [`CachingProxy`] in front of the backend
    #[serde(default)]
    pub caching: bool,
}

pub struct Session {
    ctx: Arc<Context>,
}

impl Session {
    /// Connect `backend` for the module `provider` describes.
    pub async fn connect<D>(
        provider: Arc<dyn SchemaProvider>,
        backend: D,
        config: SessionConfig,
    ) -> Result<Self>
    where
        D: DataAccessLayer + 'static,
    {
        let module = provider.module().to_string();
        let schema = Arc::new(SchemaCache::new(provider)?);
        let dal: Arc<dyn DataAccessLayer> = if config.caching {
            Arc::new(CachingProxy::new(backend))
        } else {
            Arc::new(backend)
        };
        dal.connect(&module).await?;
        info!(
            "Connected to module {module} through the {backend} backend",
            module: module.as_str(),
            backend: dal.id()
        );
        Ok(Self {
            ctx: Arc::new(Context {
                dal,
                schema,
                readonly: config.readonly,
            }),
        })
    }

    #[must_use]
    pub fn module(&self) -> &str {
        self.ctx.schema.module()
    }

    /// The module root, from which every other node is reached.
    #[must_use]
    pub fn root(&self) -> Container {
        Container::new(Handle::new(
            self.ctx.clone(),
            Path::root(),
            self.ctx.schema.root(),
        ))
    }

    #[must_use]
    pub fn schema_cache(&self) -> &Arc<SchemaCache> {
        &self.ctx.schema
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn DataAccessLayer> {
        &self.ctx.dal
    }

    pub async fn commit(&self) -> Result<()> {
        self.ctx.dal.commit().await
    }

    pub async fn validate(&self) -> Result<()> {
        self.ctx.dal.validate().await
    }

    pub async fn refresh(&self) -> Result<()> {
        self.ctx.dal.refresh().await
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.ctx.dal.disconnect().await
    }

    pub async fn dump_paths(&self) -> Result<PathDump> {
        self.ctx.dal.dump_paths().await
    }

    pub async fn dumps(&self) -> Result<String> {
        self.ctx.dal.dumps().await
    }

    pub async fn loads(&self, payload: &str) -> Result<()> {
        self.writable()?;
        self.ctx.dal.loads(payload).await
    }

    /// Apply a serialized document on top of the current data.
    pub async fn merges(&self, payload: &str) -> Result<()> {
        self.writable()?;
        self.ctx.dal.merges(payload).await
    }

    pub async fn merge(&self, file: &std::path::Path) -> Result<()> {
        self.writable()?;
        self.ctx.dal.merge(file).await
    }

    /// Remove all data. Takes effect for others on commit.
    pub async fn empty(&self) -> Result<()> {
        self.writable()?;
        self.ctx.dal.empty().await
    }

    /// Has this session changed data since it connected, committed or refreshed.
    pub async fn is_session_dirty(&self) -> Result<bool> {
        self.ctx.dal.is_dirty().await
    }

    /// Has someone else committed since this session connected, committed or refreshed.
    pub async fn has_datastore_changed(&self) -> Result<bool> {
        self.ctx.dal.has_datastore_changed().await
    }

    fn writable(&self) -> Result<()> {
        if self.ctx.readonly {
            Err(Error::ReadOnly)
        } else {
            Ok(())
        }
    }

    /// Describe `node`, or its child `child` when given.
    pub async fn describe(&self, node: &Node, child: Option<&str>) -> Result<Description> {
        let handle = node
            .handle()
            .ok_or_else(|| Error::unsupported("describe", node.variant(), ""))?;
        let (path, schema) = match child {
            Some(name) => handle.path().extend(&self.ctx.schema, name).await?,
            None => (handle.path().clone(), handle.schema().clone()),
        };
        let mut children: Vec<String> = self
            .ctx
            .schema
            .children_of(&path.schema_path())
            .await?
            .into_iter()
            .map(|n| n.replace('-', "_"))
            .collect();
        children.sort();
        Ok(Description::new(&schema, &path, children))
    }
}

/// Human-readable summary of one schema node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Description {
    pub name: String,
    pub schema_path: String,
    pub data_path: String,
    pub kind: SchemaKind,
    pub leaf_type: Option<LeafType>,
    pub enums: Vec<String>,
    pub default: Option<Value>,
    pub description: Option<String>,
    pub children: Vec<String>,
}

impl Description {
    fn new(schema: &SchemaNode, path: &Path, children: Vec<String>) -> Self {
        Self {
            name: schema.name.clone(),
            schema_path: path.schema_path(),
            data_path: path.data_path(),
            kind: schema.kind.clone(),
            leaf_type: schema.leaf_type.as_ref().map(|t| t.base),
            enums: schema
                .leaf_type
                .as_ref()
                .map(|t| t.enums.clone())
                .unwrap_or_default(),
            default: schema.default.clone(),
            description: schema.description.clone(),
            children,
        }
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Description of {}", self.name)?;
        writeln!(f, "---------------{}", "-".repeat(self.name.len()))?;
        writeln!(f)?;
        writeln!(f, "Schema Path: {}", self.schema_path)?;
        writeln!(f, "Value Path: {}", self.data_path)?;
        match self.leaf_type {
            Some(t) => writeln!(f, "NodeType: {} of type {}", self.kind, t)?,
            None => writeln!(f, "NodeType: {}", self.kind)?,
        }
        if !self.enums.is_empty() {
            writeln!(f, "Enumeration Values: {}", self.enums.join(", "))?;
        }
        if let Some(default) = &self.default {
            writeln!(f, "Default: {}", default)?;
        }
        writeln!(f)?;
        writeln!(f, "Description:")?;
        writeln!(
            f,
            "  {}",
            self.description
                .as_deref()
                .unwrap_or("N/A")
                .replace('\n', "\n  ")
        )?;
        writeln!(f)?;
        if self.children.is_empty() {
            write!(f, "Children: [No Child Nodes]")
        } else {
            write!(f, "Children: {}", self.children.join(", "))
        }
    }
}
