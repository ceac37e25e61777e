//! Memoized schema lookups with the underscore-to-hyphen fallback.

use crate::error::{Error, Result};
use crate::schema::{SchemaNode, SchemaProvider};
use diagnostics::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Rewrite the local name of every step, turning `_` into `-`.
///
/// Module prefixes are left alone.
#[must_use]
pub fn hyphenate(schema_path: &str) -> String {
    schema_path
        .split('/')
        .map(|segment| match segment.split_once(':') {
            Some((module, name)) => format!("{}:{}", module, name.replace('_', "-")),
            None => segment.replace('_', "-"),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Schema cache in front of a [`SchemaProvider`].
///
/// Entries are keyed by the schema path as asked for, so the underscore
/// spelling and the hyphen spelling each get their own entry. Failed lookups
/// are never remembered.
pub struct SchemaCache {
    provider: Arc<dyn SchemaProvider>,
    modules: Vec<String>,
    root: Arc<SchemaNode>,
    entries: Mutex<HashMap<String, Arc<SchemaNode>>>,
}

impl SchemaCache {
    /// Fails when the provider cannot list the top-level nodes.
    pub fn new(provider: Arc<dyn SchemaProvider>) -> Result<Self> {
        let children = provider.children_of("")?;
        let root = Arc::new(SchemaNode::root(provider.module(), children));
        let modules = provider.modules();
        Ok(Self {
            provider,
            modules,
            root,
            entries: Mutex::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn module(&self) -> &str {
        &self.root.module
    }

    /// Modules tried, in order, when a step name carries no prefix.
    #[must_use]
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    #[must_use]
    pub fn root(&self) -> Arc<SchemaNode> {
        self.root.clone()
    }

    #[must_use]
    pub fn provider(&self) -> &Arc<dyn SchemaProvider> {
        &self.provider
    }

    /// Resolve `schema_path`, retrying once with hyphens in place of underscores.
    pub async fn resolve(&self, schema_path: &str) -> Result<Arc<SchemaNode>> {
        if schema_path.is_empty() {
            return Ok(self.root.clone());
        }

        if let Some(node) = self.entries.lock().await.get(schema_path) {
            return Ok(node.clone());
        }

        let node = match self.provider.resolve(schema_path) {
            Ok(node) => node,
            Err(Error::NoSuchSchemaNode(_)) => {
                let alternative = hyphenate(schema_path);
                if alternative == schema_path {
                    return Err(Error::no_such_schema_node(schema_path));
                }
                match self.provider.resolve(&alternative) {
                    Ok(mut node) => {
                        debug!(
                            "Schema path {requested} resolved as {actual}",
                            requested: schema_path,
                            actual: alternative.as_str()
                        );
                        node.fallback = true;
                        node
                    }
                    Err(Error::NoSuchSchemaNode(_)) => {
                        return Err(Error::no_such_schema_node(schema_path));
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        };

        let mut entries = self.entries.lock().await;
        let cached = entries
            .entry(schema_path.to_string())
            .or_insert_with(|| Arc::new(node));
        Ok(cached.clone())
    }

    /// Child names below `schema_path` as the schema spells them.
    pub async fn children_of(&self, schema_path: &str) -> Result<Vec<String>> {
        if schema_path.is_empty() {
            return Ok(self.root.children.clone());
        }
        Ok(self.resolve(schema_path).await?.children.clone())
    }

    /// Number of remembered lookups.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unreadable;

    impl SchemaProvider for Unreadable {
        fn module(&self) -> &str {
            "broken"
        }

        fn resolve(&self, schema_path: &str) -> Result<SchemaNode> {
            Err(Error::no_such_schema_node(schema_path))
        }

        fn children_of(&self, _schema_path: &str) -> Result<Vec<String>> {
            Err(Error::backend("schema unavailable", "/"))
        }
    }

    #[test]
    fn test_provider_failure_is_reported() {
        assert!(matches!(
            SchemaCache::new(Arc::new(Unreadable)),
            Err(Error::BackendDatastore(_))
        ));
    }

    #[test]
    fn test_hyphenate_only_touches_local_names() {
        assert_eq!(
            hyphenate("/my_mod:a_b/my_mod:c_d"),
            "/my_mod:a-b/my_mod:c-d"
        );
        assert_eq!(hyphenate("/m:plain"), "/m:plain");
    }
}
