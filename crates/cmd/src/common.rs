use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use confnav::{FileStore, List, Node, SchemaNode, SchemaTree, Session, SessionConfig, Value};

/// Environment variable naming the datastore file when `--store` is absent
pub const STORE_ENV: &str = "CONFNAV_STORE";

/// Everything a command needs to open a session.
#[derive(Debug, Clone)]
pub struct ConfContext {
    pub schema: PathBuf,
    pub store: PathBuf,
    pub readonly: bool,
}

impl ConfContext {
    pub fn new(schema: PathBuf, store_override: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            schema,
            store: get_store_path_with_override(store_override)?,
            readonly: false,
        })
    }

    #[must_use]
    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    pub fn load_schema(&self) -> Result<Arc<SchemaTree>> {
        let tree = SchemaTree::from_file(&self.schema)
            .with_context(|| format!("Failed to load schema {}", self.schema.display()))?;
        Ok(Arc::new(tree))
    }

    /// Connect a cached session over the file datastore.
    pub async fn open(&self) -> Result<Session> {
        let schema = self.load_schema()?;
        let store = FileStore::new(&self.store).with_schema(schema.clone());
        let config = SessionConfig {
            readonly: self.readonly,
            caching: true,
        };
        Session::connect(schema, store, config)
            .await
            .with_context(|| format!("Failed to open datastore {}", self.store.display()))
    }
}

/// The datastore path, falling back to CONFNAV_STORE
pub fn get_store_path_with_override(override_path: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        return Ok(path);
    }
    env::var(STORE_ENV)
        .map(PathBuf::from)
        .map_err(|_| anyhow!("{} environment variable not set and no --store given", STORE_ENV))
}

/// One step of a command-line path: `name` or `name[key1,key2]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    pub name: String,
    pub keys: Vec<String>,
}

/// Split a dot-separated command-line path into steps.
///
/// An empty path, or `/`, is the module root. Dots inside brackets belong to
/// key values; key values cannot contain commas.
pub fn parse_path(text: &str) -> Result<Vec<PathStep>> {
    let text = text.trim();
    if text.is_empty() || text == "/" {
        return Ok(Vec::new());
    }

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| anyhow!("Unbalanced ']' in {}", text))?;
            }
            '.' if depth == 0 => {
                segments.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if depth != 0 {
        return Err(anyhow!("Unbalanced '[' in {}", text));
    }
    segments.push(current);

    segments.iter().map(|s| parse_step(s, text)).collect()
}

fn parse_step(segment: &str, text: &str) -> Result<PathStep> {
    let (name, keys) = match segment.split_once('[') {
        None => (segment, Vec::new()),
        Some((name, rest)) => {
            let inner = rest
                .strip_suffix(']')
                .ok_or_else(|| anyhow!("Keys must close the step {} in {}", segment, text))?;
            let keys = inner.split(',').map(|k| k.trim().to_string()).collect();
            (name, keys)
        }
    };
    if name.is_empty() {
        return Err(anyhow!("Empty step in {}", text));
    }
    Ok(PathStep {
        name: name.to_string(),
        keys,
    })
}

/// Separate the final step from its parent steps.
pub fn split_target(steps: &[PathStep]) -> Result<(&[PathStep], &PathStep)> {
    match steps.split_last() {
        Some((last, parent)) => Ok((parent, last)),
        None => Err(anyhow!("This command needs a path below the module root")),
    }
}

/// Walk `steps` from the module root.
pub async fn navigate(session: &Session, steps: &[PathStep]) -> Result<Node> {
    let mut node = Node::from(session.root());
    for step in steps {
        node = node.child(&step.name).await?;
        if !step.keys.is_empty() {
            let list = node.into_list()?;
            let keys = key_values(&list, &step.keys)?;
            node = Node::from(list.get(&keys).await?);
        }
    }
    Ok(node)
}

/// Type the key literals of a list step.
///
/// Surplus literals stay strings so the list reports the arity mismatch.
pub fn key_values(list: &List, literals: &[String]) -> Result<Vec<Value>> {
    let schema = list.handle().schema();
    let path = list.handle().data_path();
    let mut values = Vec::with_capacity(literals.len());
    for (i, literal) in literals.iter().enumerate() {
        let value = match schema.keys.get(i) {
            Some(key) => key.key_type.parse(&path, literal)?,
            None => Value::from(literal.as_str()),
        };
        values.push(value);
    }
    Ok(values)
}

/// The schema node for `name` below `parent`.
pub async fn child_schema(
    session: &Session,
    parent: &Node,
    name: &str,
) -> Result<(String, Arc<SchemaNode>)> {
    let handle = parent
        .handle()
        .ok_or_else(|| anyhow!("A {} has no children", parent.variant()))?;
    let (path, schema) = handle.path().extend(session.schema_cache(), name).await?;
    Ok((path.data_path(), schema))
}

/// Type a command-line literal for the leaf or leaf-list `schema`.
pub fn typed_value(data_path: &str, schema: &SchemaNode, literal: &str) -> Result<Value> {
    match &schema.leaf_type {
        Some(spec) => Ok(spec.parse(data_path, literal)?),
        None => Ok(Value::from(literal)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(name: &str, keys: &[&str]) -> PathStep {
        PathStep {
            name: name.to_string(),
            keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[test]
    fn test_parse_path() {
        assert!(parse_path("").unwrap().is_empty());
        assert!(parse_path("/").unwrap().is_empty());
        assert_eq!(
            parse_path("morecomplex.inner.leaf666").unwrap(),
            vec![
                step("morecomplex", &[]),
                step("inner", &[]),
                step("leaf666", &[])
            ]
        );
        assert_eq!(
            parse_path("twokeylist[true, false].tertiary").unwrap(),
            vec![step("twokeylist", &["true", "false"]), step("tertiary", &[])]
        );
    }

    #[test]
    fn test_dots_inside_keys() {
        assert_eq!(
            parse_path("hosts[example.com].port").unwrap(),
            vec![step("hosts", &["example.com"]), step("port", &[])]
        );
    }

    #[test]
    fn test_malformed_paths() {
        assert!(parse_path("a..b").is_err());
        assert!(parse_path("list[a").is_err());
        assert!(parse_path("list]a").is_err());
        assert!(parse_path("list[a]x").is_err());
    }

    #[test]
    fn test_store_override_wins() {
        let path = get_store_path_with_override(Some(PathBuf::from("/tmp/store.json"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/store.json"));
    }
}
