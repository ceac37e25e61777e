//! Data paths and schema paths, built step by step in lock-step.
//!
//! A data path names one instance in the data tree: the module prefix appears
//! once, on the first step, and list steps carry key predicates
//! (`/mod:a/b[k='v']/c`). The schema path names the type of that instance: every
//! step is prefixed with its module and there are no predicates
//! (`/mod:a/mod:b/mod:c`). Choice and case steps only exist in the schema path.

use crate::error::{Error, Result};
use crate::keys;
use crate::schema::SchemaNode;
use crate::schema_cache::SchemaCache;
use std::fmt;
use std::sync::Arc;

/// One step of a navigation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub module: String,
    /// Name as spelled in the schema
    pub name: String,
    pub predicates: Vec<(String, String)>,
    /// Choice and case steps are omitted from the data path
    pub schema_only: bool,
}

impl Step {
    pub fn new<M: Into<String>, N: Into<String>>(module: M, name: N) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
            predicates: Vec::new(),
            schema_only: false,
        }
    }
}

/// A position in the tree, from which both path spellings are derived.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path {
    steps: Vec<Step>,
}

impl Path {
    /// The module root: both spellings are empty.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use]
    pub fn data_path(&self) -> String {
        let mut out = String::new();
        let mut previous: Option<&str> = None;
        for step in self.steps.iter().filter(|s| !s.schema_only) {
            out.push('/');
            if previous != Some(step.module.as_str()) {
                out.push_str(&step.module);
                out.push(':');
            }
            out.push_str(&step.name);
            out.push_str(&keys::format_predicates(&step.predicates));
            previous = Some(step.module.as_str());
        }
        out
    }

    #[must_use]
    pub fn schema_path(&self) -> String {
        let mut out = String::new();
        for step in &self.steps {
            out.push('/');
            out.push_str(&step.module);
            out.push(':');
            out.push_str(&step.name);
        }
        out
    }

    /// Append a step.
    #[must_use]
    pub fn child(&self, step: Step) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self { steps }
    }

    /// Replace the predicates of the final step.
    #[must_use]
    pub fn with_predicates(&self, predicates: Vec<(String, String)>) -> Self {
        let mut path = self.clone();
        if let Some(last) = path.steps.last_mut() {
            last.predicates = predicates;
        }
        path
    }

    /// The same path with every predicate removed.
    #[must_use]
    pub fn erase_predicates(&self) -> Self {
        Self {
            steps: self
                .steps
                .iter()
                .map(|s| Step {
                    predicates: Vec::new(),
                    ..s.clone()
                })
                .collect(),
        }
    }

    /// Extend by one user-visible step name.
    ///
    /// Each module of the schema is tried in turn, so nodes augmented in from
    /// another module are reachable. The schema cache supplies the real
    /// spelling, which may differ from `step_name` when the hyphen fallback
    /// applied. Both path spellings use that same spelling.
    pub async fn extend(
        &self,
        cache: &SchemaCache,
        step_name: &str,
    ) -> Result<(Path, Arc<SchemaNode>)> {
        let parent = self.schema_path();
        let mut found = None;
        for module in cache.modules() {
            let candidate = format!("{}/{}:{}", parent, module, step_name);
            match cache.resolve(&candidate).await {
                Ok(node) => {
                    found = Some(node);
                    break;
                }
                Err(Error::NoSuchSchemaNode(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        let node = found.ok_or_else(|| {
            Error::no_such_schema_node(format!("{}/{}:{}", parent, cache.module(), step_name))
        })?;
        let step = Step {
            module: node.module.clone(),
            name: node.name.clone(),
            predicates: Vec::new(),
            schema_only: node.kind.is_schema_only(),
        };
        Ok((self.child(step), node))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data_path())
    }
}

/// Parse a data path into steps; steps without a prefix inherit the previous module.
pub fn split_steps(data_path: &str) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    let mut module = String::new();
    for segment in split_segments(data_path)? {
        let (head, predicates) = match segment.find('[') {
            Some(at) => (&segment[..at], keys::parse_predicates(&segment[at..])?),
            None => (segment.as_str(), Vec::new()),
        };
        let name = match head.split_once(':') {
            Some((prefix, name)) => {
                module = prefix.to_string();
                name
            }
            None if module.is_empty() => return Err(Error::path_decoding(data_path)),
            None => head,
        };
        if name.is_empty() {
            return Err(Error::path_decoding(data_path));
        }
        steps.push(Step {
            module: module.clone(),
            name: name.to_string(),
            predicates,
            schema_only: false,
        });
    }
    Ok(steps)
}

/// Split on `/` outside of quoted predicate literals.
fn split_segments(data_path: &str) -> Result<Vec<String>> {
    let Some(rest) = data_path.strip_prefix('/') else {
        return Err(Error::path_decoding(data_path));
    };
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in rest.chars() {
        match (quote, c) {
            (None, '/') => segments.push(std::mem::take(&mut current)),
            (None, '\'' | '"') => {
                quote = Some(c);
                current.push(c);
            }
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            _ => current.push(c),
        }
    }
    if quote.is_some() {
        return Err(Error::path_decoding(data_path));
    }
    segments.push(current);
    Ok(segments)
}

/// Schema path for a data path, assuming no choice or case on the way.
pub fn data_to_schema_path(module: &str, data_path: &str) -> Result<String> {
    let mut out = String::new();
    for step in split_steps(data_path)? {
        let step_module = if step.module.is_empty() {
            module
        } else {
            step.module.as_str()
        };
        out.push('/');
        out.push_str(step_module);
        out.push(':');
        out.push_str(&step.name);
    }
    Ok(out)
}

/// Remove every predicate from a data path string.
pub fn strip_predicates(data_path: &str) -> Result<String> {
    let mut out = String::new();
    let mut first = true;
    let mut previous = String::new();
    for step in split_steps(data_path)? {
        out.push('/');
        if first || step.module != previous {
            out.push_str(&step.module);
            out.push(':');
        }
        out.push_str(&step.name);
        previous = step.module;
        first = false;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_of(steps: &[(&str, bool)]) -> Path {
        let mut path = Path::root();
        for (name, schema_only) in steps {
            let mut step = Step::new("integrationtest", *name);
            step.schema_only = *schema_only;
            path = path.child(step);
        }
        path
    }

    #[test]
    fn test_root_is_empty() {
        assert_eq!(Path::root().data_path(), "");
        assert_eq!(Path::root().schema_path(), "");
    }

    #[test]
    fn test_module_prefix_only_once_in_data_path() {
        let path = path_of(&[("morecomplex", false), ("inner", false), ("leaf666", false)]);
        assert_eq!(path.data_path(), "/integrationtest:morecomplex/inner/leaf666");
        assert_eq!(
            path.schema_path(),
            "/integrationtest:morecomplex/integrationtest:inner/integrationtest:leaf666"
        );
    }

    #[test]
    fn test_choice_and_case_are_schema_only() {
        let path = path_of(&[
            ("morecomplex", false),
            ("beer-type", true),
            ("craft", true),
            ("brewery", false),
        ]);
        assert_eq!(path.data_path(), "/integrationtest:morecomplex/brewery");
        assert_eq!(
            path.schema_path(),
            concat!(
                "/integrationtest:morecomplex/integrationtest:beer-type",
                "/integrationtest:craft/integrationtest:brewery"
            )
        );
    }

    #[test]
    fn test_predicates_follow_list_steps() {
        let path = path_of(&[("twokeylist", false)]).with_predicates(vec![
            ("primary".to_string(), "true".to_string()),
            ("secondary".to_string(), "false".to_string()),
        ]);
        let path = path.child(Step::new("integrationtest", "tertiary"));
        assert_eq!(
            path.data_path(),
            "/integrationtest:twokeylist[primary='true'][secondary='false']/tertiary"
        );
        assert_eq!(
            path.erase_predicates().data_path(),
            "/integrationtest:twokeylist/tertiary"
        );
    }

    #[test]
    fn test_prefix_repeats_when_the_module_changes() {
        let path = Path::root()
            .child(Step::new("base", "system"))
            .child(Step::new("vendor", "tuning"))
            .child(Step::new("vendor", "buffer-size"));
        assert_eq!(path.data_path(), "/base:system/vendor:tuning/buffer-size");
        assert_eq!(
            path.schema_path(),
            "/base:system/vendor:tuning/vendor:buffer-size"
        );
        let steps = split_steps(&path.data_path()).expect("split");
        assert_eq!(steps[2].module, "vendor");
    }

    #[test]
    fn test_split_and_strip() {
        let steps = split_steps("/m:a[k='x/y']/b").expect("split");
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].predicates, vec![("k".to_string(), "x/y".to_string())]);
        assert_eq!(steps[1].module, "m");
        assert_eq!(strip_predicates("/m:a[k='x/y']/b").expect("strip"), "/m:a/b");
        assert_eq!(
            data_to_schema_path("m", "/m:a[k='1']/b").expect("schema"),
            "/m:a/m:b"
        );
        assert!(split_steps("a/b").is_err());
    }
}
