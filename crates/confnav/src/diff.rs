//! Differences between two path dumps of a data tree.

use crate::dal::PathDump;
use crate::value::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffOp {
    Add,
    Modify,
    Remove,
}

/// A single changed path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub path: String,
    pub old: Option<Value>,
    pub new: Option<Value>,
    pub op: DiffOp,
}

/// Path prefix and suffix a change must match; empty strings match anything.
#[derive(Debug, Clone, Default)]
pub struct DiffFilter {
    pub start: String,
    pub end: String,
}

impl DiffFilter {
    pub fn new<S: Into<String>, E: Into<String>>(start: S, end: E) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.start) && path.ends_with(&self.end)
    }
}

/// Every change between two dumps, in path order within each operation.
#[derive(Debug, Clone, Default)]
pub struct DiffSet {
    changes: Vec<Change>,
}

impl DiffSet {
    /// Compare `before` with `after`, keeping only changes `filter` accepts.
    #[must_use]
    pub fn compute(before: &PathDump, after: &PathDump, filter: &DiffFilter) -> Self {
        let mut changes = Vec::new();
        for (path, old) in before {
            if !filter.matches(path) {
                continue;
            }
            match after.get(path) {
                None => changes.push(Change {
                    path: path.clone(),
                    old: old.clone(),
                    new: None,
                    op: DiffOp::Remove,
                }),
                Some(new) if new != old => changes.push(Change {
                    path: path.clone(),
                    old: old.clone(),
                    new: new.clone(),
                    op: DiffOp::Modify,
                }),
                Some(_) => {}
            }
        }
        for (path, new) in after {
            if filter.matches(path) && !before.contains_key(path) {
                changes.push(Change {
                    path: path.clone(),
                    old: None,
                    new: new.clone(),
                    op: DiffOp::Add,
                });
            }
        }
        Self { changes }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    fn select<'a>(
        &'a self,
        op: DiffOp,
        filter: &'a DiffFilter,
    ) -> impl Iterator<Item = &'a Change> {
        self.changes
            .iter()
            .filter(move |c| c.op == op && filter.matches(&c.path))
    }

    /// All changes: removals, then modifications, then additions.
    pub fn all<'a>(&'a self, filter: &'a DiffFilter) -> impl Iterator<Item = &'a Change> {
        self.remove_modify_then_add(filter)
    }

    pub fn added<'a>(&'a self, filter: &'a DiffFilter) -> impl Iterator<Item = &'a Change> {
        self.select(DiffOp::Add, filter)
    }

    pub fn modified<'a>(&'a self, filter: &'a DiffFilter) -> impl Iterator<Item = &'a Change> {
        self.select(DiffOp::Modify, filter)
    }

    pub fn removed<'a>(&'a self, filter: &'a DiffFilter) -> impl Iterator<Item = &'a Change> {
        self.select(DiffOp::Remove, filter)
    }

    pub fn remove_modify_then_add<'a>(
        &'a self,
        filter: &'a DiffFilter,
    ) -> impl Iterator<Item = &'a Change> {
        self.removed(filter)
            .chain(self.modified(filter))
            .chain(self.added(filter))
    }

    pub fn modify_then_add<'a>(
        &'a self,
        filter: &'a DiffFilter,
    ) -> impl Iterator<Item = &'a Change> {
        self.modified(filter).chain(self.added(filter))
    }

    pub fn remove_then_modify<'a>(
        &'a self,
        filter: &'a DiffFilter,
    ) -> impl Iterator<Item = &'a Change> {
        self.removed(filter).chain(self.modified(filter))
    }
}
