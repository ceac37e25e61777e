//! confnav - schema-driven navigation of hierarchical configuration data
//!
//! Set CONFNAV_LOG to control logging (see the diagnostics crate):
//! - CONFNAV_LOG=off (default) - silent
//! - CONFNAV_LOG=info - connections and commits
//! - CONFNAV_LOG=debug - cache hits, misses and invalidations

// Error types
pub mod error;

// Scalar values and leaf types
pub mod value;

/// Schema description and the provider contract
pub mod schema;

/// YAML/JSON schema provider
pub mod schema_tree;

/// Memoized schema resolution with hyphen fallback
pub mod schema_cache;

/// Data and schema path construction
pub mod path;

/// List key predicate codec
pub mod keys;

/// Backend contract
pub mod dal;

// Flat data tree shared by the bundled backends
mod tree;

pub mod memory_store;
pub mod file_store;

/// Caching decorator for any backend
pub mod caching_proxy;

// Navigation handles and their dispatch
pub mod node;
mod factory;

pub mod session;

/// Change sets between two path dumps
pub mod diff;

#[cfg(test)]
mod tests;

pub use caching_proxy::{CacheStats, CachingProxy};
pub use dal::{DataAccessLayer, Document, Entry, PathDump, PathStream, ValueStream};
pub use diff::{Change, DiffFilter, DiffOp, DiffSet};
pub use error::{Error, Result};
pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use node::{
    Case, Choice, Container, ElementStream, EmptyLeaf, Handle, LeafList, List, ListElement,
    Navigate, Node, PresenceContainer,
};
pub use path::{Path, Step};
pub use schema::{KeyDef, SchemaKind, SchemaNode, SchemaProvider};
pub use schema_cache::SchemaCache;
pub use schema_tree::SchemaTree;
pub use session::{Description, Session, SessionConfig};
pub use value::{LeafType, TypeSpec, Value};
