//! Turns a resolved schema node into the matching navigation handle.

use crate::error::{Error, Result};
use crate::node::{
    Case, Choice, Container, Context, EmptyLeaf, Handle, LeafList, List, Node, PresenceContainer,
};
use crate::path::Path;
use crate::schema::{SchemaKind, SchemaNode};
use crate::value::LeafType;
use diagnostics::*;
use std::sync::Arc;

/// Build the node for `path`, whose schema has already been resolved.
///
/// Leaves are read straight away and come back as their value, falling back
/// to the schema default when nothing is stored.
pub(crate) async fn dispatch(
    ctx: &Arc<Context>,
    path: Path,
    schema: Arc<SchemaNode>,
) -> Result<Node> {
    let kind = schema.kind.clone();
    let handle = Handle::new(ctx.clone(), path, schema);
    let node = match kind {
        SchemaKind::Container if handle.schema().presence => {
            Node::PresenceContainer(PresenceContainer::new(handle))
        }
        SchemaKind::Container => Node::Container(Container::new(handle)),
        SchemaKind::List => Node::List(List::new(handle)),
        SchemaKind::LeafList => Node::LeafList(LeafList::new(handle)),
        SchemaKind::Choice => Node::Choice(Choice::new(handle)),
        SchemaKind::Case => Node::Case(Case::new(handle)),
        SchemaKind::Leaf => {
            let is_empty = handle
                .schema()
                .leaf_type
                .as_ref()
                .is_some_and(|t| t.base == LeafType::Empty);
            if is_empty {
                Node::Empty(EmptyLeaf::new(handle))
            } else {
                let value = handle.dal().get(&handle.data_path()).await?;
                Node::Leaf(value.or_else(|| handle.schema().default.clone()))
            }
        }
        SchemaKind::Other(other) => {
            let path = handle.schema_path();
            error!(
                "Unsupported schema node {kind} at {path}",
                kind: other.as_str(),
                path: path.as_str()
            );
            return Err(Error::unrecognized_schema_kind(path, other));
        }
    };
    Ok(node)
}
