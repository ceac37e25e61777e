use anyhow::{Result, anyhow};
use confnav::Node;
use diagnostics::*;

use crate::common::{
    ConfContext, child_schema, key_values, navigate, parse_path, split_target, typed_value,
};

/// Remove whatever `path` names, then commit.
///
/// A list element is removed with its subtree. With `value`, one entry is
/// removed from a leaf-list.
pub async fn delete_command(ctx: &ConfContext, path: &str, value: Option<&str>) -> Result<()> {
    let session = ctx.open().await?;
    let steps = parse_path(path)?;
    let (parent_steps, target) = split_target(&steps)?;
    let parent = navigate(&session, parent_steps).await?;

    if !target.keys.is_empty() {
        let list = parent.child(&target.name).await?.into_list()?;
        let keys = key_values(&list, &target.keys)?;
        list.remove(&keys).await?;
    } else {
        match (parent.child(&target.name).await?, value) {
            (Node::LeafList(leaf_list), Some(literal)) => {
                let (data_path, schema) = child_schema(&session, &parent, &target.name).await?;
                leaf_list
                    .remove(typed_value(&data_path, &schema, literal)?)
                    .await?;
            }
            (_, Some(_)) => return Err(anyhow!("Only leaf-list entries are deleted by value")),
            (Node::PresenceContainer(container), None) => container.delete().await?,
            (Node::Empty(leaf), None) => leaf.remove().await?,
            (Node::Leaf(_), None) => parent.set(&target.name, None).await?,
            (other, None) => {
                return Err(anyhow!("Cannot delete a {} at {}", other.variant(), path));
            }
        }
    }
    session.commit().await?;

    debug!("Deleted {path}", path);
    Ok(())
}
