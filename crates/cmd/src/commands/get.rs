use anyhow::{Result, anyhow};
use confnav::{Node, Value};
use futures::TryStreamExt;

use crate::common::{ConfContext, navigate, parse_path};

/// Print the value at `path`: a leaf value, each leaf-list entry, or whether
/// an empty leaf or presence container exists.
pub async fn get_command(
    ctx: &ConfContext,
    path: &str,
    mut output: impl FnMut(String),
) -> Result<()> {
    let session = ctx.open().await?;
    let steps = parse_path(path)?;

    match navigate(&session, &steps).await? {
        Node::Leaf(Some(value)) => output(value.to_string()),
        Node::Leaf(None) => output("(unset)".to_string()),
        Node::Empty(leaf) => output(presence(leaf.exists().await?)),
        Node::PresenceContainer(container) => output(presence(container.exists().await?)),
        Node::LeafList(leaf_list) => {
            let values: Vec<Value> = leaf_list.values().await?.try_collect().await?;
            for value in values {
                output(value.to_string());
            }
        }
        other => {
            return Err(anyhow!(
                "{} is a {} and has no value; try `children`",
                path,
                other.variant()
            ));
        }
    }
    Ok(())
}

fn presence(exists: bool) -> String {
    let state = if exists { "present" } else { "absent" };
    state.to_string()
}
