use anyhow::{Result, anyhow};
use confnav::Node;

use crate::common::{ConfContext, key_values, navigate, parse_path, split_target};

/// Create a list element, a presence container or an empty leaf, then commit.
pub async fn create_command(
    ctx: &ConfContext,
    path: &str,
    mut output: impl FnMut(String),
) -> Result<()> {
    let session = ctx.open().await?;
    let steps = parse_path(path)?;
    let (parent_steps, target) = split_target(&steps)?;
    let parent = navigate(&session, parent_steps).await?;
    let node = parent.child(&target.name).await?;

    if !target.keys.is_empty() {
        let list = node.into_list()?;
        let keys = key_values(&list, &target.keys)?;
        let element = list.create(&keys).await?;
        output(element.handle().data_path());
    } else {
        match node {
            Node::PresenceContainer(container) => {
                container.create().await?;
                output(container.handle().data_path());
            }
            Node::Empty(leaf) => {
                leaf.create().await?;
                output(leaf.handle().data_path());
            }
            Node::List(list) => {
                return Err(anyhow!(
                    "{} needs key values: {}[{}]",
                    path,
                    target.name,
                    list.keys().join(",")
                ));
            }
            other => return Err(anyhow!("Cannot create a {} at {}", other.variant(), path)),
        }
    }
    session.commit().await?;
    Ok(())
}
