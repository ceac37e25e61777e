use anyhow::Result;
use confnav::Node;

use crate::common::{ConfContext, navigate, parse_path};

pub async fn describe_command(
    ctx: &ConfContext,
    path: &str,
    mut output: impl FnMut(String),
) -> Result<()> {
    let session = ctx.open().await?;
    let steps = parse_path(path)?;

    let description = match steps.split_last() {
        None => session.describe(&Node::from(session.root()), None).await?,
        Some((last, parent_steps)) if last.keys.is_empty() => {
            let parent = navigate(&session, parent_steps).await?;
            session.describe(&parent, Some(&last.name)).await?
        }
        Some(_) => session.describe(&navigate(&session, &steps).await?, None).await?,
    };
    output(description.to_string());
    Ok(())
}
