use anyhow::Result;

use crate::common::{ConfContext, navigate, parse_path};

pub async fn children_command(
    ctx: &ConfContext,
    path: &str,
    mut output: impl FnMut(String),
) -> Result<()> {
    let session = ctx.open().await?;
    let steps = parse_path(path)?;
    for child in navigate(&session, &steps).await?.children().await? {
        output(child);
    }
    Ok(())
}
