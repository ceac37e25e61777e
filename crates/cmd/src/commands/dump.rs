use anyhow::Result;

use crate::common::ConfContext;

/// Print the datastore, as a document or as one `path = value` line per node.
pub async fn dump_command(
    ctx: &ConfContext,
    paths: bool,
    mut output: impl FnMut(String),
) -> Result<()> {
    let session = ctx.open().await?;
    if !paths {
        output(session.dumps().await?);
        return Ok(());
    }
    for (path, value) in session.dump_paths().await? {
        match value {
            Some(value) => output(format!("{} = {}", path, value)),
            None => output(path),
        }
    }
    Ok(())
}
