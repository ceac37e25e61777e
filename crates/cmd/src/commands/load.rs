use std::path::Path;

use anyhow::{Context, Result};
use diagnostics::*;

use crate::common::ConfContext;

/// Replace the datastore contents with a document, or merge the document
/// into them, then commit.
pub async fn load_command(ctx: &ConfContext, file: &Path, merge: bool) -> Result<()> {
    let payload = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let session = ctx.open().await?;
    if merge {
        session.merges(&payload).await?;
    } else {
        session.loads(&payload).await?;
    }
    session.commit().await?;

    let file = file.display().to_string();
    info!("Loaded {file}", file: file.as_str(), merge);
    Ok(())
}
