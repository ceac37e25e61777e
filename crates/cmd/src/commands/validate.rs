use anyhow::Result;

use crate::common::ConfContext;

pub async fn validate_command(ctx: &ConfContext, mut output: impl FnMut(String)) -> Result<()> {
    let session = ctx.open().await?;
    session.validate().await?;
    output(format!("{} is valid", ctx.store.display()));
    Ok(())
}
