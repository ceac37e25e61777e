use anyhow::{Result, anyhow};
use confnav::SchemaKind;
use diagnostics::*;

use crate::common::{ConfContext, child_schema, navigate, parse_path, split_target, typed_value};

/// Assign a leaf, or add an entry to a leaf-list, then commit.
pub async fn set_command(ctx: &ConfContext, path: &str, literal: &str) -> Result<()> {
    let session = ctx.open().await?;
    let steps = parse_path(path)?;
    let (parent_steps, target) = split_target(&steps)?;
    if !target.keys.is_empty() {
        return Err(anyhow!("{} names a list element; use `create`", path));
    }

    let parent = navigate(&session, parent_steps).await?;
    let (data_path, schema) = child_schema(&session, &parent, &target.name).await?;
    let value = typed_value(&data_path, &schema, literal)?;

    if schema.kind == SchemaKind::LeafList {
        let leaf_list = parent.child(&target.name).await?.into_leaf_list()?;
        leaf_list.add(value).await?;
    } else {
        parent.set(&target.name, Some(value)).await?;
    }
    session.commit().await?;

    debug!("Set {path} to {literal}", path, literal);
    Ok(())
}
