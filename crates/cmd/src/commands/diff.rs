use std::path::Path;

use anyhow::{Context, Result};
use confnav::{Change, DiffFilter, DiffOp, DiffSet, MemoryStore, Session, SessionConfig};

use crate::common::ConfContext;

/// Compare the datastore with a document file.
///
/// Changes are listed as the edits that turn the datastore into the file:
/// removals, then modifications, then additions.
pub async fn diff_command(
    ctx: &ConfContext,
    file: &Path,
    filter: &DiffFilter,
    mut output: impl FnMut(String),
) -> Result<()> {
    let payload = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let session = ctx.open().await?;
    let before = session.dump_paths().await?;

    let other = Session::connect(ctx.load_schema()?, MemoryStore::new(), SessionConfig::default())
        .await?;
    other.loads(&payload).await?;
    let after = other.dump_paths().await?;

    let diff = DiffSet::compute(&before, &after, filter);
    for change in diff.all(filter) {
        output(format_change(change));
    }
    Ok(())
}

fn format_change(change: &Change) -> String {
    let show = |v: &Option<confnav::Value>| v.as_ref().map(ToString::to_string).unwrap_or_default();
    match change.op {
        DiffOp::Remove => format!("- {}", change.path),
        DiffOp::Modify => format!(
            "~ {}: {} -> {}",
            change.path,
            show(&change.old),
            show(&change.new)
        ),
        DiffOp::Add => match &change.new {
            Some(value) => format!("+ {} = {}", change.path, value),
            None => format!("+ {}", change.path),
        },
    }
}
