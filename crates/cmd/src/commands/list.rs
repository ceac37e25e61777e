use anyhow::Result;
use confnav::ListElement;
use futures::TryStreamExt;

use crate::common::{ConfContext, navigate, parse_path};

pub async fn list_command(
    ctx: &ConfContext,
    path: &str,
    sorted: bool,
    mut output: impl FnMut(String),
) -> Result<()> {
    let session = ctx.open().await?;
    let steps = parse_path(path)?;
    let list = navigate(&session, &steps).await?.into_list()?;

    let elements: Vec<ListElement> = list.elements(sorted).await?.try_collect().await?;
    for element in elements {
        let keys: Vec<String> = element.keys().into_iter().map(|(_, v)| v).collect();
        output(format!("{}[{}]", path, keys.join(",")));
    }
    Ok(())
}
