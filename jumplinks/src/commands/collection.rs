// jumplinks/src/commands/collection.rs
//! `jumplinks collection`: creates or extends a mapping collection.

use anyhow::{bail, Result};
use jumplinks_core::rules::parse_mapping_line;
use jumplinks_core::sanitize_collection_name;

use crate::cli::CollectionCommand;
use crate::commands::CommandContext;

/// Parses `key=value` arguments, rejecting anything without a key.
pub fn parse_pairs(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|pair| match parse_mapping_line(pair) {
            Some(parsed) => Ok(parsed),
            None => bail!("'{}' is not a key=value mapping", pair),
        })
        .collect()
}

pub async fn run_collection(ctx: &CommandContext, cmd: &CollectionCommand) -> Result<()> {
    if sanitize_collection_name(&cmd.name).is_empty() {
        bail!("Collection name '{}' contains no letters", cmd.name);
    }
    let pairs = parse_pairs(&cmd.mappings)?;

    let mut store = ctx.load_store()?;
    let repository = store.to_repository();
    let name = repository
        .upsert_collection(&cmd.name, pairs, ctx.config.wildcard_cleaning, &ctx.config.slug_cleaner())
        .await;

    store.absorb(&repository).await;
    store.save(&ctx.store_path)?;

    let size = store.collections.get(&name).map(|c| c.mappings.len()).unwrap_or_default();
    ctx.success(format!("Collection '{}' now holds {} mappings.", name, size));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_are_trimmed_and_validated() {
        let pairs = parse_pairs(&["red = ff0000".to_string(), "blue=0000ff".to_string()]).unwrap();
        assert_eq!(pairs[0], ("red".to_string(), "ff0000".to_string()));
        assert_eq!(pairs.len(), 2);

        assert!(parse_pairs(&["no-equals-sign".to_string()]).is_err());
        assert!(parse_pairs(&["=value".to_string()]).is_err());
    }
}
