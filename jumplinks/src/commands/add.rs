// jumplinks/src/commands/add.rs
//! `jumplinks add`: appends a rule to the store.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use jumplinks_core::compile_pattern;

use crate::cli::AddCommand;
use crate::commands::CommandContext;

/// Parses an optional RFC 3339 timestamp; blank means unset.
pub fn parse_timestamp(value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let parsed = DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("'{}' is not an RFC 3339 timestamp", value))?;
    Ok(Some(parsed.with_timezone(&Utc)))
}

pub async fn run_add(ctx: &CommandContext, cmd: &AddCommand) -> Result<()> {
    let date_start = parse_timestamp(cmd.start.as_deref())?;
    let date_end = parse_timestamp(cmd.end.as_deref())?;

    let mut store = ctx.load_store()?;
    let repository = store.to_repository();
    let rule = repository
        .add_rule(&cmd.source, &cmd.destination, date_start, date_end, &store.pages)
        .await;

    // Stored regardless; the resolver skips a rule that does not compile.
    if let Err(err) = compile_pattern(&rule.source, &ctx.config.wildcard_registry()) {
        ctx.warn(format!("Jumplink #{} will be skipped until its source is fixed: {}", rule.id, err));
    }

    store.absorb(&repository).await;
    store.save(&ctx.store_path)?;
    ctx.success(format!("Added jumplink #{}: {} -> {}", rule.id, rule.source, rule.destination));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps() {
        assert_eq!(parse_timestamp(None).unwrap(), None);
        assert_eq!(parse_timestamp(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_timestamp(Some("2025-01-02T03:04:05+02:00")).unwrap(),
            Some(Utc.with_ymd_and_hms(2025, 1, 2, 1, 4, 5).unwrap())
        );
        assert!(parse_timestamp(Some("next tuesday")).is_err());
    }
}
