// jumplinks/src/commands/list.rs
//! `jumplinks list`: the rule table.

use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::{ContentArrangement, Table};
use is_terminal::IsTerminal;
use jumplinks_core::{ActivationWindow, JumplinkRule};
use std::io::{self, Write};

use crate::commands::CommandContext;
use crate::ui::output_format;
use crate::ui::theme::ThemeEntry;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

fn short(ts: DateTime<Utc>) -> String {
    ts.format(DATE_FORMAT).to_string()
}

/// The timing column: the raw window bounds, or the disabled marker.
pub fn timing(rule: &JumplinkRule) -> String {
    if rule.is_disabled() {
        return "disabled".to_string();
    }
    let window = ActivationWindow::for_rule(rule);
    match (window.start, window.end) {
        (None, None) => "always".to_string(),
        (Some(start), None) => format!("from {}", short(start)),
        (None, Some(end)) => format!("until {}", short(end)),
        (Some(start), Some(end)) if end < start => format!("from {} (ends before it starts)", short(start)),
        (Some(start), Some(end)) => format!("{} to {}", short(start), short(end)),
    }
}

pub fn rules_table(rules: &[JumplinkRule]) -> Table {
    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Source", "Destination", "Hits", "Last Hit", "Timing"]);
    for rule in rules {
        table.add_row(vec![
            rule.id.to_string(),
            rule.source.clone(),
            rule.destination.clone(),
            rule.hits.to_string(),
            rule.last_hit().map(short).unwrap_or_else(|| "never".to_string()),
            timing(rule),
        ]);
    }
    table
}

pub fn run_list(ctx: &CommandContext) -> Result<()> {
    let store = ctx.load_store()?;
    if store.rules.is_empty() {
        ctx.info("No jumplinks yet. Add one with `jumplinks add <SOURCE> <DESTINATION>`.");
        return Ok(());
    }

    let stdout = io::stdout();
    let supports_color = stdout.is_terminal();
    let mut writer = stdout.lock();
    let title = format!("Jumplinks ({})", store.rules.len());
    writeln!(writer, "{}", output_format::styled(&title, ThemeEntry::Header, &ctx.theme, supports_color))?;
    writeln!(writer, "{}", rules_table(&store.rules))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timing_column() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();

        assert_eq!(timing(&JumplinkRule::new(1, "a", "b", None, None)), "always");
        assert_eq!(timing(&JumplinkRule::new(1, "!!a", "b", None, None)), "disabled");
        assert_eq!(timing(&JumplinkRule::new(1, "a", "b", Some(start), None)), "from 2025-01-01 00:00");
        assert_eq!(timing(&JumplinkRule::new(1, "a", "b", None, Some(end))), "until 2025-02-01 00:00");
        assert_eq!(
            timing(&JumplinkRule::new(1, "a", "b", Some(start), Some(end))),
            "2025-01-01 00:00 to 2025-02-01 00:00"
        );
    }

    #[test]
    fn table_lists_every_rule() {
        let rules = vec![
            JumplinkRule::new(1, "old-page", "new-page/", None, None),
            JumplinkRule::new(2, "blog/{title}", "articles/{title}/", None, None),
        ];
        let rendered = rules_table(&rules).to_string();
        assert!(rendered.contains("old-page"));
        assert!(rendered.contains("articles/{title}/"));
        assert!(rendered.contains("never"));
    }
}
