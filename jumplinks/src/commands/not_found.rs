// jumplinks/src/commands/not_found.rs
//! `jumplinks not-found`: the not-found monitor log.

use anyhow::Result;
use comfy_table::{ContentArrangement, Table};
use is_terminal::IsTerminal;
use jumplinks_core::NotFoundEntry;
use std::io::{self, Write};

use crate::commands::CommandContext;
use crate::ui::output_format;
use crate::ui::theme::ThemeEntry;

pub fn not_found_table(entries: &[NotFoundEntry]) -> Table {
    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["When", "Request", "Referrer", "User Agent"]);
    for entry in entries {
        table.add_row(vec![
            entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            entry.request.clone(),
            entry.referrer.clone().unwrap_or_default(),
            entry.user_agent.clone().unwrap_or_default(),
        ]);
    }
    table
}

pub async fn run_not_found(ctx: &CommandContext, clear: bool) -> Result<()> {
    let mut store = ctx.load_store()?;
    let repository = store.to_repository();

    if clear {
        let cleared = repository.clear_not_found().await;
        store.absorb(&repository).await;
        store.save(&ctx.store_path)?;
        ctx.success(format!("Cleared {} not-found entries.", cleared));
        return Ok(());
    }

    let recent = repository.recent_not_found().await;
    if recent.is_empty() {
        ctx.info("The not-found log is empty.");
        return Ok(());
    }

    let stdout = io::stdout();
    let supports_color = stdout.is_terminal();
    let mut writer = stdout.lock();
    let title = format!("Most recent not-found requests ({} of {})", recent.len(), store.not_found.len());
    writeln!(writer, "{}", output_format::styled(&title, ThemeEntry::Header, &ctx.theme, supports_color))?;
    writeln!(writer, "{}", not_found_table(&recent))?;
    Ok(())
}
