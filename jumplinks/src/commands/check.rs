// jumplinks/src/commands/check.rs
//! `jumplinks check`: debug-mode evaluation of a single request.
//!
//! The resolver runs with `dryRun` forced on and the store is never written,
//! so a check can be repeated without touching hit counters or the
//! not-found log.

use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use jumplinks_core::{ResolverDecision, ScanLog};
use log::info;
use serde::Serialize;
use std::io::{self, Write};

use crate::cli::CheckCommand;
use crate::commands::CommandContext;
use crate::ui::output_format;

/// The `--json` document.
#[derive(Debug, Serialize)]
pub struct CheckReport<'a> {
    pub request: &'a str,
    pub status: u16,
    pub decision: &'a ResolverDecision,
    pub trace: &'a ScanLog,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn run_check(ctx: &CommandContext, cmd: &CheckCommand) -> Result<()> {
    info!("Checking '{}' in debug mode.", cmd.path);
    let store = ctx.load_store()?;
    let mut config = ctx.config.clone();
    config.dry_run = true;

    let (resolver, _) = ctx.resolver_for(&store, config)?;
    let resolution = resolver.resolve(&cmd.path).await;

    let stdout = io::stdout();
    let mut writer = stdout.lock();

    if cmd.json {
        let report = CheckReport {
            request: &cmd.path,
            status: resolution.decision.status_code(),
            decision: &resolution.decision,
            trace: &resolution.trace,
            error: resolution.error.as_ref().map(|e| e.to_string()),
        };
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise check report")?;
        writeln!(writer, "{}", json)?;
        return Ok(());
    }

    let supports_color = stdout.is_terminal();
    output_format::print_trace(&mut writer, &resolution.trace, &ctx.theme, supports_color)?;
    writeln!(writer)?;
    output_format::print_decision(&mut writer, &resolution.decision, &ctx.theme, supports_color)?;

    if let Some(err) = &resolution.error {
        ctx.warn(format!("The rule store failed during evaluation: {}", err));
    }
    Ok(())
}
