// jumplinks/src/commands/resolve.rs
//! `jumplinks resolve`: a live resolution. Hits and not-found entries are
//! recorded and written back to the store.

use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use jumplinks_core::IncomingRequest;
use log::info;
use std::io;

use crate::cli::ResolveCommand;
use crate::commands::CommandContext;
use crate::ui::output_format;

pub async fn run_resolve(ctx: &CommandContext, cmd: &ResolveCommand) -> Result<()> {
    let mut store = ctx.load_store()?;
    let (resolver, repository) = ctx.resolver_for(&store, ctx.config.clone())?;

    let request = IncomingRequest::new(cmd.path.as_str())
        .with_referrer(cmd.referrer.clone())
        .with_user_agent(cmd.user_agent.clone());
    let resolution = resolver.on_not_found(&request).await;

    if let Some(err) = resolution.error {
        return Err(err).with_context(|| format!("Could not resolve '{}'", cmd.path));
    }

    if !ctx.config.dry_run {
        store.absorb(&repository).await;
        store.save(&ctx.store_path)?;
    }

    info!("'{}' resolved to {}", cmd.path, output_format::decision_line(&resolution.decision));
    let stdout = io::stdout();
    let supports_color = stdout.is_terminal();
    output_format::print_decision(&mut stdout.lock(), &resolution.decision, &ctx.theme, supports_color)?;
    Ok(())
}
