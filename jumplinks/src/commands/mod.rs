// jumplinks/src/commands/mod.rs
//! Command implementations and the shared context they run with.

pub mod add;
pub mod check;
pub mod collection;
pub mod list;
pub mod not_found;
pub mod resolve;

use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use jumplinks_core::{JumplinkResolver, ResolverConfig};
use log::debug;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::{Cli, Commands};
use crate::store::{load_config, resolve_store_path, RuleStore};
use crate::ui::output_format;
use crate::ui::theme::{build_theme_map, ThemeMap};

/// Everything a command needs besides its own arguments.
pub struct CommandContext {
    pub store_path: PathBuf,
    pub config: ResolverConfig,
    pub theme: ThemeMap,
    pub quiet: bool,
}

impl CommandContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let theme = build_theme_map(cli.theme.as_ref()).context("Theme error")?;
        let config = load_config(cli.config.as_ref())?;
        let store_path = resolve_store_path(cli.store.as_ref())?;
        debug!("Using rule store {}", store_path.display());
        Ok(Self {
            store_path,
            config,
            theme,
            quiet: cli.quiet,
        })
    }

    pub fn load_store(&self) -> Result<RuleStore> {
        RuleStore::load(&self.store_path)
    }

    /// A resolver over `store` using `config`, with the store's page table
    /// and, when a legacy domain is configured, the HTTP probe.
    pub fn resolver_for(
        &self,
        store: &RuleStore,
        config: ResolverConfig,
    ) -> Result<(JumplinkResolver, Arc<jumplinks_core::InMemoryRepository>)> {
        let repository = Arc::new(store.to_repository());
        let resolver = JumplinkResolver::new(config, repository.clone())
            .with_pages(Arc::new(store.pages.clone()))
            .with_http_legacy_probe()
            .context("Failed to set up the legacy domain probe")?;
        Ok((resolver, repository))
    }

    /// Informational message on stderr, dropped with `--quiet`.
    pub fn info(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }
        let supports_color = io::stderr().is_terminal();
        let _ = output_format::print_info_message(&mut io::stderr(), msg.as_ref(), &self.theme, supports_color);
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }
        let supports_color = io::stderr().is_terminal();
        let _ = output_format::print_success_message(&mut io::stderr(), msg.as_ref(), &self.theme, supports_color);
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        let supports_color = io::stderr().is_terminal();
        let _ = output_format::print_warn_message(&mut io::stderr(), msg.as_ref(), &self.theme, supports_color);
    }
}

/// Runs the selected command.
pub async fn dispatch(cli: Cli) -> Result<()> {
    let ctx = CommandContext::from_cli(&cli)?;
    match cli.command {
        Commands::Check(cmd) => check::run_check(&ctx, &cmd).await,
        Commands::Resolve(cmd) => resolve::run_resolve(&ctx, &cmd).await,
        Commands::Add(cmd) => add::run_add(&ctx, &cmd).await,
        Commands::Collection(cmd) => collection::run_collection(&ctx, &cmd).await,
        Commands::List => list::run_list(&ctx),
        Commands::NotFound { clear } => not_found::run_not_found(&ctx, clear).await,
    }
}
