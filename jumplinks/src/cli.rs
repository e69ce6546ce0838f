// jumplinks/src/cli.rs
//! This file defines the command-line interface (CLI) for the jumplinks
//! application, including all available commands and their arguments.
//! License: MIT OR APACHE 2.0

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "jumplinks",
    author = "Obscura Team (Relay)",
    version = env!("CARGO_PKG_VERSION"),
    about = "Manage and test wildcard redirect rules",
    long_about = "Jumplinks resolves requests that found no page against a list of redirect rules. Each rule pairs a source pattern written in a small wildcard syntax with a destination template. This tool keeps the rules in a YAML store and lets you add rules and mapping collections, try requests against them with a full evaluation trace, and review the requests nothing matched.",
    arg_required_else_help = true,
)]
pub struct Cli {
    /// Path to the YAML rule store.
    #[arg(long, global = true, value_name = "FILE", env = "JUMPLINKS_STORE", help = "Path to the YAML rule store (defaults to <config dir>/jumplinks/store.yaml).")]
    pub store: Option<PathBuf>,

    /// Path to the resolver configuration.
    #[arg(long, global = true, value_name = "FILE", env = "JUMPLINKS_CONFIG", help = "Path to a YAML resolver configuration file.")]
    pub config: Option<PathBuf>,

    /// Specify the path to a custom YAML theme file.
    #[arg(long = "theme", global = true, value_name = "FILE", help = "Specify the path to a custom YAML theme file.")]
    pub theme: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, short = 'd', global = true, help = "Enable debug logging.")]
    pub debug: bool,

    /// Disable informational messages
    #[arg(long, short = 'q', global = true, help = "Suppress all informational and debug messages.")]
    pub quiet: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// All available commands for the `jumplinks` CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluates a request without recording anything and prints the trace.
    #[command(about = "Evaluate a request in debug mode and print the evaluation trace.")]
    Check(CheckCommand),

    /// Resolves a request the way the site would.
    #[command(about = "Resolve a request, recording hits and not-found entries.")]
    Resolve(ResolveCommand),

    /// Adds a jumplink rule.
    #[command(about = "Add a jumplink rule.")]
    Add(AddCommand),

    /// Creates or extends a mapping collection.
    #[command(about = "Create or extend a mapping collection.")]
    Collection(CollectionCommand),

    /// Lists every jumplink.
    #[command(about = "List every jumplink with its hit count and timing.")]
    List,

    /// Shows or clears the not-found log.
    #[command(name = "not-found", about = "Show the most recent requests nothing matched.")]
    NotFound {
        /// Empty the log instead of showing it.
        #[arg(long, help = "Clear the not-found log.")]
        clear: bool,
    },
}

/// Arguments for the `check` command.
#[derive(Parser, Debug)]
pub struct CheckCommand {
    /// The request path, e.g. `/old/page.html`.
    #[arg(value_name = "PATH", allow_hyphen_values = true)]
    pub path: String,

    /// Print the decision and trace as JSON.
    #[arg(long, help = "Print the decision and trace as JSON.")]
    pub json: bool,
}

/// Arguments for the `resolve` command.
#[derive(Parser, Debug)]
pub struct ResolveCommand {
    #[arg(value_name = "PATH", allow_hyphen_values = true)]
    pub path: String,

    #[arg(long, value_name = "URL", help = "Referrer recorded with a not-found entry.")]
    pub referrer: Option<String>,

    #[arg(long = "user-agent", value_name = "UA", help = "User agent recorded with a not-found entry.")]
    pub user_agent: Option<String>,
}

/// Arguments for the `add` command.
#[derive(Parser, Debug)]
pub struct AddCommand {
    /// Source pattern, relative to the site root.
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// Destination template, a `page:<id>` reference or an absolute URL.
    #[arg(value_name = "DESTINATION")]
    pub destination: String,

    #[arg(long, value_name = "RFC3339", help = "Activate the jumplink from this time (RFC 3339).")]
    pub start: Option<String>,

    #[arg(long, value_name = "RFC3339", help = "Deactivate the jumplink after this time (RFC 3339).")]
    pub end: Option<String>,
}

/// Arguments for the `collection` command.
#[derive(Parser, Debug)]
pub struct CollectionCommand {
    /// Collection name; reduced to lower-case letters.
    #[arg(value_name = "NAME")]
    pub name: String,

    /// `key=value` pairs to add or overwrite.
    #[arg(value_name = "KEY=VALUE", required = true)]
    pub mappings: Vec<String>,
}
