// jumplinks-core/src/lib.rs
//! # Jumplinks Core Library
//!
//! `jumplinks-core` resolves requests that found no live route against a set
//! of "jumplink" redirect rules. A rule pairs a source pattern written in a
//! small wildcard syntax with a destination template; the first rule whose
//! pattern matches, whose destination renders and whose activation window is
//! open produces the redirect.
//!
//! The library owns no storage and no HTTP front end. Rules, mapping
//! collections and page lookups are consumed through async ports, and every
//! resolution returns a structured trace instead of writing to a transport.
//!
//! ## Modules
//!
//! * `wildcards`: Wildcard types and smart wildcard shortcuts.
//! * `slug`: Cleans captured values into URL slugs.
//! * `patterns`: Compiles sources into matchers, with a process-wide cache.
//! * `render`: Builds destination URLs from templates and captures.
//! * `activation`: Timed activation and permanent/temporary classification.
//! * `resolver`: The `JumplinkResolver` orchestrator.
//! * `rules`: Jumplink rules and mapping collections.
//! * `repository`: Persistence and page lookup ports, plus in-memory versions.
//! * `legacy`: The legacy domain fallback probe.
//! * `trace`: The evaluation trace.
//! * `config`: Resolver configuration.
//! * `headless`: One-shot resolution helper.
//!
//! ## Usage Example
//!
//! ```rust
//! use jumplinks_core::{resolve_path, JumplinkRule, MappingCollections, ResolverConfig, ResolverDecision};
//! use anyhow::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let rules = vec![JumplinkRule::new(1, "articles/{title}", "blog/{title}/", None, None)];
//!
//!     let resolution = resolve_path(
//!         ResolverConfig::default(),
//!         rules,
//!         MappingCollections::new(),
//!         "/articles/Hello-World",
//!     )
//!     .await?;
//!
//!     println!("{}", resolution.trace);
//!     assert_eq!(
//!         resolution.decision,
//!         ResolverDecision::Redirect { url: "/blog/hello-world/".to_string(), permanent: true, rule_id: Some(1) }
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Fallible library operations return [`JumplinksError`]. Errors scoped to a
//! single rule are contained by the resolver; store failures are attached to
//! the returned [`Resolution`]. Configuration loading uses `anyhow` with
//! context.
//!
//! ---
//! License: MIT OR APACHE 2.0

pub mod activation;
pub mod config;
pub mod errors;
pub mod headless;
pub mod legacy;
pub mod patterns;
pub mod render;
pub mod repository;
pub mod resolver;
pub mod rules;
pub mod slug;
pub mod trace;
pub mod wildcards;

/// Re-exports the configuration types.
pub use config::{parse_status_codes, CleaningPolicy, ResolverConfig};

/// Re-exports the custom error type for clear error reporting.
pub use errors::JumplinksError;

/// Re-exports the rule model.
pub use rules::{sanitize_collection_name, JumplinkRule, MappingCollection, MappingCollections};

pub use wildcards::{SmartWildcard, WildcardRegistry, DEFAULT_EXTENSIONS};
pub use slug::SlugCleaner;
pub use patterns::compiler::{compile_pattern, get_or_compile, CompiledPattern};
pub use render::{compile_destination_url, DestinationRenderer, RenderedDestination, WildcardCheck};
pub use activation::{ActivationState, ActivationWindow, RedirectKind};

/// Re-exports the resolver and its collaborator ports.
pub use resolver::{IncomingRequest, JumplinkResolver, Resolution, ResolverDecision};
pub use repository::{
    InMemoryRepository, NoPages, NotFoundEntry, PageResolver, RuleRepository, StaticPageResolver,
};
pub use legacy::{HttpLegacyProbe, LegacyProbe};
pub use trace::{ScanLog, TraceEntry};

/// Re-exports the one-shot helper.
pub use headless::resolve_path;
