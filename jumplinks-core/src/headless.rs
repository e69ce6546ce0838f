// File: jumplinks-core/src/headless.rs

//! `headless.rs`
//! Convenience wrapper for one-shot resolutions outside any web framework.
//! The rules and collections are loaded into an in-memory repository, no
//! pages are known and the legacy domain is never probed.
//!
//! License: MIT OR APACHE 2.0

use anyhow::Result;
use std::sync::Arc;

use crate::config::ResolverConfig;
use crate::repository::InMemoryRepository;
use crate::resolver::{JumplinkResolver, Resolution};
use crate::rules::{JumplinkRule, MappingCollections};

/// Resolves `path` against `rules` in the order given.
///
/// # Arguments
///
/// * `config` - Resolver settings; validated before use.
/// * `rules` - The rule set, tried first to last.
/// * `collections` - Mapping collections for `{name|collection}` tokens.
/// * `path` - The request path that found no live route.
pub async fn resolve_path(
    config: ResolverConfig,
    rules: Vec<JumplinkRule>,
    collections: MappingCollections,
    path: &str,
) -> Result<Resolution> {
    config.validate()?;
    let repository = Arc::new(InMemoryRepository::new(rules, collections));
    let resolver = JumplinkResolver::new(config, repository);
    Ok(resolver.resolve(path).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolverDecision;
    use anyhow::Result;

    #[tokio::test]
    async fn test_resolve_path_redirects() -> Result<()> {
        let rules = vec![JumplinkRule::new(1, "articles/{name:segment}", "blog/{name}/", None, None)];
        let resolution = resolve_path(ResolverConfig::default(), rules, MappingCollections::new(), "/articles/Hello-World").await?;

        assert_eq!(
            resolution.decision,
            ResolverDecision::Redirect {
                url: "/blog/hello-world/".to_string(),
                permanent: true,
                rule_id: Some(1),
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_path_rejects_invalid_config() {
        let config = ResolverConfig {
            root_url: "no-slashes".to_string(),
            ..ResolverConfig::default()
        };
        assert!(resolve_path(config, Vec::new(), MappingCollections::new(), "x").await.is_err());
    }
}
