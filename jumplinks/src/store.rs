// jumplinks/src/store.rs
//! The YAML file that stands in for the rule database.
//!
//! A store holds the rules, mapping collections, a fixed page table for
//! `page:<id>` destinations and `[[selector]]` lookups, and the not-found log.
//! Commands load it, hand it to the core as an `InMemoryRepository`, then
//! write back whatever the resolution changed.

use anyhow::{Context, Result};
use jumplinks_core::{
    InMemoryRepository, JumplinkRule, MappingCollections, NotFoundEntry, ResolverConfig, StaticPageResolver,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const STORE_DIR: &str = "jumplinks";
const STORE_FILE: &str = "store.yaml";

/// On-disk store contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleStore {
    pub rules: Vec<JumplinkRule>,
    pub collections: MappingCollections,
    pub pages: StaticPageResolver,
    pub not_found: Vec<NotFoundEntry>,
}

/// `<config dir>/jumplinks/store.yaml`.
pub fn default_store_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine the user configuration directory; pass --store")?;
    Ok(base.join(STORE_DIR).join(STORE_FILE))
}

/// The explicit path, or the default one.
pub fn resolve_store_path(explicit: Option<&PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.clone()),
        None => default_store_path(),
    }
}

/// Loads the resolver configuration, or the defaults when no file is given.
pub fn load_config(path: Option<&PathBuf>) -> Result<ResolverConfig> {
    match path {
        Some(path) => ResolverConfig::load_from_file(path),
        None => {
            debug!("No configuration file given; using defaults.");
            Ok(ResolverConfig::default())
        }
    }
}

impl RuleStore {
    /// Reads the store. A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No rule store at {}; starting empty.", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read rule store {}", path.display()))?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let store: RuleStore = serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse rule store {}", path.display()))?;
        debug!(
            "Loaded {} rules, {} collections and {} not-found entries from {}",
            store.rules.len(),
            store.collections.len(),
            store.not_found.len(),
            path.display()
        );
        Ok(store)
    }

    /// Writes the store, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create store directory {}", parent.display()))?;
        }
        let text = serde_yaml::to_string(self).context("Failed to serialise rule store")?;
        fs::write(path, text).with_context(|| format!("Failed to write rule store {}", path.display()))?;
        debug!("Saved rule store to {}", path.display());
        Ok(())
    }

    /// Builds the repository the resolver reads from. Rules are served
    /// ordered by source text.
    pub fn to_repository(&self) -> InMemoryRepository {
        let mut rules = self.rules.clone();
        rules.sort_by(|a, b| a.source.cmp(&b.source));
        InMemoryRepository::new(rules, self.collections.clone()).with_not_found(self.not_found.clone())
    }

    /// Copies everything the repository may have changed back into the store.
    pub async fn absorb(&mut self, repository: &InMemoryRepository) {
        let mut rules = repository.rules().await;
        rules.sort_by_key(|rule| rule.id);
        self.rules = rules;
        self.collections = repository.collections().await;
        self.not_found = repository.not_found_entries().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> RuleStore {
        RuleStore {
            rules: vec![
                JumplinkRule::new(1, "zebra", "z/", None, None),
                JumplinkRule::new(2, "apple", "a/", None, None),
            ],
            ..RuleStore::default()
        }
    }

    #[test]
    fn missing_file_is_empty_store() -> Result<()> {
        let dir = tempdir()?;
        let store = RuleStore::load(&dir.path().join("nothing.yaml"))?;
        assert_eq!(store, RuleStore::default());
        Ok(())
    }

    #[test]
    fn save_then_load() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("store.yaml");
        let mut store = sample();
        store.pages.ids.insert(7, "/contact/".to_string());
        store.save(&path)?;

        assert_eq!(RuleStore::load(&path)?, store);
        Ok(())
    }

    #[tokio::test]
    async fn repository_orders_by_source_and_absorb_orders_by_id() {
        let mut store = sample();
        let repository = store.to_repository();
        let served: Vec<u64> = repository.rules().await.iter().map(|r| r.id).collect();
        assert_eq!(served, vec![2, 1]);

        store.absorb(&repository).await;
        let saved: Vec<u64> = store.rules.iter().map(|r| r.id).collect();
        assert_eq!(saved, vec![1, 2]);
    }
}
