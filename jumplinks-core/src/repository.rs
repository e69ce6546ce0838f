//! repository.rs - Collaborator ports used by the resolver.
//!
//! The resolver never talks to storage or a CMS directly. It consumes rules,
//! mapping collections and page lookups through the async traits defined
//! here, and reports hits and unmatched requests back through them.
//! `InMemoryRepository` and `StaticPageResolver` are complete, lock-guarded
//! implementations used by the headless wrapper and the CLI.
//!
//! License: MIT OR APACHE 2.0

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::config::CleaningPolicy;
use crate::errors::JumplinksError;
use crate::rules::{JumplinkRule, MappingCollections};
use crate::slug::SlugCleaner;

/// Most recent not-found entries a listing returns.
pub const NOT_FOUND_LISTING_LIMIT: usize = 100;

/// A request that no rule (and no legacy probe) could answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFoundEntry {
    pub request: String,
    #[serde(default)]
    pub referrer: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Persistence port for rules, collections and request bookkeeping.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// Every rule, in the order the resolver should try them.
    async fn list_rules(&self) -> Result<Vec<JumplinkRule>, JumplinksError>;

    async fn list_mapping_collections(&self) -> Result<MappingCollections, JumplinksError>;

    /// Increments the hit counter and sets the last-hit time, atomically
    /// with respect to other resolutions.
    async fn record_hit(&self, rule_id: u64, at: DateTime<Utc>) -> Result<(), JumplinksError>;

    async fn record_not_found(&self, entry: NotFoundEntry) -> Result<(), JumplinksError>;
}

/// CMS page lookup port.
#[async_trait]
pub trait PageResolver: Send + Sync {
    /// Resolves a `[[selector]]` expression to a page URL.
    async fn resolve_selector(&self, selector: &str) -> Option<String>;

    /// The URL of page `id`, for `page:<id>` destinations.
    async fn page_url(&self, id: u64) -> Option<String>;

    /// The id of the page living at `path`, if any.
    async fn page_id_for_path(&self, _path: &str) -> Option<u64> {
        None
    }
}

/// A page resolver that knows no pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPages;

#[async_trait]
impl PageResolver for NoPages {
    async fn resolve_selector(&self, _selector: &str) -> Option<String> {
        None
    }

    async fn page_url(&self, _id: u64) -> Option<String> {
        None
    }
}

/// Fixed page tables, keyed by id and by selector expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticPageResolver {
    pub ids: BTreeMap<u64, String>,
    pub selectors: BTreeMap<String, String>,
}

#[async_trait]
impl PageResolver for StaticPageResolver {
    async fn resolve_selector(&self, selector: &str) -> Option<String> {
        self.selectors.get(selector.trim()).cloned()
    }

    async fn page_url(&self, id: u64) -> Option<String> {
        self.ids.get(&id).cloned()
    }

    async fn page_id_for_path(&self, path: &str) -> Option<u64> {
        let wanted = path.trim_matches('/');
        self.ids
            .iter()
            .find(|(_, url)| url.trim_matches('/') == wanted)
            .map(|(id, _)| *id)
    }
}

/// Lock-guarded in-memory store.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    rules: RwLock<Vec<JumplinkRule>>,
    collections: RwLock<MappingCollections>,
    not_found: RwLock<Vec<NotFoundEntry>>,
}

impl InMemoryRepository {
    /// Rules are served in the order given here.
    pub fn new(rules: Vec<JumplinkRule>, collections: MappingCollections) -> Self {
        Self {
            rules: RwLock::new(rules),
            collections: RwLock::new(collections),
            not_found: RwLock::new(Vec::new()),
        }
    }

    pub fn with_not_found(self, entries: Vec<NotFoundEntry>) -> Self {
        Self {
            not_found: RwLock::new(entries),
            ..self
        }
    }

    pub async fn rules(&self) -> Vec<JumplinkRule> {
        self.rules.read().await.clone()
    }

    pub async fn collections(&self) -> MappingCollections {
        self.collections.read().await.clone()
    }

    /// Every recorded not-found entry, oldest first.
    pub async fn not_found_entries(&self) -> Vec<NotFoundEntry> {
        self.not_found.read().await.clone()
    }

    /// The most recent not-found entries, newest first.
    pub async fn recent_not_found(&self) -> Vec<NotFoundEntry> {
        let mut entries = self.not_found.read().await.clone();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(NOT_FOUND_LISTING_LIMIT);
        entries
    }

    pub async fn clear_not_found(&self) -> usize {
        let mut entries = self.not_found.write().await;
        let cleared = entries.len();
        entries.clear();
        cleared
    }

    /// Adds a rule. A plain relative destination that names an existing
    /// page is stored as a `page:<id>` reference so it follows page moves.
    pub async fn add_rule(
        &self,
        source: &str,
        destination: &str,
        date_start: Option<DateTime<Utc>>,
        date_end: Option<DateTime<Utc>>,
        pages: &dyn PageResolver,
    ) -> JumplinkRule {
        let mut destination = destination.to_string();
        let has_wildcards = destination.contains('{') || destination.contains('}');
        if !has_wildcards && !crate::render::has_scheme(&destination) {
            if let Some(id) = pages.page_id_for_path(&destination).await {
                debug!("Destination '{}' is page #{}; storing a page reference.", destination, id);
                destination = format!("page:{}", id);
            }
        }

        let mut rules = self.rules.write().await;
        let id = rules.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let rule = JumplinkRule::new(id, source, &destination, date_start, date_end);
        info!("Added jumplink #{}: '{}' -> '{}'", rule.id, rule.source, rule.destination);
        rules.push(rule.clone());
        rule
    }

    /// Creates or extends a mapping collection. Returns its sanitised name.
    pub async fn upsert_collection(
        &self,
        name: &str,
        pairs: Vec<(String, String)>,
        policy: CleaningPolicy,
        cleaner: &SlugCleaner,
    ) -> String {
        self.collections.write().await.upsert(name, pairs, policy, cleaner)
    }
}

#[async_trait]
impl RuleRepository for InMemoryRepository {
    async fn list_rules(&self) -> Result<Vec<JumplinkRule>, JumplinksError> {
        Ok(self.rules.read().await.clone())
    }

    async fn list_mapping_collections(&self) -> Result<MappingCollections, JumplinksError> {
        Ok(self.collections.read().await.clone())
    }

    async fn record_hit(&self, rule_id: u64, at: DateTime<Utc>) -> Result<(), JumplinksError> {
        let mut rules = self.rules.write().await;
        let rule = rules
            .iter_mut()
            .find(|r| r.id == rule_id)
            .ok_or_else(|| JumplinksError::PersistenceUnavailable(format!("rule #{} no longer exists", rule_id)))?;
        rule.hits += 1;
        rule.last_hit = Some(at);
        debug!("Rule #{} now has {} hits.", rule_id, rule.hits);
        Ok(())
    }

    async fn record_not_found(&self, entry: NotFoundEntry) -> Result<(), JumplinksError> {
        self.not_found.write().await.push(entry);
        Ok(())
    }
}
