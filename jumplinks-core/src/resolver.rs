//! resolver.rs - Resolves a not-found request against the jumplink rules.
//!
//! `JumplinkResolver` is the single entry point invoked when a request finds
//! no live route. It walks the rules in repository order; for each enabled
//! rule it compiles the source, tries the normalised request, renders the
//! destination and checks the activation window. The first rule that
//! matches, renders and is active wins. When nothing wins, the legacy domain
//! is optionally probed before reporting `NoMatch`.
//!
//! Rule-level failures (bad wildcard types, matchers the regex engine
//! rejects, unresolved selectors) skip the rule. Store failures end the
//! resolution with `NoMatch` and the error attached.
//!
//! License: MIT OR APACHE 2.0

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

use crate::activation::ActivationWindow;
use crate::config::ResolverConfig;
use crate::errors::JumplinksError;
use crate::legacy::{legacy_url, HttpLegacyProbe, LegacyProbe};
use crate::patterns::compiler::get_or_compile;
use crate::render::{compile_destination_url, DestinationRenderer};
use crate::repository::{NoPages, NotFoundEntry, PageResolver, RuleRepository};
use crate::rules::MappingCollections;
use crate::trace::ScanLog;
use crate::wildcards::WildcardRegistry;

static INDEX_PHP_REQUEST: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^index\.php(/.*)$").expect("static regex"));

/// Requests containing this are never written to the not-found monitor.
const SITEMAP_MARKER: &str = "sitemap.xml";

/// A request that found no live route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingRequest {
    pub path: String,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
}

impl IncomingRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            referrer: None,
            user_agent: None,
        }
    }

    pub fn with_referrer(mut self, referrer: Option<String>) -> Self {
        self.referrer = referrer;
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// What the caller should do with the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ResolverDecision {
    Redirect {
        url: String,
        permanent: bool,
        /// The rule that produced the redirect; `None` for the `index.php`
        /// shortcut and the legacy domain fallback.
        rule_id: Option<u64>,
    },
    NoMatch,
}

impl ResolverDecision {
    pub fn is_redirect(&self) -> bool {
        matches!(self, ResolverDecision::Redirect { .. })
    }

    /// 301/302 for redirects, 404 otherwise.
    pub fn status_code(&self) -> u16 {
        match self {
            ResolverDecision::Redirect { permanent: true, .. } => 301,
            ResolverDecision::Redirect { permanent: false, .. } => 302,
            ResolverDecision::NoMatch => 404,
        }
    }
}

/// The decision plus everything the evaluation recorded on the way.
#[derive(Debug)]
pub struct Resolution {
    pub decision: ResolverDecision,
    pub trace: ScanLog,
    /// A store failure that cut the resolution short.
    pub error: Option<JumplinksError>,
}

impl Resolution {
    fn finished(decision: ResolverDecision, trace: ScanLog) -> Self {
        Self {
            decision,
            trace,
            error: None,
        }
    }
}

/// Strips the leading slash and, below a sub-directory install, the root.
pub fn normalize_request(path: &str, root_url: &str) -> String {
    let request = path.trim_start_matches('/');
    if root_url == "/" {
        return request.to_string();
    }
    let root = root_url.trim_start_matches('/');
    request.strip_prefix(root).unwrap_or(request).to_string()
}

pub struct JumplinkResolver {
    config: ResolverConfig,
    registry: WildcardRegistry,
    renderer: DestinationRenderer,
    repository: Arc<dyn RuleRepository>,
    pages: Arc<dyn PageResolver>,
    legacy: Option<Arc<dyn LegacyProbe>>,
}

impl JumplinkResolver {
    /// A resolver with no page lookups and no legacy probe.
    pub fn new(config: ResolverConfig, repository: Arc<dyn RuleRepository>) -> Self {
        Self {
            registry: config.wildcard_registry(),
            renderer: DestinationRenderer::from_config(&config),
            config,
            repository,
            pages: Arc::new(NoPages),
            legacy: None,
        }
    }

    pub fn with_pages(mut self, pages: Arc<dyn PageResolver>) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_legacy_probe(mut self, probe: Arc<dyn LegacyProbe>) -> Self {
        self.legacy = Some(probe);
        self
    }

    /// Installs the HTTP probe when a legacy domain is configured.
    pub fn with_http_legacy_probe(self) -> Result<Self, JumplinksError> {
        if self.config.legacy_domain().is_none() {
            return Ok(self);
        }
        let probe = HttpLegacyProbe::new(self.config.legacy_probe_timeout())?;
        Ok(self.with_legacy_probe(Arc::new(probe)))
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves a bare path.
    pub async fn resolve(&self, path: &str) -> Resolution {
        self.on_not_found(&IncomingRequest::new(path)).await
    }

    /// The not-found hook: resolves `request` as of now.
    pub async fn on_not_found(&self, request: &IncomingRequest) -> Resolution {
        self.resolve_at(request, Utc::now()).await
    }

    async fn within_store_budget<T, F>(&self, operation: F) -> Result<T, JumplinksError>
    where
        F: Future<Output = Result<T, JumplinksError>>,
    {
        match tokio::time::timeout(self.config.store_timeout(), operation).await {
            Ok(result) => result,
            Err(_) => Err(JumplinksError::PersistenceTimeout(self.config.store_timeout_ms)),
        }
    }

    fn abort(&self, mut trace: ScanLog, err: JumplinksError) -> Resolution {
        error!(target: "jumplinks_core::resolver", "Resolution aborted: {}", err);
        trace.record("Aborted", err.to_string());
        Resolution {
            decision: ResolverDecision::NoMatch,
            trace,
            error: Some(err),
        }
    }

    /// Resolves `request` as of `now`.
    pub async fn resolve_at(&self, incoming: &IncomingRequest, now: DateTime<Utc>) -> Resolution {
        let mut trace = ScanLog::new();
        let raw_request = incoming.path.trim_start_matches('/');

        if let Some(rest) = INDEX_PHP_REQUEST.captures(raw_request).and_then(|caps| caps.get(1)) {
            let url = rest.as_str().to_string();
            trace.record("index.php Request", format!("Redirecting to {}", url));
            return Resolution::finished(
                ResolverDecision::Redirect {
                    url,
                    permanent: true,
                    rule_id: None,
                },
                trace,
            );
        }

        let request = normalize_request(raw_request, &self.config.root_url);
        trace.note("404 Page Not Found");
        trace.record("Checked", now.to_rfc2822());
        trace.record("Request", format!("{}{}", self.config.root_url, request));
        if self.config.dry_run {
            trace.note("Dry run: hits will not be recorded.");
        }

        let rules = match self.within_store_budget(self.repository.list_rules()).await {
            Ok(rules) => rules,
            Err(err) => return self.abort(trace, err),
        };
        trace.record("Jumplinks", rules.len().to_string());

        let no_collections = MappingCollections::new();
        let mut collections: Option<MappingCollections> = None;

        for rule in rules.iter().filter(|r| !r.is_disabled()) {
            let window = ActivationWindow::for_rule(rule).evaluate(now);
            trace.note(format!("[Checking jumplink #{}]", rule.id));

            if let Some(starts) = window.starts {
                trace.record("Timed Activation (Starts)", starts.to_rfc2822());
                if let (Some(ends), false) = (window.ends, window.is_dummy_end) {
                    trace.record("Timed Activation (Ends)", ends.to_rfc2822());
                }
                if window.is_inverted() {
                    trace.note("Timed activation ends before it starts.");
                }
            }

            trace.record("Original Source Path", rule.source.as_str());

            let pattern = match get_or_compile(rule.id, &rule.source, &self.registry) {
                Ok(pattern) => pattern,
                Err(err) => {
                    warn!(target: "jumplinks_core::resolver", "Skipping jumplink #{}: {}", rule.id, err);
                    trace.record("Skipped", err.to_string());
                    continue;
                }
            };

            if pattern.escaped != rule.source {
                trace.record("Escaped Source Path", pattern.escaped.as_str());
            }
            if pattern.used_smart_wildcards {
                trace.record("After Smart Wildcards", pattern.expanded.as_str());
            }
            trace.record("Compiled Source Path", pattern.matcher.as_str());

            if !pattern.is_match(&request) {
                trace.note("No match there...");
                continue;
            }

            if collections.is_none() {
                match self.within_store_budget(self.repository.list_mapping_collections()).await {
                    Ok(loaded) => collections = Some(loaded),
                    Err(err) => return self.abort(trace, err),
                }
            }
            let mappings = collections.as_ref().unwrap_or(&no_collections);

            let destination = compile_destination_url(&rule.destination, &self.config.root_url, self.pages.as_ref()).await;
            let rendered = self
                .renderer
                .render(&pattern, &request, &destination, mappings, self.pages.as_ref())
                .await;

            let url = match rendered {
                Ok(rendered) => {
                    for check in &rendered.checks {
                        trace.record("Wildcard Check", check.to_string());
                    }
                    trace.record("Original Destination Path", rule.destination.as_str());
                    rendered.url
                }
                Err(err) => {
                    warn!(target: "jumplinks_core::resolver", "Skipping jumplink #{}: {}", rule.id, err);
                    trace.record("Original Destination Path", rule.destination.as_str());
                    trace.note("Whilst a match was found, the selector you specified didn't return a page. As a result, this jumplink will be skipped.");
                    continue;
                }
            };
            trace.record("Compiled Destination Path", url.as_str());

            if !window.is_active {
                trace.note("Match found, but the jumplink is outside its activation window.");
                trace.note("No match there...");
                continue;
            }

            trace.note(format!("Match found! Redirecting ({}):", window.kind));
            trace.record("From URL", format!("{}{}", self.config.root_url, request));
            trace.record("To URL", url.as_str());
            if let Some(timed) = window.describe() {
                trace.record("Timed", timed);
            }

            if !self.config.dry_run {
                if let Err(err) = self.within_store_budget(self.repository.record_hit(rule.id, now)).await {
                    warn!(target: "jumplinks_core::resolver", "Could not record hit for jumplink #{}: {}", rule.id, err);
                    trace.record("Hit Not Recorded", err.to_string());
                }
            }

            info!(target: "jumplinks_core::resolver", "'{}' -> '{}' via jumplink #{} ({})", request, url, rule.id, window.kind);
            return Resolution::finished(
                ResolverDecision::Redirect {
                    url,
                    permanent: window.kind.is_permanent(),
                    rule_id: Some(rule.id),
                },
                trace,
            );
        }

        if let Some(decision) = self.probe_legacy_domain(&request, &mut trace).await {
            return Resolution::finished(decision, trace);
        }

        if self.config.enable_404_monitor && !self.config.dry_run {
            self.monitor_not_found(incoming, &request, now).await;
        }

        trace.note("No matches, sorry. The not-found page takes over from here.");
        Resolution::finished(ResolverDecision::NoMatch, trace)
    }

    async fn probe_legacy_domain(&self, request: &str, trace: &mut ScanLog) -> Option<ResolverDecision> {
        let domain = self.config.legacy_domain()?;
        let probe = self.legacy.as_ref()?;
        let url = legacy_url(domain, request);

        match tokio::time::timeout(self.config.legacy_probe_timeout(), probe.probe(&url)).await {
            Ok(Ok(status)) if self.config.status_codes.contains(&status) => {
                trace.note(format!(
                    "Found Source Path on Legacy Domain (with status code {}); redirect allowed to:",
                    status
                ));
                trace.note(format!("> {}", url));
                Some(ResolverDecision::Redirect {
                    url,
                    permanent: false,
                    rule_id: None,
                })
            }
            Ok(Ok(status)) => {
                trace.record("Legacy Domain", format!("{} answered {}, which is not an accepted status", url, status));
                None
            }
            Ok(Err(err)) => {
                warn!(target: "jumplinks_core::resolver", "{}", err);
                trace.record("Legacy Domain", err.to_string());
                None
            }
            Err(_) => {
                let err = JumplinksError::LegacyProbeFailure {
                    url,
                    reason: format!("no answer within {} ms", self.config.legacy_probe_timeout_ms),
                };
                warn!(target: "jumplinks_core::resolver", "{}", err);
                trace.record("Legacy Domain", err.to_string());
                None
            }
        }
    }

    async fn monitor_not_found(&self, incoming: &IncomingRequest, request: &str, now: DateTime<Utc>) {
        if request.to_lowercase().contains(SITEMAP_MARKER) {
            return;
        }
        let entry = NotFoundEntry {
            request: request.to_string(),
            referrer: incoming.referrer.clone(),
            user_agent: incoming.user_agent.clone(),
            created_at: now,
        };
        if let Err(err) = self.within_store_budget(self.repository.record_not_found(entry)).await {
            warn!(target: "jumplinks_core::resolver", "Could not record not-found request '{}': {}", request, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;
    use crate::rules::JumplinkRule;
    use async_trait::async_trait;

    fn resolver_with(rules: Vec<JumplinkRule>, config: ResolverConfig) -> (JumplinkResolver, Arc<InMemoryRepository>) {
        let repo = Arc::new(InMemoryRepository::new(rules, MappingCollections::new()));
        (JumplinkResolver::new(config, repo.clone()), repo)
    }

    #[test]
    fn test_normalize_request() {
        assert_eq!(normalize_request("/about", "/"), "about");
        assert_eq!(normalize_request("/sub/about", "/sub/"), "about");
        assert_eq!(normalize_request("/other/about", "/sub/"), "other/about");
    }

    #[tokio::test]
    async fn test_index_php_shortcut() {
        let (resolver, _) = resolver_with(vec![], ResolverConfig::default());
        let resolution = resolver.resolve("/index.php/about-us").await;
        assert_eq!(
            resolution.decision,
            ResolverDecision::Redirect {
                url: "/about-us".to_string(),
                permanent: true,
                rule_id: None
            }
        );
    }

    #[tokio::test]
    async fn test_disabled_rules_are_skipped() {
        let rules = vec![
            JumplinkRule::new(1, "!!old", "disabled", None, None),
            JumplinkRule::new(2, "old", "enabled", None, None),
        ];
        let (resolver, _) = resolver_with(rules, ResolverConfig::default());
        let resolution = resolver.resolve("/old").await;
        assert_eq!(
            resolution.decision,
            ResolverDecision::Redirect {
                url: "/enabled".to_string(),
                permanent: true,
                rule_id: Some(2)
            }
        );
        assert!(!resolution.trace.entries().iter().any(|e| e.label == "[Checking jumplink #1]"));
    }

    #[tokio::test]
    async fn test_dry_run_records_nothing() {
        let config = ResolverConfig {
            dry_run: true,
            enable_404_monitor: true,
            ..ResolverConfig::default()
        };
        let (resolver, repo) = resolver_with(vec![JumplinkRule::new(1, "old", "new", None, None)], config);

        assert!(resolver.resolve("old").await.decision.is_redirect());
        assert!(!resolver.resolve("missing").await.decision.is_redirect());

        assert_eq!(repo.rules().await[0].hits, 0);
        assert!(repo.not_found_entries().await.is_empty());
    }

    struct BrokenStore;

    #[async_trait]
    impl RuleRepository for BrokenStore {
        async fn list_rules(&self) -> Result<Vec<JumplinkRule>, JumplinksError> {
            Err(JumplinksError::PersistenceUnavailable("database offline".to_string()))
        }
        async fn list_mapping_collections(&self) -> Result<MappingCollections, JumplinksError> {
            Ok(MappingCollections::new())
        }
        async fn record_hit(&self, _rule_id: u64, _at: DateTime<Utc>) -> Result<(), JumplinksError> {
            Ok(())
        }
        async fn record_not_found(&self, _entry: NotFoundEntry) -> Result<(), JumplinksError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_with_no_match() {
        let resolver = JumplinkResolver::new(ResolverConfig::default(), Arc::new(BrokenStore));
        let resolution = resolver.resolve("anything").await;
        assert_eq!(resolution.decision, ResolverDecision::NoMatch);
        assert!(matches!(resolution.error, Some(JumplinksError::PersistenceUnavailable(_))));
    }

    struct SlowStore;

    #[async_trait]
    impl RuleRepository for SlowStore {
        async fn list_rules(&self) -> Result<Vec<JumplinkRule>, JumplinksError> {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            Ok(Vec::new())
        }
        async fn list_mapping_collections(&self) -> Result<MappingCollections, JumplinksError> {
            Ok(MappingCollections::new())
        }
        async fn record_hit(&self, _rule_id: u64, _at: DateTime<Utc>) -> Result<(), JumplinksError> {
            Ok(())
        }
        async fn record_not_found(&self, _entry: NotFoundEntry) -> Result<(), JumplinksError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let config = ResolverConfig {
            store_timeout_ms: 50,
            ..ResolverConfig::default()
        };
        let resolver = JumplinkResolver::new(config, Arc::new(SlowStore));
        let resolution = resolver.resolve("anything").await;
        assert!(matches!(resolution.error, Some(JumplinksError::PersistenceTimeout(50))));
    }
}
