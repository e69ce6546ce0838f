//! render.rs - Builds destination URLs from templates and captures.
//!
//! Rendering runs in three passes over the destination template:
//!
//! 1. wildcard substitution: every `{name}` / `{!name}` placeholder takes the
//!    captured value, cleaned unless the template marks it `{!name}`, and any
//!    `{name|collection}` becomes a `(raw|collection)` mapping marker
//! 2. mapping: `(key|collection)` markers become the mapped value, or the raw
//!    key when the collection has no entry for it; a key holding `(`, `)` or
//!    `|` cannot be marked and stays literal
//! 3. selectors: `[[selector]]` expressions are resolved to page URLs; one
//!    unresolved selector rejects the whole render
//!
//! License: MIT OR APACHE 2.0

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fmt;

use crate::config::{CleaningPolicy, ResolverConfig};
use crate::errors::JumplinksError;
use crate::patterns::compiler::CompiledPattern;
use crate::repository::PageResolver;
use crate::rules::MappingCollections;
use crate::slug::SlugCleaner;

/// Destination prefix referencing a page by id.
pub const PAGE_PREFIX: &str = "page:";

static SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(?:f|ht)tps?://").expect("static regex"));
// Keys are raw captures, so anything but the marker's own delimiters is allowed.
static MAPPING_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(([^()|]+)\|([a-z]+)\)").expect("static regex"));
static SELECTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\[\[([\w\-_/\s=",.'|@]+)\]\]"#).expect("static regex"));

/// True for `http(s)://` and `ftp(s)://` destinations.
pub fn has_scheme(destination: &str) -> bool {
    SCHEME.is_match(destination)
}

/// Turns a stored destination into the URL template used for rendering.
///
/// `page:<id>` becomes the page's URL (left untouched when the page is
/// unknown), absolute URLs are kept, and anything else is placed under
/// `root_url`.
pub async fn compile_destination_url(destination: &str, root_url: &str, pages: &dyn PageResolver) -> String {
    if let Some(id) = destination.strip_prefix(PAGE_PREFIX) {
        let Ok(id) = id.trim().parse::<u64>() else {
            return destination.to_string();
        };
        return match pages.page_url(id).await {
            Some(url) if url.is_empty() => "/".to_string(),
            Some(url) => url,
            None => destination.to_string(),
        };
    }

    if has_scheme(destination) {
        return destination.to_string();
    }

    format!("{}{}", root_url, destination.trim_start_matches('/'))
}

/// One substituted wildcard, kept for the evaluation trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardCheck {
    /// 1-based capture position.
    pub index: usize,
    pub name: String,
    pub raw: String,
    pub value: String,
}

impl fmt::Display for WildcardCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}> {} = {} -> {}", self.index, self.name, self.raw, self.value)
    }
}

/// A finished destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDestination {
    pub url: String,
    pub checks: Vec<WildcardCheck>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DestinationRenderer {
    policy: CleaningPolicy,
    cleaner: SlugCleaner,
}

impl DestinationRenderer {
    pub fn new(policy: CleaningPolicy, cleaner: SlugCleaner) -> Self {
        Self { policy, cleaner }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.wildcard_cleaning, config.slug_cleaner())
    }

    /// Substitutes one match worth of captures into `destination`.
    ///
    /// `names` and `values` are walked in parallel; empty values are skipped
    /// and leave their placeholder in place.
    pub fn substitute(&self, destination: &str, names: &[String], values: &[String]) -> (String, Vec<WildcardCheck>) {
        let lowered_destination = destination.to_lowercase();
        let mut result = destination.to_string();
        let mut checks = Vec::new();

        for (position, (name, raw)) in names.iter().zip(values).enumerate() {
            if raw.is_empty() {
                continue;
            }

            let skip_clean = lowered_destination.contains(&format!("{{!{}}}", name.to_lowercase()));
            let value = if !skip_clean && self.policy.cleans() {
                self.cleaner.clean(raw, self.policy.preserves_case())
            } else {
                raw.clone()
            };

            let opening = if skip_clean { "{!" } else { "{" };
            result = result.replace(&format!("{}{}}}", opening, name), &value);

            // Mappings key off the raw capture, never the cleaned one.
            if let Ok(mapping) = Regex::new(&format!(r"(?i)\{{{}\|([a-z]+)\}}", regex::escape(name))) {
                result = mapping
                    .replace_all(&result, |caps: &Captures| format!("({}|{})", raw, &caps[1]))
                    .into_owned();
            }

            checks.push(WildcardCheck {
                index: position + 1,
                name: name.clone(),
                raw: raw.clone(),
                value,
            });
        }

        if let Some(trimmed) = result.strip_suffix('/') {
            result = trimmed.to_string();
        }
        if destination.ends_with('/') {
            result.push('/');
        }

        (result, checks)
    }

    /// Replaces every match of the pattern's iteration expression in
    /// `request` with the substituted destination.
    pub fn substitute_request(
        &self,
        pattern: &CompiledPattern,
        request: &str,
        destination: &str,
    ) -> (String, Vec<WildcardCheck>) {
        let mut checks = Vec::new();
        let rendered = pattern
            .iteration_regex()
            .replace_all(request, |caps: &Captures| {
                let values: Vec<String> = (1..caps.len())
                    .map(|i| caps.get(i).map(|m| m.as_str().to_string()).unwrap_or_default())
                    .collect();
                let (output, mut found) = self.substitute(destination, &pattern.capture_names, &values);
                checks.append(&mut found);
                output
            })
            .into_owned();
        (rendered, checks)
    }

    /// Resolves `(key|collection)` markers, falling back to the raw key.
    pub fn apply_mappings(&self, rendered: &str, collections: &MappingCollections) -> String {
        MAPPING_MARKER
            .replace_all(rendered, |caps: &Captures| {
                collections
                    .lookup(&caps[2], &caps[1])
                    .map(str::to_string)
                    .unwrap_or_else(|| caps[1].to_string())
            })
            .into_owned()
    }

    /// Resolves `[[selector]]` expressions to page URLs (leading `/` dropped).
    pub async fn resolve_selectors(&self, rendered: &str, pages: &dyn PageResolver) -> Result<String, JumplinksError> {
        let found: Vec<(usize, usize, String)> = SELECTOR
            .captures_iter(rendered)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let expression = caps.get(1)?;
                Some((whole.start(), whole.end(), expression.as_str().to_string()))
            })
            .collect();

        let mut output = String::with_capacity(rendered.len());
        let mut last = 0;
        for (start, end, expression) in found {
            let url = pages
                .resolve_selector(&expression)
                .await
                .ok_or_else(|| JumplinksError::UnresolvedSelector(expression.clone()))?;
            output.push_str(&rendered[last..start]);
            output.push_str(url.trim_start_matches('/'));
            last = end;
        }
        output.push_str(&rendered[last..]);
        Ok(output)
    }

    /// Runs all three passes for a request that matched `pattern`.
    pub async fn render(
        &self,
        pattern: &CompiledPattern,
        request: &str,
        destination: &str,
        collections: &MappingCollections,
        pages: &dyn PageResolver,
    ) -> Result<RenderedDestination, JumplinksError> {
        let (substituted, checks) = self.substitute_request(pattern, request, destination);
        let mapped = self.apply_mappings(&substituted, collections);
        let url = self.resolve_selectors(&mapped, pages).await?;
        Ok(RenderedDestination { url, checks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::compiler::compile_pattern;
    use crate::repository::{NoPages, StaticPageResolver};
    use crate::rules::MappingCollection;
    use crate::wildcards::WildcardRegistry;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn full_clean() -> DestinationRenderer {
        DestinationRenderer::new(CleaningPolicy::FullClean, SlugCleaner::new(false))
    }

    #[test]
    fn test_substitute_cleans_and_keeps_trailing_slash() {
        let (url, checks) = full_clean().substitute("/blog/{name}/", &names(&["name"]), &names(&["Hello World"]));
        assert_eq!(url, "/blog/hello-world/");
        assert_eq!(checks[0].to_string(), "1> name = Hello World -> hello-world");
    }

    #[test]
    fn test_substitute_without_trailing_slash() {
        let (url, _) = full_clean().substitute("/blog/{name}", &names(&["name"]), &names(&["Hello/"]));
        assert_eq!(url, "/blog/hello");
    }

    #[test]
    fn test_no_clean_marker() {
        let (url, _) = full_clean().substitute("/files/{!file}", &names(&["file"]), &names(&["My File.PDF"]));
        assert_eq!(url, "/files/My File.PDF");
    }

    #[test]
    fn test_policies() {
        let values = names(&["Hello World"]);
        let semi = DestinationRenderer::new(CleaningPolicy::SemiClean, SlugCleaner::new(false));
        assert_eq!(semi.substitute("{name}", &names(&["name"]), &values).0, "Hello-World");
        let none = DestinationRenderer::new(CleaningPolicy::NoClean, SlugCleaner::new(false));
        assert_eq!(none.substitute("{name}", &names(&["name"]), &values).0, "Hello World");
    }

    #[test]
    fn test_empty_capture_leaves_placeholder() {
        let (url, checks) = full_clean().substitute("/x/{a}/{b}", &names(&["a", "b"]), &names(&["", "Two"]));
        assert_eq!(url, "/x/{a}/two");
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].index, 2);
    }

    #[test]
    fn test_mapping_marker_uses_raw_value() {
        let (url, _) = full_clean().substitute("/colour/{c|colors}", &names(&["c"]), &names(&["Red"]));
        assert_eq!(url, "/colour/(Red|colors)");
    }

    #[test]
    fn test_apply_mappings() {
        let collections: MappingCollections = vec![MappingCollection::parse("colors", "red=ff0000")].into_iter().collect();
        let renderer = full_clean();
        assert_eq!(renderer.apply_mappings("(red|colors)", &collections), "ff0000");
        assert_eq!(renderer.apply_mappings("(blue|colors)", &collections), "blue");
        assert_eq!(renderer.apply_mappings("/a/(red|missing)/b", &collections), "/a/red/b");
    }

    #[test]
    fn test_substitute_request_walks_matches() {
        let pattern = compile_pattern("articles/{name:segment}", &WildcardRegistry::default()).unwrap();
        let (url, checks) = full_clean().substitute_request(&pattern, "articles/Hello-World", "/news/{name}/");
        assert_eq!(url, "/news/hello-world/");
        assert_eq!(checks.len(), 1);
    }

    #[test]
    fn test_apply_mappings_accepts_raw_punctuation() {
        let collections: MappingCollections =
            vec![MappingCollection::parse("files", "a.pdf=/docs/annual-report.pdf")].into_iter().collect();
        let renderer = full_clean();
        assert_eq!(renderer.apply_mappings("/get/(a.pdf|files)", &collections), "/get//docs/annual-report.pdf");
        assert_eq!(renderer.apply_mappings("/get/(b.pdf|files)", &collections), "/get/b.pdf");
    }

    #[tokio::test]
    async fn test_render_runs_all_passes() {
        let registry = WildcardRegistry::default();
        let pattern = compile_pattern("get/{f:all}", &registry).unwrap();
        let collections: MappingCollections =
            vec![MappingCollection::parse("files", "a.pdf=annual-report")].into_iter().collect();
        let mut pages = StaticPageResolver::default();
        pages.selectors.insert("template=docs".to_string(), "/library/".to_string());

        let rendered = full_clean()
            .render(&pattern, "get/a.pdf", "/[[template=docs]]{f|files}/", &collections, &pages)
            .await
            .unwrap();
        assert_eq!(rendered.url, "/library/annual-report/");
        assert_eq!(rendered.checks.len(), 1);
        assert_eq!(rendered.checks[0].raw, "a.pdf");
    }

    #[tokio::test]
    async fn test_render_rejects_unresolved_selector() {
        let pattern = compile_pattern("shop/{sku:num}", &WildcardRegistry::default()).unwrap();
        let result = full_clean()
            .render(&pattern, "shop/12", "/[[template=product]]/{sku}", &MappingCollections::new(), &NoPages)
            .await;
        match result {
            Err(JumplinksError::UnresolvedSelector(selector)) => assert_eq!(selector, "template=product"),
            other => panic!("expected UnresolvedSelector, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_selectors_resolve_or_reject() {
        let renderer = full_clean();
        let mut pages = StaticPageResolver::default();
        pages.selectors.insert("template=product, sku=12".to_string(), "/shop/widget/".to_string());

        let url = renderer.resolve_selectors("/[[template=product, sku=12]]", &pages).await.unwrap();
        assert_eq!(url, "/shop/widget/");

        match renderer.resolve_selectors("/[[template=product, sku=99]]", &pages).await {
            Err(JumplinksError::UnresolvedSelector(selector)) => assert_eq!(selector, "template=product, sku=99"),
            other => panic!("expected UnresolvedSelector, got {:?}", other),
        }

        assert_eq!(renderer.resolve_selectors("/plain/", &NoPages).await.unwrap(), "/plain/");
    }

    #[tokio::test]
    async fn test_compile_destination_url() {
        let mut pages = StaticPageResolver::default();
        pages.ids.insert(5, "https://example.com/about/".to_string());

        assert_eq!(compile_destination_url("page:5", "/", &pages).await, "https://example.com/about/");
        assert_eq!(compile_destination_url("page:6", "/", &pages).await, "page:6");
        assert_eq!(compile_destination_url("HTTPS://other.org/x", "/", &pages).await, "HTTPS://other.org/x");
        assert_eq!(compile_destination_url("ftp://files.org/x", "/", &pages).await, "ftp://files.org/x");
        assert_eq!(compile_destination_url("blog/{name}", "/site/", &pages).await, "/site/blog/{name}");
        assert_eq!(compile_destination_url("/blog/", "/", &pages).await, "/blog/");
    }
}
