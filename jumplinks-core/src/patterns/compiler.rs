//! compiler.rs - Compiles jumplink sources into matchers and caches them.
//!
//! Compilation is a fixed pipeline over the raw source string:
//!
//! 1. blanket-escape `?`, `&` and `:` (then undo the escape on `/?`)
//! 2. `[x]` becomes `x?`
//! 3. a `/?` in the middle of the source keeps its slash mandatory
//! 4. restore `:` inside `{name:type}` tokens
//! 5. `<...>` becomes `(?:...)`
//! 6. smart `{name}` tokens expand to `{name:type}`
//! 7. `{name:type}` / `{!name:type}` become capturing groups
//!
//! Braces left over after step 7 that do not form a counted repetition are
//! escaped, so an unresolved smart token stays literal text.
//!
//! License: MIT OR APACHE 2.0

use lazy_static::lazy_static;
use log::debug;
use regex::{Regex, RegexBuilder};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};

use crate::errors::JumplinksError;
use crate::wildcards::WildcardRegistry;

const COMPILED_SIZE_LIMIT: usize = 10 * (1 << 20);

/// Upper bound on cached patterns; ids of deleted rules would otherwise stay forever.
const MAX_CACHED_PATTERNS: usize = 4096;

/// The fully-computed matcher that matches everything.
const MATCH_EVERYTHING: &str = "(.*)";
const MATCH_SOMETHING: &str = "(.+)";

lazy_static! {
    static ref OPTIONAL_CHARACTER: Regex = Regex::new(r"(?i)\[([a-z0-9/])\]").expect("static regex");
    static ref MID_SOURCE_SLASH_QUERY: Regex = Regex::new(r"(.+)/\?(.+)").expect("static regex");
    static ref ESCAPED_TOKEN_COLON: Regex = Regex::new(r"(?i)\{(!?[a-z]+)\\:([a-z]+)\}").expect("static regex");
    static ref NON_CAPTURE_GROUP: Regex = Regex::new(r"<(.*?)>").expect("static regex");
    static ref WILDCARD_TOKEN: Regex = Regex::new(r"\{!?([A-Za-z]+):([a-z]+)\}").expect("static regex");
    static ref COUNTED_REPETITION: Regex = Regex::new(r"^\{\d+(?:,\d*)?\}").expect("static regex");

    /// Process-wide cache: rule id -> (fingerprint of every compile input, pattern).
    static ref COMPILED_PATTERN_CACHE: RwLock<PatternCache> = RwLock::new(HashMap::new());
}

type PatternCache = HashMap<u64, (u64, Arc<CompiledPattern>)>;

/// A source pattern compiled against a wildcard registry.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// The raw rule source.
    pub source: String,
    /// After escaping, optional characters and the `:` restore.
    pub escaped: String,
    /// After non-capture groups and smart wildcard expansion.
    pub expanded: String,
    pub used_smart_wildcards: bool,
    /// The unanchored matcher body.
    pub matcher: String,
    /// Wildcard names, one per capturing group, left to right.
    pub capture_names: Vec<String>,
    anchored: Regex,
    iteration: Regex,
}

impl CompiledPattern {
    /// Whether the whole (normalised) request path matches.
    pub fn is_match(&self, path: &str) -> bool {
        self.anchored.is_match(path)
    }

    /// Captured values of a whole-path match, one per capture name.
    /// Groups that did not participate yield empty strings.
    pub fn captures(&self, path: &str) -> Option<Vec<String>> {
        let caps = self.anchored.captures(path)?;
        Some(
            (1..caps.len())
                .map(|i| caps.get(i).map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect(),
        )
    }

    /// The anchored expression used to decide whether a rule applies.
    pub fn anchored_regex(&self) -> &Regex {
        &self.anchored
    }

    /// The unanchored expression used to extract captures while rendering.
    /// A bare match-everything matcher is broadened to require one character.
    pub fn iteration_regex(&self) -> &Regex {
        &self.iteration
    }
}

/// Runs the escaping stages (1-4).
pub fn escape_source(source: &str) -> String {
    let blanket = source
        .replace('?', r"\?")
        .replace(r"/\?", "/?")
        .replace('&', r"\&")
        .replace(':', r"\:");
    let optional = OPTIONAL_CHARACTER.replace_all(&blanket, "${1}?").into_owned();
    let slash_kept = MID_SOURCE_SLASH_QUERY.replace(&optional, r"${1}/\?${2}").into_owned();
    ESCAPED_TOKEN_COLON.replace_all(&slash_kept, "{${1}:${2}}").into_owned()
}

/// Expands smart `{name}` tokens in registry declaration order.
/// Returns the expanded text and whether any token was expanded.
pub fn expand_smart_wildcards(source: &str, registry: &WildcardRegistry) -> Result<(String, bool), JumplinksError> {
    let mut expanded = source.to_string();
    let mut used = false;

    for smart in registry.smart_wildcards() {
        let matcher = Regex::new(&format!(r"(?i)\{{({})\}}", smart.alternation()))
            .map_err(|e| JumplinksError::PatternCompilation(source.to_string(), e))?;
        if matcher.is_match(&expanded) {
            let replacement = format!("{{${{1}}:{}}}", smart.canonical);
            expanded = matcher.replace_all(&expanded, replacement.as_str()).into_owned();
            used = true;
        }
    }

    Ok((expanded, used))
}

/// Replaces every `{name:type}` token with its capturing group.
pub fn substitute_wildcards(
    source: &str,
    registry: &WildcardRegistry,
) -> Result<(String, Vec<String>), JumplinksError> {
    let mut matcher = String::with_capacity(source.len() * 2);
    let mut names = Vec::new();
    let mut last = 0;

    for caps in WILDCARD_TOKEN.captures_iter(source) {
        let (Some(token), Some(name), Some(type_name)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let fragment = registry.fragment_for(type_name.as_str()).map_err(|_| JumplinksError::UnknownWildcardType {
            name: name.as_str().to_string(),
            type_name: type_name.as_str().to_string(),
        })?;

        matcher.push_str(&source[last..token.start()]);
        matcher.push('(');
        matcher.push_str(fragment);
        matcher.push(')');
        names.push(name.as_str().to_string());
        last = token.end();
    }
    matcher.push_str(&source[last..]);

    Ok((escape_stray_braces(&matcher), names))
}

/// Escapes `{` and `}` that are not part of a counted repetition, an
/// already-escaped brace, or a `\p{..}` class.
fn escape_stray_braces(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut rest = pattern;
    let mut after_backslash = false;

    while let Some(c) = rest.chars().next() {
        if after_backslash {
            after_backslash = false;
            out.push(c);
            rest = &rest[c.len_utf8()..];
            continue;
        }

        match c {
            '\\' => {
                after_backslash = true;
                out.push(c);
            }
            '{' if out.ends_with(r"\p") || out.ends_with(r"\P") => {
                let end = rest.find('}').map(|i| i + 1).unwrap_or(rest.len());
                out.push_str(&rest[..end]);
                rest = &rest[end..];
                continue;
            }
            '{' => {
                if let Some(m) = COUNTED_REPETITION.find(rest) {
                    out.push_str(m.as_str());
                    rest = &rest[m.end()..];
                    continue;
                }
                out.push_str(r"\{");
            }
            '}' => out.push_str(r"\}"),
            _ => out.push(c),
        }
        rest = &rest[c.len_utf8()..];
    }

    out
}

fn build_regex(source: &str, expression: &str) -> Result<Regex, JumplinksError> {
    RegexBuilder::new(expression)
        .case_insensitive(true)
        .size_limit(COMPILED_SIZE_LIMIT)
        .build()
        .map_err(|e| JumplinksError::PatternCompilation(source.to_string(), e))
}

/// Compiles `source` against `registry`.
pub fn compile_pattern(source: &str, registry: &WildcardRegistry) -> Result<CompiledPattern, JumplinksError> {
    let escaped = escape_source(source);
    let grouped = NON_CAPTURE_GROUP.replace_all(&escaped, "(?:${1})").into_owned();
    let (expanded, used_smart_wildcards) = expand_smart_wildcards(&grouped, registry)?;
    let (matcher, capture_names) = substitute_wildcards(&expanded, registry)?;

    let anchored = build_regex(source, &format!("^{}$", matcher))?;
    let iteration_body = if matcher == MATCH_EVERYTHING { MATCH_SOMETHING } else { matcher.as_str() };
    let iteration = build_regex(source, iteration_body)?;

    log::debug!(
        target: "jumplinks_core::compiler",
        "Compiled '{}' to '{}' with wildcards {:?}",
        source, matcher, capture_names
    );

    Ok(CompiledPattern {
        source: source.to_string(),
        escaped,
        expanded,
        used_smart_wildcards,
        matcher,
        capture_names,
        anchored,
        iteration,
    })
}

/// Hashes every input the compiled pattern depends on.
fn fingerprint(source: &str, registry: &WildcardRegistry) -> u64 {
    let mut hasher = DefaultHasher::new();
    source.hash(&mut hasher);
    registry.signature().hash(&mut hasher);
    hasher.finish()
}

/// Returns the cached pattern for `rule_id`, compiling it when the rule's
/// source or the registry changed since it was cached.
pub fn get_or_compile(
    rule_id: u64,
    source: &str,
    registry: &WildcardRegistry,
) -> Result<Arc<CompiledPattern>, JumplinksError> {
    let key = fingerprint(source, registry);

    if let Ok(cache) = COMPILED_PATTERN_CACHE.read() {
        if let Some((cached_key, pattern)) = cache.get(&rule_id) {
            if *cached_key == key {
                debug!("Serving compiled pattern for rule #{} from cache.", rule_id);
                return Ok(Arc::clone(pattern));
            }
        }
    }

    let compiled = Arc::new(compile_pattern(source, registry)?);
    if let Ok(mut cache) = COMPILED_PATTERN_CACHE.write() {
        insert_bounded(&mut cache, rule_id, key, Arc::clone(&compiled), MAX_CACHED_PATTERNS);
    }
    Ok(compiled)
}

/// Inserts a pattern, starting the cache over when a new id would exceed `capacity`.
fn insert_bounded(cache: &mut PatternCache, rule_id: u64, key: u64, pattern: Arc<CompiledPattern>, capacity: usize) {
    if cache.len() >= capacity && !cache.contains_key(&rule_id) {
        debug!("Pattern cache reached {} entries; dropping it.", cache.len());
        cache.clear();
    }
    cache.insert(rule_id, (key, pattern));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str) -> CompiledPattern {
        compile_pattern(source, &WildcardRegistry::default()).unwrap()
    }

    #[test]
    fn test_typed_wildcard_capture() {
        let pattern = compile("articles/{name:segment}");
        assert_eq!(pattern.matcher, r"articles/([\w_-]+)");
        assert_eq!(pattern.capture_names, vec!["name".to_string()]);
        assert_eq!(pattern.captures("articles/hello-world"), Some(vec!["hello-world".to_string()]));
        assert!(pattern.is_match("ARTICLES/Hello-World"));
        assert!(!pattern.is_match("articles/hello/world"));
    }

    #[test]
    fn test_smart_wildcards_expand_in_order() {
        let pattern = compile("blog/{year}/{month}/{title}.{ext}");
        assert!(pattern.used_smart_wildcards);
        assert_eq!(pattern.expanded, "blog/{year:num}/{month:num}/{title:segment}.{ext:ext}");
        assert_eq!(pattern.capture_names, vec!["year", "month", "title", "ext"]);
        assert!(pattern.is_match("blog/2015/06/my-post.html"));
        assert!(!pattern.is_match("blog/2015/06/my-post.zip"));
    }

    #[test]
    fn test_smart_wildcards_keep_case_of_name() {
        let pattern = compile("{Title}");
        assert_eq!(pattern.capture_names, vec!["Title"]);
        assert!(pattern.is_match("some-page"));
    }

    #[test]
    fn test_unresolved_smart_token_stays_literal() {
        let pattern = compile("go/{slug}");
        assert!(!pattern.used_smart_wildcards);
        assert!(pattern.capture_names.is_empty());
        assert!(pattern.is_match("go/{slug}"));
        assert!(!pattern.is_match("go/anything"));
    }

    #[test]
    fn test_unknown_type_names_the_wildcard() {
        match compile_pattern("x/{thing:bogus}", &WildcardRegistry::default()) {
            Err(JumplinksError::UnknownWildcardType { name, type_name }) => {
                assert_eq!(name, "thing");
                assert_eq!(type_name, "bogus");
            }
            other => panic!("expected UnknownWildcardType, got {:?}", other),
        }
    }

    #[test]
    fn test_query_string_escaping() {
        let pattern = compile("index.php?page={id:num}&lang={lang:alpha}");
        assert_eq!(pattern.escaped, r"index.php\?page={id:num}\&lang={lang:alpha}");
        assert!(pattern.is_match("index.php?page=12&lang=en"));
        assert_eq!(pattern.capture_names, vec!["id", "lang"]);
    }

    #[test]
    fn test_optional_characters_and_trailing_slash() {
        let pattern = compile("about-us[/]");
        assert_eq!(pattern.escaped, "about-us/?");
        assert!(pattern.is_match("about-us"));
        assert!(pattern.is_match("about-us/"));
    }

    #[test]
    fn test_slash_before_query_stays_mandatory() {
        let pattern = compile("shop/?item={id}");
        assert_eq!(pattern.escaped, r"shop/\?item={id}");
        assert!(pattern.is_match("shop/?item=7"));
        assert!(!pattern.is_match("shop?item=7"));
    }

    #[test]
    fn test_non_capture_groups() {
        let pattern = compile("<news|blog>/{title}");
        assert_eq!(pattern.matcher, r"(?:news|blog)/([\w_-]+)");
        assert_eq!(pattern.capture_names, vec!["title"]);
        assert_eq!(pattern.captures("blog/hello"), Some(vec!["hello".to_string()]));
    }

    #[test]
    fn test_no_clean_marker_in_source() {
        let pattern = compile("files/{!path:segments}");
        assert_eq!(pattern.capture_names, vec!["path"]);
        assert!(pattern.is_match("files/a/b/c"));
    }

    #[test]
    fn test_match_everything_iteration_pattern() {
        let pattern = compile("{all}");
        assert_eq!(pattern.matcher, "(.*)");
        assert_eq!(pattern.anchored_regex().as_str(), "^(.*)$");
        assert_eq!(pattern.iteration_regex().as_str(), "(.+)");
    }

    #[test]
    fn test_literal_source() {
        let pattern = compile("Old-Page.html");
        assert!(pattern.capture_names.is_empty());
        assert!(pattern.is_match("old-page.html"));
        assert!(!pattern.is_match("old-page.html/extra"));
    }

    #[test]
    fn test_counted_repetition_survives() {
        let registry = WildcardRegistry::new("php{1,2}");
        let pattern = compile_pattern("index.{ext}", &registry).unwrap();
        assert!(pattern.is_match("index.phpp"));
    }

    #[test]
    fn test_cache_reuses_and_invalidates() {
        let registry = WildcardRegistry::default();
        let first = get_or_compile(900_001, "cache/{id}", &registry).unwrap();
        let second = get_or_compile(900_001, "cache/{id}", &registry).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let edited = get_or_compile(900_001, "cache/{title}", &registry).unwrap();
        assert!(!Arc::ptr_eq(&first, &edited));
        assert_eq!(edited.capture_names, vec!["title"]);

        let other_registry = WildcardRegistry::new("html");
        let reconfigured = get_or_compile(900_001, "cache/{title}", &other_registry).unwrap();
        assert!(!Arc::ptr_eq(&edited, &reconfigured));
    }

    #[test]
    fn test_cache_stays_bounded() {
        let pattern = Arc::new(compile("bounded"));
        let mut cache = PatternCache::new();
        for id in 0..3 {
            insert_bounded(&mut cache, id, 7, Arc::clone(&pattern), 3);
        }
        assert_eq!(cache.len(), 3);

        // Refreshing a cached id never evicts.
        insert_bounded(&mut cache, 1, 8, Arc::clone(&pattern), 3);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache[&1].0, 8);

        insert_bounded(&mut cache, 99, 7, Arc::clone(&pattern), 3);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains_key(&99));
    }
}
