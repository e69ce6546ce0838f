//! wildcards.rs - Wildcard types and smart wildcard shortcuts.
//!
//! A wildcard type is the second fragment of a `{name:type}` token and maps to
//! the regex fragment that token is replaced with. Smart wildcards are the
//! `{name}` shortcuts, where the name itself implies the type (`{year}` is a
//! number, `{title}` a single segment, and so on).
//!
//! The `ext` fragment comes straight from configuration and is inserted into
//! matchers verbatim. This is a trusted-configuration contract: site owners
//! may write their own alternation there, so nothing is escaped.
//!
//! License: MIT OR APACHE 2.0

use log::debug;

use crate::errors::JumplinksError;

/// The default extension list used by the `ext` wildcard type.
pub const DEFAULT_EXTENSIONS: &str =
    "aspx asp cfm cgi fcgi dll html htm shtml shtm jhtml phtml xhtm xhtml rbml jspx jsp phps php4 php";

/// Builtin types, in declaration order. `ext` is filled in from configuration.
const BUILTIN_TYPES: &[(&str, &str)] = &[
    ("all", ".*"),
    ("alpha", "[a-z]+"),
    ("alphanum", r"\w+"),
    ("any", r"[\w.-_%=\s]+"),
    ("ext", ""),
    ("num", r"\d+"),
    ("segment", r"[\w_-]+"),
    ("segments", r"[\w/_-]+"),
];

/// Smart alias sets and the canonical type each one expands to.
/// The first declared set that contains a name wins.
const SMART_WILDCARDS: &[(&[&str], &str)] = &[
    (&["all"], "all"),
    (&["ext"], "ext"),
    (
        &["name", "title", "page", "post", "user", "model", "entry", "segment"],
        "segment",
    ),
    (&["path", "segments"], "segments"),
    (&["year", "month", "day", "id", "num"], "num"),
];

/// A single smart wildcard alias set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartWildcard {
    pub aliases: Vec<String>,
    pub canonical: String,
}

impl SmartWildcard {
    /// The aliases as a regex alternation, e.g. `path|segments`.
    pub fn alternation(&self) -> String {
        self.aliases
            .iter()
            .map(|a| regex::escape(a))
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// Maps wildcard type names to regex fragments, and smart names to types.
///
/// Both tables keep declaration order so that overlaps resolve the same way
/// on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardRegistry {
    types: Vec<(String, String)>,
    smart: Vec<SmartWildcard>,
}

impl Default for WildcardRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS)
    }
}

impl WildcardRegistry {
    /// Builds the registry, joining the space-separated `extension_list`
    /// with `|` to form the `ext` fragment.
    pub fn new(extension_list: &str) -> Self {
        let ext_fragment = extension_fragment(extension_list);
        debug!("Building wildcard registry with ext fragment '{}'", ext_fragment);

        let types = BUILTIN_TYPES
            .iter()
            .map(|(name, fragment)| {
                let fragment = if *name == "ext" { ext_fragment.clone() } else { fragment.to_string() };
                (name.to_string(), fragment)
            })
            .collect();

        let smart = SMART_WILDCARDS
            .iter()
            .map(|(aliases, canonical)| SmartWildcard {
                aliases: aliases.iter().map(|a| a.to_string()).collect(),
                canonical: canonical.to_string(),
            })
            .collect();

        Self { types, smart }
    }

    /// Returns the regex fragment configured for `type_name`.
    pub fn fragment_for(&self, type_name: &str) -> Result<&str, JumplinksError> {
        self.types
            .iter()
            .find(|(name, _)| name == type_name)
            .map(|(_, fragment)| fragment.as_str())
            .ok_or_else(|| JumplinksError::UnknownWildcardType {
                name: String::new(),
                type_name: type_name.to_string(),
            })
    }

    /// Resolves a smart wildcard name (case-insensitive) to its canonical type.
    pub fn resolve_smart(&self, name: &str) -> Option<&str> {
        self.smart
            .iter()
            .find(|s| s.aliases.iter().any(|a| a.eq_ignore_ascii_case(name)))
            .map(|s| s.canonical.as_str())
    }

    /// Smart alias sets in declaration order.
    pub fn smart_wildcards(&self) -> &[SmartWildcard] {
        &self.smart
    }

    /// A stable string covering every fragment, used in compile cache keys.
    pub fn signature(&self) -> String {
        self.types
            .iter()
            .map(|(name, fragment)| format!("{}={}", name, fragment))
            .collect::<Vec<_>>()
            .join("\u{1f}")
    }

    /// Checks that every smart alias set points at a registered type.
    pub fn validate(&self) -> Result<(), JumplinksError> {
        for smart in &self.smart {
            if self.fragment_for(&smart.canonical).is_err() {
                return Err(JumplinksError::InvalidConfig(format!(
                    "smart wildcard '{}' expands to unknown type '{}'",
                    smart.alternation(),
                    smart.canonical
                )));
            }
        }
        Ok(())
    }
}

/// Joins a space-separated extension list into an alternation fragment.
pub fn extension_fragment(extension_list: &str) -> String {
    extension_list.split_whitespace().collect::<Vec<_>>().join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_for_builtin_types() {
        let registry = WildcardRegistry::default();
        assert_eq!(registry.fragment_for("num").unwrap(), r"\d+");
        assert_eq!(registry.fragment_for("segment").unwrap(), r"[\w_-]+");
        assert_eq!(registry.fragment_for("segments").unwrap(), r"[\w/_-]+");
        assert_eq!(registry.fragment_for("all").unwrap(), ".*");
        assert!(registry.fragment_for("ext").unwrap().starts_with("aspx|asp|cfm"));
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        let registry = WildcardRegistry::default();
        match registry.fragment_for("bogus") {
            Err(JumplinksError::UnknownWildcardType { type_name, .. }) => assert_eq!(type_name, "bogus"),
            other => panic!("expected UnknownWildcardType, got {:?}", other),
        }
    }

    #[test]
    fn test_ext_fragment_is_taken_verbatim() {
        let registry = WildcardRegistry::new("  html   (?:php[345]?) ");
        assert_eq!(registry.fragment_for("ext").unwrap(), "html|(?:php[345]?)");
    }

    #[test]
    fn test_resolve_smart_is_case_insensitive() {
        let registry = WildcardRegistry::default();
        assert_eq!(registry.resolve_smart("Title"), Some("segment"));
        assert_eq!(registry.resolve_smart("year"), Some("num"));
        assert_eq!(registry.resolve_smart("path"), Some("segments"));
        assert_eq!(registry.resolve_smart("slug"), None);
    }

    #[test]
    fn test_default_registry_validates() {
        assert!(WildcardRegistry::default().validate().is_ok());
    }

    #[test]
    fn test_signature_changes_with_extensions() {
        let a = WildcardRegistry::new("html");
        let b = WildcardRegistry::new("html php");
        assert_ne!(a.signature(), b.signature());
    }
}
