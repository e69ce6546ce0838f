//! rules.rs - Jumplink rules and mapping collections.
//!
//! This module defines the persisted data the resolver works from: the
//! jumplink rules themselves and the named key/value collections used to
//! remap captured values while rendering destinations.
//!
//! License: MIT OR APACHE 2.0

use chrono::{DateTime, TimeZone, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use crate::config::CleaningPolicy;
use crate::slug::SlugCleaner;

/// Prefix that disables a rule without deleting it.
pub const DISABLED_PREFIX: &str = "!!";

/// Timestamps at or before this date are stored "zero dates" and mean unset.
pub fn legacy_date_floor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1974, 10, 10, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Drops timestamps that fall on or before the legacy floor.
pub fn normalize_timestamp(value: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    value.filter(|ts| *ts > legacy_date_floor())
}

/// A single redirect definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct JumplinkRule {
    pub id: u64,
    /// The raw source pattern, relative to the site root.
    pub source: String,
    /// The raw destination template.
    pub destination: String,
    pub date_start: Option<DateTime<Utc>>,
    pub date_end: Option<DateTime<Utc>>,
    pub hits: u64,
    pub last_hit: Option<DateTime<Utc>>,
}

impl Default for JumplinkRule {
    fn default() -> Self {
        Self {
            id: 0,
            source: String::new(),
            destination: String::new(),
            date_start: None,
            date_end: None,
            hits: 0,
            last_hit: None,
        }
    }
}

impl Hash for JumplinkRule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.source.hash(state);
        self.destination.hash(state);
        self.date_start.hash(state);
        self.date_end.hash(state);
    }
}

impl JumplinkRule {
    /// Builds a rule the way the management `add` API does: leading slashes
    /// are dropped from both paths and floor dates are treated as unset.
    pub fn new(
        id: u64,
        source: &str,
        destination: &str,
        date_start: Option<DateTime<Utc>>,
        date_end: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            source: source.trim_start_matches('/').to_string(),
            destination: destination.trim_start_matches('/').to_string(),
            date_start: normalize_timestamp(date_start),
            date_end: normalize_timestamp(date_end),
            hits: 0,
            last_hit: None,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.source.starts_with(DISABLED_PREFIX)
    }

    pub fn starts(&self) -> Option<DateTime<Utc>> {
        normalize_timestamp(self.date_start)
    }

    pub fn ends(&self) -> Option<DateTime<Utc>> {
        normalize_timestamp(self.date_end)
    }

    pub fn last_hit(&self) -> Option<DateTime<Utc>> {
        normalize_timestamp(self.last_hit)
    }
}

/// Lower-cases a collection name and keeps ASCII letters only.
pub fn sanitize_collection_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Parses a single `key=value` line. Lines without `=` yield `None`.
pub fn parse_mapping_line(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.trim().to_string()))
}

/// A named key/value lookup table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MappingCollection {
    pub name: String,
    pub mappings: BTreeMap<String, String>,
}

impl MappingCollection {
    pub fn new(name: &str) -> Self {
        Self {
            name: sanitize_collection_name(name),
            mappings: BTreeMap::new(),
        }
    }

    /// Parses the `key=value` per line text form.
    pub fn parse(name: &str, text: &str) -> Self {
        let mut collection = Self::new(name);
        collection.mappings = text.lines().filter_map(parse_mapping_line).collect();
        collection
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.mappings.get(key).map(String::as_str)
    }
}

/// Every mapping collection, keyed by sanitised name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct MappingCollections(BTreeMap<String, BTreeMap<String, String>>);

impl MappingCollections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up `key` in `collection`. Collection names are matched after
    /// sanitising; keys are matched exactly.
    pub fn lookup(&self, collection: &str, key: &str) -> Option<&str> {
        self.0
            .get(&sanitize_collection_name(collection))
            .and_then(|mappings| mappings.get(key))
            .map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<MappingCollection> {
        let name = sanitize_collection_name(name);
        self.0.get(&name).map(|mappings| MappingCollection {
            name,
            mappings: mappings.clone(),
        })
    }

    pub fn insert(&mut self, collection: MappingCollection) {
        self.0.insert(collection.name, collection.mappings);
    }

    /// Creates or extends a collection. Values are cleaned according to
    /// `policy` before they are stored; existing keys are overwritten.
    /// Returns the sanitised collection name.
    pub fn upsert<I>(&mut self, name: &str, pairs: I, policy: CleaningPolicy, cleaner: &SlugCleaner) -> String
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let name = sanitize_collection_name(name);
        let mappings = self.0.entry(name.clone()).or_default();
        let mut added = 0usize;

        for (key, value) in pairs {
            let key = key.trim().to_string();
            if key.is_empty() {
                continue;
            }
            let value = if policy.cleans() {
                cleaner.clean(&value, policy.preserves_case())
            } else {
                value
            };
            mappings.insert(key, value);
            added += 1;
        }

        debug!("Collection '{}' now holds {} mappings ({} written).", name, mappings.len(), added);
        name
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<MappingCollection> for MappingCollections {
    fn from_iter<T: IntoIterator<Item = MappingCollection>>(iter: T) -> Self {
        let mut collections = Self::new();
        for collection in iter {
            collections.insert(collection);
        }
        collections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_prefix() {
        let rule = JumplinkRule::new(1, "!!old/page", "new", None, None);
        assert!(rule.is_disabled());
        assert!(!JumplinkRule::new(2, "old/page", "new", None, None).is_disabled());
    }

    #[test]
    fn test_new_strips_leading_slashes() {
        let rule = JumplinkRule::new(1, "/old/{name}", "/new/{name}/", None, None);
        assert_eq!(rule.source, "old/{name}");
        assert_eq!(rule.destination, "new/{name}/");
    }

    #[test]
    fn test_floor_dates_are_unset() {
        let zero = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        let floor = legacy_date_floor();
        let real = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let rule = JumplinkRule::new(1, "a", "b", Some(zero), Some(floor));
        assert_eq!(rule.starts(), None);
        assert_eq!(rule.ends(), None);

        let rule = JumplinkRule::new(1, "a", "b", Some(real), None);
        assert_eq!(rule.starts(), Some(real));
    }

    #[test]
    fn test_collection_name_sanitising() {
        assert_eq!(sanitize_collection_name("My Colours_2"), "mycolours");
        assert_eq!(MappingCollection::new("Colors!").name, "colors");
    }

    #[test]
    fn test_parse_collection_text() {
        let collection = MappingCollection::parse("colors", " red =ff0000\nno-equals-here\nblue=0000ff\r\n");
        assert_eq!(collection.get("red"), Some("ff0000"));
        assert_eq!(collection.get("blue"), Some("0000ff"));
        assert_eq!(collection.mappings.len(), 2);
    }

    #[test]
    fn test_upsert_cleans_and_merges() {
        let cleaner = SlugCleaner::new(false);
        let mut collections = MappingCollections::new();

        collections.upsert(
            "Products",
            vec![("1".to_string(), "Blue Widget".to_string())],
            CleaningPolicy::FullClean,
            &cleaner,
        );
        collections.upsert(
            "products",
            vec![("2".to_string(), "Red Widget".to_string())],
            CleaningPolicy::SemiClean,
            &cleaner,
        );
        collections.upsert(
            "products",
            vec![("3".to_string(), "As Is!".to_string())],
            CleaningPolicy::NoClean,
            &cleaner,
        );

        assert_eq!(collections.lookup("products", "1"), Some("blue-widget"));
        assert_eq!(collections.lookup("products", "2"), Some("Red-Widget"));
        assert_eq!(collections.lookup("products", "3"), Some("As Is!"));
        assert_eq!(collections.len(), 1);
    }
}
