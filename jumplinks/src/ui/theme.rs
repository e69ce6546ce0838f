//! Module for managing the terminal colour theme of the `jumplinks` CLI.
//!
//! Every logical part of the output (headers, trace labels, redirect
//! outcomes, messages) maps to a `ThemeStyle`. Themes are loaded from YAML and
//! merged over the defaults, so a theme file only needs the entries it changes.

use anyhow::{Context, Result};
use owo_colors::AnsiColors;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Type alias for the theme map, providing a consistent type definition.
pub type ThemeMap = HashMap<ThemeEntry, ThemeStyle>;

/// The different logical parts of the output that can be styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeEntry {
    /// Section titles and table headers.
    Header,
    Success,
    Info,
    Warn,
    Error,
    /// The label column of an evaluation trace.
    TraceLabel,
    /// The detail column of an evaluation trace.
    TraceDetail,
    /// A 301 outcome.
    PermanentRedirect,
    /// A 302 outcome.
    TemporaryRedirect,
    /// A 404 outcome.
    NoMatch,
}

impl ThemeEntry {
    /// Every entry, in display order.
    pub const ALL: [ThemeEntry; 10] = [
        ThemeEntry::Header,
        ThemeEntry::Success,
        ThemeEntry::Info,
        ThemeEntry::Warn,
        ThemeEntry::Error,
        ThemeEntry::TraceLabel,
        ThemeEntry::TraceDetail,
        ThemeEntry::PermanentRedirect,
        ThemeEntry::TemporaryRedirect,
        ThemeEntry::NoMatch,
    ];
}

/// Represents an ANSI color that can be used in the theme.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ThemeColor {
    /// A named ANSI color (e.g., "red", "brightgreen").
    Named(String),
}

/// Error type for parsing an invalid `ThemeColor` string.
#[derive(Debug, Clone)]
pub struct ParseThemeColorError;

impl fmt::Display for ParseThemeColorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Invalid theme color; expected one of: black, red, green, yellow, blue, \
            magenta, cyan, white, brightblack, brightred, brightgreen, brightyellow, \
            brightblue, brightmagenta, brightcyan, brightwhite."
        )
    }
}

impl std::error::Error for ParseThemeColorError {}

const NAMED_COLORS: [(&str, AnsiColors); 16] = [
    ("black", AnsiColors::Black),
    ("red", AnsiColors::Red),
    ("green", AnsiColors::Green),
    ("yellow", AnsiColors::Yellow),
    ("blue", AnsiColors::Blue),
    ("magenta", AnsiColors::Magenta),
    ("cyan", AnsiColors::Cyan),
    ("white", AnsiColors::White),
    ("brightblack", AnsiColors::BrightBlack),
    ("brightred", AnsiColors::BrightRed),
    ("brightgreen", AnsiColors::BrightGreen),
    ("brightyellow", AnsiColors::BrightYellow),
    ("brightblue", AnsiColors::BrightBlue),
    ("brightmagenta", AnsiColors::BrightMagenta),
    ("brightcyan", AnsiColors::BrightCyan),
    ("brightwhite", AnsiColors::BrightWhite),
];

impl FromStr for ThemeColor {
    type Err = ParseThemeColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        if NAMED_COLORS.iter().any(|(name, _)| *name == lower) {
            Ok(ThemeColor::Named(lower))
        } else {
            Err(ParseThemeColorError)
        }
    }
}

impl ThemeColor {
    /// Converts the colour into its `owo_colors::AnsiColors` counterpart.
    /// Unknown names fall back to white.
    pub fn to_ansi_color(&self) -> AnsiColors {
        let ThemeColor::Named(name) = self;
        let lower = name.to_lowercase();
        NAMED_COLORS
            .iter()
            .find(|(candidate, _)| *candidate == lower)
            .map(|(_, color)| *color)
            .unwrap_or(AnsiColors::White)
    }
}

/// Represents the style configuration for a specific `ThemeEntry`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ThemeStyle {
    /// An optional `ThemeColor` to apply as the foreground color.
    pub fg: Option<ThemeColor>,
}

fn named(color: &str) -> ThemeStyle {
    ThemeStyle {
        fg: Some(ThemeColor::Named(color.into())),
    }
}

/// Loads a theme configuration from a YAML file or returns the default theme.
pub fn build_theme_map(theme_path: Option<&PathBuf>) -> Result<ThemeMap> {
    if let Some(path) = theme_path {
        ThemeStyle::load_from_file(path)
    } else {
        Ok(ThemeStyle::default_theme_map())
    }
}

impl ThemeStyle {
    /// Loads a theme file and fills every entry it leaves out from the defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<ThemeMap> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read theme file {}", path.display()))?;
        let mut custom: ThemeMap = serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse theme file {}", path.display()))?;

        for (entry, style) in Self::default_theme_map() {
            custom.entry(entry).or_insert(style);
        }
        Ok(custom)
    }

    /// Returns a default theme map with predefined color mappings.
    pub fn default_theme_map() -> ThemeMap {
        let mut default_theme = HashMap::new();
        default_theme.insert(ThemeEntry::Header, named("brightcyan"));
        default_theme.insert(ThemeEntry::Success, named("green"));
        default_theme.insert(ThemeEntry::Warn, named("yellow"));
        default_theme.insert(ThemeEntry::Error, named("red"));
        default_theme.insert(ThemeEntry::TraceLabel, named("brightblack"));
        default_theme.insert(ThemeEntry::PermanentRedirect, named("brightgreen"));
        default_theme.insert(ThemeEntry::TemporaryRedirect, named("brightyellow"));
        default_theme.insert(ThemeEntry::NoMatch, named("brightred"));

        for entry in ThemeEntry::ALL {
            default_theme.entry(entry).or_insert_with(|| named("white"));
        }
        default_theme
    }
}
