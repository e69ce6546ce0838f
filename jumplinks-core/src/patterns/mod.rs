//! Source pattern compilation for jumplinks.
//!
//! A jumplink source is written in a small wildcard syntax (`{name:type}`,
//! smart `{name}` shortcuts, `<...>` non-capturing groups, `[x]` optional
//! characters). This module turns that syntax into anchored, case-insensitive
//! regular expressions plus the ordered list of wildcard names, and keeps a
//! process-wide cache of the results.

pub mod compiler;
