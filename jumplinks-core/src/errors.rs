//! errors.rs - Custom error types for the jumplinks-core library.
//!
//! Rule-level variants (`UnknownWildcardType`, `PatternCompilation`,
//! `UnresolvedSelector`) are contained to the rule that raised them: the
//! resolver logs them and moves on to the next candidate. Store-level
//! variants abort the current resolution, and legacy probe failures only
//! ever degrade to "no acceptable status".
//!
//! License: MIT OR APACHE 2.0

use thiserror::Error;

/// This enum represents all possible error types in the `jumplinks-core` library.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum JumplinksError {
    #[error("Wildcard '{{{name}:{type_name}}}' references unknown wildcard type '{type_name}'")]
    UnknownWildcardType { name: String, type_name: String },

    #[error("Failed to compile matcher for source '{0}': {1}")]
    PatternCompilation(String, regex::Error),

    #[error("Selector '[[{0}]]' did not resolve to a page")]
    UnresolvedSelector(String),

    #[error("Rule store unavailable: {0}")]
    PersistenceUnavailable(String),

    #[error("Rule store did not answer within {0} ms")]
    PersistenceTimeout(u64),

    #[error("Legacy domain probe failed for '{url}': {reason}")]
    LegacyProbeFailure { url: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("An unexpected I/O error occurred: {0}")]
    IoError(#[from] std::io::Error),

    #[error("A critical system error occurred: {0}")]
    AnyhowWrapper(#[from] anyhow::Error),
}

impl JumplinksError {
    /// True for errors that only disqualify the rule being evaluated.
    pub fn is_rule_scoped(&self) -> bool {
        matches!(
            self,
            JumplinksError::UnknownWildcardType { .. }
                | JumplinksError::PatternCompilation(..)
                | JumplinksError::UnresolvedSelector(_)
        )
    }
}
