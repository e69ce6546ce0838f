//! trace.rs - The evaluation trace produced by every resolution.
//!
//! Each resolution records an ordered list of `label`/`detail` entries that
//! describes what happened to every rule it looked at. The trace is returned
//! to the caller as a value; entries are mirrored to `log::debug!` as they
//! are recorded, but nothing here writes to a transport.
//!
//! License: MIT OR APACHE 2.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// Width the label column is padded to when a trace is rendered as text.
const LABEL_WIDTH: usize = 30;

/// One step of an evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "- {:<width$}{}", format!("{}:", self.label), detail, width = LABEL_WIDTH),
            None => write!(f, "{}", self.label),
        }
    }
}

/// An ordered evaluation trace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanLog {
    entries: Vec<TraceEntry>,
}

impl ScanLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a labelled value.
    pub fn record(&mut self, label: impl Into<String>, detail: impl Into<String>) {
        self.push(TraceEntry {
            label: label.into(),
            detail: Some(detail.into()),
        });
    }

    /// Records a free-standing line.
    pub fn note(&mut self, text: impl Into<String>) {
        self.push(TraceEntry {
            label: text.into(),
            detail: None,
        });
    }

    fn push(&mut self, entry: TraceEntry) {
        log::debug!(target: "jumplinks_core::resolver", "{}", entry);
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if any entry carries `label`.
    pub fn contains_label(&self, label: &str) -> bool {
        self.entries.iter().any(|e| e.label == label)
    }

    /// The detail of the last entry carrying `label`.
    pub fn detail_of(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.label == label)
            .and_then(|e| e.detail.as_deref())
    }
}

impl fmt::Display for ScanLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{}", entry)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_pads_labels() {
        let mut log = ScanLog::new();
        log.note("[Checking jumplink #3]");
        log.record("Original Source Path", "old/{id}");

        let rendered = log.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "[Checking jumplink #3]");
        assert_eq!(lines[1], format!("- {:<30}old/{{id}}", "Original Source Path:"));
    }

    #[test]
    fn test_lookup_helpers() {
        let mut log = ScanLog::new();
        log.record("To URL", "/first");
        log.record("To URL", "/second");
        assert!(log.contains_label("To URL"));
        assert_eq!(log.detail_of("To URL"), Some("/second"));
        assert_eq!(log.detail_of("From URL"), None);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_serializes_as_list() {
        let mut log = ScanLog::new();
        log.note("No match there...");
        let json = serde_json::to_string(&log).unwrap();
        assert_eq!(json, r#"[{"label":"No match there..."}]"#);
    }
}
