//! activation.rs - Timed activation of jumplinks.
//!
//! A rule may carry a start and/or an end timestamp. Missing bounds are
//! filled in so that a single `starts <= now <= ends` test decides whether
//! the rule is live:
//!
//! * no dates: always active, permanent redirect
//! * end only: the window starts "now"
//! * start only: the window ends at a far-future dummy date
//!
//! Any timed rule redirects temporarily. A window whose end precedes its
//! start is evaluated as-is and only described differently.
//!
//! License: MIT OR APACHE 2.0

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::rules::{normalize_timestamp, JumplinkRule};

/// How far past "now" a dummy end date is placed.
const DUMMY_END_YEARS: i64 = 100;

/// Redirect semantics of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectKind {
    Permanent,
    Temporary,
}

impl RedirectKind {
    pub fn status_code(&self) -> u16 {
        match self {
            RedirectKind::Permanent => 301,
            RedirectKind::Temporary => 302,
        }
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, RedirectKind::Permanent)
    }
}

impl fmt::Display for RedirectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedirectKind::Permanent => write!(f, "301, permanent"),
            RedirectKind::Temporary => write!(f, "302, temporary"),
        }
    }
}

/// The raw bounds of a rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivationWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// The evaluated window at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationState {
    pub is_active: bool,
    pub kind: RedirectKind,
    pub starts: Option<DateTime<Utc>>,
    pub ends: Option<DateTime<Utc>>,
    /// `ends` was filled in and is not meaningful to display.
    pub is_dummy_end: bool,
}

impl ActivationWindow {
    /// Builds a window, treating legacy floor dates as unset.
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self {
            start: normalize_timestamp(start),
            end: normalize_timestamp(end),
        }
    }

    pub fn for_rule(rule: &JumplinkRule) -> Self {
        Self::new(rule.starts(), rule.ends())
    }

    pub fn evaluate(&self, now: DateTime<Utc>) -> ActivationState {
        let (starts, ends, is_dummy_end) = match (self.start, self.end) {
            (None, None) => (None, None, false),
            (None, Some(end)) => (Some(now), Some(end), false),
            (Some(start), None) => (Some(start), Some(now + Duration::days(365 * DUMMY_END_YEARS)), true),
            (Some(start), Some(end)) => (Some(start), Some(end), false),
        };

        let is_active = match (starts, ends) {
            (Some(starts), Some(ends)) => starts <= now && now <= ends,
            _ => true,
        };

        let kind = if starts.is_some() { RedirectKind::Temporary } else { RedirectKind::Permanent };

        ActivationState {
            is_active,
            kind,
            starts,
            ends,
            is_dummy_end,
        }
    }
}

impl ActivationState {
    /// The end precedes the start.
    pub fn is_inverted(&self) -> bool {
        matches!((self.starts, self.ends), (Some(starts), Some(ends)) if ends < starts)
    }

    /// Human description of the window, `None` for untimed rules.
    pub fn describe(&self) -> Option<String> {
        let starts = self.starts?;
        match self.ends {
            Some(ends) if !self.is_dummy_end && !self.is_inverted() => {
                Some(format!("From {} to {}", starts.to_rfc2822(), ends.to_rfc2822()))
            }
            _ => Some(format!("From {} onwards", starts.to_rfc2822())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_untimed_is_permanent_and_active() {
        let state = ActivationWindow::new(None, None).evaluate(at(2024, 1, 1));
        assert!(state.is_active);
        assert_eq!(state.kind, RedirectKind::Permanent);
        assert_eq!((state.starts, state.ends), (None, None));
        assert_eq!(state.describe(), None);
    }

    #[test]
    fn test_end_only_starts_now() {
        let now = at(2024, 1, 1);
        let state = ActivationWindow::new(None, Some(at(2024, 6, 1))).evaluate(now);
        assert!(state.is_active);
        assert_eq!(state.starts, Some(now));
        assert!(!state.is_dummy_end);
        assert_eq!(state.kind, RedirectKind::Temporary);

        let expired = ActivationWindow::new(None, Some(at(2023, 6, 1))).evaluate(now);
        assert!(!expired.is_active);
    }

    #[test]
    fn test_start_only_uses_dummy_end() {
        let now = at(2024, 1, 1);
        let state = ActivationWindow::new(Some(at(2023, 1, 1)), None).evaluate(now);
        assert!(state.is_active);
        assert!(state.is_dummy_end);
        assert_eq!(state.kind, RedirectKind::Temporary);
        assert!(state.describe().unwrap().ends_with("onwards"));

        let future = ActivationWindow::new(Some(at(2025, 1, 1)), None).evaluate(now);
        assert!(!future.is_active);
    }

    #[test]
    fn test_bounded_window() {
        let window = ActivationWindow::new(Some(at(2024, 1, 1)), Some(at(2024, 2, 1)));
        assert!(window.evaluate(at(2024, 1, 15)).is_active);
        assert!(!window.evaluate(at(2024, 3, 1)).is_active);
        let described = window.evaluate(at(2024, 1, 15)).describe().unwrap();
        assert!(described.starts_with("From ") && described.contains(" to "));
    }

    #[test]
    fn test_inverted_window() {
        let state = ActivationWindow::new(Some(at(2024, 2, 1)), Some(at(2024, 1, 1))).evaluate(at(2024, 1, 15));
        assert!(state.is_inverted());
        assert!(!state.is_active);
        assert!(state.describe().unwrap().ends_with("onwards"));
    }

    #[test]
    fn test_floor_dates_ignored() {
        let zero = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        let state = ActivationWindow::new(Some(zero), Some(zero)).evaluate(at(2024, 1, 1));
        assert_eq!(state.kind, RedirectKind::Permanent);
        assert!(state.is_active);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(RedirectKind::Permanent.to_string(), "301, permanent");
        assert_eq!(RedirectKind::Temporary.status_code(), 302);
    }
}
