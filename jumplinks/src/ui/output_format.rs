//! Themed terminal output helpers.
//!
//! Every writer takes a `supports_color` flag so callers decide colour per
//! stream (`is-terminal`); nothing here inspects the environment itself.

use jumplinks_core::{ResolverDecision, ScanLog};
use owo_colors::OwoColorize;
use std::io::{self, Write};

use crate::ui::theme::{ThemeEntry, ThemeMap};

/// Applies the theme colour for `entry` to `text` when colour is enabled.
pub fn styled(text: &str, entry: ThemeEntry, theme: &ThemeMap, supports_color: bool) -> String {
    if !supports_color {
        return text.to_string();
    }
    match theme.get(&entry).and_then(|style| style.fg.as_ref()) {
        Some(color) => text.color(color.to_ansi_color()).to_string(),
        None => text.to_string(),
    }
}

fn print_message<W: Write>(
    writer: &mut W,
    prefix: &str,
    msg: &str,
    entry: ThemeEntry,
    theme: &ThemeMap,
    supports_color: bool,
) -> io::Result<()> {
    writeln!(writer, "{}", styled(&format!("{}{}", prefix, msg), entry, theme, supports_color))
}

pub fn print_info_message<W: Write>(writer: &mut W, msg: &str, theme: &ThemeMap, supports_color: bool) -> io::Result<()> {
    print_message(writer, "", msg, ThemeEntry::Info, theme, supports_color)
}

pub fn print_success_message<W: Write>(writer: &mut W, msg: &str, theme: &ThemeMap, supports_color: bool) -> io::Result<()> {
    print_message(writer, "", msg, ThemeEntry::Success, theme, supports_color)
}

pub fn print_warn_message<W: Write>(writer: &mut W, msg: &str, theme: &ThemeMap, supports_color: bool) -> io::Result<()> {
    print_message(writer, "Warning: ", msg, ThemeEntry::Warn, theme, supports_color)
}

pub fn print_error_message<W: Write>(writer: &mut W, msg: &str, theme: &ThemeMap, supports_color: bool) -> io::Result<()> {
    print_message(writer, "Error: ", msg, ThemeEntry::Error, theme, supports_color)
}

/// Writes a trace one entry per line, labels and details themed separately.
pub fn print_trace<W: Write>(writer: &mut W, trace: &ScanLog, theme: &ThemeMap, supports_color: bool) -> io::Result<()> {
    for entry in trace.entries() {
        match &entry.detail {
            Some(detail) => {
                let label = format!("{:<30}", format!("{}:", entry.label));
                writeln!(
                    writer,
                    "- {}{}",
                    styled(&label, ThemeEntry::TraceLabel, theme, supports_color),
                    styled(detail, ThemeEntry::TraceDetail, theme, supports_color)
                )?;
            }
            None => writeln!(writer, "{}", styled(&entry.label, ThemeEntry::Header, theme, supports_color))?,
        }
    }
    Ok(())
}

/// The one-line outcome: `301 <url>`, `302 <url>` or `404`.
pub fn decision_line(decision: &ResolverDecision) -> String {
    match decision {
        ResolverDecision::Redirect { url, .. } => format!("{} {}", decision.status_code(), url),
        ResolverDecision::NoMatch => decision.status_code().to_string(),
    }
}

pub fn print_decision<W: Write>(
    writer: &mut W,
    decision: &ResolverDecision,
    theme: &ThemeMap,
    supports_color: bool,
) -> io::Result<()> {
    let entry = match decision {
        ResolverDecision::Redirect { permanent: true, .. } => ThemeEntry::PermanentRedirect,
        ResolverDecision::Redirect { permanent: false, .. } => ThemeEntry::TemporaryRedirect,
        ResolverDecision::NoMatch => ThemeEntry::NoMatch,
    };
    writeln!(writer, "{}", styled(&decision_line(decision), entry, theme, supports_color))
}
