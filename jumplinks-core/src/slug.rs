//! slug.rs - Wildcard value cleaning ("slugging").
//!
//! Captured wildcard values are normalised into URL-safe slugs before they
//! are placed into a destination. The stages run in a fixed order and each
//! one relies on the normalisation done by the stages before it:
//!
//! 1. (enhanced) break acronym runs and TitleCase boundaries with hyphens
//! 2. `%uXXXX` escapes to numeric entities, then URL decoding
//! 3. runs of anything but letters, digits and `/` become a single hyphen
//! 4. transliteration to ASCII; when enhanced, stage 1 runs again on the
//!    transliterated letters
//! 5. (enhanced) hyphen between letter/digit adjacencies
//! 6. trim hyphens
//! 7. strip anything outside `[A-Za-z0-9_/-]`
//! 8. lower-case unless case is preserved
//!
//! License: MIT OR APACHE 2.0

use deunicode::deunicode;
use once_cell::sync::Lazy;
use regex::Regex;

static LEGACY_UNICODE_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)%u([a-f\d]{3,4})").expect("static regex"));
static NON_LETTER_DIGIT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{Nd}/]+").expect("static regex"));
static LETTER_THEN_DIGIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-zA-Z])(\d)").expect("static regex"));
static DIGIT_THEN_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d)([a-zA-Z])").expect("static regex"));
static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_/\-]+").expect("static regex"));
static REPEATED_HYPHENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").expect("static regex"));

/// Cleans captured values into slugs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlugCleaner {
    /// Split TitleCase words, acronyms and letter/digit runs with hyphens.
    pub enhanced: bool,
}

impl SlugCleaner {
    pub fn new(enhanced: bool) -> Self {
        Self { enhanced }
    }

    /// Cleans `input`, lower-casing the result unless `preserve_case` is set.
    ///
    /// Cleaning is idempotent: feeding a cleaned value back in with the same
    /// flags returns it unchanged.
    pub fn clean(&self, input: &str, preserve_case: bool) -> String {
        let mut value = input.to_string();

        if self.enhanced {
            value = insert_title_case_breaks(&fold_acronyms(&value));
        }

        let entities = LEGACY_UNICODE_ESCAPE.replace_all(&value, "&#x${1};").into_owned();
        value = url_decode(&entities);
        value = NON_LETTER_DIGIT_RUN.replace_all(&value, "-").into_owned();
        value = deunicode(&value);

        if self.enhanced {
            // Transliteration can produce new uppercase runs (`ÀB` -> `AB`).
            let ascii = DISALLOWED.replace_all(&value, "");
            value = insert_title_case_breaks(&fold_acronyms(&ascii));
            let split = LETTER_THEN_DIGIT.replace_all(&value, "${1}-${2}").into_owned();
            value = DIGIT_THEN_LETTER.replace_all(&split, "${1}-${2}").into_owned();
        }

        value = value.trim_matches('-').to_string();
        value = DISALLOWED.replace_all(&value, "").into_owned();

        // Transliteration can leave punctuation next to a hyphen; settle it so
        // a second pass has nothing left to do.
        let settled = REPEATED_HYPHENS.replace_all(&value, "-").into_owned();
        value = settled.trim_matches('-').to_string();

        if !preserve_case {
            value = value.to_lowercase();
        }

        value
    }
}

fn is_word_byte(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `NASALaunch` -> `NasaLaunch`: an uppercase letter followed by an uppercase
/// run keeps its first letter and lower-cases the run, as long as the run ends
/// at another uppercase letter or a word boundary.
fn fold_acronyms(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        if !chars[i].is_ascii_uppercase() {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let run = chars[i + 1..].iter().take_while(|c| c.is_ascii_uppercase()).count();
        let after_run = chars.get(i + 1 + run).copied();
        let ends_at_boundary = after_run.map_or(true, |c| !is_word_byte(c));

        let taken = if run >= 1 && ends_at_boundary {
            run
        } else if run >= 2 {
            // Give the last uppercase letter back so it can start the next word.
            run - 1
        } else {
            0
        };

        if taken == 0 {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        out.push(chars[i]);
        out.extend(chars[i + 1..=i + taken].iter().map(|c| c.to_ascii_lowercase()));
        i += 1 + taken;
    }

    out
}

/// Inserts a hyphen before every uppercase letter that follows a word character.
fn insert_title_case_breaks(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 4);
    let mut previous: Option<char> = None;

    for c in input.chars() {
        if c.is_ascii_uppercase() && previous.is_some_and(is_word_byte) {
            out.push('-');
        }
        out.push(c);
        previous = Some(c);
    }

    out
}

/// Form-style URL decoding: `+` is a space, invalid UTF-8 is replaced.
fn url_decode(input: &str) -> String {
    let spaced = input.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}
