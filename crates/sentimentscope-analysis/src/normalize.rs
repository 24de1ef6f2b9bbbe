//! Text normalization shared by the sentiment and topic passes

use regex::Regex;
use std::sync::OnceLock;

/// Inputs shorter than this (after trimming) normalize to the empty string
pub const MIN_TEXT_LEN: usize = 10;

fn non_alpha() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z\s]").expect("static regex"))
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// Normalize review text.
///
/// Returns lowercase ASCII letters separated by single spaces, or an empty
/// string when the trimmed input is shorter than [`MIN_TEXT_LEN`] characters.
pub fn normalize(text: &str) -> String {
    if text.trim().chars().count() < MIN_TEXT_LEN {
        return String::new();
    }

    let lowered = text.to_lowercase();
    let letters_only = non_alpha().replace_all(&lowered, "");
    let collapsed = whitespace().replace_all(&letters_only, " ");
    collapsed.trim().to_string()
}

/// Number of whitespace-separated words
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
