//! Text cleanup applied to every candidate before it is judged or summarized.
//!
//! [`normalize`] runs the fixed sequence: non-ASCII strip, whitespace
//! collapse, markup strip, URL strip, boilerplate strip, then the line pass.
//! Each step is total and the whole pipeline is idempotent.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static MARKUP_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]*>").ok());

static URL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"https?://\S+").ok());

static BOILERPLATE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)membership id[#:\s]*\d+").ok());

static HEADING_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^#+\s*[A-Z]{2,}").ok());

/// Repeats the cleanup pass until it no longer changes the text, since one
/// removal can expose another match (e.g. nested membership ids).
pub fn normalize(text: &str) -> String {
    let mut current = cleanup_pass(text);
    loop {
        let next = cleanup_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Every step only removes characters once the text is on one line, so the
/// pass is non-increasing in length and `normalize` terminates.
fn cleanup_pass(text: &str) -> String {
    let text = strip_non_ascii(text);
    let text = collapse_whitespace(&text);
    let text = strip_markup(&text);
    let text = strip_urls(&text);
    let text = strip_boilerplate(&text);
    filter_lines(&text)
}

/// Drops non-ASCII characters and control characters other than whitespace.
pub fn strip_non_ascii(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii() && (!c.is_ascii_control() || c.is_ascii_whitespace()))
        .collect()
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn strip_markup(text: &str) -> String {
    replace_all(&MARKUP_RE, text)
}

pub fn strip_urls(text: &str) -> String {
    replace_all(&URL_RE, text)
}

pub fn strip_boilerplate(text: &str) -> String {
    replace_all(&BOILERPLATE_RE, text)
}

/// Line pass: trims and whitespace-normalizes each line, drops blank and
/// noise lines, keeps the first copy of repeated lines, joins with spaces.
pub fn filter_lines(text: &str) -> String {
    let mut seen = HashSet::new();
    let mut kept: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = collapse_whitespace(line);
        if line.is_empty() || is_noise_line(&line) {
            continue;
        }
        if seen.insert(line.clone()) {
            kept.push(line);
        }
    }
    kept.join(" ")
}

/// Image caption placeholders and all-caps markdown headings.
pub fn is_noise_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    if lower.starts_with("view image") || lower.contains("follow image") {
        return true;
    }
    HEADING_RE
        .as_ref()
        .map(|re| re.is_match(line))
        .unwrap_or(false)
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn replace_all(re: &LazyLock<Option<Regex>>, text: &str) -> String {
    match re.as_ref() {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.to_string(),
    }
}
