/// Anything shorter than this many characters is not worth summarizing.
pub const MIN_CHARS: usize = 10;

const MARKUP_PREFIX: &str = "html";

const CSS_MARKERS: [&str; 3] = ["font-", "margin:", "background-color"];

/// True when the text is too short, or looks like unrendered markup or
/// styling rather than prose.
pub fn is_garbage(text: &str) -> bool {
    text.chars().count() < MIN_CHARS
        || text.to_lowercase().starts_with(MARKUP_PREFIX)
        || CSS_MARKERS.iter().any(|m| text.contains(m))
}
