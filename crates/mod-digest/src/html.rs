//! HTML-to-text conversion used by the decoder and the cascade.

use tracing::debug;

/// Wide enough that `html2text` never wraps a paragraph onto several lines.
const RENDER_WIDTH: usize = 10_000;

/// Renders HTML to plain text, one whitespace-normalized line per block.
pub fn html_to_text(html: &str) -> String {
    let rendered = match html2text::from_read(html.as_bytes(), RENDER_WIDTH) {
        Ok(text) => text,
        Err(e) => {
            debug!(%e, "html2text failed, stripping tags instead");
            strip_tags(html)
        }
    };
    rendered
        .lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                result.push(' ');
            }
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result
}
