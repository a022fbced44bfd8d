use std::sync::Arc;

use digest_domain::SummaryModel;
use tracing::{debug, warn};

use crate::normalize::word_count;

/// Inputs shorter than this are returned as-is.
pub const MIN_WORDS: usize = 10;

/// `(max_len, min_len)` output bounds for an input of `words` words.
pub fn length_bounds(words: usize) -> (usize, usize) {
    match words {
        0..=19 => (20, 5),
        20..=49 => (40, 10),
        50..=99 => (80, 20),
        100..=199 => (110, 30),
        _ => (130, 40),
    }
}

/// Best-effort summarization: never fails and never returns something
/// longer than its input.
#[derive(Clone)]
pub struct Summarizer {
    model: Arc<dyn SummaryModel>,
}

impl Summarizer {
    pub fn new(model: Arc<dyn SummaryModel>) -> Self {
        Self { model }
    }

    pub async fn summarize(&self, text: &str) -> String {
        let text = text.trim();
        let words = word_count(text);
        if words < MIN_WORDS {
            return text.to_string();
        }

        let (max_len, min_len) = length_bounds(words);
        match self.model.summarize(text, max_len, min_len).await {
            Ok(summary) => {
                let summary = summary.trim();
                let summary_words = word_count(summary);
                if summary_words == 0 || summary_words >= words {
                    debug!(words, summary_words, "summary not shorter than input, keeping input");
                    text.to_string()
                } else {
                    summary.to_string()
                }
            }
            Err(e) => {
                warn!(%e, "summarization unavailable, keeping input");
                text.to_string()
            }
        }
    }
}
