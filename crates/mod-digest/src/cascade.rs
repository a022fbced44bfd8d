//! Fallback cascade: plain text, then HTML-derived text, then OCR of the
//! rendered HTML.
//!
//! Expressed as a state machine with one transition function. A candidate
//! produced by the HTML or OCR stage re-enters [`Stage::Plain`] with no HTML
//! attached, so every candidate goes through the same preparation and
//! garbage check before it is accepted.

use std::sync::Arc;

use digest_domain::{DecodedMessage, ExtractionResult, HtmlRenderer, OcrEngine};
use tracing::{debug, warn};

use crate::garbage::is_garbage;
use crate::html::html_to_text;
use crate::normalize::{filter_lines, normalize, word_count};

/// Minimum word count for HTML-derived text to be trusted.
pub const MIN_HTML_WORDS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Judge a candidate; `html` is the fallback if it is rejected.
    Plain {
        candidate: String,
        html: Option<String>,
    },
    HtmlText {
        html: String,
    },
    Ocr {
        html: String,
    },
    Accepted(String),
    Exhausted,
}

impl Stage {
    pub fn initial(msg: &DecodedMessage) -> Self {
        Self::Plain {
            candidate: msg.plain_body.clone(),
            html: msg.has_html().then(|| msg.html_body.clone()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted(_) | Self::Exhausted)
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Plain { .. } => "plain",
            Self::HtmlText { .. } => "html_text",
            Self::Ocr { .. } => "ocr",
            Self::Accepted(_) => "accepted",
            Self::Exhausted => "exhausted",
        }
    }
}

/// Line filtering while the candidate still has its original line breaks,
/// then the full normalizer.
pub fn prepare(candidate: &str) -> String {
    normalize(&filter_lines(candidate))
}

#[derive(Clone)]
pub struct Cascade {
    renderer: Arc<dyn HtmlRenderer>,
    ocr: Arc<dyn OcrEngine>,
}

impl Cascade {
    pub fn new(renderer: Arc<dyn HtmlRenderer>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self { renderer, ocr }
    }

    pub async fn extract(&self, msg: &DecodedMessage) -> ExtractionResult {
        self.run(Stage::initial(msg)).await
    }

    /// Runs a bare piece of text (e.g. OCR output) through the plain stage.
    pub async fn extract_text(&self, text: &str) -> ExtractionResult {
        self.run(Stage::Plain {
            candidate: text.to_string(),
            html: None,
        })
        .await
    }

    pub async fn run(&self, mut stage: Stage) -> ExtractionResult {
        while !stage.is_terminal() {
            let from = stage.name();
            stage = self.advance(stage).await;
            debug!(from, to = stage.name(), "cascade transition");
        }
        match stage {
            Stage::Accepted(text) => ExtractionResult::Text(text),
            _ => ExtractionResult::Exhausted,
        }
    }

    pub async fn advance(&self, stage: Stage) -> Stage {
        match stage {
            Stage::Plain { candidate, html } => {
                let text = prepare(&candidate);
                if !is_garbage(&text) {
                    Stage::Accepted(text)
                } else if let Some(html) = html {
                    Stage::HtmlText { html }
                } else {
                    Stage::Exhausted
                }
            }
            Stage::HtmlText { html } => {
                let text = prepare(&html_to_text(&html));
                if word_count(&text) >= MIN_HTML_WORDS && !is_garbage(&text) {
                    Stage::Plain {
                        candidate: text,
                        html: None,
                    }
                } else {
                    Stage::Ocr { html }
                }
            }
            Stage::Ocr { html } => match self.ocr_html(&html).await {
                Some(text) if !is_garbage(&text) => Stage::Plain {
                    candidate: text,
                    html: None,
                },
                _ => Stage::Exhausted,
            },
            terminal => terminal,
        }
    }

    async fn ocr_html(&self, html: &str) -> Option<String> {
        let image = match self.renderer.render(html).await {
            Ok(image) => image,
            Err(e) => {
                warn!(%e, "html render failed, ocr stage unavailable");
                return None;
            }
        };
        match self.ocr.recognize(&image).await {
            Ok(text) => Some(prepare(&text)),
            Err(e) => {
                warn!(%e, "ocr failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use digest_domain::{RasterImage, NO_CONTENT};
    use digest_error::DigestError;

    use super::*;

    struct FixedRenderer;

    #[async_trait]
    impl HtmlRenderer for FixedRenderer {
        async fn render(&self, _html: &str) -> Result<RasterImage, DigestError> {
            Ok(RasterImage::new(vec![0x89, b'P', b'N', b'G']))
        }
    }

    struct BrokenRenderer;

    #[async_trait]
    impl HtmlRenderer for BrokenRenderer {
        async fn render(&self, _html: &str) -> Result<RasterImage, DigestError> {
            Err(DigestError::render("no browser"))
        }
    }

    struct CountingOcr {
        text: String,
        calls: AtomicUsize,
    }

    impl CountingOcr {
        fn new(text: &str) -> Arc<Self> {
            Arc::new(Self {
                text: text.to_string(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl OcrEngine for CountingOcr {
        async fn recognize(&self, _image: &RasterImage) -> Result<String, DigestError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.text.clone())
        }
    }

    fn message(plain: &str, html: &str) -> DecodedMessage {
        DecodedMessage {
            subject: "s".into(),
            sender: "a@b.c".into(),
            plain_body: plain.into(),
            html_body: html.into(),
        }
    }

    #[tokio::test]
    async fn plain_text_is_accepted_first() {
        let ocr = CountingOcr::new("unused");
        let cascade = Cascade::new(Arc::new(FixedRenderer), ocr.clone());
        let result = cascade
            .extract(&message("Lunch moved to noon on Friday.", "<p>ignored</p>"))
            .await;
        assert_eq!(
            result,
            ExtractionResult::Text("Lunch moved to noon on Friday.".into())
        );
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn html_stage_succeeds_without_ocr() {
        let ocr = CountingOcr::new("unused");
        let cascade = Cascade::new(Arc::new(FixedRenderer), ocr.clone());
        let html = "<html><body>This is a sufficiently long readable message for testing purposes.</body></html>";
        let result = cascade.extract(&message("", html)).await;
        assert_eq!(
            result,
            ExtractionResult::Text(normalize(&html_to_text(html)))
        );
        assert_eq!(
            result.as_str(),
            "This is a sufficiently long readable message for testing purposes."
        );
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn both_bodies_empty_is_exhausted() {
        let ocr = CountingOcr::new("unused");
        let cascade = Cascade::new(Arc::new(FixedRenderer), ocr.clone());
        let result = cascade.extract(&message("", "")).await;
        assert_eq!(result, ExtractionResult::Exhausted);
        assert_eq!(result.as_str(), NO_CONTENT);
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn short_html_falls_through_to_ocr() {
        let ocr = CountingOcr::new("SALE\nEverything in the store is half price this weekend only");
        let cascade = Cascade::new(Arc::new(FixedRenderer), ocr.clone());
        let result = cascade
            .extract(&message("", "<img src=\"banner.png\"><p>Shop now</p>"))
            .await;
        assert_eq!(
            result.as_str(),
            "SALE Everything in the store is half price this weekend only"
        );
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn css_leak_in_html_goes_to_ocr() {
        let ocr = CountingOcr::new("margin: 0; padding: 0");
        let cascade = Cascade::new(Arc::new(FixedRenderer), ocr.clone());
        let html = "<div>font-size: 12px; margin: 0 auto; this table has lots of words in it here</div>";
        let result = cascade.extract(&message("", html)).await;
        assert_eq!(result, ExtractionResult::Exhausted);
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn render_failure_exhausts_without_ocr() {
        let ocr = CountingOcr::new("would have worked fine as text");
        let cascade = Cascade::new(Arc::new(BrokenRenderer), ocr.clone());
        let result = cascade.extract(&message("hi", "<p>tiny</p>")).await;
        assert_eq!(result, ExtractionResult::Exhausted);
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn garbage_plain_without_html_is_exhausted() {
        let ocr = CountingOcr::new("unused");
        let cascade = Cascade::new(Arc::new(FixedRenderer), ocr.clone());
        let result = cascade.extract(&message("ok", "")).await;
        assert!(result.is_exhausted());
    }

    #[tokio::test]
    async fn transitions_follow_stage_order() {
        let ocr = CountingOcr::new("unused");
        let cascade = Cascade::new(Arc::new(FixedRenderer), ocr);
        let html = "<p>short</p>".to_string();
        let stage = Stage::initial(&message("", &html));
        let stage = cascade.advance(stage).await;
        assert_eq!(stage, Stage::HtmlText { html: html.clone() });
        let stage = cascade.advance(stage).await;
        assert_eq!(stage, Stage::Ocr { html });
        let stage = cascade.advance(stage).await;
        assert_eq!(stage, Stage::Exhausted);
        assert_eq!(cascade.advance(Stage::Exhausted).await, Stage::Exhausted);
    }
}
