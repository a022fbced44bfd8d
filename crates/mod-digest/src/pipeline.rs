use std::sync::Arc;

use digest_domain::{
    DecodedMessage, EmailSummary, ExtractionResult, HtmlRenderer, OcrEngine, SummaryModel,
    NO_CONTENT,
};

use crate::cascade::Cascade;
use crate::normalize::normalize;
use crate::priority::classify;
use crate::summarize::Summarizer;

/// Per-message work: cascade, then summarizer, then classifier.
#[derive(Clone)]
pub struct MessagePipeline {
    cascade: Cascade,
    summarizer: Summarizer,
}

impl MessagePipeline {
    pub fn new(
        renderer: Arc<dyn HtmlRenderer>,
        ocr: Arc<dyn OcrEngine>,
        model: Arc<dyn SummaryModel>,
    ) -> Self {
        Self {
            cascade: Cascade::new(renderer, ocr),
            summarizer: Summarizer::new(model),
        }
    }

    pub fn cascade(&self) -> &Cascade {
        &self.cascade
    }

    pub async fn run(&self, msg: &DecodedMessage) -> EmailSummary {
        let extraction = self.cascade.extract(msg).await;
        let summary = self.summarize_extraction(&extraction).await;
        let body = match &extraction {
            ExtractionResult::Text(text) => text.clone(),
            ExtractionResult::Exhausted => normalize(&msg.plain_body),
        };
        let priority = classify(&format!("{summary} {body}"));

        EmailSummary {
            subject: msg.subject.clone(),
            sender: msg.sender.clone(),
            summary,
            priority,
        }
    }

    /// The sentinel is never sent to the model.
    pub async fn summarize_extraction(&self, extraction: &ExtractionResult) -> String {
        match extraction {
            ExtractionResult::Text(text) => self.summarizer.summarize(text).await,
            ExtractionResult::Exhausted => NO_CONTENT.to_string(),
        }
    }
}
