use std::path::Path;
use std::sync::Arc;

use digest_domain::{
    Credentials, DecodedMessage, EmailSummary, HtmlRenderer, MailTransport, OcrEngine,
    RasterImage, SummaryModel,
};
use digest_error::DigestError;
use tracing::info;

use crate::batch::BatchOrchestrator;
use crate::decode::decode;
use crate::pipeline::MessagePipeline;
use crate::priority::classify;

pub const IMAGE_SUBJECT: &str = "Image Summary";
pub const IMAGE_SENDER: &str = "Image Upload";

#[derive(Debug, Clone)]
pub struct DigestRequest {
    pub credentials: Credentials,
    pub max_count: usize,
    pub unread_only: bool,
    pub sender_filter: Option<String>,
}

pub struct DigestService {
    transport: Arc<dyn MailTransport>,
    ocr: Arc<dyn OcrEngine>,
    pipeline: Arc<MessagePipeline>,
    orchestrator: BatchOrchestrator,
}

impl DigestService {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        renderer: Arc<dyn HtmlRenderer>,
        ocr: Arc<dyn OcrEngine>,
        model: Arc<dyn SummaryModel>,
        workers: usize,
    ) -> Self {
        let pipeline = Arc::new(MessagePipeline::new(renderer, ocr.clone(), model));
        let orchestrator = BatchOrchestrator::new(pipeline.clone(), workers);
        Self {
            transport,
            ocr,
            pipeline,
            orchestrator,
        }
    }

    /// Fetch, decode, summarize and classify a batch. Only transport-level
    /// failures are returned as errors.
    pub async fn fetch_and_summarize(
        &self,
        request: &DigestRequest,
    ) -> Result<Vec<EmailSummary>, DigestError> {
        validate_request(request)?;

        let raw = self
            .transport
            .fetch(&request.credentials, request.max_count, request.unread_only)
            .await?;
        info!(count = raw.len(), unread_only = request.unread_only, "fetched messages");
        if raw.is_empty() {
            return Ok(Vec::new());
        }

        let decoded: Vec<DecodedMessage> = raw.iter().map(decode).collect();
        drop(raw);

        let summaries = self.orchestrator.process(decoded).await;
        let summaries = filter_by_sender(summaries, request.sender_filter.as_deref());
        info!(count = summaries.len(), "digest ready");
        Ok(summaries)
    }

    /// OCR an image file and run the text through the plain stage,
    /// summarizer and classifier.
    pub async fn summarize_image(&self, path: &Path) -> Result<EmailSummary, DigestError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| DigestError::io(format!("read {}: {e}", path.display())))?;
        if bytes.is_empty() {
            return Err(DigestError::invalid_input(format!(
                "image file is empty: {}",
                path.display()
            )));
        }

        let text = self.ocr.recognize(&RasterImage::new(bytes)).await?;
        let extraction = self.pipeline.cascade().extract_text(&text).await;
        let summary = self.pipeline.summarize_extraction(&extraction).await;
        let priority = classify(&summary);
        info!(path = %path.display(), %priority, "image summarized");

        Ok(EmailSummary {
            subject: IMAGE_SUBJECT.to_string(),
            sender: IMAGE_SENDER.to_string(),
            summary,
            priority,
        })
    }
}

fn validate_request(request: &DigestRequest) -> Result<(), DigestError> {
    let address = request.credentials.address.trim();
    if address.is_empty() || !address.contains('@') {
        return Err(DigestError::invalid_input(format!(
            "not an email address: '{address}'"
        )));
    }
    if request.max_count == 0 {
        return Err(DigestError::invalid_input("max count must be at least 1"));
    }
    Ok(())
}

/// Case-insensitive substring match on the sender; blank filter keeps all.
pub fn filter_by_sender(summaries: Vec<EmailSummary>, filter: Option<&str>) -> Vec<EmailSummary> {
    let needle = match filter.map(|f| f.trim().to_lowercase()) {
        Some(f) if !f.is_empty() => f,
        _ => return summaries,
    };
    summaries
        .into_iter()
        .filter(|s| s.sender.to_lowercase().contains(&needle))
        .collect()
}
