use async_trait::async_trait;
use digest_error::DigestError;

use crate::entities::{Credentials, RasterImage, RawMessage};

/// Pulls a bounded batch of raw messages from a mailbox.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Newest first, at most `max_count` entries. An empty search result is
    /// `Ok(vec![])`.
    async fn fetch(
        &self,
        credentials: &Credentials,
        max_count: usize,
        unread_only: bool,
    ) -> Result<Vec<RawMessage>, DigestError>;
}

#[async_trait]
pub trait HtmlRenderer: Send + Sync {
    async fn render(&self, html: &str) -> Result<RasterImage, DigestError>;
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &RasterImage) -> Result<String, DigestError>;
}

#[async_trait]
pub trait SummaryModel: Send + Sync {
    async fn summarize(
        &self,
        text: &str,
        max_len: usize,
        min_len: usize,
    ) -> Result<String, DigestError>;
}
