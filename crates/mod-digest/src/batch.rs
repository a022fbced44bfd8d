//! Bounded fan-out of per-message work with results returned in input order.

use std::sync::Arc;

use digest_domain::{DecodedMessage, EmailSummary, Priority, NO_CONTENT};
use futures::stream::{self, StreamExt};
use tracing::{error, info};

use crate::pipeline::MessagePipeline;

pub const DEFAULT_WORKERS: usize = 4;

pub struct BatchOrchestrator {
    pipeline: Arc<MessagePipeline>,
    workers: usize,
}

impl BatchOrchestrator {
    pub fn new(pipeline: Arc<MessagePipeline>, workers: usize) -> Self {
        Self {
            pipeline,
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Each message runs on its own task, at most `workers` at a time. Every
    /// result lands in the slot of its input position.
    pub async fn process(&self, messages: Vec<DecodedMessage>) -> Vec<EmailSummary> {
        let total = messages.len();
        if total == 0 {
            return Vec::new();
        }
        info!(total, workers = self.workers, "processing batch");

        let mut slots: Vec<Option<EmailSummary>> = vec![None; total];

        let mut completed = stream::iter(messages.into_iter().enumerate())
            .map(|(idx, msg)| {
                let pipeline = self.pipeline.clone();
                let fallback = fallback_summary(&msg);
                let handle = tokio::spawn(async move { pipeline.run(&msg).await });
                async move {
                    match handle.await {
                        Ok(summary) => (idx, summary),
                        Err(e) => {
                            error!(idx, %e, "message task failed");
                            (idx, fallback)
                        }
                    }
                }
            })
            .buffer_unordered(self.workers);

        while let Some((idx, summary)) = completed.next().await {
            if let Some(slot) = slots.get_mut(idx) {
                *slot = Some(summary);
            }
        }

        let summaries: Vec<EmailSummary> = slots.into_iter().flatten().collect();
        info!(count = summaries.len(), "batch complete");
        summaries
    }
}

fn fallback_summary(msg: &DecodedMessage) -> EmailSummary {
    EmailSummary {
        subject: msg.subject.clone(),
        sender: msg.sender.clone(),
        summary: NO_CONTENT.to_string(),
        priority: Priority::Low,
    }
}
