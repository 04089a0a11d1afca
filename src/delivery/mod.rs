//! Delivery of finalized meetings to their two sinks.
//!
//! File export and webhook export are independent: the lifecycle runs them
//! concurrently and a failure in one never cancels the other.

pub mod download;
pub mod webhook;

pub use download::{DownloadsSink, FileSink, TranscriptExporter};
pub use webhook::WebhookSink;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::MeetingError;

#[async_trait]
pub trait DeliveryService: Send + Sync {
    /// Render and save one history entry as a transcript file.
    /// `webhook_enabled` is only a hint forwarded to the usage beacon.
    async fn download_transcript(
        &self,
        index: usize,
        webhook_enabled: bool,
    ) -> Result<PathBuf, MeetingError>;

    /// Post one history entry to the configured webhook. Also the manual
    /// retry entry point.
    async fn post_transcript_to_webhook(&self, index: usize) -> Result<(), MeetingError>;

    fn webhook_configured(&self) -> bool;
}

pub struct DeliveryPipeline {
    exporter: TranscriptExporter,
    webhook: WebhookSink,
}

impl DeliveryPipeline {
    pub fn new(exporter: TranscriptExporter, webhook: WebhookSink) -> Self {
        Self { exporter, webhook }
    }
}

#[async_trait]
impl DeliveryService for DeliveryPipeline {
    async fn download_transcript(
        &self,
        index: usize,
        webhook_enabled: bool,
    ) -> Result<PathBuf, MeetingError> {
        self.exporter.export(index, webhook_enabled).await
    }

    async fn post_transcript_to_webhook(&self, index: usize) -> Result<(), MeetingError> {
        self.webhook.post(index).await
    }

    fn webhook_configured(&self) -> bool {
        self.webhook.is_configured()
    }
}
