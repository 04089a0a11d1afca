//! Webhook export sink.
//!
//! One JSON POST per delivery. Bookkeeping lives on the meeting record:
//! `webhookPostStatus` always reflects the last attempt, and a failed
//! attempt raises a desktop notification offering retry. The sink may be
//! invoked again for the same index at any time; the receiver is assumed
//! to tolerate duplicate delivery.

use anyhow::{bail, Context, Result};
use chrono::SecondsFormat;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::{WebhookBodyType, WebhookConfig};
use crate::error::MeetingError;
use crate::meeting::records::{ChatMessage, Meeting, TranscriptBlock, WebhookPostStatus};
use crate::notify::Notifier;
use crate::render;
use crate::store::MeetingStore;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AdvancedWebhookBody<'a> {
    meeting_title: &'a str,
    meeting_start_timestamp: String,
    meeting_end_timestamp: String,
    transcript: &'a [TranscriptBlock],
    chat_messages: &'a [ChatMessage],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimpleWebhookBody {
    meeting_title: String,
    meeting_start_timestamp: String,
    meeting_end_timestamp: String,
    transcript: String,
    chat_messages: String,
}

/// Build the webhook payload for one meeting.
///
/// `advanced` ships the raw record with ISO timestamps; `simple` ships
/// pre-rendered text with human-readable timestamps.
pub fn build_payload(meeting: &Meeting, body_type: WebhookBodyType) -> Result<Value> {
    let title = meeting.meeting_title.as_deref().unwrap_or("");
    let value = match body_type {
        WebhookBodyType::Advanced => serde_json::to_value(AdvancedWebhookBody {
            meeting_title: title,
            meeting_start_timestamp: meeting
                .meeting_start_timestamp
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            meeting_end_timestamp: meeting
                .meeting_end_timestamp
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            transcript: &meeting.transcript,
            chat_messages: &meeting.chat_messages,
        }),
        WebhookBodyType::Simple => serde_json::to_value(SimpleWebhookBody {
            meeting_title: title.to_string(),
            meeting_start_timestamp: render::format_timestamp(&meeting.meeting_start_timestamp),
            meeting_end_timestamp: render::format_timestamp(&meeting.meeting_end_timestamp),
            transcript: render::transcript_text(&meeting.transcript),
            chat_messages: render::chat_text(&meeting.chat_messages),
        }),
    };
    value.context("Failed to serialize webhook payload")
}

pub struct WebhookSink {
    store: Arc<dyn MeetingStore>,
    notifier: Arc<dyn Notifier>,
    client: reqwest::Client,
    url: Option<String>,
    body_type: WebhookBodyType,
}

impl WebhookSink {
    pub fn from_config(
        store: Arc<dyn MeetingStore>,
        notifier: Arc<dyn Notifier>,
        config: &WebhookConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            client: reqwest::Client::new(),
            url: config.url.clone(),
            body_type: config.body_type,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    pub async fn post(&self, index: usize) -> Result<(), MeetingError> {
        let url = self
            .url
            .as_deref()
            .ok_or(MeetingError::NoWebhookConfigured)?;

        let meeting = self
            .store
            .meeting_at(index)
            .await?
            .ok_or(MeetingError::MeetingNotFound(index))?;

        let payload = build_payload(&meeting, self.body_type)?;

        match self.send(url, &payload).await {
            Ok(()) => {
                self.store
                    .set_webhook_status(index, WebhookPostStatus::Successful)
                    .await?;
                info!("Webhook posted for meeting at index {index}");
                Ok(())
            }
            Err(err) => {
                error!("Webhook post failed for meeting at index {index}: {err:#}");
                self.store
                    .set_webhook_status(index, WebhookPostStatus::Failed)
                    .await?;
                self.notifier
                    .notify(
                        "Could not post webhook!",
                        "Open the meetings page to view status and retry.",
                    )
                    .await;
                Err(MeetingError::WebhookDeliveryFailed(err.to_string()))
            }
        }
    }

    async fn send(&self, url: &str, payload: &Value) -> Result<()> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .context("Webhook request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Webhook request failed: {status}");
        }
        Ok(())
    }
}
