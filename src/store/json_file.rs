//! JSON-file-backed store.
//!
//! The whole document lives in one file under the data directory and is
//! rewritten on every mutation. Key names match the ones the capture layer
//! has always used, so an existing document survives an upgrade.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;

use crate::meeting::records::{
    append_trimmed, ChatMessage, Meeting, TranscriptBlock, TransientCaptureState,
    WebhookPostStatus,
};

use super::{LifecycleFlags, MeetingStore, SessionToken};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StoreDocument {
    meeting_tab_id: Option<SessionToken>,
    is_deferred_updated_available: bool,
    meetings: Vec<Meeting>,
    meeting_title: Option<String>,
    meeting_start_timestamp: Option<DateTime<Utc>>,
    transcript: Vec<TranscriptBlock>,
    chat_messages: Vec<ChatMessage>,
}

pub struct JsonFileStore {
    path: PathBuf,
    doc: Mutex<StoreDocument>,
}

impl JsonFileStore {
    /// Open (or create) the store file. A present-but-malformed document is
    /// an error rather than a silent reset.
    pub async fn open(path: PathBuf) -> Result<Self> {
        let doc = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse store file {:?}", path))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreDocument::default(),
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to read store file {:?}", path))
            }
        };

        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    async fn persist(&self, doc: &StoreDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create store directory")?;
        }

        let raw = serde_json::to_string_pretty(doc).context("Failed to serialize store")?;
        tokio::fs::write(&self.path, raw)
            .await
            .with_context(|| format!("Failed to write store file {:?}", self.path))
    }
}

#[async_trait]
impl MeetingStore for JsonFileStore {
    async fn lifecycle_flags(&self) -> Result<LifecycleFlags> {
        let doc = self.doc.lock().await;
        Ok(LifecycleFlags {
            active_session: doc.meeting_tab_id.clone(),
            deferred_update_pending: doc.is_deferred_updated_available,
        })
    }

    async fn set_active_session(&self, token: Option<SessionToken>) -> Result<()> {
        let mut doc = self.doc.lock().await;
        doc.meeting_tab_id = token;
        self.persist(&doc).await
    }

    async fn set_deferred_update(&self, pending: bool) -> Result<()> {
        let mut doc = self.doc.lock().await;
        doc.is_deferred_updated_available = pending;
        self.persist(&doc).await
    }

    async fn meeting_history(&self) -> Result<Vec<Meeting>> {
        let doc = self.doc.lock().await;
        Ok(doc.meetings.clone())
    }

    async fn meeting_at(&self, index: usize) -> Result<Option<Meeting>> {
        let doc = self.doc.lock().await;
        Ok(doc.meetings.get(index).cloned())
    }

    async fn push_meeting(&self, meeting: Meeting) -> Result<usize> {
        let mut doc = self.doc.lock().await;
        let index = append_trimmed(&mut doc.meetings, meeting);
        self.persist(&doc).await?;
        Ok(index)
    }

    async fn set_webhook_status(&self, index: usize, status: WebhookPostStatus) -> Result<bool> {
        let mut doc = self.doc.lock().await;
        match doc.meetings.get_mut(index) {
            Some(meeting) => {
                meeting.webhook_post_status = status;
                self.persist(&doc).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn capture_state(&self) -> Result<Option<TransientCaptureState>> {
        let doc = self.doc.lock().await;
        Ok(doc
            .meeting_start_timestamp
            .map(|started_at| TransientCaptureState {
                meeting_title: doc.meeting_title.clone(),
                meeting_start_timestamp: started_at,
                transcript: doc.transcript.clone(),
                chat_messages: doc.chat_messages.clone(),
            }))
    }

    async fn begin_capture(&self, title: Option<String>, started_at: DateTime<Utc>) -> Result<()> {
        let mut doc = self.doc.lock().await;
        doc.meeting_title = title;
        doc.meeting_start_timestamp = Some(started_at);
        doc.transcript.clear();
        doc.chat_messages.clear();
        self.persist(&doc).await
    }

    async fn append_transcript_block(&self, block: TranscriptBlock) -> Result<()> {
        let mut doc = self.doc.lock().await;
        doc.transcript.push(block);
        self.persist(&doc).await
    }

    async fn append_chat_message(&self, message: ChatMessage) -> Result<()> {
        let mut doc = self.doc.lock().await;
        doc.chat_messages.push(message);
        self.persist(&doc).await
    }
}
