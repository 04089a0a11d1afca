//! In-memory store for tests and ephemeral runs.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::meeting::records::{
    append_trimmed, ChatMessage, Meeting, TranscriptBlock, TransientCaptureState,
    WebhookPostStatus,
};

use super::{LifecycleFlags, MeetingStore, SessionToken};

#[derive(Default)]
struct MemoryState {
    flags: LifecycleFlags,
    meetings: Vec<Meeting>,
    capture: Option<TransientCaptureState>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MeetingStore for MemoryStore {
    async fn lifecycle_flags(&self) -> Result<LifecycleFlags> {
        Ok(self.state.lock().await.flags.clone())
    }

    async fn set_active_session(&self, token: Option<SessionToken>) -> Result<()> {
        self.state.lock().await.flags.active_session = token;
        Ok(())
    }

    async fn set_deferred_update(&self, pending: bool) -> Result<()> {
        self.state.lock().await.flags.deferred_update_pending = pending;
        Ok(())
    }

    async fn meeting_history(&self) -> Result<Vec<Meeting>> {
        Ok(self.state.lock().await.meetings.clone())
    }

    async fn meeting_at(&self, index: usize) -> Result<Option<Meeting>> {
        Ok(self.state.lock().await.meetings.get(index).cloned())
    }

    async fn push_meeting(&self, meeting: Meeting) -> Result<usize> {
        let mut state = self.state.lock().await;
        Ok(append_trimmed(&mut state.meetings, meeting))
    }

    async fn set_webhook_status(&self, index: usize, status: WebhookPostStatus) -> Result<bool> {
        let mut state = self.state.lock().await;
        match state.meetings.get_mut(index) {
            Some(meeting) => {
                meeting.webhook_post_status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn capture_state(&self) -> Result<Option<TransientCaptureState>> {
        Ok(self.state.lock().await.capture.clone())
    }

    async fn begin_capture(&self, title: Option<String>, started_at: DateTime<Utc>) -> Result<()> {
        self.state.lock().await.capture = Some(TransientCaptureState {
            meeting_title: title,
            meeting_start_timestamp: started_at,
            transcript: vec![],
            chat_messages: vec![],
        });
        Ok(())
    }

    async fn append_transcript_block(&self, block: TranscriptBlock) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(capture) = state.capture.as_mut() {
            capture.transcript.push(block);
        }
        Ok(())
    }

    async fn append_chat_message(&self, message: ChatMessage) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(capture) = state.capture.as_mut() {
            capture.chat_messages.push(message);
        }
        Ok(())
    }
}
