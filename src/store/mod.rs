//! Durable meeting store.
//!
//! Single source of truth for the recent-meetings history, the lifecycle
//! flags, and the transient capture state. All other components depend on
//! the [`MeetingStore`] trait, never on a concrete backend.

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::meeting::records::{
    ChatMessage, Meeting, TranscriptBlock, TransientCaptureState, WebhookPostStatus,
};

/// Opaque identifier for one capture session. The capture layer usually
/// supplies its tab id; a fresh UUID is generated when it does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionToken {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for SessionToken {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state shared by the controller and the update gate.
///
/// Invariant: at most one session is active at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LifecycleFlags {
    pub active_session: Option<SessionToken>,
    pub deferred_update_pending: bool,
}

#[async_trait]
pub trait MeetingStore: Send + Sync {
    // Lifecycle flags

    async fn lifecycle_flags(&self) -> Result<LifecycleFlags>;

    async fn set_active_session(&self, token: Option<SessionToken>) -> Result<()>;

    async fn set_deferred_update(&self, pending: bool) -> Result<()>;

    // Meeting history

    async fn meeting_history(&self) -> Result<Vec<Meeting>>;

    async fn meeting_at(&self, index: usize) -> Result<Option<Meeting>>;

    /// Append a meeting, trimming the history to its bound. Returns the new
    /// entry's index.
    async fn push_meeting(&self, meeting: Meeting) -> Result<usize>;

    /// Update delivery bookkeeping for one entry. Returns false when the
    /// index is out of range.
    async fn set_webhook_status(&self, index: usize, status: WebhookPostStatus) -> Result<bool>;

    // Transient capture state

    /// The in-progress capture, or `None` if no meeting was ever started.
    async fn capture_state(&self) -> Result<Option<TransientCaptureState>>;

    /// Reset the capture for a newly started meeting.
    async fn begin_capture(&self, title: Option<String>, started_at: DateTime<Utc>) -> Result<()>;

    async fn append_transcript_block(&self, block: TranscriptBlock) -> Result<()>;

    async fn append_chat_message(&self, message: ChatMessage) -> Result<()>;
}
