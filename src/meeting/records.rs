//! Durable meeting records and the transient capture state they are
//! promoted from.
//!
//! Wire names (camelCase) match the keys the capture layer and webhook
//! consumers already understand.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MeetingError;

/// History keeps only the most recent meetings; older ones are evicted from
/// the front.
pub const HISTORY_LIMIT: usize = 10;

/// One spoken block attributed to a participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptBlock {
    pub person_name: String,
    pub timestamp: DateTime<Utc>,
    pub transcript_text: String,
}

/// One chat message posted during the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub person_name: String,
    pub timestamp: DateTime<Utc>,
    pub chat_message_text: String,
}

/// Webhook delivery bookkeeping for one meeting. Always reflects the last
/// attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookPostStatus {
    New,
    Successful,
    Failed,
}

impl WebhookPostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Successful => "successful",
            Self::Failed => "failed",
        }
    }
}

/// A finalized, durable record of one completed call session.
///
/// Created exactly once by promotion; mutated only to update
/// `webhook_post_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    #[serde(default)]
    pub meeting_title: Option<String>,
    pub meeting_start_timestamp: DateTime<Utc>,
    pub meeting_end_timestamp: DateTime<Utc>,
    pub transcript: Vec<TranscriptBlock>,
    pub chat_messages: Vec<ChatMessage>,
    pub webhook_post_status: WebhookPostStatus,
}

/// The in-progress, not-yet-finalized record of the call currently being
/// captured. Left in place after promotion; recovery dedupes on the start
/// timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransientCaptureState {
    #[serde(default)]
    pub meeting_title: Option<String>,
    pub meeting_start_timestamp: DateTime<Utc>,
    pub transcript: Vec<TranscriptBlock>,
    pub chat_messages: Vec<ChatMessage>,
}

impl TransientCaptureState {
    pub fn is_empty(&self) -> bool {
        self.transcript.is_empty() && self.chat_messages.is_empty()
    }

    /// Convert into a durable meeting record. A capture with neither
    /// transcript nor chat never becomes a meeting.
    pub fn promote(self, ended_at: DateTime<Utc>) -> Result<Meeting, MeetingError> {
        if self.is_empty() {
            return Err(MeetingError::EmptyCapture);
        }

        Ok(Meeting {
            meeting_title: self.meeting_title,
            meeting_start_timestamp: self.meeting_start_timestamp,
            meeting_end_timestamp: ended_at,
            transcript: self.transcript,
            chat_messages: self.chat_messages,
            webhook_post_status: WebhookPostStatus::New,
        })
    }
}

/// Append a meeting and trim the history to `HISTORY_LIMIT`, evicting the
/// oldest entries. Returns the index of the new entry.
pub fn append_trimmed(history: &mut Vec<Meeting>, meeting: Meeting) -> usize {
    history.push(meeting);
    if history.len() > HISTORY_LIMIT {
        let excess = history.len() - HISTORY_LIMIT;
        history.drain(..excess);
    }
    history.len() - 1
}
