//! Pure formatting of meeting records into human-readable text.
//!
//! No side effects; every function is a plain string transform.

use chrono::{DateTime, Local, Utc};

use crate::meeting::records::{ChatMessage, Meeting, TranscriptBlock};

/// 12-hour local time, zero-padded, uppercase meridiem.
const TIME_FORMAT: &str = "%m/%d/%Y, %I:%M %p";

const SECTION_RULE: &str = "---------------";

const ATTRIBUTION: &str =
    "Transcript saved using MeetVault (https://github.com/meetvault/meetvault)";

pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format(TIME_FORMAT)
        .to_string()
}

/// Timestamp variant safe to embed in a file name.
pub fn file_name_timestamp(timestamp: &DateTime<Utc>) -> String {
    format_timestamp(timestamp).replace(['/', ':'], "-")
}

/// `"{speaker} ({local time})\n{text}\n\n"` per block, in original order.
/// An empty transcript renders as an empty string.
pub fn transcript_text(transcript: &[TranscriptBlock]) -> String {
    let mut out = String::new();
    for block in transcript {
        out.push_str(&block.person_name);
        out.push_str(&format!(" ({})\n", format_timestamp(&block.timestamp)));
        out.push_str(&block.transcript_text);
        out.push_str("\n\n");
    }
    out
}

pub fn chat_text(chat_messages: &[ChatMessage]) -> String {
    let mut out = String::new();
    for message in chat_messages {
        out.push_str(&message.person_name);
        out.push_str(&format!(" ({})\n", format_timestamp(&message.timestamp)));
        out.push_str(&message.chat_message_text);
        out.push_str("\n\n");
    }
    out
}

fn section_header(label: &str) -> String {
    format!("\n\n{SECTION_RULE}\n{label}\n{SECTION_RULE}\n\n")
}

/// The full export document: transcript, analytics, chat, attribution.
pub fn compose_document(meeting: &Meeting, analytics: &str) -> String {
    let mut content = transcript_text(&meeting.transcript);
    content.push_str(&section_header("CALL ANALYTICS & COACHING"));
    content.push_str(analytics);
    content.push_str(&section_header("CHAT MESSAGES"));
    content.push_str(&chat_text(&meeting.chat_messages));
    content.push_str(&format!("\n\n{SECTION_RULE}\n{ATTRIBUTION}\n{SECTION_RULE}"));
    content
}

/// Trailing line of every export document.
pub fn attribution() -> &'static str {
    ATTRIBUTION
}
