//! Inbound event contract with the capture layer.
//!
//! Every request is a tagged message and every response is
//! `{success, message?}` — failures travel in the response body, never as
//! HTTP error statuses, so the capture layer has one uniform channel.

use axum::{extract::State, response::Json, routing::post, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::delivery::DeliveryService;
use crate::error::MeetingError;
use crate::meeting::records::{ChatMessage, TranscriptBlock};
use crate::meeting::{LifecycleController, RecoveryOutcome};
use crate::store::{MeetingStore, SessionToken};

#[derive(Clone)]
pub struct EventsState {
    pub controller: Arc<LifecycleController>,
    pub store: Arc<dyn MeetingStore>,
    pub delivery: Arc<dyn DeliveryService>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    #[serde(rename_all = "camelCase")]
    NewMeetingStarted {
        #[serde(default)]
        tab_id: Option<String>,
        #[serde(default)]
        title: Option<String>,
    },
    MeetingEnded,
    #[serde(rename_all = "camelCase")]
    MeetingTabClosed { tab_id: String },
    #[serde(rename_all = "camelCase")]
    TranscriptBlock {
        person_name: String,
        timestamp: DateTime<Utc>,
        transcript_text: String,
    },
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        person_name: String,
        timestamp: DateTime<Utc>,
        chat_message_text: String,
    },
    DownloadTranscriptAtIndex { index: i64 },
    RetryWebhookAtIndex { index: i64 },
    RecoverLastMeeting,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl EventResponse {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    fn ok_empty() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

pub fn router(state: EventsState) -> Router {
    Router::new()
        .route("/events", post(handle_event))
        .with_state(state)
}

async fn handle_event(
    State(state): State<EventsState>,
    Json(event): Json<InboundEvent>,
) -> Json<EventResponse> {
    Json(dispatch(&state, event).await)
}

async fn dispatch(state: &EventsState, event: InboundEvent) -> EventResponse {
    match event {
        InboundEvent::NewMeetingStarted { tab_id, title } => {
            info!("new_meeting_started");
            match state
                .controller
                .on_meeting_started(tab_id.map(SessionToken::from), title)
                .await
            {
                Ok(token) => EventResponse::ok(token.to_string()),
                Err(err) => EventResponse::err(err.to_string()),
            }
        }
        InboundEvent::MeetingEnded => {
            info!("meeting_ended");
            match state.controller.on_meeting_ended().await {
                Ok(()) => EventResponse::ok("Meeting processing and delivery complete"),
                Err(err) => EventResponse::err(err.to_string()),
            }
        }
        InboundEvent::MeetingTabClosed { tab_id } => {
            match state
                .controller
                .on_tab_closed(&SessionToken::from(tab_id))
                .await
            {
                Ok(()) => EventResponse::ok_empty(),
                Err(err) => EventResponse::err(err.to_string()),
            }
        }
        InboundEvent::TranscriptBlock {
            person_name,
            timestamp,
            transcript_text,
        } => {
            let block = TranscriptBlock {
                person_name,
                timestamp,
                transcript_text,
            };
            match state.store.append_transcript_block(block).await {
                Ok(()) => EventResponse::ok_empty(),
                Err(err) => EventResponse::err(err.to_string()),
            }
        }
        InboundEvent::ChatMessage {
            person_name,
            timestamp,
            chat_message_text,
        } => {
            let message = ChatMessage {
                person_name,
                timestamp,
                chat_message_text,
            };
            match state.store.append_chat_message(message).await {
                Ok(()) => EventResponse::ok_empty(),
                Err(err) => EventResponse::err(err.to_string()),
            }
        }
        InboundEvent::DownloadTranscriptAtIndex { index } => {
            info!("download_transcript_at_index {index}");
            match validate_index(index) {
                Ok(index) => match state.delivery.download_transcript(index, false).await {
                    Ok(_) => EventResponse::ok("Transcript downloaded successfully"),
                    Err(err) => EventResponse::err(err.to_string()),
                },
                Err(err) => EventResponse::err(err.to_string()),
            }
        }
        InboundEvent::RetryWebhookAtIndex { index } => {
            info!("retry_webhook_at_index {index}");
            match validate_index(index) {
                Ok(index) => match state.delivery.post_transcript_to_webhook(index).await {
                    Ok(()) => EventResponse::ok("Webhook posted successfully"),
                    Err(err) => EventResponse::err(err.to_string()),
                },
                Err(err) => EventResponse::err(err.to_string()),
            }
        }
        InboundEvent::RecoverLastMeeting => {
            info!("recover_last_meeting");
            match state.controller.recover_last_meeting().await {
                Ok(RecoveryOutcome::Recovered) => {
                    EventResponse::ok("Recovered last meeting to the best possible extent")
                }
                Ok(RecoveryOutcome::NotNeeded) => EventResponse::ok("No recovery needed"),
                Err(err) => EventResponse::err(err.to_string()),
            }
        }
    }
}

fn validate_index(index: i64) -> Result<usize, MeetingError> {
    usize::try_from(index).map_err(|_| MeetingError::InvalidIndex(index))
}
