//! Read-only meeting history endpoints for the UI layer.

use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::render;
use crate::store::MeetingStore;

#[derive(Clone)]
pub struct MeetingsState {
    pub store: Arc<dyn MeetingStore>,
}

pub fn router(state: MeetingsState) -> Router {
    Router::new()
        .route("/", get(list_meetings))
        .route("/:index", get(get_meeting))
        .with_state(state)
}

/// GET /meetings - History summaries, oldest first. The index is the handle
/// used by download/retry events.
async fn list_meetings(State(state): State<MeetingsState>) -> ApiResult<Json<Value>> {
    let history = state.store.meeting_history().await.map_err(ApiError::from)?;

    let entries: Vec<Value> = history
        .iter()
        .enumerate()
        .map(|(index, meeting)| {
            json!({
                "index": index,
                "meetingTitle": meeting.meeting_title,
                "meetingStartTimestamp": meeting.meeting_start_timestamp,
                "meetingEndTimestamp": meeting.meeting_end_timestamp,
                "startedAt": render::format_timestamp(&meeting.meeting_start_timestamp),
                "transcriptBlocks": meeting.transcript.len(),
                "chatMessages": meeting.chat_messages.len(),
                "webhookPostStatus": meeting.webhook_post_status.as_str(),
            })
        })
        .collect();

    Ok(Json(json!({ "meetings": entries })))
}

/// GET /meetings/:index - One full meeting record.
async fn get_meeting(
    Path(index): Path<usize>,
    State(state): State<MeetingsState>,
) -> ApiResult<Json<Value>> {
    let meeting = state
        .store
        .meeting_at(index)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found(format!("Meeting at index {index} not found")))?;

    let value =
        serde_json::to_value(&meeting).map_err(|err| ApiError::internal(err.to_string()))?;
    Ok(Json(value))
}
