//! Update availability endpoint.
//!
//! The host runtime posts here when a new build is ready; the gate decides
//! whether to restart now or after the active meeting settles.

use axum::{extract::State, response::Json, routing::post, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::update::UpdateGate;

#[derive(Clone)]
pub struct UpdateState {
    pub gate: Arc<UpdateGate>,
}

pub fn router(state: UpdateState) -> Router {
    Router::new()
        .route("/available", post(update_available))
        .with_state(state)
}

/// POST /update/available - An update is ready to install.
async fn update_available(State(state): State<UpdateState>) -> ApiResult<Json<Value>> {
    state
        .gate
        .on_update_available()
        .await
        .map_err(ApiError::from)?;
    Ok(Json(json!({
        "success": true,
        "message": "Update applied or deferred until the active meeting ends",
    })))
}
