//! Loopback HTTP API for MeetVault.
//!
//! Provides endpoints for:
//! - The capture-layer event contract (POST /events)
//! - Meeting history (GET /meetings, GET /meetings/:index)
//! - Update availability (POST /update/available)

pub mod error;
pub mod routes;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;

use crate::config::Config;
use crate::delivery::DeliveryService;
use crate::meeting::LifecycleController;
use crate::store::MeetingStore;
use crate::update::UpdateGate;

pub use routes::events::{EventResponse, EventsState, InboundEvent};

pub struct ApiServer {
    port: u16,
    events_state: EventsState,
    meetings_state: routes::meetings::MeetingsState,
    update_state: routes::update::UpdateState,
}

impl ApiServer {
    pub fn new(
        controller: Arc<LifecycleController>,
        store: Arc<dyn MeetingStore>,
        delivery: Arc<dyn DeliveryService>,
        gate: Arc<UpdateGate>,
        config: &Config,
    ) -> Self {
        Self {
            port: config.api.port,
            events_state: EventsState {
                controller,
                store: store.clone(),
                delivery,
            },
            meetings_state: routes::meetings::MeetingsState { store },
            update_state: routes::update::UpdateState { gate },
        }
    }

    pub async fn start(self) -> Result<()> {
        let app = Router::new()
            // Root and version endpoints
            .route("/", get(status))
            .route("/version", get(version))
            // Capture-layer event contract
            .merge(routes::events::router(self.events_state))
            // Other API routes
            .nest("/meetings", routes::meetings::router(self.meetings_state))
            .nest("/update", routes::update::router(self.update_state))
            .layer(ServiceBuilder::new());

        let listener = tokio::net::TcpListener::bind(&format!("127.0.0.1:{}", self.port)).await?;

        info!("API server listening on http://127.0.0.1:{}", self.port);
        info!("Endpoints:");
        info!("  POST /events           - Capture-layer event contract");
        info!("  GET  /meetings         - List meeting history");
        info!("  GET  /meetings/:index  - Get a single meeting");
        info!("  POST /update/available - Signal an available update");
        info!("  GET  /version          - Get version info");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "meetvault",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "meetvault"
    }))
}
