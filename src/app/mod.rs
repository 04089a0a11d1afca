//! Component wiring and the service entry point.

use crate::analytics::AnalyticsGenerator;
use crate::api::ApiServer;
use crate::config::Config;
use crate::delivery::{DeliveryPipeline, DeliveryService, DownloadsSink, TranscriptExporter, WebhookSink};
use crate::error::MeetingError;
use crate::global;
use crate::meeting::{LifecycleController, RecoveryOutcome};
use crate::notify::{DesktopNotifier, Notifier, NullNotifier};
use crate::store::{JsonFileStore, MeetingStore};
use crate::telemetry::Telemetry;
use crate::update::{RestartApplier, UpdateGate};
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Components {
    pub store: Arc<dyn MeetingStore>,
    pub controller: Arc<LifecycleController>,
    pub delivery: Arc<dyn DeliveryService>,
    pub gate: Arc<UpdateGate>,
}

pub async fn build_components(config: &Config) -> Result<Components> {
    let store: Arc<dyn MeetingStore> = Arc::new(JsonFileStore::open(global::store_file()?).await?);

    let notifier: Arc<dyn Notifier> = if config.notifications.enabled {
        Arc::new(DesktopNotifier)
    } else {
        Arc::new(NullNotifier)
    };

    let downloads_dir = match &config.export.downloads_dir {
        Some(dir) => dir.clone(),
        None => global::downloads_dir()?,
    };

    let exporter = TranscriptExporter::new(
        store.clone(),
        AnalyticsGenerator::from_config(&config.ai),
        Box::new(DownloadsSink::new(downloads_dir)),
        Telemetry::from_config(&config.telemetry),
    );
    let webhook = WebhookSink::from_config(store.clone(), notifier, &config.webhook);
    let delivery: Arc<dyn DeliveryService> = Arc::new(DeliveryPipeline::new(exporter, webhook));

    let gate = Arc::new(UpdateGate::new(store.clone(), Box::new(RestartApplier)));

    let controller = Arc::new(LifecycleController::new(
        store.clone(),
        delivery.clone(),
        gate.clone(),
        config.webhook.auto_post,
    ));

    Ok(Components {
        store,
        controller,
        delivery,
        gate,
    })
}

pub async fn run_service() -> Result<()> {
    info!("Starting MeetVault service");

    let config = Config::load()?;
    let components = build_components(&config).await?;

    // Startup recovery: pick up a meeting the previous run never delivered
    match components.controller.recover_last_meeting().await {
        Ok(RecoveryOutcome::Recovered) => {
            info!("Recovered last meeting to the best possible extent")
        }
        Ok(RecoveryOutcome::NotNeeded) => info!("No recovery needed"),
        Err(MeetingError::NoCaptureState) => info!("No previous meeting to recover"),
        Err(err) => warn!("Startup recovery failed: {err}"),
    }

    let api_server = ApiServer::new(
        components.controller,
        components.store,
        components.delivery,
        components.gate,
        &config,
    );

    info!("MeetVault is ready!");

    api_server.start().await
}
