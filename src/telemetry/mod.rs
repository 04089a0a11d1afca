//! Anonymous usage and error beacons.
//!
//! Fire-and-forget: every send is spawned off the caller's task and its
//! outcome is discarded. Delivery must never wait on a beacon.

use tracing::debug;

use crate::config::TelemetryConfig;

pub mod error_codes {
    /// The derived export file name was rejected by the filesystem.
    pub const FILE_NAME_REJECTED: &str = "009";
}

pub struct Telemetry {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl Telemetry {
    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.enabled.then(|| config.endpoint.clone()),
        }
    }

    pub fn disabled() -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: None,
        }
    }

    /// Count one transcript export.
    pub fn report_download(&self, webhook_enabled: bool) {
        let Some(endpoint) = self.endpoint.clone() else {
            return;
        };
        let client = self.client.clone();
        tokio::spawn(async move {
            let _ = client
                .get(&endpoint)
                .query(&[
                    ("version", env!("CARGO_PKG_VERSION")),
                    ("isWebhookEnabled", if webhook_enabled { "true" } else { "false" }),
                ])
                .send()
                .await;
            debug!("usage beacon sent");
        });
    }

    /// Report one recovered error.
    pub fn report_error(&self, code: &str, error: &str) {
        let Some(endpoint) = self.endpoint.clone() else {
            return;
        };
        let client = self.client.clone();
        let code = code.to_string();
        let error = error.to_string();
        tokio::spawn(async move {
            let _ = client
                .get(&endpoint)
                .query(&[
                    ("version", env!("CARGO_PKG_VERSION")),
                    ("code", code.as_str()),
                    ("error", error.as_str()),
                ])
                .send()
                .await;
            debug!("error beacon sent");
        });
    }
}
