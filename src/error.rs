//! Domain errors for meeting processing and delivery.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeetingError {
    #[error("No meeting has been captured yet. Maybe attend one?")]
    NoCaptureState,

    #[error("Empty transcript and empty chat messages")]
    EmptyCapture,

    #[error("Invalid index: {0}")]
    InvalidIndex(i64),

    #[error("Meeting at index {0} not found")]
    MeetingNotFound(usize),

    #[error("No webhook URL configured")]
    NoWebhookConfigured,

    #[error("Webhook delivery failed: {0}")]
    WebhookDeliveryFailed(String),

    #[error("File export failed: {0}")]
    FileExportFailed(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type MeetingResult<T> = std::result::Result<T, MeetingError>;
