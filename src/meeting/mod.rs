//! Meeting records and lifecycle.
//!
//! Captures the end-of-meeting state, promotes it into durable history,
//! and drives delivery of the finished record.

pub mod lifecycle;
pub mod records;

pub use lifecycle::{LifecycleController, RecoveryOutcome};
pub use records::{
    ChatMessage, Meeting, TranscriptBlock, TransientCaptureState, WebhookPostStatus, HISTORY_LIMIT,
};
