//! User-visible desktop notifications.
//!
//! Best-effort: a notification that cannot be shown is logged and dropped,
//! it never changes delivery bookkeeping.

use async_trait::async_trait;
use tracing::warn;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, body: &str);
}

/// Shells out to `notify-send`.
pub struct DesktopNotifier;

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn notify(&self, title: &str, body: &str) {
        match tokio::process::Command::new("notify-send")
            .arg(title)
            .arg(body)
            .output()
            .await
        {
            Ok(output) if !output.status.success() => {
                warn!(
                    "notify-send exited with status {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
            Ok(_) => {}
            Err(err) => warn!("Failed to send desktop notification: {err}"),
        }
    }
}

/// Swallows notifications; used when they are disabled and in tests.
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, _title: &str, _body: &str) {}
}
