//! Meeting lifecycle orchestrator.
//!
//! Three independent triggers can initiate processing of a finished
//! meeting: the explicit end signal, the tab-close signal, and startup
//! recovery. Each trigger runs as one serialized turn; the session-token
//! guard makes overlapping triggers for the same session process the
//! meeting exactly once.
//!
//! All dependencies are injected via constructor — no concrete types
//! hardcoded.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::delivery::DeliveryService;
use crate::error::MeetingError;
use crate::store::{MeetingStore, SessionToken};
use crate::update::UpdateGate;

/// Result of a startup recovery pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// The last capture was never promoted; it has now been processed.
    Recovered,
    /// The last capture already matches the newest history entry.
    NotNeeded,
}

pub struct LifecycleController {
    store: Arc<dyn MeetingStore>,
    delivery: Arc<dyn DeliveryService>,
    gate: Arc<UpdateGate>,
    auto_post_webhook: bool,
    // One trigger turn at a time; `on_tab_closed` re-reads the guard inside
    // its turn.
    process_turn: Mutex<()>,
}

impl LifecycleController {
    pub fn new(
        store: Arc<dyn MeetingStore>,
        delivery: Arc<dyn DeliveryService>,
        gate: Arc<UpdateGate>,
        auto_post_webhook: bool,
    ) -> Self {
        Self {
            store,
            delivery,
            gate,
            auto_post_webhook,
            process_turn: Mutex::new(()),
        }
    }

    /// A new meeting started. Records the session token (overwriting any
    /// previous one — only one meeting can be active) and resets the
    /// capture state for the new session.
    pub async fn on_meeting_started(
        &self,
        token: Option<SessionToken>,
        title: Option<String>,
    ) -> Result<SessionToken, MeetingError> {
        let token = token.unwrap_or_else(SessionToken::generate);
        self.store.begin_capture(title, Utc::now()).await?;
        self.store.set_active_session(Some(token.clone())).await?;
        info!("Meeting started, session {token}");
        Ok(token)
    }

    /// The explicit end signal. Processes the finished meeting, then clears
    /// the session and releases any deferred update — on failure paths too.
    pub async fn on_meeting_ended(&self) -> Result<(), MeetingError> {
        let _turn = self.process_turn.lock().await;
        let outcome = self.process_last_meeting().await;
        self.finish_active_session().await;
        outcome
    }

    /// The tab-close signal. Only acts when the closed tab is the active
    /// session; anything else is a stale event from an earlier meeting.
    pub async fn on_tab_closed(&self, token: &SessionToken) -> Result<(), MeetingError> {
        let _turn = self.process_turn.lock().await;

        let flags = self.store.lifecycle_flags().await?;
        if flags.active_session.as_ref() != Some(token) {
            debug!("Ignoring close of inactive tab {token}");
            return Ok(());
        }

        info!("Intercepted close of the active meeting tab");
        let outcome = self.process_last_meeting().await;
        self.finish_active_session().await;
        outcome
    }

    /// Startup recovery. If the newest history entry does not match the
    /// lingering capture state, the previous run died before promotion or
    /// delivery — process it now.
    pub async fn recover_last_meeting(&self) -> Result<RecoveryOutcome, MeetingError> {
        let _turn = self.process_turn.lock().await;

        let capture = self
            .store
            .capture_state()
            .await?
            .ok_or(MeetingError::NoCaptureState)?;

        let history = self.store.meeting_history().await?;
        if let Some(last) = history.last() {
            if last.meeting_start_timestamp == capture.meeting_start_timestamp {
                info!("Last meeting already processed, no recovery needed");
                return Ok(RecoveryOutcome::NotNeeded);
            }
        }

        info!(
            "Recovering unprocessed meeting started at {}",
            capture.meeting_start_timestamp
        );
        self.process_last_meeting().await?;
        Ok(RecoveryOutcome::Recovered)
    }

    /// Promote the capture into history, then run both delivery sinks
    /// concurrently. Both sinks always settle; a failure in one never
    /// cancels the other.
    async fn process_last_meeting(&self) -> Result<(), MeetingError> {
        let Some(index) = self.promote_capture().await? else {
            debug!("Capture already promoted, nothing to process");
            return Ok(());
        };
        let webhook_enabled = self.auto_post_webhook && self.delivery.webhook_configured();

        let (download, webhook) = tokio::join!(
            self.delivery.download_transcript(index, webhook_enabled),
            async {
                if webhook_enabled {
                    self.delivery.post_transcript_to_webhook(index).await
                } else {
                    Ok(())
                }
            }
        );

        download?;
        webhook?;
        Ok(())
    }

    /// `None` means the capture already sits at the end of history — an
    /// overlapping trigger beat us to it. Promotion must happen exactly
    /// once per meeting.
    async fn promote_capture(&self) -> Result<Option<usize>, MeetingError> {
        let capture = self
            .store
            .capture_state()
            .await?
            .ok_or(MeetingError::NoCaptureState)?;

        let history = self.store.meeting_history().await?;
        if let Some(last) = history.last() {
            if last.meeting_start_timestamp == capture.meeting_start_timestamp {
                return Ok(None);
            }
        }

        let meeting = capture.promote(Utc::now())?;
        let index = self.store.push_meeting(meeting).await?;
        info!("Meeting promoted into history at index {index}");
        Ok(Some(index))
    }

    /// Clear the session guard and release any deferred update. Runs after
    /// processing regardless of its outcome.
    async fn finish_active_session(&self) {
        if let Err(err) = self.store.set_active_session(None).await {
            error!("Failed to clear active session: {err:#}");
        }
        self.gate.apply_if_deferred().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meeting::records::{ChatMessage, TranscriptBlock, WebhookPostStatus};
    use crate::store::MemoryStore;
    use crate::update::UpdateApplier;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingApplier {
        applied: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl UpdateApplier for CountingApplier {
        async fn apply(&self) {
            self.applied.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct MockDelivery {
        downloads: AtomicUsize,
        webhook_posts: AtomicUsize,
        webhook_configured: bool,
        fail_downloads: bool,
    }

    #[async_trait]
    impl DeliveryService for MockDelivery {
        async fn download_transcript(
            &self,
            _index: usize,
            _webhook_enabled: bool,
        ) -> Result<PathBuf, MeetingError> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            if self.fail_downloads {
                return Err(MeetingError::FileExportFailed("disk full".to_string()));
            }
            Ok(PathBuf::from("/tmp/Transcript.txt"))
        }

        async fn post_transcript_to_webhook(&self, _index: usize) -> Result<(), MeetingError> {
            self.webhook_posts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn webhook_configured(&self) -> bool {
            self.webhook_configured
        }
    }

    struct Fixture {
        store: Arc<dyn MeetingStore>,
        delivery: Arc<MockDelivery>,
        controller: LifecycleController,
        updates_applied: Arc<AtomicUsize>,
    }

    fn fixture_with(delivery: MockDelivery) -> Fixture {
        let store: Arc<dyn MeetingStore> = Arc::new(MemoryStore::new());
        let delivery = Arc::new(delivery);
        let updates_applied = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(UpdateGate::new(
            store.clone(),
            Box::new(CountingApplier {
                applied: updates_applied.clone(),
            }),
        ));
        let controller = LifecycleController::new(
            store.clone(),
            delivery.clone(),
            gate,
            true,
        );
        Fixture {
            store,
            delivery,
            controller,
            updates_applied,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(MockDelivery::default())
    }

    async fn capture_one_block(fixture: &Fixture) {
        fixture
            .store
            .append_transcript_block(TranscriptBlock {
                person_name: "Alice".to_string(),
                timestamp: Utc::now(),
                transcript_text: "Hello".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_meeting_ended_promotes_and_delivers() {
        let fixture = fixture();
        fixture
            .controller
            .on_meeting_started(None, Some("Standup".to_string()))
            .await
            .unwrap();
        capture_one_block(&fixture).await;

        fixture.controller.on_meeting_ended().await.unwrap();

        let history = fixture.store.meeting_history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].webhook_post_status, WebhookPostStatus::New);
        assert_eq!(fixture.delivery.downloads.load(Ordering::SeqCst), 1);
        // No webhook configured in the mock
        assert_eq!(fixture.delivery.webhook_posts.load(Ordering::SeqCst), 0);
        assert!(fixture
            .store
            .lifecycle_flags()
            .await
            .unwrap()
            .active_session
            .is_none());
    }

    #[tokio::test]
    async fn test_end_then_tab_close_processes_once() {
        let fixture = fixture();
        let token = fixture
            .controller
            .on_meeting_started(Some(SessionToken::from("tab-7")), None)
            .await
            .unwrap();
        capture_one_block(&fixture).await;

        fixture.controller.on_meeting_ended().await.unwrap();
        fixture.controller.on_tab_closed(&token).await.unwrap();

        assert_eq!(fixture.store.meeting_history().await.unwrap().len(), 1);
        assert_eq!(fixture.delivery.downloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_end_and_tab_close_process_once() {
        let fixture = Arc::new(fixture());
        let token = fixture
            .controller
            .on_meeting_started(Some(SessionToken::from("tab-7")), None)
            .await
            .unwrap();
        capture_one_block(&fixture).await;

        let ended = {
            let fixture = fixture.clone();
            tokio::spawn(async move { fixture.controller.on_meeting_ended().await })
        };
        let closed = {
            let fixture = fixture.clone();
            tokio::spawn(async move { fixture.controller.on_tab_closed(&token).await })
        };
        ended.await.unwrap().unwrap();
        closed.await.unwrap().unwrap();

        assert_eq!(fixture.store.meeting_history().await.unwrap().len(), 1);
        assert_eq!(fixture.delivery.downloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_double_end_signal_processes_once() {
        let fixture = fixture();
        fixture
            .controller
            .on_meeting_started(None, None)
            .await
            .unwrap();
        capture_one_block(&fixture).await;

        fixture.controller.on_meeting_ended().await.unwrap();
        fixture.controller.on_meeting_ended().await.unwrap();

        assert_eq!(fixture.store.meeting_history().await.unwrap().len(), 1);
        assert_eq!(fixture.delivery.downloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tab_close_mismatch_is_noop() {
        let fixture = fixture();
        fixture
            .controller
            .on_meeting_started(Some(SessionToken::from("tab-7")), None)
            .await
            .unwrap();
        capture_one_block(&fixture).await;

        fixture
            .controller
            .on_tab_closed(&SessionToken::from("tab-8"))
            .await
            .unwrap();

        assert!(fixture.store.meeting_history().await.unwrap().is_empty());
        assert_eq!(fixture.delivery.downloads.load(Ordering::SeqCst), 0);
        // The active session is untouched
        assert!(fixture
            .store
            .lifecycle_flags()
            .await
            .unwrap()
            .active_session
            .is_some());
    }

    #[tokio::test]
    async fn test_empty_capture_fails_but_clears_session() {
        let fixture = fixture();
        fixture
            .controller
            .on_meeting_started(None, None)
            .await
            .unwrap();

        let result = fixture.controller.on_meeting_ended().await;

        assert!(matches!(result, Err(MeetingError::EmptyCapture)));
        assert!(fixture.store.meeting_history().await.unwrap().is_empty());
        assert!(fixture
            .store
            .lifecycle_flags()
            .await
            .unwrap()
            .active_session
            .is_none());
    }

    #[tokio::test]
    async fn test_ended_without_any_meeting() {
        let fixture = fixture();
        let result = fixture.controller.on_meeting_ended().await;
        assert!(matches!(result, Err(MeetingError::NoCaptureState)));
    }

    #[tokio::test]
    async fn test_delivery_failure_still_clears_session() {
        let fixture = fixture_with(MockDelivery {
            fail_downloads: true,
            ..MockDelivery::default()
        });
        fixture
            .controller
            .on_meeting_started(None, None)
            .await
            .unwrap();
        capture_one_block(&fixture).await;

        let result = fixture.controller.on_meeting_ended().await;

        assert!(matches!(result, Err(MeetingError::FileExportFailed(_))));
        // The meeting is already durable; only delivery failed
        assert_eq!(fixture.store.meeting_history().await.unwrap().len(), 1);
        assert!(fixture
            .store
            .lifecycle_flags()
            .await
            .unwrap()
            .active_session
            .is_none());
    }

    #[tokio::test]
    async fn test_webhook_runs_alongside_download() {
        let fixture = fixture_with(MockDelivery {
            webhook_configured: true,
            ..MockDelivery::default()
        });
        fixture
            .controller
            .on_meeting_started(None, None)
            .await
            .unwrap();
        capture_one_block(&fixture).await;

        fixture.controller.on_meeting_ended().await.unwrap();

        assert_eq!(fixture.delivery.downloads.load(Ordering::SeqCst), 1);
        assert_eq!(fixture.delivery.webhook_posts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_deferred_update_applied_after_processing() {
        let fixture = fixture();
        fixture
            .controller
            .on_meeting_started(None, None)
            .await
            .unwrap();
        capture_one_block(&fixture).await;
        fixture.store.set_deferred_update(true).await.unwrap();

        fixture.controller.on_meeting_ended().await.unwrap();

        assert_eq!(fixture.updates_applied.load(Ordering::SeqCst), 1);
        assert!(!fixture
            .store
            .lifecycle_flags()
            .await
            .unwrap()
            .deferred_update_pending);
    }

    #[tokio::test]
    async fn test_recover_without_capture() {
        let fixture = fixture();
        let result = fixture.controller.recover_last_meeting().await;
        assert!(matches!(result, Err(MeetingError::NoCaptureState)));
    }

    #[tokio::test]
    async fn test_recover_when_already_processed() {
        let fixture = fixture();
        fixture
            .controller
            .on_meeting_started(None, None)
            .await
            .unwrap();
        capture_one_block(&fixture).await;
        fixture.controller.on_meeting_ended().await.unwrap();

        let outcome = fixture.controller.recover_last_meeting().await.unwrap();

        assert_eq!(outcome, RecoveryOutcome::NotNeeded);
        assert_eq!(fixture.store.meeting_history().await.unwrap().len(), 1);
        assert_eq!(fixture.delivery.downloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recover_unprocessed_capture() {
        let fixture = fixture();
        // A meeting started and captured content, but the runtime died
        // before the end signal was handled
        fixture
            .controller
            .on_meeting_started(None, None)
            .await
            .unwrap();
        capture_one_block(&fixture).await;
        fixture
            .store
            .append_chat_message(ChatMessage {
                person_name: "Bob".to_string(),
                timestamp: Utc::now(),
                chat_message_text: "link".to_string(),
            })
            .await
            .unwrap();

        let outcome = fixture.controller.recover_last_meeting().await.unwrap();

        assert_eq!(outcome, RecoveryOutcome::Recovered);
        let history = fixture.store.meeting_history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].chat_messages.len(), 1);
        assert_eq!(fixture.delivery.downloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_restart_overwrites_active_session() {
        let fixture = fixture();
        let first = fixture
            .controller
            .on_meeting_started(None, None)
            .await
            .unwrap();
        let second = fixture
            .controller
            .on_meeting_started(None, None)
            .await
            .unwrap();

        assert_ne!(first, second);
        let flags = fixture.store.lifecycle_flags().await.unwrap();
        assert_eq!(flags.active_session, Some(second));
    }
}
