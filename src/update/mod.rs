//! Deferred-restart gating.
//!
//! A runtime update must never destroy in-progress capture or in-flight
//! delivery state. While a session is active the update is parked behind a
//! durable flag; the lifecycle controller releases it only after delivery
//! has settled and the session flag is cleared.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

use crate::store::MeetingStore;

/// Exit code the service supervisor treats as a relaunch request.
pub const RESTART_EXIT_CODE: i32 = 75;

#[async_trait]
pub trait UpdateApplier: Send + Sync {
    async fn apply(&self);
}

/// Applies an update by asking the supervisor to relaunch the binary.
pub struct RestartApplier;

#[async_trait]
impl UpdateApplier for RestartApplier {
    async fn apply(&self) {
        info!("Restarting to apply pending update");
        std::process::exit(RESTART_EXIT_CODE);
    }
}

pub struct UpdateGate {
    store: Arc<dyn MeetingStore>,
    applier: Box<dyn UpdateApplier>,
}

impl UpdateGate {
    pub fn new(store: Arc<dyn MeetingStore>, applier: Box<dyn UpdateApplier>) -> Self {
        Self { store, applier }
    }

    /// The host runtime signalled that an update is ready.
    pub async fn on_update_available(&self) -> Result<()> {
        let flags = self.store.lifecycle_flags().await?;
        if flags.active_session.is_some() {
            self.store.set_deferred_update(true).await?;
            info!("Meeting in progress, update deferred");
        } else {
            info!("No active meeting, applying update immediately");
            self.applier.apply().await;
        }
        Ok(())
    }

    /// Release a parked update. Only called once processing has fully
    /// settled and the active session is cleared.
    pub async fn apply_if_deferred(&self) {
        match self.store.lifecycle_flags().await {
            Ok(flags) if flags.deferred_update_pending => {
                if let Err(err) = self.store.set_deferred_update(false).await {
                    error!("Failed to clear deferred update flag: {err:#}");
                    return;
                }
                info!("Applying deferred update");
                self.applier.apply().await;
            }
            Ok(_) => {}
            Err(err) => error!("Failed to read lifecycle flags: {err:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SessionToken};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) struct CountingApplier {
        pub applied: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl UpdateApplier for CountingApplier {
        async fn apply(&self) {
            self.applied.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn gate_with_counter(store: Arc<dyn MeetingStore>) -> (UpdateGate, Arc<AtomicUsize>) {
        let applied = Arc::new(AtomicUsize::new(0));
        let gate = UpdateGate::new(
            store,
            Box::new(CountingApplier {
                applied: applied.clone(),
            }),
        );
        (gate, applied)
    }

    #[tokio::test]
    async fn test_applies_immediately_when_idle() {
        let store: Arc<dyn MeetingStore> = Arc::new(MemoryStore::new());
        let (gate, applied) = gate_with_counter(store.clone());

        gate.on_update_available().await.unwrap();

        assert_eq!(applied.load(Ordering::SeqCst), 1);
        assert!(!store.lifecycle_flags().await.unwrap().deferred_update_pending);
    }

    #[tokio::test]
    async fn test_defers_while_meeting_active() {
        let store: Arc<dyn MeetingStore> = Arc::new(MemoryStore::new());
        store
            .set_active_session(Some(SessionToken::from("tab-1")))
            .await
            .unwrap();
        let (gate, applied) = gate_with_counter(store.clone());

        gate.on_update_available().await.unwrap();

        assert_eq!(applied.load(Ordering::SeqCst), 0);
        assert!(store.lifecycle_flags().await.unwrap().deferred_update_pending);
    }

    #[tokio::test]
    async fn test_apply_if_deferred_clears_flag_then_applies() {
        let store: Arc<dyn MeetingStore> = Arc::new(MemoryStore::new());
        store.set_deferred_update(true).await.unwrap();
        let (gate, applied) = gate_with_counter(store.clone());

        gate.apply_if_deferred().await;

        assert_eq!(applied.load(Ordering::SeqCst), 1);
        assert!(!store.lifecycle_flags().await.unwrap().deferred_update_pending);
    }

    #[tokio::test]
    async fn test_apply_if_deferred_is_noop_without_flag() {
        let store: Arc<dyn MeetingStore> = Arc::new(MemoryStore::new());
        let (gate, applied) = gate_with_counter(store);

        gate.apply_if_deferred().await;

        assert_eq!(applied.load(Ordering::SeqCst), 0);
    }
}
