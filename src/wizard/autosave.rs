//! Debounced auto-save
//!
//! A single pending-timer slot: every edit cancels the waiting timer and
//! schedules a new one, so a burst of edits produces one save once the form
//! has been quiet for the configured interval. Outcomes are published on a
//! watch channel and folded into the wizard state by the manager.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::drafts::{DraftError, DraftRequest, DraftStore};
use crate::form::FormData;
use crate::wizard::WizardKind;

/// Receives auto-save snapshots
#[async_trait]
pub trait AutoSaveHandler: Send + Sync {
    /// Persist the snapshot taken on `step`; may return the id of the draft it landed in
    async fn auto_save(&self, data: Arc<FormData>, step: u8)
        -> Result<Option<String>, DraftError>;

    /// The session saved draft `id` itself; later auto-saves should land there
    async fn adopt_draft_id(&self, _id: &str) {}
}

/// Latest auto-save outcome
#[derive(Debug, Clone, PartialEq)]
pub enum AutoSaveStatus {
    Idle,
    Saved {
        /// Edit revision the saved snapshot was taken at
        revision: u64,
        at: DateTime<Utc>,
        draft_id: Option<String>,
    },
    Failed {
        revision: u64,
        message: String,
    },
}

struct PendingSave {
    handle: JoinHandle<()>,
    fired: Arc<AtomicBool>,
}

pub struct AutoSaver {
    handler: Arc<dyn AutoSaveHandler>,
    interval: Duration,
    pending: Option<PendingSave>,
    status_tx: Arc<watch::Sender<AutoSaveStatus>>,
    status_rx: watch::Receiver<AutoSaveStatus>,
}

impl AutoSaver {
    pub fn new(handler: Arc<dyn AutoSaveHandler>, interval: Duration) -> Self {
        let (status_tx, status_rx) = watch::channel(AutoSaveStatus::Idle);
        Self {
            handler,
            interval,
            pending: None,
            status_tx: Arc::new(status_tx),
            status_rx,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Replace any waiting timer with a new one for `data`
    ///
    /// A save whose timer already fired is left to finish. Without a tokio
    /// runtime nothing is scheduled.
    pub fn schedule(&mut self, data: Arc<FormData>, step: u8, revision: u64) {
        self.cancel_waiting();

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime available, auto-save skipped");
            return;
        };

        let handler = Arc::clone(&self.handler);
        let status_tx = Arc::clone(&self.status_tx);
        let fired = Arc::new(AtomicBool::new(false));
        let task_fired = Arc::clone(&fired);
        let interval = self.interval;

        let handle = runtime.spawn(async move {
            tokio::time::sleep(interval).await;
            task_fired.store(true, Ordering::SeqCst);

            let status = match handler.auto_save(data, step).await {
                Ok(draft_id) => {
                    tracing::debug!(revision, "auto-save completed");
                    AutoSaveStatus::Saved {
                        revision,
                        at: Utc::now(),
                        draft_id,
                    }
                }
                Err(err) => {
                    tracing::warn!(revision, error = %err, "auto-save failed");
                    AutoSaveStatus::Failed {
                        revision,
                        message: err.to_string(),
                    }
                }
            };
            status_tx.send_replace(status);
        });

        self.pending = Some(PendingSave { handle, fired });
    }

    fn cancel_waiting(&mut self) {
        if let Some(pending) = self.pending.take() {
            if !pending.fired.load(Ordering::SeqCst) {
                pending.handle.abort();
            }
        }
    }

    /// Abort the pending save whether or not its timer fired
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.handle.abort();
        }
    }

    /// Drop a waiting timer, or wait for a save that is already running
    pub async fn settle(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        if !pending.fired.load(Ordering::SeqCst) {
            pending.handle.abort();
            return;
        }
        if let Err(err) = pending.handle.await {
            tracing::debug!(error = %err, "auto-save task ended early");
        }
    }

    pub fn handler(&self) -> Arc<dyn AutoSaveHandler> {
        Arc::clone(&self.handler)
    }

    /// True while a timer is waiting or a save is running
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| !p.handle.is_finished())
    }

    /// The newest outcome not yet observed
    pub fn take_status(&mut self) -> Option<AutoSaveStatus> {
        if self.status_rx.has_changed().unwrap_or(false) {
            Some(self.status_rx.borrow_and_update().clone())
        } else {
            None
        }
    }
}

impl Drop for AutoSaver {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for AutoSaver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoSaver")
            .field("interval", &self.interval)
            .field("pending", &self.is_pending())
            .finish_non_exhaustive()
    }
}

/// Auto-saves into a [`DraftStore`], reusing the draft created by the first save
pub struct StoreAutoSave {
    store: Arc<dyn DraftStore>,
    kind: WizardKind,
    draft_id: Mutex<Option<String>>,
}

impl StoreAutoSave {
    pub fn new(store: Arc<dyn DraftStore>, kind: WizardKind, draft_id: Option<String>) -> Self {
        Self {
            store,
            kind,
            draft_id: Mutex::new(draft_id),
        }
    }
}

#[async_trait]
impl AutoSaveHandler for StoreAutoSave {
    async fn auto_save(
        &self,
        data: Arc<FormData>,
        step: u8,
    ) -> Result<Option<String>, DraftError> {
        // Held across the save so overlapping saves cannot create two drafts
        let mut draft_id = self.draft_id.lock().await;
        let id = self
            .store
            .save_draft(DraftRequest {
                id: draft_id.clone(),
                kind: self.kind,
                step,
                form_data: data,
            })
            .await?;
        *draft_id = Some(id.clone());
        Ok(Some(id))
    }

    async fn adopt_draft_id(&self, id: &str) {
        *self.draft_id.lock().await = Some(id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingHandler {
        calls: AtomicUsize,
        last_title: std::sync::Mutex<Option<String>>,
    }

    #[async_trait]
    impl AutoSaveHandler for CountingHandler {
        async fn auto_save(
            &self,
            data: Arc<FormData>,
            _step: u8,
        ) -> Result<Option<String>, DraftError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_title.lock().unwrap() = Some(data.text("title").to_string());
            Ok(None)
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl AutoSaveHandler for FailingHandler {
        async fn auto_save(
            &self,
            _data: Arc<FormData>,
            _step: u8,
        ) -> Result<Option<String>, DraftError> {
            Err(DraftError::Rejected("backend offline".to_string()))
        }
    }

    fn titled(title: &str) -> Arc<FormData> {
        Arc::new(FormData::new().with("title", title))
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_edits_saves_once() {
        let handler = Arc::new(CountingHandler::default());
        let mut saver = AutoSaver::new(handler.clone(), Duration::from_millis(500));

        for (revision, title) in ["a", "ab", "abc"].into_iter().enumerate() {
            saver.schedule(titled(title), 1, revision as u64 + 1);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert_eq!(handler.last_title.lock().unwrap().as_deref(), Some("abc"));
        match saver.take_status() {
            Some(AutoSaveStatus::Saved { revision, .. }) => assert_eq!(revision, 3),
            other => panic!("unexpected status: {other:?}"),
        }
        assert!(saver.take_status().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_reported() {
        let mut saver = AutoSaver::new(Arc::new(FailingHandler), Duration::from_millis(10));
        saver.schedule(titled("x"), 1, 7);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(
            saver.take_status(),
            Some(AutoSaveStatus::Failed {
                revision: 7,
                message: "backend offline".to_string()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_save() {
        let handler = Arc::new(CountingHandler::default());
        let mut saver = AutoSaver::new(handler.clone(), Duration::from_millis(100));
        saver.schedule(titled("x"), 1, 1);
        saver.cancel();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
        assert!(!saver.is_pending());
    }

    #[test]
    fn test_schedule_without_runtime_is_skipped() {
        let handler = Arc::new(CountingHandler::default());
        let mut saver = AutoSaver::new(handler.clone(), Duration::from_millis(1));
        saver.schedule(titled("x"), 1, 1);
        assert!(!saver.is_pending());
    }
}
