use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use crate::core::{ClientError, ClientEvent, ExtractionBackend, Result, SortField, SortOrder};
use crate::tracking::Ledger;
use super::manager_worker::SyncWorker;
use super::state::SyncState;
use super::types::{RefreshOutcome, SyncCommand, SyncConfig};
use super::view::{TaskView, ViewStore};

/// Route of the task list page; navigating there triggers a refresh
pub const TASKS_LOCATION: &str = "/page-tasks";

/// Handle to the polling task synchronizer. Cheap to clone.
#[derive(Clone)]
pub struct TaskSynchronizer {
    command_tx: mpsc::Sender<SyncCommand>,
    view_rx: watch::Receiver<Arc<TaskView>>,
    cancellation_token: CancellationToken,
}

/// Synchronizer plus the task running its loop
pub struct TaskSynchronizerHandle {
    pub synchronizer: TaskSynchronizer,
    pub worker_handle: JoinHandle<()>,
}

impl TaskSynchronizerHandle {
    pub async fn shutdown(self) -> Result<()> {
        self.synchronizer.cancellation_token.cancel();
        self.worker_handle.await
            .map_err(|err| ClientError::internal_error(format!("Synchronizer panic: {}", err)))
    }
}

impl TaskSynchronizer {
    /// Start the synchronizer loop; it polls every `config.poll_interval`
    /// until shut down
    pub fn spawn(
        backend: Arc<dyn ExtractionBackend>,
        ledger: Ledger,
        config: SyncConfig,
        event_tx: broadcast::Sender<ClientEvent>,
    ) -> TaskSynchronizerHandle {
        let (command_tx, command_rx) = mpsc::channel(64);
        let state = SyncState::new(config.page_size);
        let view = ViewStore::new(TaskView {
            state,
            ..Default::default()
        });
        let view_rx = view.subscribe();
        let cancellation_token = CancellationToken::new();

        let worker = SyncWorker::new(backend, ledger, config.mode, state, view, event_tx);
        let worker_handle = tokio::spawn(worker.run(
            command_rx,
            config.poll_interval,
            cancellation_token.clone(),
        ));

        let synchronizer = Self {
            command_tx,
            view_rx,
            cancellation_token,
        };

        TaskSynchronizerHandle {
            synchronizer,
            worker_handle,
        }
    }

    async fn send(&self, command: SyncCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| ClientError::Shutdown)
    }

    /// Re-read the ledger and query the backend; resolves once the result was
    /// committed, discarded as stale, or failed
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SyncCommand::Refresh { reply: Some(reply_tx) }).await?;

        reply_rx
            .await
            .map_err(|_| ClientError::Shutdown)?
    }

    /// Fire-and-forget refresh
    pub async fn request_refresh(&self) -> Result<()> {
        self.send(SyncCommand::Refresh { reply: None }).await
    }

    /// Switch page; no-op when page and size are already current
    pub async fn update_page(&self, page: u32, page_size: u32) -> Result<RefreshOutcome> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SyncCommand::UpdatePage {
            page,
            page_size,
            reply: reply_tx,
        }).await?;

        reply_rx
            .await
            .map_err(|_| ClientError::Shutdown)?
    }

    /// Switch sorting; an unspecified order falls back to the field default
    pub async fn update_sorting(&self, field: SortField, order: SortOrder) -> Result<RefreshOutcome> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SyncCommand::UpdateSorting {
            field,
            order,
            reply: reply_tx,
        }).await?;

        reply_rx
            .await
            .map_err(|_| ClientError::Shutdown)?
    }

    /// Navigation hook: refresh when the task list is shown
    pub async fn location_changed(&self, location: &str) -> Result<Option<RefreshOutcome>> {
        if !location.contains(TASKS_LOCATION) {
            return Ok(None);
        }

        self.refresh().await.map(Some)
    }

    pub async fn state(&self) -> Result<SyncState> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SyncCommand::GetState { reply: reply_tx }).await?;

        reply_rx
            .await
            .map_err(|_| ClientError::Shutdown)
    }

    /// Latest committed view
    pub fn snapshot(&self) -> Arc<TaskView> {
        self.view_rx.borrow().clone()
    }

    /// Receiver that wakes on every commit
    pub fn subscribe(&self) -> watch::Receiver<Arc<TaskView>> {
        self.view_rx.clone()
    }
}
