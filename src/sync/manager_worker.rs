use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use crate::core::{ClientError, ClientEvent, ExtractionBackend, Result, UploadRequest, UploadTask};
use crate::tracking::Ledger;
use super::state::{join_statuses, paginate, sort_tasks, SyncState};
use super::types::{RefreshOutcome, RefreshReply, SyncCommand, SyncMode};
use super::view::{TaskView, ViewStore};

/// Result of one backend round trip
struct FetchedView {
    tasks: Vec<UploadTask>,
    tasks_pending: u64,
    total: usize,
}

struct RefreshCompletion {
    sequence: u64,
    state: SyncState,
    /// `None` when nothing is tracked
    result: Result<Option<FetchedView>>,
    reply: Option<RefreshReply>,
}

pub(crate) struct SyncWorker {
    backend: Arc<dyn ExtractionBackend>,
    ledger: Ledger,
    mode: SyncMode,
    state: SyncState,
    view: ViewStore,
    next_sequence: u64,

    event_tx: broadcast::Sender<ClientEvent>,
    completion_tx: mpsc::UnboundedSender<RefreshCompletion>,
    completion_rx: mpsc::UnboundedReceiver<RefreshCompletion>,
}

impl SyncWorker {
    pub(crate) fn new(
        backend: Arc<dyn ExtractionBackend>,
        ledger: Ledger,
        mode: SyncMode,
        state: SyncState,
        view: ViewStore,
        event_tx: broadcast::Sender<ClientEvent>,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            ledger,
            mode,
            state,
            view,
            next_sequence: 1,
            event_tx,
            completion_tx,
            completion_rx,
        }
    }

    pub(crate) async fn run(
        mut self,
        mut command_rx: mpsc::Receiver<SyncCommand>,
        poll_interval: Duration,
        cancellation_token: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval_at(Instant::now() + poll_interval, poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => break,
                command = command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(completion) = self.completion_rx.recv() => {
                    self.handle_completion(completion);
                }
                _ = ticker.tick() => {
                    tracing::trace!("Poll tick");
                    self.start_refresh(None);
                }
            }
        }

        tracing::debug!(last_applied = self.view.last_applied(), "Synchronizer stopped");
    }

    fn handle_command(&mut self, command: SyncCommand) {
        match command {
            SyncCommand::Refresh { reply } => {
                self.start_refresh(reply);
            }
            SyncCommand::UpdatePage { page, page_size, reply } => {
                match self.state.with_page(page, page_size) {
                    Some(state) => {
                        self.state = state;
                        self.start_refresh(Some(reply));
                    }
                    None => {
                        let _ = reply.send(Ok(RefreshOutcome::Unchanged));
                    }
                }
            }
            SyncCommand::UpdateSorting { field, order, reply } => {
                match self.state.with_sorting(field, order) {
                    Some(state) => {
                        self.state = state;
                        self.start_refresh(Some(reply));
                    }
                    None => {
                        let _ = reply.send(Ok(RefreshOutcome::Unchanged));
                    }
                }
            }
            SyncCommand::GetState { reply } => {
                let _ = reply.send(self.state);
            }
        }
    }

    fn start_refresh(&mut self, reply: Option<RefreshReply>) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let backend = self.backend.clone();
        let ledger = self.ledger.clone();
        let completion_tx = self.completion_tx.clone();
        let mode = self.mode;
        let state = self.state;

        // Responses may come back out of order, the sequence sorts that out
        tokio::spawn(async move {
            let result = match load_requests(ledger).await {
                Ok(requests) if requests.is_empty() => Ok(None),
                Ok(requests) => {
                    tracing::debug!(sequence, tracked = requests.len(), "Refreshing tasks");
                    fetch_view(backend.as_ref(), mode, state, requests).await.map(Some)
                }
                Err(err) => Err(err),
            };

            let _ = completion_tx.send(RefreshCompletion {
                sequence,
                state,
                result,
                reply,
            });
        });
    }

    fn handle_completion(&mut self, completion: RefreshCompletion) {
        let RefreshCompletion { sequence, state, result, reply } = completion;

        let outcome = match result {
            Ok(None) => {
                let committed = self.commit(TaskView {
                    state,
                    sequence,
                    refreshed_at: Some(Utc::now()),
                    ..Default::default()
                });

                if committed {
                    Ok(RefreshOutcome::Empty { sequence })
                } else {
                    Ok(RefreshOutcome::Stale { sequence })
                }
            }
            Ok(Some(fetched)) => {
                let rows = fetched.tasks.len();
                let committed = self.commit(TaskView {
                    tasks: fetched.tasks,
                    tasks_pending: fetched.tasks_pending,
                    total: fetched.total,
                    state,
                    sequence,
                    refreshed_at: Some(Utc::now()),
                });

                if committed {
                    Ok(RefreshOutcome::Applied { sequence, rows })
                } else {
                    tracing::debug!(sequence, last_applied = self.view.last_applied(), "Discarding stale refresh");
                    Ok(RefreshOutcome::Stale { sequence })
                }
            }
            Err(err) => {
                tracing::warn!(sequence, category = err.category(), error = %err, "Refresh failed, keeping previous view");
                let _ = self.event_tx.send(ClientEvent::RefreshFailed {
                    sequence,
                    error: err.to_string(),
                });
                Err(err)
            }
        };

        if let Some(reply) = reply {
            let _ = reply.send(outcome);
        }
    }

    fn commit(&mut self, view: TaskView) -> bool {
        let sequence = view.sequence;
        let rows = view.tasks.len();
        let tasks_pending = view.tasks_pending;

        if !self.view.commit(view) {
            return false;
        }

        let _ = self.event_tx.send(ClientEvent::ViewCommitted {
            sequence,
            rows,
            tasks_pending,
        });
        true
    }
}

/// The ledger sits on the filesystem, keep its reads off the actor
async fn load_requests(ledger: Ledger) -> Result<Vec<UploadRequest>> {
    tokio::task::spawn_blocking(move || ledger.list())
        .await
        .map_err(|err| ClientError::internal_error(format!("Ledger read failed: {}", err)))
}

async fn fetch_view(
    backend: &dyn ExtractionBackend,
    mode: SyncMode,
    state: SyncState,
    requests: Vec<UploadRequest>,
) -> Result<FetchedView> {
    let total = requests.len();

    match mode {
        SyncMode::Summary => {
            let query = state.summary_query(&requests);
            let response = backend.query_request_summary(&query).await?;

            Ok(FetchedView {
                tasks: join_statuses(&requests, response.request_statuses),
                tasks_pending: response.tasks_pending,
                total,
            })
        }
        SyncMode::Statuses => {
            let ids: Vec<_> = requests.iter().map(|r| r.id.clone()).collect();
            let statuses = backend.query_request_statuses(&ids).await?;

            let mut tasks = join_statuses(&requests, statuses);
            let tasks_pending = tasks.iter().filter(|t| t.status.is_pending()).count() as u64;
            sort_tasks(&mut tasks, state.sort_field, state.sort_direction);

            Ok(FetchedView {
                tasks: paginate(tasks, state.page, state.page_size),
                tasks_pending,
                total,
            })
        }
    }
}
