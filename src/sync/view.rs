use std::sync::Arc;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use crate::core::UploadTask;
use super::state::SyncState;

/// Immutable snapshot of the task list, replaced wholesale on every commit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskView {
    pub tasks: Vec<UploadTask>,
    pub tasks_pending: u64,
    /// Number of tracked requests, for the pager
    pub total: usize,
    pub state: SyncState,
    /// Sequence number of the refresh this view came from, 0 before the first
    pub sequence: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Single-writer holder of the current view
pub struct ViewStore {
    tx: watch::Sender<Arc<TaskView>>,
    last_applied: u64,
}

impl ViewStore {
    pub fn new(initial: TaskView) -> Self {
        let last_applied = initial.sequence;
        let (tx, _) = watch::channel(Arc::new(initial));

        Self { tx, last_applied }
    }

    /// Replace the view unless a newer refresh was already committed
    pub fn commit(&mut self, view: TaskView) -> bool {
        if view.sequence <= self.last_applied {
            return false;
        }

        self.last_applied = view.sequence;
        self.tx.send_replace(Arc::new(view));
        true
    }

    pub fn last_applied(&self) -> u64 {
        self.last_applied
    }

    pub fn current(&self) -> Arc<TaskView> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<TaskView>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(sequence: u64, tasks_pending: u64) -> TaskView {
        TaskView {
            sequence,
            tasks_pending,
            ..Default::default()
        }
    }

    #[test]
    fn test_commit_replaces_view() {
        let mut store = ViewStore::new(TaskView::default());
        let rx = store.subscribe();

        assert!(store.commit(view(1, 3)));
        assert_eq!(store.current().tasks_pending, 3);
        assert_eq!(rx.borrow().sequence, 1);
    }

    #[test]
    fn test_older_sequence_is_discarded() {
        let mut store = ViewStore::new(TaskView::default());

        assert!(store.commit(view(2, 5)));
        assert!(!store.commit(view(1, 9)));
        assert!(!store.commit(view(2, 9)));

        assert_eq!(store.current().tasks_pending, 5);
        assert_eq!(store.last_applied(), 2);
    }

    #[tokio::test]
    async fn test_subscribers_are_notified() {
        let mut store = ViewStore::new(TaskView::default());
        let mut rx = store.subscribe();

        store.commit(view(1, 1));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().sequence, 1);
    }
}
