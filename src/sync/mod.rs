//! Reconciles the local ledger with backend status into a paged task view.

mod manager;
mod manager_worker;
mod state;
mod types;
mod view;

pub use manager::{TaskSynchronizer, TaskSynchronizerHandle, TASKS_LOCATION};
pub use state::{join_statuses, paginate, sort_tasks, SyncState, DEFAULT_PAGE_SIZE};
pub use types::{RefreshOutcome, SyncConfig, SyncMode};
pub use view::{TaskView, ViewStore};
