use std::time::Duration;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use crate::core::{Result, SortField, SortOrder};
use super::state::{SyncState, DEFAULT_PAGE_SIZE};

/// Where sorting and paging happen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Backend sorts and pages via `query_request_summary`
    #[default]
    Summary,
    /// `query_request_statuses` for every id, sorted and paged locally
    Statuses,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub poll_interval: Duration,
    pub page_size: u32,
    pub mode: SyncMode,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            page_size: DEFAULT_PAGE_SIZE,
            mode: SyncMode::Summary,
        }
    }
}

/// What a refresh request ended in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Paging/sorting was already current, nothing was queried
    Unchanged,

    /// Ledger is empty, the view was cleared without a network call
    Empty {
        sequence: u64,
    },

    /// A new view was committed
    Applied {
        sequence: u64,
        rows: usize,
    },

    /// A newer refresh had already been committed, this response was dropped
    Stale {
        sequence: u64,
    },
}

pub(crate) type RefreshReply = oneshot::Sender<Result<RefreshOutcome>>;

/// Synchronizer commands
pub(crate) enum SyncCommand {
    Refresh {
        reply: Option<RefreshReply>,
    },

    UpdatePage {
        page: u32,
        page_size: u32,
        reply: RefreshReply,
    },

    UpdateSorting {
        field: SortField,
        order: SortOrder,
        reply: RefreshReply,
    },

    GetState {
        reply: oneshot::Sender<SyncState>,
    },
}
