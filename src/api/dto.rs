use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::core::{RequestId, SortDirection, SortField, TaskStatus};

/// One entry of `request_statuses`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RequestStatusRecord {
    pub request_id: RequestId,
    pub status: TaskStatus,
    #[serde(default)]
    pub original_file_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StatusesResponse {
    pub request_statuses: Vec<RequestStatusRecord>,
}

/// Body of `query_request_summary`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryQuery {
    pub request_ids: Vec<RequestId>,
    pub request_times: Vec<DateTime<Utc>>,
    pub sort_column: SortField,
    pub sort_order: SortDirection,
    /// Zero-based
    pub page_index: u32,
    pub records_on_page: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SummaryResponse {
    pub request_statuses: Vec<RequestStatusRecord>,
    /// Required, a response without it is malformed
    pub tasks_pending: u64,
}
