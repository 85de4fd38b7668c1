use std::cmp::Ordering;
use std::collections::HashMap;
use crate::api::dto::{RequestStatusRecord, SummaryQuery};
use crate::core::{SortDirection, SortField, SortOrder, UploadRequest, UploadTask};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Paging and sorting the synchronizer queries with. Transitions return a new
/// value, or `None` when nothing would change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncState {
    /// One-based
    pub page: u32,
    pub page_size: u32,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl SyncState {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            sort_field: SortField::Started,
            sort_direction: SortField::Started.default_direction(),
        }
    }

    pub fn with_page(&self, page: u32, page_size: u32) -> Option<Self> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        if page == self.page && page_size == self.page_size {
            return None;
        }

        Some(Self { page, page_size, ..*self })
    }

    pub fn with_sorting(&self, field: SortField, order: SortOrder) -> Option<Self> {
        let direction = order.resolve(field);
        if field == self.sort_field && direction == self.sort_direction {
            return None;
        }

        Some(Self {
            sort_field: field,
            sort_direction: direction,
            ..*self
        })
    }

    pub fn page_index(&self) -> u32 {
        self.page.saturating_sub(1)
    }

    pub fn summary_query(&self, requests: &[UploadRequest]) -> SummaryQuery {
        SummaryQuery {
            request_ids: requests.iter().map(|r| r.id.clone()).collect(),
            request_times: requests.iter().map(|r| r.started).collect(),
            sort_column: self.sort_field,
            sort_order: self.sort_direction,
            page_index: self.page_index(),
            records_on_page: self.page_size,
        }
    }
}

/// Join backend statuses with the ledger. Local file name and start time win;
/// statuses for ids the ledger does not know are dropped. Backend order is kept.
pub fn join_statuses(requests: &[UploadRequest], statuses: Vec<RequestStatusRecord>) -> Vec<UploadTask> {
    let by_id: HashMap<_, _> = requests.iter().map(|r| (&r.id, r)).collect();

    statuses
        .into_iter()
        .filter_map(|record| match by_id.get(&record.request_id) {
            Some(request) => Some(UploadTask::new((*request).clone(), record.status)),
            None => {
                tracing::debug!(request_id = %record.request_id, "Status for untracked request ignored");
                None
            }
        })
        .collect()
}

fn compare_tasks(a: &UploadTask, b: &UploadTask, field: SortField) -> Ordering {
    match field {
        SortField::Started => a.started().cmp(&b.started()),
        SortField::FileName => a.file_name().cmp(b.file_name()),
        SortField::Status => a.status.as_str().cmp(b.status.as_str()),
    }
}

/// Client-side sort; equal keys keep their input order
pub fn sort_tasks(tasks: &mut [UploadTask], field: SortField, direction: SortDirection) {
    tasks.sort_by(|a, b| {
        let ord = compare_tasks(a, b, field);
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

/// Window of `page_size` items ending at `page * page_size`, clamped to the
/// list, so a page past the end shows the last window
pub fn paginate<T>(mut items: Vec<T>, page: u32, page_size: u32) -> Vec<T> {
    let page_size = page_size.max(1) as usize;
    let end = (page.max(1) as usize).saturating_mul(page_size).min(items.len());
    let start = end.saturating_sub(page_size);

    items.truncate(end);
    items.drain(..start);
    items
}
