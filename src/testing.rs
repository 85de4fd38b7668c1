use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use async_trait::async_trait;
use tokio::sync::oneshot;
use crate::api::dto::{RequestStatusRecord, SummaryQuery, SummaryResponse};
use crate::core::{
    ClientError,
    ExtractionBackend,
    RequestId,
    Result,
    TaskStatus,
    UploadSource,
    UploadTaskSettings,
};

/// In-memory backend for unit tests. Unknown ids report `PENDING`.
#[derive(Default)]
pub(crate) struct MockBackend {
    pub create_calls: AtomicUsize,
    pub summary_calls: AtomicUsize,
    pub statuses_calls: AtomicUsize,
    pub fail_create: AtomicBool,
    pub fail_queries: AtomicBool,
    statuses: Mutex<HashMap<RequestId, TaskStatus>>,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    last_query: Mutex<Option<SummaryQuery>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, request_id: &str, status: TaskStatus) {
        self.statuses.lock().unwrap().insert(RequestId::new(request_id), status);
    }

    /// The next query blocks until the returned sender fires or is dropped
    pub fn hold_next_query(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn last_query(&self) -> Option<SummaryQuery> {
        self.last_query.lock().unwrap().clone()
    }

    pub fn query_calls(&self) -> usize {
        self.summary_calls.load(Ordering::SeqCst) + self.statuses_calls.load(Ordering::SeqCst)
    }

    fn status_of(&self, request_id: &RequestId) -> TaskStatus {
        self.statuses
            .lock()
            .unwrap()
            .get(request_id)
            .cloned()
            .unwrap_or(TaskStatus::Pending)
    }

    async fn wait_gate(&self) {
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
    }
}

#[async_trait]
impl ExtractionBackend for MockBackend {
    fn base_url(&self) -> &str {
        "http://backend.test"
    }

    async fn create_task(&self, source: &UploadSource, _settings: &UploadTaskSettings) -> Result<RequestId> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(ClientError::server_error(500, "Simulated failure"));
        }

        Ok(RequestId::new(format!("req-{}-{}", n, source.file_name)))
    }

    async fn query_request_statuses(&self, request_ids: &[RequestId]) -> Result<Vec<RequestStatusRecord>> {
        self.statuses_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate().await;
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(ClientError::server_error(502, "Bad gateway"));
        }

        Ok(request_ids
            .iter()
            .map(|id| RequestStatusRecord {
                request_id: id.clone(),
                status: self.status_of(id),
                original_file_name: None,
            })
            .collect())
    }

    async fn query_request_summary(&self, query: &SummaryQuery) -> Result<SummaryResponse> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.clone());
        self.wait_gate().await;
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(ClientError::server_error(502, "Bad gateway"));
        }

        let records: Vec<_> = query.request_ids
            .iter()
            .map(|id| RequestStatusRecord {
                request_id: id.clone(),
                status: self.status_of(id),
                original_file_name: Some("echoed-by-server.bin".to_string()),
            })
            .collect();
        let tasks_pending = records.iter().filter(|r| r.status.is_pending()).count() as u64;

        let start = (query.page_index * query.records_on_page) as usize;
        let request_statuses = records
            .into_iter()
            .skip(start)
            .take(query.records_on_page as usize)
            .collect();

        Ok(SummaryResponse {
            request_statuses,
            tasks_pending,
        })
    }

    async fn request_status(&self, request_id: &RequestId) -> Result<RequestStatusRecord> {
        Ok(RequestStatusRecord {
            request_id: request_id.clone(),
            status: self.status_of(request_id),
            original_file_name: None,
        })
    }
}
