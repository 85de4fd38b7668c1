use std::path::PathBuf;
use async_trait::async_trait;
use crate::api::dto::{RequestStatusRecord, SummaryQuery, SummaryResponse};
use super::types::{RequestId, UploadTaskSettings};
use super::errors::Result;

/// A local file about to be sent to the creation endpoint
#[derive(Debug, Clone)]
pub struct UploadSource {
    pub path: PathBuf,
    pub file_name: String,
    pub file_size: u64,
}

/// Extraction service backend - the HTTP client implements this, tests mock it
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Base URL the result links are built from
    fn base_url(&self) -> &str;

    /// Create an extraction task, returns the server-assigned request id
    async fn create_task(&self, source: &UploadSource, settings: &UploadTaskSettings) -> Result<RequestId>;

    /// Statuses of the given requests, in no guaranteed order
    async fn query_request_statuses(&self, request_ids: &[RequestId]) -> Result<Vec<RequestStatusRecord>>;

    /// One sorted page of statuses plus the pending count
    async fn query_request_summary(&self, query: &SummaryQuery) -> Result<SummaryResponse>;

    /// Status of a single request
    async fn request_status(&self, request_id: &RequestId) -> Result<RequestStatusRecord>;
}

/// String key/value storage with local-storage semantics
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;
}
