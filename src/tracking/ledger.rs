use std::sync::{Arc, Mutex};
use chrono::{DateTime, Utc};
use crate::core::{ClientError, KeyValueStore, RequestId, Result, UploadRequest};

const REQUESTS_KEY: &str = "requests";
const REQUEST_KEY_PREFIX: &str = "request_";

/// Append-only local record of every submitted request
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn KeyValueStore>,
    /// Held across the read-modify-write of the id list
    write_lock: Arc<Mutex<()>>,
}

impl Ledger {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn detail_key(request_id: &RequestId) -> String {
        format!("{}{}", REQUEST_KEY_PREFIX, request_id)
    }

    fn read_ids(&self) -> Result<Vec<RequestId>> {
        match self.store.get(REQUESTS_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Record a request, surfacing storage failures
    pub fn try_record(
        &self,
        request_id: RequestId,
        file_name: impl Into<String>,
        started: DateTime<Utc>,
    ) -> Result<UploadRequest> {
        let request = UploadRequest {
            id: request_id,
            file_name: file_name.into(),
            started,
        };

        // A poisoned lock guards no data, carry on
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut ids = match self.read_ids() {
            Ok(ids) => ids,
            Err(ClientError::Json(err)) => {
                tracing::warn!(error = %err, "Request id list unreadable, starting a new one");
                Vec::new()
            }
            Err(err) => return Err(err),
        };

        // Detail first: an id in the list must always have its record
        self.store.set(&Self::detail_key(&request.id), &serde_json::to_string(&request)?)?;

        if !ids.contains(&request.id) {
            ids.push(request.id.clone());
            self.store.set(REQUESTS_KEY, &serde_json::to_string(&ids)?)?;
        }

        Ok(request)
    }

    /// Record a request. Storage failures are logged and otherwise ignored,
    /// the upload itself already succeeded server-side.
    pub fn record(
        &self,
        request_id: RequestId,
        file_name: impl Into<String>,
        started: DateTime<Utc>,
    ) -> UploadRequest {
        let file_name = file_name.into();
        match self.try_record(request_id.clone(), file_name.clone(), started) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(request_id = %request_id, error = %err, "Failed to record request, it will not be tracked");
                UploadRequest {
                    id: request_id,
                    file_name,
                    started,
                }
            }
        }
    }

    pub fn get(&self, request_id: &RequestId) -> Option<UploadRequest> {
        let raw = match self.store.get(&Self::detail_key(request_id)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(request_id = %request_id, error = %err, "Failed to read request record");
                return None;
            }
        };

        match serde_json::from_str::<UploadRequest>(&raw) {
            Ok(request) if &request.id == request_id => Some(request),
            Ok(request) => {
                tracing::warn!(request_id = %request_id, stored_id = %request.id, "Request record belongs to another id");
                None
            }
            Err(err) => {
                tracing::warn!(request_id = %request_id, error = %err, "Request record unreadable, skipping");
                None
            }
        }
    }

    /// All tracked requests in insertion order; unreadable entries are skipped
    pub fn list(&self) -> Vec<UploadRequest> {
        let ids = match self.read_ids() {
            Ok(ids) => ids,
            Err(err) => {
                tracing::warn!(error = %err, "Request id list unreadable");
                return Vec::new();
            }
        };

        ids.iter()
            .filter_map(|id| self.get(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
