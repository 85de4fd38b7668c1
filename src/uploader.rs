use std::path::Path;
use std::sync::Arc;
use chrono::Utc;
use tokio::sync::broadcast;
use crate::core::{
    ClientError,
    ClientEvent,
    ExtractionBackend,
    Result,
    UploadRequest,
    UploadSource,
    UploadTaskSettings,
};
use crate::tracking::Ledger;
use crate::utils::format_bytes;

/// Sends files to the creation endpoint and records accepted requests
#[derive(Clone)]
pub struct UploadSubmitter {
    backend: Arc<dyn ExtractionBackend>,
    ledger: Ledger,
    event_tx: broadcast::Sender<ClientEvent>,
}

impl UploadSubmitter {
    pub fn new(
        backend: Arc<dyn ExtractionBackend>,
        ledger: Ledger,
        event_tx: broadcast::Sender<ClientEvent>,
    ) -> Self {
        Self {
            backend,
            ledger,
            event_tx,
        }
    }

    async fn prepare(path: &Path) -> Result<UploadSource> {
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(ClientError::ParamError(format!("Not a file: {}", path.display())));
        }

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| ClientError::ParamError(format!("No file name in {}", path.display())))?;

        Ok(UploadSource {
            path: path.to_path_buf(),
            file_name,
            file_size: metadata.len(),
        })
    }

    /// Upload one file. The ledger is written only after the backend accepted
    /// it; any failure leaves no trace and is returned as is.
    pub async fn submit(&self, path: impl AsRef<Path>, settings: &UploadTaskSettings) -> Result<UploadRequest> {
        let path = path.as_ref();
        let source = match Self::prepare(path).await {
            Ok(source) => source,
            Err(err) => {
                tracing::warn!(path = %path.display(), category = err.category(), error = %err, "Cannot read file for upload");
                return Err(err);
            }
        };

        tracing::info!(
            file_name = %source.file_name,
            size = %format_bytes(source.file_size),
            ocr = settings.ocr_enable,
            format = settings.output_format.as_str(),
            "Uploading file"
        );

        let request_id = match self.backend.create_task(&source, settings).await {
            Ok(request_id) => request_id,
            Err(err) => {
                match &err {
                    ClientError::ServerError { status_code, message } => {
                        tracing::warn!(file_name = %source.file_name, status_code, body = %message, "Upload rejected by server");
                    }
                    _ => {
                        tracing::warn!(file_name = %source.file_name, category = err.category(), error = %err, "Upload failed");
                    }
                }
                return Err(err);
            }
        };

        let request = self.ledger.record(request_id, source.file_name, Utc::now());
        let _ = self.event_tx.send(ClientEvent::Uploaded {
            request: request.clone(),
        });

        tracing::info!(request_id = %request.id, "file \"{}\" is uploaded", request.file_name);
        Ok(request)
    }
}
