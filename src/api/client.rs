use std::path::Path;
use std::time::Duration;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use url::Url;
use uuid::Uuid;
use crate::core::{
    ClientError,
    ExtractionBackend,
    RequestId,
    Result,
    ResultKind,
    UploadSource,
    UploadTaskSettings,
};
use super::dto::{RequestStatusRecord, StatusesResponse, SummaryQuery, SummaryResponse};

pub const TASKS_PATH: &str = "/api/v1/data_extraction_tasks";

/// Absolute URL of a result file
pub fn result_url(base_url: &str, request_id: &RequestId, kind: ResultKind) -> String {
    format!(
        "{}{}/{}/results/{}",
        base_url.trim_end_matches('/'),
        TASKS_PATH,
        request_id,
        kind.file_name()
    )
}

/// The creation endpoint answers with a bare id, either JSON-quoted or as raw text
pub fn parse_request_id(body: &str) -> Result<RequestId> {
    let body = body.trim();
    if body.is_empty() {
        return Err(ClientError::malformed("Empty response body, expected a request id"));
    }

    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::String(id)) if !id.trim().is_empty() => Ok(RequestId::new(id.trim())),
        Ok(serde_json::Value::String(_)) => Err(ClientError::malformed("Blank request id")),
        Ok(other) => Err(ClientError::malformed(format!("Expected a bare request id, got: {}", other))),
        Err(_) if body.chars().any(|c| c.is_whitespace() || c == '"' || c == '{' || c == '[') => {
            Err(ClientError::malformed(format!("Unexpected response body: {}", body)))
        }
        Err(_) => Ok(RequestId::new(body)),
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionClient {
    client: Client,
    base_url: String,
}

impl ExtractionClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Url::parse(base_url)
            .map_err(|err| ClientError::Config(format!("Invalid endpoint {:?}: {}", base_url, err)))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, TASKS_PATH, path)
    }

    /// Turn a non-2xx response into a server error, logging its headers
    async fn check_response(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        tracing::debug!(
            status = status.as_u16(),
            headers = ?response.headers(),
            "Backend rejected request"
        );

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        Err(ClientError::server_error(status.as_u16(), message))
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        let response = self.client
            .post(self.build_url(path))
            .json(body)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let text = response.text().await?;

        serde_json::from_str(&text)
            .map_err(|err| ClientError::malformed(format!("{} ({})", err, path)))
    }

    /// Stream a result file to `dest`, returns the number of bytes written.
    /// `dest` is only replaced once the whole body has arrived.
    pub async fn download_result(&self, request_id: &RequestId, kind: ResultKind, dest: &Path) -> Result<u64> {
        let url = result_url(&self.base_url, request_id, kind);
        let response = self.client.get(&url).send().await?;
        let response = Self::check_response(response).await?;

        let dir = dest.parent().unwrap_or_else(|| Path::new("."));
        let tmp = dir.join(format!(".{}.tmp", Uuid::new_v4()));

        let written = match Self::write_body(response, &tmp).await {
            Ok(written) => written,
            Err(err) => {
                let _ = tokio::fs::remove_file(&tmp).await;
                return Err(err);
            }
        };

        if let Err(err) = tokio::fs::rename(&tmp, dest).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(ClientError::storage(format!("Failed to move download to {}: {}", dest.display(), err)));
        }

        tracing::debug!(request_id = %request_id, bytes = written, dest = %dest.display(), "Result downloaded");
        Ok(written)
    }

    async fn write_body(response: Response, path: &Path) -> Result<u64> {
        let mut file = File::create(path).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        Ok(written)
    }
}

#[async_trait]
impl ExtractionBackend for ExtractionClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn create_task(&self, source: &UploadSource, settings: &UploadTaskSettings) -> Result<RequestId> {
        let file = File::open(&source.path).await?;
        // The size seen at selection time may be stale by now
        let file_size = file.metadata().await?.len();
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, file_size)
            .file_name(source.file_name.clone());

        let mut form = Form::new().part("file", part);
        for (name, value) in settings.form_fields() {
            form = form.text(name, value);
        }

        let response = self.client
            .post(self.build_url("/"))
            .multipart(form)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let text = response.text().await?;

        parse_request_id(&text)
    }

    async fn query_request_statuses(&self, request_ids: &[RequestId]) -> Result<Vec<RequestStatusRecord>> {
        let response: StatusesResponse = self.post_json("/query_request_statuses", request_ids).await?;
        Ok(response.request_statuses)
    }

    async fn query_request_summary(&self, query: &SummaryQuery) -> Result<SummaryResponse> {
        self.post_json("/query_request_summary", query).await
    }

    async fn request_status(&self, request_id: &RequestId) -> Result<RequestStatusRecord> {
        let response = self.client
            .get(self.build_url(&format!("/{}/status.json", request_id)))
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let text = response.text().await?;

        serde_json::from_str(&text)
            .map_err(|err| ClientError::malformed(format!("{} (status.json)", err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_id() {
        assert_eq!(parse_request_id("\"abc-123\"").unwrap(), RequestId::new("abc-123"));
        assert_eq!(parse_request_id("abc-123\n").unwrap(), RequestId::new("abc-123"));

        assert!(parse_request_id("").is_err());
        assert!(parse_request_id("\"\"").is_err());
        assert!(parse_request_id("{\"id\": \"abc\"}").is_err());
        assert!(parse_request_id("[1, 2]").is_err());
        assert!(parse_request_id("Internal Server Error").is_err());
    }

    #[test]
    fn test_result_url() {
        let id = RequestId::new("r1");
        assert_eq!(
            result_url("http://host/", &id, ResultKind::PlainText),
            "http://host/api/v1/data_extraction_tasks/r1/results/extracted_plain_text.txt"
        );
        assert_eq!(
            result_url("http://host", &id, ResultKind::PackedZip),
            "http://host/api/v1/data_extraction_tasks/r1/results/packed_data.zip"
        );
    }

    #[test]
    fn test_rejects_invalid_endpoint() {
        assert!(ExtractionClient::new("not a url", Duration::from_secs(1)).is_err());

        let client = ExtractionClient::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.build_url("/"), "http://localhost:8000/api/v1/data_extraction_tasks/");
    }
}
