use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use super::errors::ClientError;

/// Server-assigned request identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, the way the task table shows ids
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Ledger entry: a request this client has submitted
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub id: RequestId,
    pub file_name: String,
    pub started: DateTime<Utc>,
}

/// Backend-reported processing status
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Pending,
    Done,
    Failure,
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Done => "DONE",
            Self::Failure => "FAILURE",
            Self::Other(value) => value,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PENDING" => Self::Pending,
            "DONE" => Self::Done,
            "FAILURE" => Self::Failure,
            _ => Self::Other(value),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(value: TaskStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Downloadable result of a finished request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    PlainText,
    PackedZip,
}

impl ResultKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::PlainText => "extracted_plain_text.txt",
            Self::PackedZip => "packed_data.zip",
        }
    }
}

impl FromStr for ResultKind {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "txt" | "text" => Ok(Self::PlainText),
            "zip" => Ok(Self::PackedZip),
            other => Err(ClientError::ParamError(format!("Unknown result kind: {}", other))),
        }
    }
}

/// Result links of a `DONE` task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLinks {
    pub plain_text: String,
    pub packed_zip: String,
}

/// View-model row: a ledger entry joined with its current status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    pub request: UploadRequest,
    pub status: TaskStatus,
}

impl UploadTask {
    pub fn new(request: UploadRequest, status: TaskStatus) -> Self {
        Self { request, status }
    }

    pub fn id(&self) -> &RequestId {
        &self.request.id
    }

    pub fn file_name(&self) -> &str {
        &self.request.file_name
    }

    pub fn started(&self) -> DateTime<Utc> {
        self.request.started
    }

    /// Result links, present only once the backend reports `DONE`
    pub fn download_links(&self, base_url: &str) -> Option<DownloadLinks> {
        if !self.status.is_done() {
            return None;
        }

        Some(DownloadLinks {
            plain_text: crate::api::result_url(base_url, self.id(), ResultKind::PlainText),
            packed_zip: crate::api::result_url(base_url, self.id(), ResultKind::PackedZip),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Msgpack,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Msgpack => "msgpack",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "msgpack" => Ok(Self::Msgpack),
            other => Err(ClientError::ParamError(format!("Unknown output format: {}", other))),
        }
    }
}

pub const DEFAULT_TIMEOUT_SEC: u32 = 900;

/// Extraction options attached to an upload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadTaskSettings {
    pub language: Option<String>,
    pub ocr_enable: bool,
    pub output_format: OutputFormat,
    pub convert_to_pdf_timeout_sec: u32,
    pub pdf_to_images_timeout_sec: u32,
}

impl Default for UploadTaskSettings {
    fn default() -> Self {
        Self {
            language: None,
            ocr_enable: true,
            output_format: OutputFormat::Json,
            convert_to_pdf_timeout_sec: DEFAULT_TIMEOUT_SEC,
            pdf_to_images_timeout_sec: DEFAULT_TIMEOUT_SEC,
        }
    }
}

impl UploadTaskSettings {
    /// Flattened form fields, in submission order
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::with_capacity(5);
        if let Some(language) = self.language.as_deref().filter(|l| !l.is_empty()) {
            fields.push(("language", language.to_string()));
        }
        fields.push(("ocr_enable", self.ocr_enable.to_string()));
        fields.push(("output_format", self.output_format.as_str().to_string()));
        fields.push(("convert_to_pdf_timeout_sec", self.convert_to_pdf_timeout_sec.to_string()));
        fields.push(("pdf_to_images_timeout_sec", self.pdf_to_images_timeout_sec.to_string()));
        fields
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum SortField {
    #[serde(rename = "started")]
    Started,
    #[serde(rename = "fileName")]
    FileName,
    #[serde(rename = "status")]
    Status,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::FileName => "fileName",
            Self::Status => "status",
        }
    }

    /// Direction used when the UI leaves the order unspecified
    pub fn default_direction(&self) -> SortDirection {
        match self {
            Self::Started => SortDirection::Desc,
            Self::FileName | Self::Status => SortDirection::Asc,
        }
    }
}

impl FromStr for SortField {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(Self::Started),
            "fileName" | "file_name" | "file" => Ok(Self::FileName),
            "status" => Ok(Self::Status),
            other => Err(ClientError::ParamError(format!("Unknown sort field: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Sort-order token coming from the table widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascend,
    Descend,
    Unspecified,
}

impl SortOrder {
    /// Anything but `ascend`/`descend` counts as unspecified
    pub fn from_token(token: &str) -> Self {
        match token {
            "ascend" | "asc" => Self::Ascend,
            "descend" | "desc" => Self::Descend,
            _ => Self::Unspecified,
        }
    }

    pub fn resolve(&self, field: SortField) -> SortDirection {
        match self {
            Self::Ascend => SortDirection::Asc,
            Self::Descend => SortDirection::Desc,
            Self::Unspecified => field.default_direction(),
        }
    }
}

/// Notifications published to every subscriber of the context
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A file was accepted by the backend and recorded locally
    Uploaded {
        request: UploadRequest,
    },

    /// A new task view replaced the previous one
    ViewCommitted {
        sequence: u64,
        rows: usize,
        tasks_pending: u64,
    },

    /// A refresh failed and the previous view was kept
    RefreshFailed {
        sequence: u64,
        error: String,
    },
}
