use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// No response was received at all
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server error: status code {status_code}, message: {message}")]
    ServerError {
        status_code: u16,
        message: String,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Param error: {0}")]
    ParamError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Synchronizer shut down")]
    Shutdown,
}

impl ClientError {
    pub fn server_error(status_code: u16, message: impl Into<String>) -> Self {
        Self::ServerError {
            status_code,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }

    /// Short label of the failure category, used as a log field
    pub fn category(&self) -> &'static str {
        match self {
            Self::Transport(err) if err.is_decode() => "malformed_response",
            Self::Transport(_) => "transport",
            Self::ServerError { .. } => "server",
            Self::MalformedResponse(_) | Self::Json(_) => "malformed_response",
            Self::Io(_) | Self::Storage(_) => "storage",
            Self::Config(_) | Self::ParamError(_) => "param",
            Self::InternalError(_) | Self::Shutdown => "internal",
        }
    }
}

/// Error alias
pub type Result<T, E = ClientError> = std::result::Result<T, E>;
