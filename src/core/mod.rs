mod errors;
mod store;
mod traits;
mod types;

pub use errors::{ClientError, Result};
pub use store::{FileStore, MemoryStore};
pub use traits::{ExtractionBackend, KeyValueStore, UploadSource};
pub use types::{
    ClientEvent,
    DownloadLinks,
    OutputFormat,
    RequestId,
    ResultKind,
    SortDirection,
    SortField,
    SortOrder,
    TaskStatus,
    UploadRequest,
    UploadTask,
    UploadTaskSettings,
    DEFAULT_TIMEOUT_SEC,
};
