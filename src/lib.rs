pub mod api;
pub mod config;
pub mod context;
pub mod core;
pub mod sync;
pub mod tracking;
pub mod ui;
pub mod uploader;
pub mod utils;

pub use api::ExtractionClient;
pub use config::Config;
pub use context::AppContext;
pub use core::{
    ClientError,
    ClientEvent,
    ExtractionBackend,
    RequestId,
    Result,
    TaskStatus,
    UploadRequest,
    UploadTask,
    UploadTaskSettings,
};
pub use sync::{RefreshOutcome, TaskSynchronizer, TaskView};
pub use tracking::{Ledger, SettingsStore};
pub use uploader::UploadSubmitter;

#[cfg(test)]
mod testing;
