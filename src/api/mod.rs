//! HTTP access to the extraction service.

mod client;
pub mod dto;

pub use client::{ExtractionClient, TASKS_PATH, parse_request_id, result_url};
