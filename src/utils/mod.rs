pub mod format;
pub mod logging;

pub use format::{format_bytes, format_datetime};
pub use logging::init_tracing;
