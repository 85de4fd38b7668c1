//! Terminal rendering of the task view

mod table;
mod watch;

pub use table::{pager_line, render_ledger, render_view, task_rows, total_pages, TaskRow};
pub use watch::{run_watch, WatchKey};
