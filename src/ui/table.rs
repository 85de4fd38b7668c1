use std::io::{self, Write};
use crossterm::{
    queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
};
use crate::core::{DownloadLinks, TaskStatus, UploadRequest};
use crate::sync::TaskView;
use crate::utils::format_datetime;

const HEADERS: [&str; 4] = ["ID", "STATUS", "FILE", "STARTED"];
const GAP: &str = "  ";

/// One rendered task line plus its result links
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub cells: [String; 4],
    pub status: TaskStatus,
    pub links: Option<DownloadLinks>,
}

pub fn task_rows(view: &TaskView, base_url: &str) -> Vec<TaskRow> {
    view.tasks
        .iter()
        .map(|task| TaskRow {
            cells: [
                task.id().short().to_string(),
                task.status.to_string(),
                task.file_name().to_string(),
                format_datetime(&task.started()),
            ],
            status: task.status.clone(),
            links: task.download_links(base_url),
        })
        .collect()
}

pub fn total_pages(total: usize, page_size: u32) -> usize {
    let page_size = page_size.max(1) as usize;
    total.div_ceil(page_size).max(1)
}

/// `Page 2/5 | 42 tracked | sorted by started desc`
pub fn pager_line(view: &TaskView) -> String {
    let state = view.state;
    let mut line = format!(
        "Page {}/{} | {} tracked | sorted by {} {}",
        state.page,
        total_pages(view.total, state.page_size),
        view.total,
        state.sort_field.as_str(),
        state.sort_direction.as_str(),
    );

    if let Some(refreshed_at) = &view.refreshed_at {
        line.push_str(&format!(" | updated {}", format_datetime(refreshed_at)));
    }
    line
}

fn status_color(status: &TaskStatus) -> Color {
    match status {
        TaskStatus::Done => Color::Green,
        TaskStatus::Pending => Color::Yellow,
        TaskStatus::Failure => Color::Red,
        TaskStatus::Other(_) => Color::Grey,
    }
}

fn column_widths(rows: &[TaskRow]) -> [usize; 4] {
    let mut widths = HEADERS.map(|h| h.len());
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(&row.cells) {
            *width = (*width).max(cell.chars().count());
        }
    }
    widths
}

fn pad(cell: &str, width: usize) -> String {
    format!("{:<width$}", cell, width = width)
}

/// Render the task view as a table, lines end with `\r\n` so the output is
/// also correct in raw mode
pub fn render_view<W: Write>(out: &mut W, view: &TaskView, base_url: &str) -> io::Result<()> {
    if view.tasks_pending > 0 {
        queue!(
            out,
            SetForegroundColor(Color::Black),
            SetBackgroundColor(Color::Yellow),
            Print(format!(" {} pending ", view.tasks_pending)),
            ResetColor,
            Print("\r\n"),
        )?;
    }

    let rows = task_rows(view, base_url);
    if rows.is_empty() {
        queue!(out, Print("No tasks yet\r\n"))?;
    } else {
        let widths = column_widths(&rows);

        let header: Vec<_> = HEADERS.iter().zip(widths).map(|(h, w)| pad(h, w)).collect();
        queue!(
            out,
            SetAttribute(Attribute::Bold),
            Print(header.join(GAP).trim_end()),
            SetAttribute(Attribute::Reset),
            Print("\r\n"),
        )?;

        for row in &rows {
            let [id, status, file, started] = &row.cells;
            queue!(
                out,
                Print(pad(id, widths[0])),
                Print(GAP),
                SetForegroundColor(status_color(&row.status)),
                Print(pad(status, widths[1])),
                ResetColor,
                Print(GAP),
                Print(pad(file, widths[2])),
                Print(GAP),
                Print(started),
                Print("\r\n"),
            )?;

            match &row.links {
                Some(links) => queue!(
                    out,
                    Print(format!("    txt {}\r\n", links.plain_text)),
                    Print(format!("    zip {}\r\n", links.packed_zip)),
                )?,
                None => queue!(out, Print("    -\r\n"))?,
            }
        }
    }

    queue!(out, Print(pager_line(view)), Print("\r\n"))?;
    out.flush()
}

/// Plain listing of ledger entries, in insertion order
pub fn render_ledger<W: Write>(out: &mut W, requests: &[UploadRequest]) -> io::Result<()> {
    if requests.is_empty() {
        writeln!(out, "No tracked requests")?;
        return Ok(());
    }

    for request in requests {
        writeln!(
            out,
            "{}  {}  {}",
            request.id,
            format_datetime(&request.started),
            request.file_name
        )?;
    }
    out.flush()
}
