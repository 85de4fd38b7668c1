use std::io::{self, Write};
use std::time::Duration;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::Print,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use tokio::sync::mpsc;
use crate::core::{Result, SortDirection, SortField, SortOrder};
use crate::sync::TaskSynchronizer;
use super::table::{render_view, total_pages};

const HELP: &str = "q quit | n/p page | s sort | o order | r refresh";

/// Keys the live view reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKey {
    Quit,
    NextPage,
    PrevPage,
    CycleSort,
    ToggleOrder,
    Refresh,
}

impl WatchKey {
    pub fn from_event(key: KeyEvent) -> Option<Self> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Self::Quit),
            KeyCode::Char('q') | KeyCode::Esc => Some(Self::Quit),
            KeyCode::Char('n') | KeyCode::Right | KeyCode::PageDown => Some(Self::NextPage),
            KeyCode::Char('p') | KeyCode::Left | KeyCode::PageUp => Some(Self::PrevPage),
            KeyCode::Char('s') => Some(Self::CycleSort),
            KeyCode::Char('o') => Some(Self::ToggleOrder),
            KeyCode::Char('r') => Some(Self::Refresh),
            _ => None,
        }
    }
}

fn next_sort_field(field: SortField) -> SortField {
    match field {
        SortField::Started => SortField::FileName,
        SortField::FileName => SortField::Status,
        SortField::Status => SortField::Started,
    }
}

/// Restores the terminal even when the loop bails out early
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, Hide)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Key reader on a blocking thread; stops once the receiver is gone
fn spawn_key_reader() -> mpsc::Receiver<WatchKey> {
    let (key_tx, key_rx) = mpsc::channel(16);

    tokio::task::spawn_blocking(move || {
        while !key_tx.is_closed() {
            match event::poll(Duration::from_millis(100)) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    tracing::debug!(error = %err, "Terminal poll failed");
                    break;
                }
            }

            if let Ok(Event::Key(key)) = event::read() {
                if let Some(key) = WatchKey::from_event(key) {
                    if key_tx.blocking_send(key).is_err() {
                        break;
                    }
                }
            }
        }
    });

    key_rx
}

fn draw(synchronizer: &TaskSynchronizer, base_url: &str, status: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    queue!(stdout, MoveTo(0, 0), Clear(ClearType::All))?;

    render_view(&mut stdout, &synchronizer.snapshot(), base_url)?;
    queue!(stdout, Print("\r\n"), Print(HELP), Print("\r\n"))?;
    if !status.is_empty() {
        queue!(stdout, Print(status), Print("\r\n"))?;
    }
    stdout.flush()
}

async fn handle_key(synchronizer: &TaskSynchronizer, key: WatchKey) -> Result<()> {
    let state = synchronizer.state().await?;

    match key {
        WatchKey::Quit => {}
        WatchKey::NextPage => {
            let last = total_pages(synchronizer.snapshot().total, state.page_size) as u32;
            if state.page < last {
                synchronizer.update_page(state.page + 1, state.page_size).await?;
            }
        }
        WatchKey::PrevPage => {
            if state.page > 1 {
                synchronizer.update_page(state.page - 1, state.page_size).await?;
            }
        }
        WatchKey::CycleSort => {
            synchronizer
                .update_sorting(next_sort_field(state.sort_field), SortOrder::Unspecified)
                .await?;
        }
        WatchKey::ToggleOrder => {
            let order = match state.sort_direction {
                SortDirection::Asc => SortOrder::Descend,
                SortDirection::Desc => SortOrder::Ascend,
            };
            synchronizer.update_sorting(state.sort_field, order).await?;
        }
        WatchKey::Refresh => {
            synchronizer.refresh().await?;
        }
    }

    Ok(())
}

/// Live task table; redraws on every committed view until `q`
pub async fn run_watch(synchronizer: &TaskSynchronizer, base_url: &str) -> Result<()> {
    let _guard = TerminalGuard::enter()?;
    let mut key_rx = spawn_key_reader();
    let mut view_rx = synchronizer.subscribe();
    let mut status = String::new();

    synchronizer.request_refresh().await?;
    draw(synchronizer, base_url, &status)?;

    loop {
        tokio::select! {
            changed = view_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                status.clear();
            }
            key = key_rx.recv() => match key {
                Some(WatchKey::Quit) | None => break,
                Some(key) => {
                    // Failures are shown and the previous view stays
                    if let Err(err) = handle_key(synchronizer, key).await {
                        status = format!("Refresh failed: {}", err);
                    }
                }
            },
        }

        draw(synchronizer, base_url, &status)?;
    }

    Ok(())
}
