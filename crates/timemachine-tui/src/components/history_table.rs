//! HistoryTable component: the listening history, newest first.
//!
//! The last row is the end-of-list marker: "loading more…" while a page is in
//! flight, "no more tracks" once history is exhausted, blank otherwise.  The
//! scroll trigger watches whether that row is on screen.

use std::time::Instant;

use chrono::Local;
use ratatui::crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, Table},
    Frame,
};

use timemachine_proto::history::PageKind;
use timemachine_proto::protocol::Track;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    scroll_trigger::Viewport,
    theme::{
        style_muted, style_selected, style_selected_focused, C_ARTIST, C_MUTED, C_PENDING,
        C_PRIMARY, C_ROW_NUMBER, C_SECONDARY, C_TIMESTAMP,
    },
    widgets::{
        pane_chrome::{pane_chrome, Badge},
        scrollable_list::ScrollableList,
    },
};

pub struct HistoryTable {
    list: ScrollableList,
    /// Rows available for tracks in the last draw (header excluded).
    page_rows: usize,
    viewport: Viewport,
    last_click: Option<(usize, Instant)>,
}

impl HistoryTable {
    pub fn new() -> Self {
        Self {
            list: ScrollableList::new(),
            page_rows: 10,
            viewport: Viewport::default(),
            last_click: None,
        }
    }

    /// What was on screen in the last draw, marker row included.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn selected(&self) -> Option<usize> {
        self.list.selected()
    }

    /// Back to the top, for a new session.
    pub fn reset(&mut self) {
        self.list.reset();
        self.viewport = Viewport::default();
        self.last_click = None;
    }

    fn sync(&mut self, state: &AppState) {
        self.list.set_len(state.tracks().len());
    }

    fn selected_track<'a>(&self, state: &'a AppState) -> Option<&'a Track> {
        self.list.selected().and_then(|i| state.track(i))
    }
}

impl Component for HistoryTable {
    fn id(&self) -> ComponentId {
        ComponentId::HistoryTable
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        self.sync(state);

        let step = if key.modifiers.contains(KeyModifiers::SHIFT) {
            5
        } else {
            1
        };
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.list.select_up(step),
            KeyCode::Down | KeyCode::Char('j') => self.list.select_down(step),
            KeyCode::PageUp => self.list.select_up(self.page_rows.max(1)),
            KeyCode::PageDown => self.list.select_down(self.page_rows.max(1)),
            KeyCode::Home | KeyCode::Char('g') => self.list.select_first(),
            KeyCode::End | KeyCode::Char('G') => self.list.select_last(),
            KeyCode::Enter | KeyCode::Char('a') => {
                if let Some(idx) = self.list.selected() {
                    return vec![Action::OpenPicker(idx)];
                }
            }
            KeyCode::Char('y') => {
                if let Some(track) = self.selected_track(state) {
                    return vec![Action::CopyToClipboard(track.display())];
                }
            }
            _ => {}
        }
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, area: Rect, state: &AppState) -> Vec<Action> {
        self.sync(state);
        // border + column header
        let rel_row = event.row.saturating_sub(area.y + 2) as usize;
        match event.kind {
            MouseEventKind::ScrollUp => self.list.select_up(1),
            MouseEventKind::ScrollDown => self.list.select_down(1),
            MouseEventKind::Down(MouseButton::Left) => {
                let now = Instant::now();
                let is_double = self
                    .last_click
                    .map(|(row, t)| row == rel_row && t.elapsed().as_millis() < 400)
                    .unwrap_or(false);
                if event.row >= area.y + 2 && self.list.handle_click(rel_row) && is_double {
                    self.last_click = None;
                    if let Some(idx) = self.list.selected() {
                        return vec![Action::OpenPicker(idx)];
                    }
                } else {
                    self.last_click = Some((rel_row, now));
                }
            }
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        self.sync(state);
        let tracks = state.tracks();
        let in_flight_kind = state.history.pending().map(|r| r.kind);

        let badge = match in_flight_kind {
            Some(PageKind::More) => Some(Badge {
                text: "LOADING",
                color: C_PENDING,
            }),
            _ if state.history.is_exhausted() => Some(Badge {
                text: "END",
                color: C_MUTED,
            }),
            _ => None,
        };
        let subtitle = (!tracks.is_empty()).then(|| format!("· {}", tracks.len()));
        let block = pane_chrome("listening history", subtitle, focused, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if tracks.is_empty() {
            self.viewport = Viewport::default();
            let msg = if state.initial_loading() {
                "  Loading your listening history…"
            } else {
                "  No listening history found."
            };
            frame.render_widget(Paragraph::new(Span::styled(msg, style_muted())), inner);
            return;
        }

        let rows_h = inner.height.saturating_sub(1) as usize;
        self.page_rows = rows_h;
        self.list.ensure_visible(rows_h);
        let range = self.list.visible_range(rows_h);
        let selected = self.list.selected();

        let mut rows: Vec<Row> = range
            .clone()
            .map(|idx| track_row(idx, &tracks[idx], selected == Some(idx), focused))
            .collect();

        // Marker row directly after the last track.
        if range.end == tracks.len() && rows.len() < rows_h {
            let marker = match in_flight_kind {
                Some(PageKind::More) => {
                    Span::styled("loading more…", Style::default().fg(C_PENDING))
                }
                Some(_) => Span::styled("loading…", Style::default().fg(C_PENDING)),
                None if state.history.is_exhausted() => {
                    Span::styled("no more tracks", style_muted())
                }
                None => Span::raw(""),
            };
            rows.push(Row::new(vec![Cell::from(""), Cell::from(Line::from(marker))]));
        }

        self.viewport = Viewport {
            scroll_offset: self.list.scroll_offset,
            rows: rows_h,
            row_count: tracks.len() + 1,
        };

        let header = Row::new(vec!["#", "Title", "Listened on", "Played"])
            .style(Style::default().fg(C_MUTED).add_modifier(Modifier::BOLD));
        let table = Table::new(
            rows,
            [
                Constraint::Length(6),
                Constraint::Min(20),
                Constraint::Length(17),
                Constraint::Length(7),
            ],
        )
        .header(header)
        .column_spacing(1);
        frame.render_widget(table, inner);
    }
}

fn track_row(idx: usize, track: &Track, is_selected: bool, focused: bool) -> Row<'static> {
    let title_style = if is_selected {
        Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(C_PRIMARY)
    };
    let title = Line::from(vec![
        Span::styled(track.track_name.clone(), title_style),
        Span::styled("  ", Style::default()),
        Span::styled(track.artist_name.clone(), Style::default().fg(C_ARTIST)),
    ]);
    let row = Row::new(vec![
        Cell::from(Span::styled(
            format!("{:>5}", idx + 1),
            Style::default().fg(C_ROW_NUMBER),
        )),
        Cell::from(title),
        Cell::from(Span::styled(
            listened_on(track),
            Style::default().fg(C_TIMESTAMP),
        )),
        Cell::from(Span::styled(
            played(track.ms_played),
            Style::default().fg(C_SECONDARY),
        )),
    ]);
    match (is_selected, focused) {
        (true, true) => row.style(style_selected_focused()),
        (true, false) => row.style(style_selected()),
        _ => row,
    }
}

/// End time in the local zone.
fn listened_on(track: &Track) -> String {
    track
        .end_time
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

fn played(ms: Option<u64>) -> String {
    match ms {
        Some(ms) => {
            let secs = ms / 1000;
            format!("{}:{:02}", secs / 60, secs % 60)
        }
        None => "–".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_played_formatting() {
        assert_eq!(played(Some(252_000)), "4:12");
        assert_eq!(played(Some(59_999)), "0:59");
        assert_eq!(played(Some(3_600_000)), "60:00");
        assert_eq!(played(None), "–");
    }
}
