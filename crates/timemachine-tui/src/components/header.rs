//! Header component: 2-row top bar.
//!
//! Row 1: app title, session state, loaded count, loading spinner.
//! Row 2: backend address and history state, dimmed.
//!
//! Not focusable.

use ratatui::crossterm::event::KeyEvent;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use timemachine_proto::history::PageKind;
use timemachine_proto::session::SessionState;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{C_ACCENT, C_ERROR, C_MUTED, C_PENDING, C_PRIMARY, C_SECONDARY},
};

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub struct Header {
    frame: usize,
}

impl Header {
    pub fn new() -> Self {
        Self { frame: 0 }
    }

    fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.frame % SPINNER_FRAMES.len()]
    }
}

impl Component for Header {
    fn id(&self) -> ComponentId {
        ComponentId::Header
    }

    fn handle_key(&mut self, _key: KeyEvent, _state: &AppState) -> Vec<Action> {
        vec![]
    }

    fn tick(&mut self, state: &AppState) -> Vec<Action> {
        if busy(state) {
            self.frame = self.frame.wrapping_add(1);
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _focused: bool, state: &AppState) {
        frame.render_widget(Clear, area);
        if area.height < 2 {
            frame.render_widget(Paragraph::new(self.build_row1(state)), area);
            return;
        }
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(area);
        frame.render_widget(Paragraph::new(self.build_row1(state)), rows[0]);
        frame.render_widget(Paragraph::new(build_row2(state)), rows[1]);
    }
}

impl Header {
    fn build_row1(&self, state: &AppState) -> Line<'static> {
        let session_color = match state.session {
            SessionState::Authenticated => C_ACCENT,
            SessionState::Authenticating => C_PENDING,
            SessionState::Unauthenticated => C_ERROR,
        };
        let session_label = if state.checking_session {
            "checking session…"
        } else {
            state.session.label()
        };

        let mut spans = vec![
            Span::styled(
                " ♫ timemachine",
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            ),
            Span::styled("  ·  ", Style::default().fg(C_MUTED)),
            Span::styled("● ", Style::default().fg(session_color)),
            Span::styled(session_label, Style::default().fg(C_SECONDARY)),
        ];

        if state.session.is_authenticated() {
            let n = state.tracks().len();
            spans.push(Span::styled("  ·  ", Style::default().fg(C_MUTED)));
            spans.push(Span::styled(
                format!("{} track{} loaded", n, if n == 1 { "" } else { "s" }),
                Style::default().fg(C_SECONDARY),
            ));
            if !state.playlists.is_empty() {
                spans.push(Span::styled(
                    format!(", {} playlists", state.playlists.len()),
                    Style::default().fg(C_MUTED),
                ));
            }
        }

        if busy(state) {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                format!("{} {}", self.spinner(), busy_label(state)),
                Style::default().fg(C_PENDING),
            ));
        }
        Line::from(spans)
    }
}

fn build_row2(state: &AppState) -> Line<'static> {
    let mut spans = vec![Span::styled(
        format!(" backend {}", state.backend_url),
        Style::default().fg(C_MUTED),
    )];
    if state.session.is_authenticated() && state.history.is_exhausted() {
        spans.push(Span::styled(
            "  ·  full history loaded",
            Style::default().fg(C_MUTED),
        ));
    }
    Line::from(spans)
}

fn busy(state: &AppState) -> bool {
    state.checking_session || state.history.in_flight() || state.playlists_loading
}

fn busy_label(state: &AppState) -> &'static str {
    if state.checking_session {
        return "connecting";
    }
    match state.history.pending().map(|req| req.kind) {
        Some(PageKind::Initial) | Some(PageKind::Prefetch) => "loading history",
        Some(PageKind::More) => "loading more",
        None => "loading playlists",
    }
}
