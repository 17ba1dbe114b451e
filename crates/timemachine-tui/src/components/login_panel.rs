//! LoginPanel component: shown instead of the history while signed out or
//! while a browser login is pending.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use timemachine_proto::session::SessionState;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{style_muted, C_ACCENT, C_LINK, C_PENDING, C_PRIMARY, C_SECONDARY},
    widgets::pane_chrome::pane_chrome,
};

pub struct LoginPanel;

impl LoginPanel {
    pub fn new() -> Self {
        Self
    }
}

impl Component for LoginPanel {
    fn id(&self) -> ComponentId {
        ComponentId::LoginPanel
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release || state.checking_session {
            return vec![];
        }
        match (state.session, key.code) {
            (SessionState::Unauthenticated, KeyCode::Char('l') | KeyCode::Enter) => {
                vec![Action::Login]
            }
            (SessionState::Authenticating, KeyCode::Char('o') | KeyCode::Enter) => {
                vec![Action::OpenAuthUrl]
            }
            (SessionState::Authenticating, KeyCode::Char('y')) => state
                .auth_url
                .clone()
                .map(Action::CopyToClipboard)
                .into_iter()
                .collect(),
            (SessionState::Authenticating, KeyCode::Esc) => vec![Action::CancelLogin],
            _ => vec![],
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let block = pane_chrome("sign in", None, focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let title = Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD);
        let mut lines = vec![Line::from(""), Line::from("")];

        if state.checking_session {
            lines.push(Line::from(Span::styled("Checking session…", style_muted())));
        } else {
            match state.session {
                SessionState::Unauthenticated | SessionState::Authenticated => {
                    lines.push(Line::from(Span::styled("Listening history time machine", title)));
                    lines.push(Line::from(""));
                    lines.push(Line::from(Span::styled(
                        "Connect your streaming account to browse what you played",
                        Style::default().fg(C_SECONDARY),
                    )));
                    lines.push(Line::from(Span::styled(
                        "and add tracks back to your playlists.",
                        Style::default().fg(C_SECONDARY),
                    )));
                    lines.push(Line::from(""));
                    lines.push(Line::from(vec![
                        Span::styled("press ", style_muted()),
                        Span::styled("l", Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD)),
                        Span::styled(" to log in", style_muted()),
                    ]));
                }
                SessionState::Authenticating => {
                    lines.push(Line::from(Span::styled(
                        "Waiting for authorization in your browser…",
                        Style::default().fg(C_PENDING).add_modifier(Modifier::BOLD),
                    )));
                    lines.push(Line::from(""));
                    match &state.auth_url {
                        Some(url) => {
                            lines.push(Line::from(Span::styled(
                                "If no browser opened, visit:",
                                style_muted(),
                            )));
                            lines.push(Line::from(Span::styled(url.clone(), Style::default().fg(C_LINK))));
                        }
                        None => {
                            lines.push(Line::from(Span::styled(
                                "Requesting login link…",
                                style_muted(),
                            )));
                        }
                    }
                    lines.push(Line::from(""));
                    lines.push(Line::from(Span::styled(
                        format!("redirect  {}", state.redirect_uri),
                        style_muted(),
                    )));
                    lines.push(Line::from(""));
                    lines.push(Line::from(Span::styled(
                        "o open again · y copy link · esc cancel",
                        style_muted(),
                    )));
                }
            }
        }

        frame.render_widget(
            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            inner,
        );
    }
}
