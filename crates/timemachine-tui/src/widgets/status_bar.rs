//! Status bar: bottom line with the current mode and keybindings.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use timemachine_proto::session::SessionState;

use crate::theme::{C_ACCENT, C_MUTED, C_PENDING, C_SECONDARY};

/// Which key set the bar advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeysMode {
    Session(SessionState),
    Picker,
    Help,
}

impl KeysMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Session(SessionState::Authenticated) => "HISTORY",
            Self::Session(SessionState::Authenticating) => "LOGIN",
            Self::Session(SessionState::Unauthenticated) => "SIGNED OUT",
            Self::Picker => "PLAYLIST",
            Self::Help => "HELP",
        }
    }

    pub fn color(self) -> Color {
        match self {
            Self::Session(SessionState::Authenticated) => C_ACCENT,
            Self::Session(SessionState::Authenticating) | Self::Picker => C_PENDING,
            Self::Session(SessionState::Unauthenticated) | Self::Help => C_SECONDARY,
        }
    }

    fn keys(self) -> &'static str {
        match self {
            Self::Session(SessionState::Authenticated) => {
                " ↑↓/jk select  PgUp/PgDn page  g/G top/bottom  Enter/a add to playlist  y copy  r refresh  L logout  ? help  q quit"
            }
            Self::Session(SessionState::Authenticating) => {
                " o open browser again  y copy login url  Esc cancel  ? help  q quit"
            }
            Self::Session(SessionState::Unauthenticated) => " l log in  ? help  q quit",
            Self::Picker => " ↑↓/jk select  Enter add  Esc cancel",
            Self::Help => " ? or Esc close",
        }
    }
}

/// Draw the keybindings footer bar (one row).
pub fn draw_keys_bar(frame: &mut Frame, area: Rect, mode: KeysMode) {
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", mode.label()),
            Style::default().fg(mode.color()).add_modifier(Modifier::BOLD),
        ),
        Span::styled(mode.keys(), Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
