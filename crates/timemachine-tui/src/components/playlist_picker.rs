//! PlaylistPicker component: overlay for adding the selected track to a
//! playlist.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseEvent, MouseEventKind};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    components::help_overlay::centered_rect,
    theme::{
        style_muted, style_section, style_selected_focused, C_ARTIST, C_OVERLAY_BG,
        C_PANEL_BORDER_FOCUSED, C_PRIMARY, C_SECONDARY,
    },
    widgets::scrollable_list::ScrollableList,
};

/// Rows above the playlist list: title, blank, track, artist, blank, section.
const HEADER_ROWS: u16 = 6;

pub struct PlaylistPicker {
    track: Option<usize>,
    list: ScrollableList,
}

impl PlaylistPicker {
    pub fn new() -> Self {
        Self {
            track: None,
            list: ScrollableList::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.track.is_some()
    }

    fn open(&mut self, track: usize) {
        self.track = Some(track);
        self.list.reset();
    }

    fn close(&mut self) {
        self.track = None;
    }

    fn choose(&mut self) -> Vec<Action> {
        match (self.track, self.list.selected()) {
            (Some(track), Some(playlist)) => {
                vec![Action::ClosePicker, Action::AddToPlaylist { track, playlist }]
            }
            _ => vec![],
        }
    }
}

impl Component for PlaylistPicker {
    fn id(&self) -> ComponentId {
        ComponentId::PlaylistPicker
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release || !self.is_open() {
            return vec![];
        }
        self.list.set_len(state.playlists.len());
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return vec![Action::ClosePicker],
            KeyCode::Up | KeyCode::Char('k') => self.list.select_up(1),
            KeyCode::Down | KeyCode::Char('j') => self.list.select_down(1),
            KeyCode::Home | KeyCode::Char('g') => self.list.select_first(),
            KeyCode::End | KeyCode::Char('G') => self.list.select_last(),
            KeyCode::Enter => return self.choose(),
            _ => {}
        }
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, state: &AppState) -> Vec<Action> {
        self.list.set_len(state.playlists.len());
        match event.kind {
            MouseEventKind::ScrollUp => self.list.select_up(1),
            MouseEventKind::ScrollDown => self.list.select_down(1),
            _ => {}
        }
        vec![]
    }

    fn on_action(&mut self, action: &Action, state: &AppState) -> Vec<Action> {
        match action {
            Action::OpenPicker(idx) if state.track(*idx).is_some() => self.open(*idx),
            Action::ClosePicker | Action::Logout => self.close(),
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _focused: bool, state: &AppState) {
        let Some(track) = self.track.and_then(|i| state.track(i)) else {
            return;
        };
        self.list.set_len(state.playlists.len());

        let list_rows = state.playlists.len().clamp(1, 12) as u16;
        let popup = centered_rect(60, HEADER_ROWS + list_rows + 4, area);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(C_PANEL_BORDER_FOCUSED))
            .style(Style::default().bg(C_OVERLAY_BG));
        let inner = block.inner(popup);
        frame.render_widget(Clear, popup);
        frame.render_widget(block, popup);

        let mut lines = vec![
            Line::from(Span::styled(
                " Add to playlist",
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                format!(" {}", track.track_name),
                Style::default().fg(C_PRIMARY),
            )),
            Line::from(Span::styled(
                format!(" {}", track.artist_name),
                Style::default().fg(C_ARTIST),
            )),
            Line::from(""),
            Line::from(Span::styled(" playlists", style_section())),
        ];

        if state.playlists.is_empty() {
            let msg = if state.playlists_loading {
                " loading playlists…"
            } else {
                " No playlists found"
            };
            lines.push(Line::from(Span::styled(msg, style_muted())));
        } else {
            let rows = inner.height.saturating_sub(HEADER_ROWS + 2) as usize;
            self.list.ensure_visible(rows);
            let selected = self.list.selected();
            for idx in self.list.visible_range(rows) {
                let p = &state.playlists[idx];
                let is_selected = selected == Some(idx);
                let marker = if is_selected { "▸ " } else { "  " };
                let name_style = if is_selected {
                    style_selected_focused()
                } else {
                    Style::default().fg(C_PRIMARY)
                };
                let mut spans = vec![
                    Span::styled(format!(" {}", marker), name_style),
                    Span::styled(p.name.clone(), name_style),
                ];
                if let Some(total) = p.track_count() {
                    spans.push(Span::styled(
                        format!("  {} tracks", total),
                        Style::default().fg(C_SECONDARY),
                    ));
                }
                lines.push(Line::from(spans));
            }
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            " enter add · esc cancel",
            style_muted(),
        )));
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;
    use timemachine_proto::config::HistoryConfig;
    use timemachine_proto::history::HistoryLoader;
    use timemachine_proto::protocol::{Playlist, Track};
    use timemachine_proto::session::SessionState;

    fn state_with(playlists: usize) -> AppState {
        let mut history = HistoryLoader::new(&HistoryConfig::default());
        if let Some(req) = history.begin_initial() {
            let track = Track {
                artist_name: "Khruangbin".into(),
                track_name: "Texas Sun".into(),
                end_time: chrono::Utc::now(),
                ms_played: None,
                album_art_url: None,
            };
            history.apply_page(req, Ok(vec![track]));
        }
        AppState {
            session: SessionState::Authenticated,
            auth_url: None,
            redirect_uri: String::new(),
            checking_session: false,
            history,
            playlists: (0..playlists)
                .map(|i| Playlist {
                    id: format!("pl-{}", i),
                    name: format!("Playlist {}", i),
                    images: None,
                    tracks: None,
                })
                .collect(),
            playlists_loading: false,
            backend_url: String::new(),
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_enter_adds_selected_playlist() {
        let state = state_with(3);
        let mut picker = PlaylistPicker::new();
        picker.on_action(&Action::OpenPicker(0), &state);
        assert!(picker.is_open());

        picker.handle_key(key(KeyCode::Down), &state);
        picker.handle_key(key(KeyCode::Down), &state);
        let actions = picker.handle_key(key(KeyCode::Enter), &state);
        assert!(matches!(actions[0], Action::ClosePicker));
        assert!(matches!(
            actions[1],
            Action::AddToPlaylist {
                track: 0,
                playlist: 2
            }
        ));
    }

    #[test]
    fn test_no_playlists_adds_nothing() {
        let state = state_with(0);
        let mut picker = PlaylistPicker::new();
        picker.on_action(&Action::OpenPicker(0), &state);
        assert!(picker.handle_key(key(KeyCode::Enter), &state).is_empty());
    }

    #[test]
    fn test_unknown_track_does_not_open() {
        let state = state_with(2);
        let mut picker = PlaylistPicker::new();
        picker.on_action(&Action::OpenPicker(7), &state);
        assert!(!picker.is_open());
    }
}
