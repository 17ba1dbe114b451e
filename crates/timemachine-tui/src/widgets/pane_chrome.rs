//! PaneChrome: standardized bordered pane with focus styling and badges.

use crate::theme::{
    style_focused_border, style_unfocused_border, C_MUTED, C_PRIMARY, C_SECONDARY,
};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders},
};

/// Shown in the top-right of the pane header (e.g. "LOADING", "END").
pub struct Badge<'a> {
    pub text: &'a str,
    pub color: Color,
}

/// Bordered pane with a title, an optional dimmed subtitle and an optional
/// badge.
pub fn pane_chrome<'a>(
    title: &'a str,
    subtitle: Option<String>,
    focused: bool,
    badge: Option<Badge<'a>>,
) -> Block<'a> {
    let border_style = if focused {
        style_focused_border()
    } else {
        style_unfocused_border()
    };
    let title_style = if focused {
        Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(C_MUTED)
    };

    let mut title_spans = vec![Span::styled(format!(" {} ", title), title_style)];
    if let Some(sub) = subtitle {
        title_spans.push(Span::styled(
            format!("{} ", sub),
            Style::default().fg(C_SECONDARY),
        ));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Line::from(title_spans));

    match badge {
        Some(b) => block.title_top(
            Line::from(Span::styled(
                format!(" {} ", b.text),
                Style::default().fg(b.color).add_modifier(Modifier::BOLD),
            ))
            .right_aligned(),
        ),
        None => block,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::layout::Rect;

    #[test]
    fn test_pane_is_bordered_on_all_sides() {
        let block = pane_chrome("listening history", None, true, None);
        assert_eq!(block.inner(Rect::new(0, 0, 20, 10)), Rect::new(1, 1, 18, 8));
    }
}
