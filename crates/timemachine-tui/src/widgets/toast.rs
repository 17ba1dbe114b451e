//! Notification center: transient status messages in the top-right corner.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use timemachine_proto::config::NotificationConfig;

use crate::theme::{C_TOAST_ERROR, C_TOAST_INFO, C_TOAST_SUCCESS, C_TOAST_WARNING};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

pub type NotificationId = u64;

#[derive(Debug, Clone)]
struct Notification {
    message: String,
    severity: Severity,
    /// `None` stays until dismissed.
    expires: Option<Instant>,
}

/// A persistent spinner line that animates until resolved.
struct Spinner {
    message: String,
    frame: usize,
}

const SPINNER_FRAMES: &[&str] = &["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

pub struct NotificationCenter {
    items: BTreeMap<NotificationId, Notification>,
    next_id: NotificationId,
    spinner: Option<Spinner>,
    duration: Duration,
    max_visible: usize,
}

impl NotificationCenter {
    pub fn new(config: &NotificationConfig) -> Self {
        Self {
            items: BTreeMap::new(),
            next_id: 1,
            spinner: None,
            duration: config.duration(),
            max_visible: config.max_visible.max(1),
        }
    }

    pub fn push(&mut self, message: impl Into<String>, severity: Severity) -> NotificationId {
        self.push_at(message, severity, self.duration, Instant::now())
    }

    /// Ids grow monotonically, so map order is arrival order.  A zero
    /// `duration` keeps the notification until `dismiss`.
    pub fn push_at(
        &mut self,
        message: impl Into<String>,
        severity: Severity,
        duration: Duration,
        now: Instant,
    ) -> NotificationId {
        let message = message.into();
        self.items.retain(|_, n| n.message != message);

        let id = self.next_id;
        self.next_id += 1;
        self.items.insert(
            id,
            Notification {
                message,
                severity,
                expires: (!duration.is_zero()).then(|| now + duration),
            },
        );

        while self.items.len() > self.max_visible * 2 {
            self.items.pop_first();
        }
        id
    }

    pub fn info(&mut self, message: impl Into<String>) -> NotificationId {
        self.push(message, Severity::Info)
    }

    pub fn success(&mut self, message: impl Into<String>) -> NotificationId {
        self.push(message, Severity::Success)
    }

    pub fn warning(&mut self, message: impl Into<String>) -> NotificationId {
        self.push(message, Severity::Warning)
    }

    pub fn error(&mut self, message: impl Into<String>) -> NotificationId {
        self.push(message, Severity::Error)
    }

    /// Returns false if `id` was already gone.
    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        self.items.remove(&id).is_some()
    }

    /// Drop the newest notification.
    pub fn dismiss_latest(&mut self) -> bool {
        self.items.pop_last().is_some()
    }

    /// Start or replace the spinner line.
    pub fn spinner(&mut self, message: impl Into<String>) {
        self.spinner = Some(Spinner {
            message: message.into(),
            frame: 0,
        });
    }

    pub fn dismiss_spinner(&mut self) {
        self.spinner = None;
    }

    /// Remove expired notifications and advance the spinner. Call each tick.
    pub fn tick(&mut self) {
        self.expire_at(Instant::now());
        if let Some(ref mut s) = self.spinner {
            s.frame = (s.frame + 1) % SPINNER_FRAMES.len();
        }
    }

    pub fn expire_at(&mut self, now: Instant) {
        self.items
            .retain(|_, n| n.expires.map_or(true, |expires| expires > now));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.spinner.is_none()
    }

    /// Messages, oldest first.
    pub fn messages(&self) -> impl Iterator<Item = (&str, Severity)> {
        self.items.values().map(|n| (n.message.as_str(), n.severity))
    }

    /// Render in the top-right corner of `area`, newest on top.
    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        if self.is_empty() {
            return;
        }
        let max_width = (area.width / 2).clamp(30.min(area.width), 60);
        let mut y = area.y + 1;

        if let Some(ref s) = self.spinner {
            let icon = SPINNER_FRAMES[s.frame % SPINNER_FRAMES.len()];
            draw_line(frame, area, y, max_width, icon, &s.message, C_TOAST_INFO);
            y += 1;
        }

        for n in self.items.values().rev().take(self.max_visible) {
            if y >= area.y + area.height {
                break;
            }
            let (icon, color) = match n.severity {
                Severity::Info => ("·", C_TOAST_INFO),
                Severity::Success => ("✓", C_TOAST_SUCCESS),
                Severity::Warning => ("!", C_TOAST_WARNING),
                Severity::Error => ("✗", C_TOAST_ERROR),
            };
            draw_line(frame, area, y, max_width, icon, &n.message, color);
            y += 1;
        }
    }
}

fn draw_line(
    frame: &mut Frame,
    area: Rect,
    y: u16,
    max_width: u16,
    icon: &str,
    message: &str,
    color: ratatui::style::Color,
) {
    if y >= area.y + area.height {
        return;
    }
    let w = (message.width() as u16 + 4).min(max_width);
    let x = area.x + area.width.saturating_sub(w + 1);
    let toast_area = Rect {
        x,
        y,
        width: w,
        height: 1,
    };
    frame.render_widget(Clear, toast_area);
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            format!(" {} {} ", icon, message),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))),
        toast_area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn center() -> NotificationCenter {
        NotificationCenter::new(&NotificationConfig::default())
    }

    #[test]
    fn test_expires_after_duration() {
        let mut c = center();
        let t0 = Instant::now();
        c.push_at("Failed to load history", Severity::Error, Duration::from_secs(5), t0);
        c.expire_at(t0 + Duration::from_millis(4999));
        assert_eq!(c.len(), 1);
        c.expire_at(t0 + Duration::from_secs(5));
        assert_eq!(c.len(), 0);
    }

    #[test]
    fn test_zero_duration_is_sticky() {
        let mut c = center();
        let t0 = Instant::now();
        let id = c.push_at("stay", Severity::Warning, Duration::ZERO, t0);
        c.expire_at(t0 + Duration::from_secs(3600));
        assert_eq!(c.len(), 1);
        assert!(c.dismiss(id));
        assert!(!c.dismiss(id));
        assert!(c.is_empty());
    }

    #[test]
    fn test_identical_message_replaces() {
        let mut c = center();
        let first = c.info("No more tracks");
        let second = c.info("No more tracks");
        assert_ne!(first, second);
        assert_eq!(c.len(), 1);
        assert!(!c.dismiss(first));
    }

    #[test]
    fn test_cap_drops_oldest() {
        let mut c = NotificationCenter::new(&NotificationConfig {
            duration_ms: 5000,
            max_visible: 2,
        });
        for i in 0..6 {
            c.info(format!("message {}", i));
        }
        let kept: Vec<&str> = c.messages().map(|(m, _)| m).collect();
        assert_eq!(kept, vec!["message 2", "message 3", "message 4", "message 5"]);
    }

    #[test]
    fn test_default_duration_from_config() {
        let mut c = center();
        c.success("Logged out successfully");
        let (msg, severity) = c.messages().next().unwrap();
        assert_eq!(msg, "Logged out successfully");
        assert_eq!(severity, Severity::Success);
        c.expire_at(Instant::now() + Duration::from_millis(5001));
        assert!(c.is_empty());
    }

    #[test]
    fn test_spinner_keeps_center_non_empty() {
        let mut c = center();
        c.spinner("Waiting for browser login…");
        assert!(!c.is_empty());
        c.tick();
        c.dismiss_spinner();
        assert!(c.is_empty());
    }
}
