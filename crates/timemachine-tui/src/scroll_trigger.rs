//! Fires `LoadMore` when the end-of-list marker of the history table is on
//! screen.
//!
//! The check is level-triggered and runs after every draw.  Duplicate
//! requests are the loader's problem (its in-flight guard), not the
//! trigger's.  After a failed page the trigger disarms until the user scrolls
//! or the marker leaves the viewport, so a failure is never retried behind
//! the user's back.

/// What the history table showed in its last draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub scroll_offset: usize,
    pub rows: usize,
    /// Track rows plus the end-of-list marker row.
    pub row_count: usize,
}

#[derive(Debug)]
pub struct ScrollTrigger {
    lookahead: usize,
    armed: bool,
}

impl ScrollTrigger {
    pub fn new(lookahead: usize) -> Self {
        Self {
            lookahead,
            armed: true,
        }
    }

    pub fn marker_visible(&self, view: Viewport) -> bool {
        view.rows > 0 && view.scroll_offset + view.rows + self.lookahead >= view.row_count
    }

    /// `loader_allows` is the loader's own guard (tracks loaded, nothing in
    /// flight, not exhausted).
    pub fn should_fire(&mut self, view: Viewport, loader_allows: bool) -> bool {
        if !self.marker_visible(view) {
            self.armed = true;
            return false;
        }
        self.armed && loader_allows
    }

    /// Hold fire until the next scroll.
    pub fn disarm(&mut self) {
        self.armed = false;
    }

    pub fn rearm(&mut self) {
        self.armed = true;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}
