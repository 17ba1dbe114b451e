//! Selection and scroll bookkeeping for a list whose rows live elsewhere.
//!
//! The rows themselves (tracks, playlists) are owned by `AppState`; the list
//! only tracks how many there are, which one is selected and which slice is
//! on screen.

#[derive(Debug, Default, Clone)]
pub struct ScrollableList {
    pub selected: usize,
    pub scroll_offset: usize,
    len: usize,
}

impl ScrollableList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the row count, clamping the selection.  Rows appended at the end
    /// keep the current selection and scroll position.
    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
        if self.scroll_offset >= len {
            self.scroll_offset = len.saturating_sub(1);
        }
    }

    pub fn reset(&mut self) {
        self.selected = 0;
        self.scroll_offset = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn selected(&self) -> Option<usize> {
        (self.selected < self.len).then_some(self.selected)
    }

    pub fn select_up(&mut self, n: usize) {
        if self.len == 0 {
            return;
        }
        self.selected = self.selected.saturating_sub(n);
    }

    pub fn select_down(&mut self, n: usize) {
        if self.len == 0 {
            return;
        }
        self.selected = (self.selected + n).min(self.len - 1);
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        self.scroll_offset = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.len.saturating_sub(1);
    }

    /// Move `scroll_offset` so the selection is inside a `height`-row window.
    pub fn ensure_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if self.selected >= self.scroll_offset + height {
            self.scroll_offset = self.selected + 1 - height;
        }
    }

    /// Index range on screen for a `height`-row window.
    pub fn visible_range(&self, height: usize) -> std::ops::Range<usize> {
        let start = self.scroll_offset.min(self.len);
        let end = (self.scroll_offset + height).min(self.len);
        start..end
    }

    /// Row of the selection inside the window.
    pub fn selected_in_view(&self) -> usize {
        self.selected.saturating_sub(self.scroll_offset)
    }

    /// Select the row clicked at `row` inside the window.
    /// Returns true if it hit a row.
    pub fn handle_click(&mut self, row: usize) -> bool {
        let target = self.scroll_offset + row;
        if target < self.len {
            self.selected = target;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_follows_selection() {
        let mut l = ScrollableList::new();
        l.set_len(100);
        l.select_down(25);
        l.ensure_visible(10);
        assert_eq!(l.scroll_offset, 16);
        assert_eq!(l.visible_range(10), 16..26);
        assert_eq!(l.selected_in_view(), 9);

        l.select_up(20);
        l.ensure_visible(10);
        assert_eq!(l.scroll_offset, 5);
    }

    #[test]
    fn test_append_keeps_position() {
        let mut l = ScrollableList::new();
        l.set_len(50);
        l.select_last();
        l.ensure_visible(20);
        let offset = l.scroll_offset;
        l.set_len(100);
        assert_eq!(l.selected(), Some(49));
        assert_eq!(l.scroll_offset, offset);
        l.select_down(1);
        assert_eq!(l.selected(), Some(50));
    }

    #[test]
    fn test_shrink_clamps() {
        let mut l = ScrollableList::new();
        l.set_len(30);
        l.select_last();
        l.ensure_visible(10);
        l.set_len(0);
        assert_eq!(l.selected(), None);
        assert_eq!(l.visible_range(10), 0..0);
        l.select_down(3);
        assert_eq!(l.selected, 0);
    }

    #[test]
    fn test_click_outside_rows() {
        let mut l = ScrollableList::new();
        l.set_len(3);
        assert!(l.handle_click(2));
        assert_eq!(l.selected(), Some(2));
        assert!(!l.handle_click(5));
    }
}
