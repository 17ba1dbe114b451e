//! Action enum: all user-initiated intents and internal events.

/// Unique identifier for a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    Header,
    LoginPanel,
    HistoryTable,
    PlaylistPicker,
    HelpOverlay,
}

/// All actions that can flow through the system.
/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone)]
pub enum Action {
    // ── History ──────────────────────────────────────────────────────────────
    /// Reload history and playlists from the newest page.
    Refresh,
    /// The end-of-list marker came into view.
    LoadMore,

    // ── Playlists ────────────────────────────────────────────────────────────
    /// Open the playlist picker for the track at this index.
    OpenPicker(usize),
    ClosePicker,
    /// Add track `track` to playlist `playlist` (both indices into AppState).
    AddToPlaylist { track: usize, playlist: usize },

    // ── Session ──────────────────────────────────────────────────────────────
    Login,
    Logout,
    /// Open the pending authorization URL in the browser again.
    OpenAuthUrl,
    /// Stop waiting for the redirect.
    CancelLogin,

    // ── UI toggles ───────────────────────────────────────────────────────────
    ToggleHelp,
    CopyToClipboard(String),
    DismissNotification,

    // ── System ───────────────────────────────────────────────────────────────
    Quit,
    Resize(u16, u16),
}
