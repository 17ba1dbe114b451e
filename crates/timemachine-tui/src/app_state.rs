//! AppState: shared read-only data passed to all components during render/event.
//!
//! Components read this, never mutate it.  The App event loop is the only
//! writer.

use timemachine_proto::history::HistoryLoader;
use timemachine_proto::protocol::{Playlist, Track};
use timemachine_proto::session::SessionState;

pub struct AppState {
    // ── Session ─────────────────────────────────────────────────────────────
    pub session: SessionState,
    /// Authorization URL handed out by the backend while a login is pending.
    pub auth_url: Option<String>,
    /// Where the browser will be sent back to.
    pub redirect_uri: String,
    /// Startup `/auth/status` has not answered yet.
    pub checking_session: bool,

    // ── History ─────────────────────────────────────────────────────────────
    pub history: HistoryLoader,

    // ── Playlists ───────────────────────────────────────────────────────────
    pub playlists: Vec<Playlist>,
    pub playlists_loading: bool,

    // ── Backend ─────────────────────────────────────────────────────────────
    pub backend_url: String,
}

impl AppState {
    pub fn tracks(&self) -> &[Track] {
        self.history.tracks()
    }

    pub fn track(&self, idx: usize) -> Option<&Track> {
        self.history.tracks().get(idx)
    }

    /// A first page (or refresh) is on its way and nothing is shown yet.
    pub fn initial_loading(&self) -> bool {
        self.history.in_flight() && self.history.tracks().is_empty()
    }
}
