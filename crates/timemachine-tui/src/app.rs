//! App: component-based event loop.
//!
//! - `App` owns all components and `AppState` (shared read-only data for components).
//! - A `tokio::mpsc` channel carries `AppMessage`s in: terminal events from a
//!   blocking reader task, and the result of every backend call from the
//!   task that made it.
//! - The loop draws, evaluates the scroll trigger, then awaits the next message.
//! - Components return `Vec<Action>`; App dispatches each Action.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use anyhow::Context;
use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use timemachine_proto::client::BackendClient;
use timemachine_proto::config::Config;
use timemachine_proto::error::{ApiError, FailureKind};
use timemachine_proto::history::{HistoryLoader, LoadOutcome, PageKind, PageRequest};
use timemachine_proto::protocol::{Playlist, Track};
use timemachine_proto::session::{SessionEvent, SessionState};

use crate::{
    action::Action,
    app_state::AppState,
    callback::{CallbackListener, RedirectOutcome},
    component::Component,
    components::{
        header::Header, help_overlay::HelpOverlay, history_table::HistoryTable,
        login_panel::LoginPanel, playlist_picker::PlaylistPicker,
    },
    scroll_trigger::ScrollTrigger,
    widgets::{
        status_bar::{self, KeysMode},
        toast::NotificationCenter,
    },
};

// ── Internal event bus ────────────────────────────────────────────────────────

pub enum AppMessage {
    Event(Event),
    AuthStatus(Result<bool, ApiError>),
    AuthUrl(Result<String, ApiError>),
    Redirect(RedirectOutcome),
    CodeExchanged(Result<(), ApiError>),
    HistoryPage(PageRequest, Result<Vec<Track>, ApiError>),
    /// Playlists fetched for loader generation `.0`.
    Playlists(u64, Result<Vec<Playlist>, ApiError>),
    Added {
        track_name: String,
        result: Result<Option<String>, ApiError>,
    },
    LoggedOut(Result<(), ApiError>),
}

pub struct App {
    state: AppState,
    config: Config,
    client: BackendClient,

    tx: mpsc::Sender<AppMessage>,
    rx: Option<mpsc::Receiver<AppMessage>>,

    // ── Components ────────────────────────────────────────────────────────────
    header: Header,
    login_panel: LoginPanel,
    history_table: HistoryTable,
    playlist_picker: PlaylistPicker,
    help_overlay: HelpOverlay,

    toast: NotificationCenter,
    trigger: ScrollTrigger,
    callback: Option<CallbackListener>,

    /// Where the body pane was drawn last frame, for mouse routing.
    body_area: Rect,
    /// "No more tracks" has been announced in this session.
    exhausted_notified: bool,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config, client: BackendClient) -> Self {
        let (tx, rx) = mpsc::channel::<AppMessage>(256);
        let state = AppState {
            session: SessionState::Unauthenticated,
            auth_url: None,
            redirect_uri: config.auth.redirect_uri(),
            checking_session: true,
            history: HistoryLoader::new(&config.history),
            playlists: Vec::new(),
            playlists_loading: false,
            backend_url: client.base_url().to_string(),
        };
        Self {
            state,
            toast: NotificationCenter::new(&config.notifications),
            trigger: ScrollTrigger::new(config.history.trigger_lookahead_rows),
            config,
            client,
            tx,
            rx: Some(rx),
            header: Header::new(),
            login_panel: LoginPanel::new(),
            history_table: HistoryTable::new(),
            playlist_picker: PlaylistPicker::new(),
            help_overlay: HelpOverlay::new(),
            callback: None,
            body_area: Rect::default(),
            exhausted_notified: false,
            should_quit: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut rx = self.rx.take().context("App::run called twice")?;

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        // ── Background task: keyboard/mouse events ────────────────────────────
        let event_tx = self.tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Startup session check ─────────────────────────────────────────────
        let client = self.client.clone();
        self.spawn(async move { AppMessage::AuthStatus(client.auth_status().await) });

        // Notification expiry + spinner animation.
        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        let result = loop {
            if needs_redraw {
                if let Err(e) = terminal.draw(|f| self.draw(f)) {
                    break Err(e.into());
                }
                needs_redraw = self.check_scroll_trigger();
            }

            if self.should_quit {
                break Ok(());
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    needs_redraw |= self.handle_message(msg).await;
                    // Drain whatever else is queued before the next frame.
                    while let Ok(next) = rx.try_recv() {
                        needs_redraw |= self.handle_message(next).await;
                    }
                }

                _ = ui_tick.tick() => {
                    self.toast.tick();
                    let actions = self.header.tick(&self.state);
                    self.dispatch_all(actions);
                    needs_redraw = true;
                }
            }

            if self.should_quit {
                break Ok(());
            }
        };

        // ── Teardown ──────────────────────────────────────────────────────────
        self.callback = None;
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
        info!("timemachine exiting");
        result
    }

    /// Run a backend call on its own task and feed the result back.
    fn spawn<F>(&self, fut: F)
    where
        F: std::future::Future<Output = AppMessage> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let msg = fut.await;
            if tx.send(msg).await.is_err() {
                debug!("app loop gone, dropping backend result");
            }
        });
    }

    // ── Message handling ──────────────────────────────────────────────────────

    /// Returns true when a redraw is needed.
    async fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(ev) => match ev {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        return false;
                    }
                    let actions = self.handle_key(key);
                    self.dispatch_all(actions);
                }
                Event::Mouse(mouse) => {
                    let actions = self.handle_mouse(mouse);
                    self.dispatch_all(actions);
                }
                Event::Resize(w, h) => self.dispatch(Action::Resize(w, h)),
                _ => return false,
            },

            AppMessage::AuthStatus(result) => self.on_auth_status(result),
            AppMessage::AuthUrl(result) => self.on_auth_url(result).await,
            AppMessage::Redirect(outcome) => self.on_redirect(outcome),
            AppMessage::CodeExchanged(result) => self.on_code_exchanged(result),
            AppMessage::HistoryPage(req, result) => self.on_history_page(req, result),
            AppMessage::Playlists(generation, result) => self.on_playlists(generation, result),
            AppMessage::Added { track_name, result } => self.on_added(&track_name, result),
            AppMessage::LoggedOut(result) => self.on_logged_out(result),
        }
        true
    }

    fn on_auth_status(&mut self, result: Result<bool, ApiError>) {
        self.state.checking_session = false;
        match result {
            Ok(authenticated) => {
                info!("[session] backend reports authenticated={}", authenticated);
                if self.state.session.on(SessionEvent::StatusChecked { authenticated })
                    && authenticated
                {
                    self.load_data();
                }
            }
            Err(e) => {
                warn!("[session] status check failed: {}", e);
                self.toast
                    .warning(format!("Cannot reach backend at {}", self.state.backend_url));
            }
        }
    }

    async fn on_auth_url(&mut self, result: Result<String, ApiError>) {
        if self.state.session != SessionState::Authenticating {
            debug!("[session] auth url arrived after login was abandoned");
            return;
        }
        let url = match result {
            Ok(url) => url,
            Err(e) => {
                warn!("[session] GET /auth failed: {}", e);
                self.fail_login("Failed to get auth URL".to_string());
                return;
            }
        };

        let auth = &self.config.auth;
        let mut listener = match CallbackListener::bind(&auth.redirect_bind, &auth.callback_path).await {
            Ok(l) => l,
            Err(e) => {
                warn!("[session] {}", e);
                self.fail_login(e.to_string());
                return;
            }
        };
        if let Some(outcome) = listener.take_outcome() {
            let tx = self.tx.clone();
            tokio::spawn(async move {
                // Dropped sender means the login was cancelled.
                if let Ok(outcome) = outcome.await {
                    let _ = tx.send(AppMessage::Redirect(outcome)).await;
                }
            });
        }
        self.callback = Some(listener);
        self.state.auth_url = Some(url);
        if self.config.auth.open_browser {
            self.open_auth_url();
        }
    }

    fn on_redirect(&mut self, outcome: RedirectOutcome) {
        self.callback = None;
        if self.state.session != SessionState::Authenticating {
            return;
        }
        match outcome {
            RedirectOutcome::Code(code) => {
                let client = self.client.clone();
                self.spawn(async move { AppMessage::CodeExchanged(client.exchange_code(&code).await) });
            }
            RedirectOutcome::Denied(reason) => {
                self.fail_login(format!("Authentication failed: {}", reason));
            }
            RedirectOutcome::Empty => {
                self.fail_login("Authentication failed".to_string());
            }
        }
    }

    fn on_code_exchanged(&mut self, result: Result<(), ApiError>) {
        match result {
            Ok(()) => {
                if self.state.session.on(SessionEvent::LoginSucceeded) {
                    self.state.auth_url = None;
                    self.toast.dismiss_spinner();
                    self.toast.success("Logged in");
                    self.load_data();
                }
            }
            Err(e) => {
                warn!("[session] code exchange failed: {}", e);
                self.fail_login(e.user_message("Authentication failed"));
            }
        }
    }

    fn fail_login(&mut self, message: String) {
        self.callback = None;
        self.state.auth_url = None;
        self.toast.dismiss_spinner();
        if self.state.session.on(SessionEvent::LoginFailed) {
            self.toast.error(message);
        }
    }

    fn on_history_page(&mut self, req: PageRequest, result: Result<Vec<Track>, ApiError>) {
        match self.state.history.apply_page(req, result) {
            LoadOutcome::Prefetch(next) => self.fetch_page(next),
            LoadOutcome::Loaded { kind, appended } => {
                debug!("[history] {:?} page appended {}", kind, appended);
            }
            LoadOutcome::Exhausted { .. } => {
                if !self.exhausted_notified {
                    self.exhausted_notified = true;
                    self.toast.info("No more tracks");
                }
            }
            LoadOutcome::Failed { kind, error } => {
                let fallback = match kind {
                    PageKind::Initial | PageKind::Prefetch => "Failed to load history",
                    PageKind::More => {
                        self.trigger.disarm();
                        "Failed to load more tracks"
                    }
                };
                self.toast.error(error.user_message(fallback));
            }
            LoadOutcome::Stale | LoadOutcome::Skipped => {}
        }
    }

    fn on_playlists(&mut self, generation: u64, result: Result<Vec<Playlist>, ApiError>) {
        if generation != self.state.history.generation() {
            debug!("[playlists] discarding result from generation {}", generation);
            return;
        }
        self.state.playlists_loading = false;
        match result {
            Ok(playlists) => {
                info!("[playlists] {} playlists", playlists.len());
                self.state.playlists = playlists;
            }
            Err(e) => {
                warn!("[playlists] load failed: {}", e);
                self.toast.error(e.user_message("Failed to load playlists"));
            }
        }
    }

    fn on_added(&mut self, track_name: &str, result: Result<Option<String>, ApiError>) {
        match result {
            Ok(_) => {
                self.toast
                    .success(format!("Successfully added \"{}\" to playlist!", track_name));
            }
            Err(e) => {
                warn!("[playlists] add {:?} failed: {}", track_name, e);
                let message = match e.kind() {
                    FailureKind::Application => e.user_message("Failed to add track"),
                    FailureKind::Transport => "Failed to add track to playlist".to_string(),
                };
                self.toast.error(message);
            }
        }
    }

    fn on_logged_out(&mut self, result: Result<(), ApiError>) {
        match result {
            Ok(()) => {
                if self.state.session.on(SessionEvent::LoggedOut) {
                    self.state.history.reset();
                    self.history_table.reset();
                    self.state.playlists.clear();
                    self.state.playlists_loading = false;
                    self.exhausted_notified = false;
                    self.toast.info("Logged out successfully");
                }
            }
            Err(e) => {
                warn!("[session] logout failed: {}", e);
                self.toast.error("Failed to logout");
            }
        }
    }

    // ── Backend calls ─────────────────────────────────────────────────────────

    /// First history page and playlists, fetched concurrently.
    fn load_data(&mut self) {
        // Keep what is on screen until the new first page lands.
        self.state.history.invalidate();
        self.trigger.rearm();
        if let Some(req) = self.state.history.begin_initial() {
            self.fetch_page(req);
        }

        self.state.playlists_loading = true;
        let generation = self.state.history.generation();
        let client = self.client.clone();
        self.spawn(async move { AppMessage::Playlists(generation, client.playlists().await) });
    }

    fn fetch_page(&self, req: PageRequest) {
        let client = self.client.clone();
        self.spawn(async move { AppMessage::HistoryPage(req, client.history(req.before).await) });
    }

    fn check_scroll_trigger(&mut self) -> bool {
        if !self.state.session.is_authenticated() {
            return false;
        }
        let view = self.history_table.viewport();
        if self
            .trigger
            .should_fire(view, self.state.history.can_load_more())
        {
            debug!("[history] end of list in view: {:?}", view);
            self.dispatch(Action::LoadMore);
            return true;
        }
        false
    }

    fn open_auth_url(&mut self) {
        let Some(url) = self.state.auth_url.clone() else {
            return;
        };
        if let Err(e) = webbrowser::open(&url) {
            warn!("[session] cannot open browser: {}", e);
            self.toast
                .warning("Could not open a browser, copy the login link with y");
        }
    }

    // ── Input ─────────────────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return vec![Action::Quit];
        }

        // Overlays capture all keys while open.
        if self.help_overlay.visible {
            return self.help_overlay.handle_key(key, &self.state);
        }
        if self.playlist_picker.is_open() {
            return self.playlist_picker.handle_key(key, &self.state);
        }

        match key.code {
            KeyCode::Char('q') => return vec![Action::Quit],
            KeyCode::Char('?') => return vec![Action::ToggleHelp],
            KeyCode::Char('x') => return vec![Action::DismissNotification],
            _ => {}
        }

        if self.state.session.is_authenticated() {
            match key.code {
                KeyCode::Char('r') => return vec![Action::Refresh],
                KeyCode::Char('L') => return vec![Action::Logout],
                _ => {}
            }
            self.trigger.rearm();
            self.history_table.handle_key(key, &self.state)
        } else {
            self.login_panel.handle_key(key, &self.state)
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> Vec<Action> {
        if self.help_overlay.visible {
            return vec![];
        }
        if self.playlist_picker.is_open() {
            return self
                .playlist_picker
                .handle_mouse(mouse, self.body_area, &self.state);
        }
        if !self.state.session.is_authenticated() {
            return vec![];
        }
        let inside = self
            .body_area
            .contains(Position::new(mouse.column, mouse.row));
        let is_scroll = matches!(
            mouse.kind,
            MouseEventKind::ScrollUp | MouseEventKind::ScrollDown
        );
        if inside || is_scroll {
            self.trigger.rearm();
            return self
                .history_table
                .handle_mouse(mouse, self.body_area, &self.state);
        }
        vec![]
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    fn dispatch_all(&mut self, actions: Vec<Action>) {
        for action in actions {
            self.dispatch(action);
        }
    }

    /// Apply `action`, then let every component react to it.  Follow-up
    /// actions are processed in order.
    fn dispatch(&mut self, action: Action) {
        let mut queue = VecDeque::from([action]);
        while let Some(action) = queue.pop_front() {
            self.apply(&action);
            let s = &self.state;
            let components: [&mut dyn Component; 5] = [
                &mut self.header,
                &mut self.login_panel,
                &mut self.history_table,
                &mut self.playlist_picker,
                &mut self.help_overlay,
            ];
            for component in components {
                let follow = component.on_action(&action, s);
                if !follow.is_empty() {
                    debug!("{:?} -> {:?}", component.id(), follow);
                }
                queue.extend(follow);
            }
        }
    }

    fn apply(&mut self, action: &Action) {
        match action {
            Action::Refresh => {
                if self.state.session.is_authenticated() {
                    info!("[history] refresh");
                    self.load_data();
                }
            }
            Action::LoadMore => {
                if let Some(req) = self.state.history.begin_more() {
                    self.fetch_page(req);
                }
            }
            Action::AddToPlaylist { track, playlist } => {
                let (Some(t), Some(p)) = (
                    self.state.track(*track).cloned(),
                    self.state.playlists.get(*playlist).cloned(),
                ) else {
                    return;
                };
                info!("[playlists] adding {} to {}", t.display(), p.name);
                let client = self.client.clone();
                self.spawn(async move {
                    let result = client
                        .add_to_playlist(&p.id, &t.artist_name, &t.track_name)
                        .await;
                    AppMessage::Added {
                        track_name: t.track_name,
                        result,
                    }
                });
            }
            Action::Login => {
                if self.state.session.on(SessionEvent::LoginStarted) {
                    self.toast.spinner("Waiting for browser login…");
                    let client = self.client.clone();
                    self.spawn(async move { AppMessage::AuthUrl(client.auth_url().await) });
                }
            }
            Action::OpenAuthUrl => self.open_auth_url(),
            Action::CancelLogin => {
                if self.state.session == SessionState::Authenticating {
                    self.callback = None;
                    self.state.auth_url = None;
                    self.toast.dismiss_spinner();
                    self.state.session.on(SessionEvent::LoginFailed);
                    self.toast.info("Login cancelled");
                }
            }
            Action::Logout => {
                if self.state.session.is_authenticated() {
                    let client = self.client.clone();
                    self.spawn(async move { AppMessage::LoggedOut(client.logout().await) });
                }
            }
            Action::CopyToClipboard(text) => {
                match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text.clone())) {
                    Ok(()) => {
                        let display = if text.chars().count() > 40 {
                            format!("{}…", text.chars().take(40).collect::<String>())
                        } else {
                            text.clone()
                        };
                        self.toast.success(format!("copied: {}", display));
                    }
                    Err(e) => {
                        warn!("clipboard error: {}", e);
                        self.toast.error(format!("clipboard error: {}", e));
                    }
                }
            }
            Action::DismissNotification => {
                self.toast.dismiss_latest();
            }
            Action::Quit => self.should_quit = true,
            Action::OpenPicker(_)
            | Action::ClosePicker
            | Action::ToggleHelp
            | Action::Resize(_, _) => {}
        }
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        use crate::theme::C_BG;
        use ratatui::widgets::Block;
        let area = frame.area();

        frame.render_widget(
            Block::default().style(ratatui::style::Style::default().bg(C_BG)),
            area,
        );

        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);
        let (header_area, body_area, status_area) = (outer[0], outer[1], outer[2]);
        self.body_area = body_area;

        self.header.draw(frame, header_area, false, &self.state);

        if self.state.session.is_authenticated() {
            let focused = !self.playlist_picker.is_open() && !self.help_overlay.visible;
            self.history_table
                .draw(frame, body_area, focused, &self.state);
        } else {
            self.login_panel.draw(frame, body_area, true, &self.state);
        }

        let mode = if self.help_overlay.visible {
            KeysMode::Help
        } else if self.playlist_picker.is_open() {
            KeysMode::Picker
        } else {
            KeysMode::Session(self.state.session)
        };
        status_bar::draw_keys_bar(frame, status_area, mode);

        // ── Overlays ──────────────────────────────────────────────────────────
        self.playlist_picker.draw(frame, area, true, &self.state);
        self.help_overlay.draw(frame, area, false, &self.state);
        self.toast.draw(frame, area);
    }
}
