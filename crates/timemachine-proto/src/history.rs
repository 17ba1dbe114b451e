//! Incremental loading of the listening history.
//!
//! The loader owns the loaded tracks and the pagination bookkeeping.  Each
//! fetch is split in two: `begin_*` checks the guards and marks the loader in
//! flight, `apply_page` takes the response back.  The HTTP call itself happens
//! in between, usually on a spawned task, so the UI loop never blocks on it.

use tracing::{debug, info, warn};

use crate::client::BackendClient;
use crate::config::HistoryConfig;
use crate::error::ApiError;
use crate::protocol::Track;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// First page of a fresh load.
    Initial,
    /// Eager second page of the initial load.
    Prefetch,
    /// Page requested by scrolling.
    More,
}

/// A page fetch the loader has committed to.  The response must be handed back
/// together with the request that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub kind: PageKind,
    /// `before` cursor in epoch milliseconds; `None` for the newest page.
    pub before: Option<i64>,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { kind: PageKind, appended: usize },
    /// The first page was full; fetch this one next.  The loader stays in flight.
    Prefetch(PageRequest),
    /// History ended with this page.  Reported once, on the transition.
    Exhausted { kind: PageKind, appended: usize },
    Failed { kind: PageKind, error: ApiError },
    /// Response to a request from before the last reset, or one the loader no
    /// longer waits for.  Nothing changed.
    Stale,
    /// A guard refused the load; no request was made.
    Skipped,
}

#[derive(Debug)]
pub struct HistoryLoader {
    tracks: Vec<Track>,
    exhausted: bool,
    pending: Option<PageRequest>,
    generation: u64,
    prefetch_threshold: usize,
    end_on_short_page: bool,
}

impl HistoryLoader {
    pub fn new(config: &HistoryConfig) -> Self {
        Self {
            tracks: Vec::new(),
            exhausted: false,
            pending: None,
            generation: 0,
            prefetch_threshold: config.prefetch_threshold,
            end_on_short_page: config.end_on_short_page,
        }
    }

    // ── State ───────────────────────────────────────────────────────────────

    /// Loaded tracks, newest first.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Epoch-ms timestamp of the oldest loaded track.
    pub fn cursor(&self) -> Option<i64> {
        self.tracks.last().map(Track::end_time_ms)
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn in_flight(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<PageRequest> {
        self.pending
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `begin_more` would issue a request right now.
    pub fn can_load_more(&self) -> bool {
        !self.in_flight() && !self.exhausted && !self.tracks.is_empty()
    }

    // ── Transitions ─────────────────────────────────────────────────────────

    /// Start a fresh load from the newest page.  Already loaded tracks stay
    /// visible until the new first page arrives.
    pub fn begin_initial(&mut self) -> Option<PageRequest> {
        if self.in_flight() {
            debug!("[history] initial load refused: request in flight");
            return None;
        }
        let req = PageRequest {
            kind: PageKind::Initial,
            before: None,
            generation: self.generation,
        };
        self.pending = Some(req);
        Some(req)
    }

    /// Request the page before the oldest loaded track.  Returns `None` when
    /// a request is in flight, nothing is loaded yet, or history is exhausted.
    pub fn begin_more(&mut self) -> Option<PageRequest> {
        if !self.can_load_more() {
            return None;
        }
        let req = PageRequest {
            kind: PageKind::More,
            before: self.cursor(),
            generation: self.generation,
        };
        self.pending = Some(req);
        Some(req)
    }

    /// Hand back the result of a request issued by `begin_*` or by a previous
    /// `LoadOutcome::Prefetch`.
    pub fn apply_page(
        &mut self,
        req: PageRequest,
        result: Result<Vec<Track>, ApiError>,
    ) -> LoadOutcome {
        if req.generation != self.generation || self.pending != Some(req) {
            debug!(
                "[history] discarding stale {:?} page (generation {} vs {})",
                req.kind, req.generation, self.generation
            );
            return LoadOutcome::Stale;
        }

        let page = match result {
            Ok(page) => page,
            Err(error) => {
                self.pending = None;
                warn!("[history] {:?} page failed: {}", req.kind, error);
                return LoadOutcome::Failed {
                    kind: req.kind,
                    error,
                };
            }
        };

        match req.kind {
            PageKind::Initial => self.apply_first_page(req, page),
            PageKind::Prefetch | PageKind::More => self.apply_next_page(req, page),
        }
    }

    /// Invalidate outstanding requests but keep what is loaded.  A following
    /// `begin_initial` replaces the tracks only once its first page succeeds.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.pending = None;
        debug!("[history] invalidated, now generation {}", self.generation);
    }

    /// Drop everything and invalidate outstanding requests.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.tracks.clear();
        self.exhausted = false;
        self.pending = None;
        debug!("[history] reset to generation {}", self.generation);
    }

    fn apply_first_page(&mut self, req: PageRequest, page: Vec<Track>) -> LoadOutcome {
        let received = page.len();
        self.tracks.clear();
        self.exhausted = false;
        let appended = self.append_in_order(page);
        info!("[history] first page: {} tracks", appended);

        if self.prefetch_threshold > 0 && received >= self.prefetch_threshold {
            if let Some(before) = self.cursor() {
                let next = PageRequest {
                    kind: PageKind::Prefetch,
                    before: Some(before),
                    generation: req.generation,
                };
                self.pending = Some(next);
                return LoadOutcome::Prefetch(next);
            }
        }

        self.pending = None;
        if received > 0 && self.is_short(received) {
            self.exhausted = true;
            info!("[history] short first page, history exhausted");
            return LoadOutcome::Exhausted {
                kind: req.kind,
                appended,
            };
        }
        LoadOutcome::Loaded {
            kind: req.kind,
            appended,
        }
    }

    fn apply_next_page(&mut self, req: PageRequest, page: Vec<Track>) -> LoadOutcome {
        self.pending = None;
        let received = page.len();
        let appended = self.append_in_order(page);
        debug!(
            "[history] {:?} page before={:?}: received {}, appended {}",
            req.kind, req.before, received, appended
        );

        // A page with nothing usable would hand back the same cursor forever.
        if appended == 0 || self.is_short(received) {
            self.exhausted = true;
            info!("[history] exhausted after {} tracks", self.tracks.len());
            return LoadOutcome::Exhausted {
                kind: req.kind,
                appended,
            };
        }
        LoadOutcome::Loaded {
            kind: req.kind,
            appended,
        }
    }

    fn is_short(&self, received: usize) -> bool {
        self.end_on_short_page && self.prefetch_threshold > 0 && received < self.prefetch_threshold
    }

    /// Append in received order, dropping entries that would break the
    /// newest-first ordering or repeat the current oldest play.
    fn append_in_order(&mut self, page: Vec<Track>) -> usize {
        let mut appended = 0;
        for track in page {
            if let Some(oldest) = self.tracks.last() {
                if track.end_time > oldest.end_time || track.same_play(oldest) {
                    warn!(
                        "[history] dropping out-of-order entry {} at {}",
                        track.display(),
                        track.end_time
                    );
                    continue;
                }
            }
            self.tracks.push(track);
            appended += 1;
        }
        appended
    }

    // ── Driving ─────────────────────────────────────────────────────────────

    /// Run a whole initial load, prefetch included, against `client`.
    pub async fn load_initial(&mut self, client: &BackendClient) -> LoadOutcome {
        let Some(req) = self.begin_initial() else {
            return LoadOutcome::Skipped;
        };
        self.drive(client, req).await
    }

    /// Fetch and append the next page, unless a guard refuses it.
    pub async fn load_more(&mut self, client: &BackendClient) -> LoadOutcome {
        let Some(req) = self.begin_more() else {
            return LoadOutcome::Skipped;
        };
        self.drive(client, req).await
    }

    async fn drive(&mut self, client: &BackendClient, mut req: PageRequest) -> LoadOutcome {
        loop {
            let result = client.history(req.before).await;
            match self.apply_page(req, result) {
                LoadOutcome::Prefetch(next) => req = next,
                outcome => return outcome,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const BASE_MS: i64 = 1_709_300_000_000;

    fn track(n: i64) -> Track {
        Track {
            artist_name: format!("Artist {}", n),
            track_name: format!("Track {}", n),
            end_time: Utc.timestamp_millis_opt(BASE_MS - n * 60_000).unwrap(),
            ms_played: Some(180_000),
            album_art_url: None,
        }
    }

    /// Tracks numbered `from..to`, newest first.
    fn page(from: i64, to: i64) -> Vec<Track> {
        (from..to).map(track).collect()
    }

    fn loader() -> HistoryLoader {
        HistoryLoader::new(&HistoryConfig::default())
    }

    fn assert_non_increasing(tracks: &[Track]) {
        for pair in tracks.windows(2) {
            assert!(pair[0].end_time >= pair[1].end_time, "order broken at {:?}", pair[1]);
        }
    }

    #[test]
    fn test_load_more_needs_tracks() {
        let mut l = loader();
        assert!(l.begin_more().is_none());
        assert!(!l.in_flight());
    }

    #[test]
    fn test_full_first_page_prefetches_from_oldest() {
        let mut l = loader();
        let req = l.begin_initial().unwrap();
        assert_eq!(req.before, None);

        let first = page(0, 50);
        let oldest_ms = first[49].end_time_ms();
        let next = match l.apply_page(req, Ok(first)) {
            LoadOutcome::Prefetch(next) => next,
            other => panic!("expected prefetch, got {:?}", other),
        };
        assert_eq!(next.kind, PageKind::Prefetch);
        assert_eq!(next.before, Some(oldest_ms));
        assert!(l.in_flight());
        assert!(l.begin_more().is_none());

        let outcome = l.apply_page(next, Ok(page(50, 100)));
        assert_eq!(
            outcome,
            LoadOutcome::Loaded {
                kind: PageKind::Prefetch,
                appended: 50
            }
        );
        assert_eq!(l.tracks().len(), 100);
        assert_eq!(l.cursor(), Some(track(99).end_time_ms()));
        assert_non_increasing(l.tracks());
        assert!(!l.in_flight());
    }

    #[test]
    fn test_partial_first_page_does_not_prefetch() {
        let mut l = loader();
        let req = l.begin_initial().unwrap();
        let outcome = l.apply_page(req, Ok(page(0, 12)));
        assert_eq!(
            outcome,
            LoadOutcome::Loaded {
                kind: PageKind::Initial,
                appended: 12
            }
        );
        assert!(!l.is_exhausted());
        assert!(l.can_load_more());
    }

    #[test]
    fn test_empty_first_page_is_usable_not_exhausted() {
        let mut l = loader();
        let req = l.begin_initial().unwrap();
        l.apply_page(req, Ok(Vec::new()));
        assert!(l.tracks().is_empty());
        assert!(!l.is_exhausted());
        assert!(l.begin_more().is_none());
        assert!(l.begin_initial().is_some());
    }

    #[test]
    fn test_repeated_load_more_issues_one_request() {
        let mut l = loader();
        let req = l.begin_initial().unwrap();
        l.apply_page(req, Ok(page(0, 10)));

        let first = l.begin_more();
        assert!(first.is_some());
        for _ in 0..5 {
            assert!(l.begin_more().is_none());
        }
        assert_eq!(first.unwrap().before, Some(track(9).end_time_ms()));
    }

    #[test]
    fn test_empty_page_exhausts_once() {
        let mut l = loader();
        let req = l.begin_initial().unwrap();
        l.apply_page(req, Ok(page(0, 10)));

        let more = l.begin_more().unwrap();
        assert_eq!(
            l.apply_page(more, Ok(Vec::new())),
            LoadOutcome::Exhausted {
                kind: PageKind::More,
                appended: 0
            }
        );
        assert!(l.is_exhausted());
        assert!(l.begin_more().is_none());
        assert_eq!(l.tracks().len(), 10);
    }

    #[test]
    fn test_failed_prefetch_keeps_first_page() {
        let mut l = loader();
        let req = l.begin_initial().unwrap();
        let LoadOutcome::Prefetch(next) = l.apply_page(req, Ok(page(0, 50))) else {
            panic!("expected prefetch");
        };
        let outcome = l.apply_page(next, Err(ApiError::Transport("timed out".into())));
        assert!(matches!(
            outcome,
            LoadOutcome::Failed {
                kind: PageKind::Prefetch,
                ..
            }
        ));
        assert_eq!(l.tracks().len(), 50);
        assert!(!l.in_flight());
        assert!(l.can_load_more());
    }

    #[test]
    fn test_failed_initial_load_leaves_empty_usable_state() {
        let mut l = loader();
        let req = l.begin_initial().unwrap();
        let outcome = l.apply_page(req, Err(ApiError::Application(Some("Not authenticated".into()))));
        assert!(matches!(outcome, LoadOutcome::Failed { .. }));
        assert!(l.tracks().is_empty());
        assert!(!l.in_flight());
        assert!(l.begin_initial().is_some());
    }

    #[test]
    fn test_stale_response_after_reset_is_discarded() {
        let mut l = loader();
        let req = l.begin_initial().unwrap();
        l.reset();
        assert_eq!(l.apply_page(req, Ok(page(0, 10))), LoadOutcome::Stale);
        assert!(l.tracks().is_empty());
        assert!(!l.in_flight());
    }

    #[test]
    fn test_unexpected_request_is_stale() {
        let mut l = loader();
        let req = l.begin_initial().unwrap();
        l.apply_page(req, Ok(page(0, 10)));
        // Same request delivered twice.
        assert_eq!(l.apply_page(req, Ok(page(0, 10))), LoadOutcome::Stale);
        assert_eq!(l.tracks().len(), 10);
    }

    #[test]
    fn test_inclusive_boundary_is_dropped() {
        let mut l = loader();
        let req = l.begin_initial().unwrap();
        l.apply_page(req, Ok(page(0, 10)));

        let more = l.begin_more().unwrap();
        // Backend repeats the cursor entry and sneaks in a newer one.
        let mut next = vec![track(9), track(3)];
        next.extend(page(10, 20));
        let outcome = l.apply_page(more, Ok(next));
        assert_eq!(
            outcome,
            LoadOutcome::Loaded {
                kind: PageKind::More,
                appended: 10
            }
        );
        assert_eq!(l.tracks().len(), 20);
        assert_non_increasing(l.tracks());
    }

    #[test]
    fn test_page_of_only_duplicates_ends_history() {
        let mut l = loader();
        let req = l.begin_initial().unwrap();
        l.apply_page(req, Ok(page(0, 10)));
        let more = l.begin_more().unwrap();
        let outcome = l.apply_page(more, Ok(vec![track(9)]));
        assert!(matches!(outcome, LoadOutcome::Exhausted { appended: 0, .. }));
        assert!(l.begin_more().is_none());
    }

    #[test]
    fn test_short_page_ends_history_when_configured() {
        let mut l = HistoryLoader::new(&HistoryConfig {
            end_on_short_page: true,
            ..HistoryConfig::default()
        });
        let req = l.begin_initial().unwrap();
        let LoadOutcome::Prefetch(next) = l.apply_page(req, Ok(page(0, 50))) else {
            panic!("expected prefetch");
        };
        let outcome = l.apply_page(next, Ok(page(50, 70)));
        assert_eq!(
            outcome,
            LoadOutcome::Exhausted {
                kind: PageKind::Prefetch,
                appended: 20
            }
        );
        assert!(l.begin_more().is_none());
    }

    #[test]
    fn test_refresh_replaces_tracks() {
        let mut l = loader();
        let req = l.begin_initial().unwrap();
        l.apply_page(req, Ok(page(5, 15)));
        let more = l.begin_more().unwrap();
        l.apply_page(more, Ok(Vec::new()));
        assert!(l.is_exhausted());

        let again = l.begin_initial().unwrap();
        assert_eq!(l.tracks().len(), 10);
        l.apply_page(again, Ok(page(0, 8)));
        assert_eq!(l.tracks().len(), 8);
        assert!(!l.is_exhausted());
        assert!(l.can_load_more());
    }

    #[test]
    fn test_failed_refresh_keeps_prior_tracks() {
        let mut l = loader();
        let req = l.begin_initial().unwrap();
        l.apply_page(req, Ok(page(0, 10)));
        let more = l.begin_more().unwrap();

        l.invalidate();
        let again = l.begin_initial().unwrap();
        assert_eq!(l.tracks().len(), 10);
        let outcome = l.apply_page(again, Err(ApiError::Transport("connection refused".into())));
        assert!(matches!(
            outcome,
            LoadOutcome::Failed {
                kind: PageKind::Initial,
                ..
            }
        ));
        assert_eq!(l.tracks().len(), 10);
        assert!(l.can_load_more());
        // The scroll request from before the refresh is no longer awaited.
        assert_eq!(l.apply_page(more, Ok(page(10, 20))), LoadOutcome::Stale);
        assert_eq!(l.tracks().len(), 10);
    }

    #[test]
    fn test_refresh_in_flight_response_goes_stale() {
        let mut l = loader();
        let req = l.begin_initial().unwrap();
        l.invalidate();
        let again = l.begin_initial().unwrap();
        assert_eq!(l.apply_page(req, Ok(page(0, 10))), LoadOutcome::Stale);
        assert!(l.in_flight());
        l.apply_page(again, Ok(page(0, 4)));
        assert_eq!(l.tracks().len(), 4);
    }

    #[test]
    fn test_prefetch_disabled() {
        let mut l = HistoryLoader::new(&HistoryConfig {
            prefetch_threshold: 0,
            ..HistoryConfig::default()
        });
        let req = l.begin_initial().unwrap();
        assert!(matches!(
            l.apply_page(req, Ok(page(0, 50))),
            LoadOutcome::Loaded { appended: 50, .. }
        ));
    }
}
