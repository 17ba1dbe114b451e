#![allow(dead_code)]

//! In-process stand-in for the history backend, served on an ephemeral
//! loopback port.

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{TimeZone, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use timemachine_proto::protocol::{AddTrackRequest, CodeExchangeRequest, Track};

pub const PAGE_SIZE: usize = 50;
pub const NEWEST_MS: i64 = 1_709_300_000_000;
pub const VALID_CODE: &str = "good-code";

pub struct MockState {
    /// Full history, newest first.
    pub history: Vec<Track>,
    pub authenticated: AtomicBool,
    /// Answer `/history` with a bare 502.
    pub history_down: AtomicBool,
    /// Every `before` parameter `/history` saw, in order.
    pub befores: Mutex<Vec<Option<i64>>>,
    pub added: Mutex<Vec<AddTrackRequest>>,
    pub exchanged: Mutex<Vec<String>>,
}

pub struct MockBackend {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockBackend {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn befores(&self) -> Vec<Option<i64>> {
        self.state.befores.lock().unwrap().clone()
    }

    pub fn set_authenticated(&self, value: bool) {
        self.state.authenticated.store(value, Ordering::SeqCst);
    }
}

/// One play per minute going back from `NEWEST_MS`.
pub fn synthetic_history(count: usize) -> Vec<Track> {
    (0..count as i64)
        .map(|n| Track {
            artist_name: format!("Artist {}", n),
            track_name: format!("Track {}", n),
            end_time: Utc
                .timestamp_millis_opt(NEWEST_MS - n * 60_000)
                .single()
                .unwrap(),
            ms_played: Some(200_000),
            album_art_url: None,
        })
        .collect()
}

pub async fn spawn(history: Vec<Track>) -> Result<MockBackend> {
    let state = Arc::new(MockState {
        history,
        authenticated: AtomicBool::new(true),
        history_down: AtomicBool::new(false),
        befores: Mutex::new(Vec::new()),
        added: Mutex::new(Vec::new()),
        exchanged: Mutex::new(Vec::new()),
    });

    let app = Router::new()
        .route("/history", get(history_handler))
        .route("/playlists", get(playlists_handler))
        .route("/add", post(add_handler))
        .route("/auth", get(auth_handler))
        .route("/auth/status", get(auth_status_handler))
        .route("/callback", post(callback_handler))
        .route("/logout", post(logout_handler))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("bind mock backend")?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(MockBackend { addr, state })
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "error": message }))).into_response()
}

async fn history_handler(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if state.history_down.load(Ordering::SeqCst) {
        return (StatusCode::BAD_GATEWAY, "upstream unavailable").into_response();
    }
    if !state.authenticated.load(Ordering::SeqCst) {
        return failure(StatusCode::UNAUTHORIZED, "Not authenticated");
    }
    let before = params.get("before").and_then(|b| b.parse::<i64>().ok());
    state.befores.lock().unwrap().push(before);

    let page: Vec<&Track> = state
        .history
        .iter()
        .filter(|t| before.map_or(true, |b| t.end_time_ms() < b))
        .take(PAGE_SIZE)
        .collect();
    Json(json!({ "success": true, "data": page })).into_response()
}

async fn playlists_handler(State(state): State<Arc<MockState>>) -> Response {
    if !state.authenticated.load(Ordering::SeqCst) {
        return failure(StatusCode::UNAUTHORIZED, "Not authenticated");
    }
    Json(json!({
        "success": true,
        "data": [
            {
                "id": "pl-road",
                "name": "Road Trip",
                "public": true,
                "images": [{ "url": "https://img.example/road.jpg", "height": 300, "width": 300 }],
                "tracks": { "href": "https://api.example/pl-road/tracks", "total": 42 }
            },
            { "id": "pl-empty", "name": "Untitled", "images": null, "tracks": { "total": 0 } }
        ]
    }))
    .into_response()
}

async fn add_handler(
    State(state): State<Arc<MockState>>,
    Json(body): Json<AddTrackRequest>,
) -> Response {
    if body.track_name == "Unknown Track" {
        return failure(
            StatusCode::BAD_REQUEST,
            &format!(
                "Could not find Spotify ID for '{}' by '{}'",
                body.track_name, body.artist_name
            ),
        );
    }
    let message = format!("Added {} to playlist", body.track_name);
    state.added.lock().unwrap().push(body);
    Json(json!({ "success": true, "data": message })).into_response()
}

async fn auth_handler() -> Response {
    Json(json!({
        "auth_url": "https://accounts.example/authorize?client_id=abc&redirect_uri=http%3A%2F%2F127.0.0.1%3A3000%2Fcallback"
    }))
    .into_response()
}

async fn auth_status_handler(State(state): State<Arc<MockState>>) -> Response {
    Json(json!({ "authenticated": state.authenticated.load(Ordering::SeqCst) })).into_response()
}

async fn callback_handler(
    State(state): State<Arc<MockState>>,
    Json(body): Json<CodeExchangeRequest>,
) -> Response {
    state.exchanged.lock().unwrap().push(body.code.clone());
    if body.code != VALID_CODE {
        return failure(StatusCode::BAD_REQUEST, "Invalid authorization code");
    }
    state.authenticated.store(true, Ordering::SeqCst);
    Json(json!({ "success": true })).into_response()
}

async fn logout_handler(State(state): State<Arc<MockState>>) -> Response {
    state.authenticated.store(false, Ordering::SeqCst);
    Json(json!({ "success": true })).into_response()
}
