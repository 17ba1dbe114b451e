//! Typed client for the history backend.
//!
//! The backend answers 400/401/500 with envelope bodies, so every response
//! body is decoded as an envelope first; only a non-envelope body on a
//! non-success status is reported as a bare HTTP failure.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::BackendConfig;
use crate::error::ApiError;
use crate::protocol::{
    AddTrackRequest, ApiResponse, AuthStatusResponse, AuthUrlResponse, CodeExchangeRequest,
    Playlist, Track,
};

/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self::with_http(http, &config.base_url))
    }

    pub fn with_http(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /history`, newest first.  `before` is an epoch-millisecond cursor;
    /// `None` asks for the most recent page.
    pub async fn history(&self, before: Option<i64>) -> Result<Vec<Track>, ApiError> {
        debug!("[backend] GET /history before={:?}", before);
        let mut req = self.http.get(self.url("/history"));
        if let Some(ms) = before {
            req = req.query(&[("before", ms.to_string())]);
        }
        let resp = req.send().await?;
        let page = read_envelope::<Vec<Track>>(resp)
            .await?
            .into_result()?
            .ok_or_else(|| ApiError::Decode("history response without data".into()))?;
        debug!("[backend] /history returned {} tracks", page.len());
        Ok(page)
    }

    /// `GET /playlists`
    pub async fn playlists(&self) -> Result<Vec<Playlist>, ApiError> {
        debug!("[backend] GET /playlists");
        let resp = self.http.get(self.url("/playlists")).send().await?;
        let playlists = read_envelope::<Vec<Playlist>>(resp)
            .await?
            .into_result()?
            .unwrap_or_default();
        debug!("[backend] /playlists returned {} playlists", playlists.len());
        Ok(playlists)
    }

    /// `POST /add`.  Returns the server's confirmation text, if any.
    pub async fn add_to_playlist(
        &self,
        playlist_id: &str,
        artist_name: &str,
        track_name: &str,
    ) -> Result<Option<String>, ApiError> {
        debug!(
            "[backend] POST /add playlist={} track={:?} artist={:?}",
            playlist_id, track_name, artist_name
        );
        let body = AddTrackRequest {
            playlist_id: playlist_id.to_string(),
            artist_name: artist_name.to_string(),
            track_name: track_name.to_string(),
        };
        let resp = self.http.post(self.url("/add")).json(&body).send().await?;
        read_envelope::<String>(resp).await?.into_result()
    }

    /// `GET /auth`: the provider's authorization URL.
    pub async fn auth_url(&self) -> Result<String, ApiError> {
        debug!("[backend] GET /auth");
        let resp = self.http.get(self.url("/auth")).send().await?;
        let body: AuthUrlResponse = read_plain(resp).await?;
        Ok(body.auth_url)
    }

    /// `GET /auth/status`
    pub async fn auth_status(&self) -> Result<bool, ApiError> {
        debug!("[backend] GET /auth/status");
        let resp = self.http.get(self.url("/auth/status")).send().await?;
        let body: AuthStatusResponse = read_plain(resp).await?;
        Ok(body.authenticated)
    }

    /// `POST /callback`: trade an authorization code for a backend session.
    pub async fn exchange_code(&self, code: &str) -> Result<(), ApiError> {
        debug!("[backend] POST /callback");
        let body = CodeExchangeRequest {
            code: code.to_string(),
        };
        let resp = self
            .http
            .post(self.url("/callback"))
            .json(&body)
            .send()
            .await?;
        read_envelope::<serde_json::Value>(resp)
            .await?
            .into_result()
            .map(|_| ())
    }

    /// `POST /logout`: 200 means success.
    pub async fn logout(&self) -> Result<(), ApiError> {
        debug!("[backend] POST /logout");
        let resp = self.http.post(self.url("/logout")).send().await?;
        if resp.status().is_success() {
            return Ok(());
        }
        read_envelope::<serde_json::Value>(resp)
            .await?
            .into_result()
            .map(|_| ())
    }
}

async fn read_envelope<T: DeserializeOwned>(resp: Response) -> Result<ApiResponse<T>, ApiError> {
    let status = resp.status();
    let bytes = resp.bytes().await?;
    match serde_json::from_slice::<ApiResponse<T>>(&bytes) {
        Ok(env) => {
            if !status.is_success() {
                debug!("[backend] HTTP {} with envelope success={}", status, env.success);
            }
            Ok(env)
        }
        Err(e) if status.is_success() => Err(ApiError::Decode(e.to_string())),
        Err(_) => Err(status_error(status)),
    }
}

async fn read_plain<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(status_error(status));
    }
    Ok(resp.json::<T>().await?)
}

fn status_error(status: StatusCode) -> ApiError {
    warn!("[backend] HTTP {} without a response envelope", status);
    ApiError::Status(status.as_u16())
}
