//! Wire types for the history backend's REST surface.
//!
//! Every business endpoint answers with the same envelope:
//! `{ "success": bool, "data"?: T, "error"?: string }`.  Callers branch on
//! `success`, not on the HTTP status alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// One listening-history entry.  The backend has no stable id, so identity is
/// `(artist_name, track_name, end_time)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub artist_name: String,
    pub track_name: String,
    /// When the play finished (RFC 3339 on the wire).
    pub end_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ms_played: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_art_url: Option<String>,
}

impl Track {
    pub fn identity(&self) -> (&str, &str, DateTime<Utc>) {
        (&self.artist_name, &self.track_name, self.end_time)
    }

    pub fn same_play(&self, other: &Track) -> bool {
        self.identity() == other.identity()
    }

    /// `end_time` as epoch milliseconds, the form the `before` cursor takes.
    pub fn end_time_ms(&self) -> i64 {
        self.end_time.timestamp_millis()
    }

    /// "Artist – Title", used for clipboard copies and notifications.
    pub fn display(&self) -> String {
        format!("{} \u{2013} {}", self.artist_name, self.track_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistImage {
    pub url: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistTracks {
    pub total: u32,
}

/// A playlist as returned by `GET /playlists`.  The backend forwards the
/// streaming service's full object; everything not listed here is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub images: Option<Vec<PlaylistImage>>,
    #[serde(default)]
    pub tracks: Option<PlaylistTracks>,
}

impl Playlist {
    pub fn track_count(&self) -> Option<u32> {
        self.tracks.map(|t| t.total)
    }
}

/// The common response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// `success: false` becomes an application error carrying the server's
    /// message; a successful envelope yields its (possibly absent) data.
    pub fn into_result(self) -> Result<Option<T>, ApiError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(ApiError::Application(self.error.filter(|e| !e.trim().is_empty())))
        }
    }
}

/// Body of `POST /add`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTrackRequest {
    pub playlist_id: String,
    pub artist_name: String,
    pub track_name: String,
}

/// Body of `POST /callback`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeExchangeRequest {
    pub code: String,
}

/// `GET /auth`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUrlResponse {
    pub auth_url: String,
}

/// `GET /auth/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatusResponse {
    pub authenticated: bool,
}
