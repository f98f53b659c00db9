// Common types and traits for scrobble sources

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unix timestamp in seconds
pub type Timestamp = i64;

/// Track identity as reported by the scrobble source
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackRef {
    pub artist: String,
    pub title: String,
    pub album: String,
}

impl TrackRef {
    pub fn new(
        artist: impl Into<String>,
        title: impl Into<String>,
        album: impl Into<String>,
    ) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            album: album.into(),
        }
    }

    /// Artist and title match, album is ignored
    pub fn same_song(&self, other: &TrackRef) -> bool {
        self.artist == other.artist && self.title == other.title
    }
}

impl fmt::Display for TrackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}

/// A scrobble: a track and the time it started playing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrobbleEntry {
    pub track: TrackRef,
    pub played_at: Timestamp,
}

/// One poll result. `recent` is ordered newest-first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub now_playing: Option<TrackRef>,
    pub recent: Vec<ScrobbleEntry>,
    pub fetched_at: Timestamp,
}

impl Snapshot {
    /// Start timestamp of the newest scrobble, 0 when history is empty
    pub fn latest_scrobble_ts(&self) -> Timestamp {
        self.recent.first().map(|e| e.played_at).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    NotFound,
    RateLimited,
    ServerError,
    NetworkError,
    Other,
}

impl fmt::Display for UpstreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "not found",
            Self::RateLimited => "rate limited",
            Self::ServerError => "server error",
            Self::NetworkError => "network error",
            Self::Other => "error",
        };
        f.write_str(name)
    }
}

/// Failure talking to an upstream service (Last.fm, Spotify)
#[derive(Debug, thiserror::Error)]
#[error("{service} {kind}: {message}")]
pub struct UpstreamError {
    pub service: &'static str,
    pub kind: UpstreamKind,
    pub message: String,
}

impl UpstreamError {
    pub fn new(service: &'static str, kind: UpstreamKind, message: impl Into<String>) -> Self {
        Self {
            service,
            kind,
            message: message.into(),
        }
    }

    /// Map a transport failure from attohttpc
    pub fn from_http(service: &'static str, err: attohttpc::Error) -> Self {
        let kind = match err.kind() {
            attohttpc::ErrorKind::Io(_) => UpstreamKind::NetworkError,
            _ => UpstreamKind::Other,
        };
        Self::new(service, kind, err.to_string())
    }

    /// Map a non-success HTTP status code
    pub fn from_status(service: &'static str, status: u16, body: &str) -> Self {
        let kind = match status {
            404 => UpstreamKind::NotFound,
            429 => UpstreamKind::RateLimited,
            500..=599 => UpstreamKind::ServerError,
            _ => UpstreamKind::Other,
        };
        Self::new(service, kind, format!("HTTP {}: {}", status, body.trim()))
    }
}

/// One listing of a user's recent tracks
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecentTracks {
    pub now_playing: Option<TrackRef>,
    /// Newest-first, excluding the now playing entry
    pub entries: Vec<ScrobbleEntry>,
}

/// Source of "now playing" and scrobble history for a user
pub trait ScrobbleSource {
    /// Currently playing track and up to `limit` scrobbles, read in a single request
    fn recent_tracks(&self, user: &str, limit: usize) -> Result<RecentTracks, UpstreamError>;

    /// Up to `limit` most recent scrobbles, newest-first
    fn recent(&self, user: &str, limit: usize) -> Result<Vec<ScrobbleEntry>, UpstreamError> {
        Ok(self.recent_tracks(user, limit)?.entries)
    }

    /// Track length in seconds according to the source's own metadata
    fn track_duration(&self, track: &TrackRef) -> Result<Option<u64>, UpstreamError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_song_ignores_album() {
        let a = TrackRef::new("Air", "La femme d'argent", "Moon Safari");
        let b = TrackRef::new("Air", "La femme d'argent", "Moon Safari (Deluxe)");
        assert!(a.same_song(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(UpstreamError::from_status("Last.fm", 503, "").kind, UpstreamKind::ServerError);
        assert_eq!(UpstreamError::from_status("Last.fm", 429, "").kind, UpstreamKind::RateLimited);
        assert_eq!(UpstreamError::from_status("Last.fm", 404, "").kind, UpstreamKind::NotFound);
        assert_eq!(UpstreamError::from_status("Last.fm", 403, "").kind, UpstreamKind::Other);
    }

    #[test]
    fn latest_scrobble_ts_of_empty_history_is_zero() {
        let snapshot = Snapshot {
            now_playing: None,
            recent: Vec::new(),
            fetched_at: 100,
        };
        assert_eq!(snapshot.latest_scrobble_ts(), 0);
    }
}
