// Spotify Web API client
// Used to look up accurate track durations and track IDs for playback

pub mod playback;

use crate::scrobbler::{TrackRef, UpstreamError, UpstreamKind};
use serde::Deserialize;
use std::time::{Duration, Instant};

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SEARCH_URL: &str = "https://api.spotify.com/v1/search";
const SERVICE: &str = "Spotify";

// Refresh tokens a little before Spotify expires them
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// A Spotify catalogue match for a track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyTrack {
    pub id: String,
    pub duration: u64,
}

impl SpotifyTrack {
    pub fn uri(&self) -> String {
        format!("spotify:track:{}", self.id)
    }

    pub fn url(&self) -> String {
        format!("https://open.spotify.com/track/{}?si=1", self.id)
    }
}

/// Secondary source of track metadata
pub trait DurationLookup {
    fn search_track(&mut self, track: &TrackRef) -> Result<Option<SpotifyTrack>, UpstreamError>;
}

/// Access token with its expiry, owned by the client
#[derive(Debug, Default)]
pub struct TokenCache {
    token: Option<String>,
    expires_at: Option<Instant>,
}

impl TokenCache {
    pub fn is_valid(&self, now: Instant) -> bool {
        match (&self.token, self.expires_at) {
            (Some(_), Some(expires_at)) => now + TOKEN_EXPIRY_MARGIN < expires_at,
            _ => false,
        }
    }

    pub fn store(&mut self, token: String, expires_in: Duration, now: Instant) {
        self.token = Some(token);
        self.expires_at = Some(now + expires_in);
    }

    pub fn get(&self, now: Instant) -> Option<&str> {
        if self.is_valid(now) {
            self.token.as_deref()
        } else {
            None
        }
    }

    pub fn invalidate(&mut self) {
        self.token = None;
        self.expires_at = None;
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct SearchResponse {
    tracks: SearchTracks,
}

#[derive(Deserialize)]
struct SearchTracks {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: String,
    duration_ms: u64,
}

pub struct SpotifyClient {
    client_id: String,
    client_secret: String,
    timeout: Duration,
    tokens: TokenCache,
}

impl SpotifyClient {
    pub fn new(client_id: String, client_secret: String, timeout: Duration) -> Self {
        Self {
            client_id,
            client_secret,
            timeout,
            tokens: TokenCache::default(),
        }
    }

    /// Return a cached token or request a new one (client credentials flow)
    fn access_token(&mut self) -> Result<String, UpstreamError> {
        let now = Instant::now();
        if let Some(token) = self.tokens.get(now) {
            return Ok(token.to_string());
        }

        log::debug!("Requesting new Spotify access token");
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let response = attohttpc::post(TOKEN_URL)
            .timeout(self.timeout)
            .form(&form)
            .map_err(|e| UpstreamError::from_http(SERVICE, e))?
            .send()
            .map_err(|e| UpstreamError::from_http(SERVICE, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(UpstreamError::from_status(SERVICE, status, &body));
        }

        let token: TokenResponse = response
            .json()
            .map_err(|e| UpstreamError::new(SERVICE, UpstreamKind::Other, e.to_string()))?;
        self.tokens
            .store(token.access_token.clone(), Duration::from_secs(token.expires_in), now);

        Ok(token.access_token)
    }
}

impl DurationLookup for SpotifyClient {
    fn search_track(&mut self, track: &TrackRef) -> Result<Option<SpotifyTrack>, UpstreamError> {
        let token = self.access_token()?;
        let query = format!("{} {}", track.artist, track.title);

        let response = attohttpc::get(SEARCH_URL)
            .param("q", &query)
            .param("type", "track")
            .param("limit", 1)
            .header("Authorization", format!("Bearer {}", token))
            .timeout(self.timeout)
            .send()
            .map_err(|e| UpstreamError::from_http(SERVICE, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            if status == 401 {
                self.tokens.invalidate();
            }
            let body = response.text().unwrap_or_default();
            return Err(UpstreamError::from_status(SERVICE, status, &body));
        }

        let body = response
            .text()
            .map_err(|e| UpstreamError::from_http(SERVICE, e))?;
        parse_search(&body)
    }
}

pub fn parse_search(body: &str) -> Result<Option<SpotifyTrack>, UpstreamError> {
    let response: SearchResponse = serde_json::from_str(body).map_err(|e| {
        UpstreamError::new(
            SERVICE,
            UpstreamKind::Other,
            format!("Malformed search response: {}", e),
        )
    })?;

    Ok(response.tracks.items.into_iter().next().map(|item| SpotifyTrack {
        id: item.id,
        duration: item.duration_ms / 1000,
    }))
}
