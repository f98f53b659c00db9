// Last.fm scrobble source
// API Documentation: https://www.last.fm/api

use super::traits::{
    RecentTracks, ScrobbleEntry, ScrobbleSource, TrackRef, UpstreamError, UpstreamKind,
};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const API_URL: &str = "https://ws.audioscrobbler.com/2.0/";
const SERVICE: &str = "Last.fm";

pub struct LastFmSource {
    api_key: String,
    timeout: Duration,
}

impl LastFmSource {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self { api_key, timeout }
    }

    /// Call an API method and return the raw JSON body, mapping Last.fm error payloads
    fn call(&self, method: &str, params: &[(&str, &str)]) -> Result<String, UpstreamError> {
        let mut request = attohttpc::get(API_URL)
            .param("method", method)
            .param("api_key", &self.api_key)
            .param("format", "json")
            .timeout(self.timeout);
        for (key, value) in params {
            request = request.param(key, value);
        }

        let response = request
            .send()
            .map_err(|e| UpstreamError::from_http(SERVICE, e))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| UpstreamError::from_http(SERVICE, e))?;

        if let Some(err) = api_error(&body) {
            return Err(err);
        }
        if !status.is_success() {
            return Err(UpstreamError::from_status(SERVICE, status.as_u16(), &body));
        }

        Ok(body)
    }
}

impl ScrobbleSource for LastFmSource {
    fn recent_tracks(&self, user: &str, limit: usize) -> Result<RecentTracks, UpstreamError> {
        let limit_param = limit.max(1).to_string();
        let body = self.call(
            "user.getrecenttracks",
            &[("user", user), ("limit", limit_param.as_str())],
        )?;
        let mut parsed = parse_recent_tracks(&body)?;
        // the now playing entry comes on top of `limit`
        parsed.entries.truncate(limit);
        Ok(parsed)
    }

    fn track_duration(&self, track: &TrackRef) -> Result<Option<u64>, UpstreamError> {
        let body = self.call(
            "track.getinfo",
            &[("artist", track.artist.as_str()), ("track", track.title.as_str())],
        )?;
        parse_track_duration(&body)
    }
}

#[derive(Deserialize)]
struct RecentTracksResponse {
    recenttracks: RecentTracksBody,
}

#[derive(Deserialize)]
struct RecentTracksBody {
    #[serde(default)]
    track: OneOrMany<RawTrack>,
}

// Last.fm collapses single-element arrays into a bare object
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

#[derive(Deserialize)]
struct TextField {
    #[serde(rename = "#text", default)]
    text: String,
}

#[derive(Deserialize)]
struct RawDate {
    uts: String,
}

#[derive(Deserialize)]
struct RawAttr {
    #[serde(default)]
    nowplaying: Option<String>,
}

#[derive(Deserialize)]
struct RawTrack {
    artist: TextField,
    name: String,
    #[serde(default)]
    album: Option<TextField>,
    #[serde(default)]
    date: Option<RawDate>,
    #[serde(rename = "@attr", default)]
    attr: Option<RawAttr>,
}

impl RawTrack {
    fn is_now_playing(&self) -> bool {
        self.attr
            .as_ref()
            .and_then(|a| a.nowplaying.as_deref())
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    fn into_track(self) -> TrackRef {
        TrackRef {
            artist: self.artist.text,
            title: self.name,
            album: self.album.map(|a| a.text).unwrap_or_default(),
        }
    }
}

/// Extract a Last.fm `{"error": code, "message": ...}` payload, if present
fn api_error(body: &str) -> Option<UpstreamError> {
    let value: Value = serde_json::from_str(body).ok()?;
    let code = value.get("error")?.as_i64()?;
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");

    let kind = match code {
        6 => UpstreamKind::NotFound,
        29 => UpstreamKind::RateLimited,
        8 | 11 | 16 => UpstreamKind::ServerError,
        _ => UpstreamKind::Other,
    };
    Some(UpstreamError::new(SERVICE, kind, format!("{} (code {})", message, code)))
}

pub fn parse_recent_tracks(body: &str) -> Result<RecentTracks, UpstreamError> {
    let response: RecentTracksResponse = serde_json::from_str(body).map_err(|e| {
        UpstreamError::new(SERVICE, UpstreamKind::Other, format!("Malformed recent tracks: {}", e))
    })?;

    let mut parsed = RecentTracks::default();
    for raw in response.recenttracks.track.into_vec() {
        if raw.is_now_playing() {
            if parsed.now_playing.is_none() {
                parsed.now_playing = Some(raw.into_track());
            }
            continue;
        }
        let played_at = raw
            .date
            .as_ref()
            .and_then(|d| d.uts.parse::<i64>().ok())
            .unwrap_or(0);
        parsed.entries.push(ScrobbleEntry {
            track: raw.into_track(),
            played_at,
        });
    }

    Ok(parsed)
}

/// `track.getinfo` reports the duration in milliseconds, as a string, "0" when unknown
pub fn parse_track_duration(body: &str) -> Result<Option<u64>, UpstreamError> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        UpstreamError::new(SERVICE, UpstreamKind::Other, format!("Malformed track info: {}", e))
    })?;

    let millis = match value.pointer("/track/duration") {
        Some(Value::String(s)) => s.parse::<u64>().unwrap_or(0),
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        _ => 0,
    };

    Ok(if millis >= 1000 { Some(millis / 1000) } else { None })
}
