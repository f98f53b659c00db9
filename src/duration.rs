// Track duration resolution
// Spotify (when configured) first, then the scrobble source's own metadata

use crate::scrobbler::{ScrobbleSource, TrackRef};
use crate::spotify::{DurationLookup, SpotifyTrack};

pub struct DurationResolver {
    spotify: Option<Box<dyn DurationLookup>>,
    use_spotify_durations: bool,
    last_match: Option<(TrackRef, Option<SpotifyTrack>)>,
}

impl DurationResolver {
    pub fn new(spotify: Option<Box<dyn DurationLookup>>, use_spotify_durations: bool) -> Self {
        Self {
            spotify,
            use_spotify_durations,
            last_match: None,
        }
    }

    /// Best-effort duration in seconds; `None` is a normal outcome
    pub fn resolve(&mut self, source: &dyn ScrobbleSource, track: &TrackRef) -> Option<u64> {
        if self.use_spotify_durations {
            if let Some(duration) = self.spotify_match(track).map(|t| t.duration) {
                if duration > 0 {
                    return Some(duration);
                }
            }
        }

        match source.track_duration(track) {
            Ok(duration) => duration.filter(|d| *d > 0),
            Err(e) => {
                log::debug!("No duration for {}: {}", track, e);
                None
            }
        }
    }

    /// Spotify catalogue match, cached for the most recent track
    pub fn spotify_match(&mut self, track: &TrackRef) -> Option<SpotifyTrack> {
        if let Some((cached, found)) = &self.last_match {
            if cached == track {
                return found.clone();
            }
        }

        let lookup = self.spotify.as_mut()?;
        let found = match lookup.search_track(track) {
            Ok(found) => found,
            Err(e) => {
                log::warn!("Spotify search failed for {}: {}", track, e);
                return None;
            }
        };
        self.last_match = Some((track.clone(), found.clone()));
        found
    }
}
