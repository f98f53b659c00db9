// Session state owned by the state machine

use super::classifier::Thresholds;
use crate::scrobbler::{Timestamp, TrackRef};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Offline,
    Online,
    Paused,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Offline => "offline",
            Self::Online => "online",
            Self::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// Timers and thresholds the machine runs with
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Poll interval while online or paused, in seconds
    pub active_interval: u64,
    /// Seconds without activity before the session ends
    pub inactivity_threshold: u64,
    /// Pause is reported after `break_multiplier * active_interval` seconds, 0 disables it
    pub break_multiplier: u64,
    /// Consecutive starts of the same track that count as a loop
    pub loop_threshold: u32,
    /// Offline ticks between liveness heartbeats, 0 disables them
    pub liveness_ticks: u64,
    pub thresholds: Thresholds,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            active_interval: 5,
            inactivity_threshold: 180,
            break_multiplier: 4,
            loop_threshold: 3,
            liveness_ticks: 21600 / 15,
            thresholds: Thresholds::default(),
        }
    }
}

impl SessionSettings {
    /// Pause window in seconds, if pause detection is active
    pub fn break_window(&self) -> Option<i64> {
        let window = self.break_multiplier * self.active_interval;
        if self.break_multiplier > 0 && window < self.inactivity_threshold {
            Some(window as i64)
        } else {
            None
        }
    }
}

/// The minimal record that survives a restart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedActivity {
    pub timestamp: Timestamp,
    pub artist: String,
    pub title: String,
    pub album: String,
}

impl PersistedActivity {
    pub fn new(timestamp: Timestamp, track: &TrackRef) -> Self {
        Self {
            timestamp,
            artist: track.artist.clone(),
            title: track.title.clone(),
            album: track.album.clone(),
        }
    }

    pub fn track(&self) -> TrackRef {
        TrackRef::new(&self.artist, &self.title, &self.album)
    }
}

/// Mutable per-user session record. Timestamps of 0 mean "never".
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub phase: Phase,
    pub current_track: Option<TrackRef>,
    pub current_track_started_at: Timestamp,
    /// Start of the current track shifted forward by every pause since
    pub current_track_started_at_after_resume: Timestamp,
    /// Start of the track before the current one
    pub previous_track_started_at: Timestamp,
    pub session_started_at: Timestamp,
    pub last_seen_active_at: Timestamp,
    pub resumed_at: Timestamp,
    pub pause_started_at: Timestamp,
    pub accumulated_pause_seconds: u64,
    pub pause_count: u32,
    pub songs_played: u32,
    pub songs_skipped: u32,
    pub songs_looped: u32,
    pub same_track_repeat_count: u32,
    pub resolved_duration_seconds: Option<u64>,
    pub continuation_candidate: bool,
    /// Newest scrobble timestamp accepted as belonging to the current play
    pub accepted_scrobble_ts: Timestamp,
    /// Newest scrobble timestamp observed on any tick
    pub previous_track_ts_seen: Timestamp,
    /// Last track known to be played, kept across sessions
    pub last_known_track: Option<TrackRef>,
    pub idle_ticks: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: Phase::Offline,
            current_track: None,
            current_track_started_at: 0,
            current_track_started_at_after_resume: 0,
            previous_track_started_at: 0,
            session_started_at: 0,
            last_seen_active_at: 0,
            resumed_at: 0,
            pause_started_at: 0,
            accumulated_pause_seconds: 0,
            pause_count: 0,
            songs_played: 0,
            songs_skipped: 0,
            songs_looped: 0,
            same_track_repeat_count: 0,
            resolved_duration_seconds: None,
            continuation_candidate: false,
            accepted_scrobble_ts: 0,
            previous_track_ts_seen: 0,
            last_known_track: None,
            idle_ticks: 0,
        }
    }
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Online | Phase::Paused)
    }

    /// Clear counters at the start or end of a session
    pub fn reset_session_counters(&mut self) {
        self.accumulated_pause_seconds = 0;
        self.pause_count = 0;
        self.songs_played = 0;
        self.songs_skipped = 0;
        self.songs_looped = 0;
        self.same_track_repeat_count = 0;
    }

    /// Check the structural invariants of the record
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.phase == Phase::Offline && self.current_track.is_some() {
            return Err("offline with a current track".to_string());
        }
        if self.songs_skipped > self.songs_played {
            return Err(format!(
                "skipped {} > played {}",
                self.songs_skipped, self.songs_played
            ));
        }
        if self.current_track_started_at_after_resume < self.current_track_started_at {
            return Err("after-resume start precedes track start".to_string());
        }
        Ok(())
    }
}
