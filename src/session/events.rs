// Semantic listening events emitted by the session state machine

use super::classifier::Classification;
use super::state::PersistedActivity;
use crate::scrobbler::{ScrobbleEntry, Timestamp, TrackRef};

/// Span of time flagged as possibly listened in private mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrivateModeWindow {
    pub from: Timestamp,
    pub to: Timestamp,
}

/// Totals reported when a session ends
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub last_track: Option<TrackRef>,
    pub started_at: Timestamp,
    pub last_activity: Timestamp,
    pub songs_played: u32,
    pub songs_skipped: u32,
    pub songs_looped: u32,
    pub paused_seconds: u64,
    pub pause_count: u32,
    pub final_play: Option<Classification>,
    pub inactivity_threshold: u64,
}

impl SessionSummary {
    pub fn span_seconds(&self) -> i64 {
        (self.last_activity - self.started_at).max(0)
    }

    pub fn paused_percent(&self) -> Option<u32> {
        let span = self.span_seconds();
        if self.paused_seconds == 0 || span <= 0 {
            return None;
        }
        Some(((self.paused_seconds as f64 / span as f64) * 100.0) as u32)
    }

    pub fn skipped_percent(&self) -> Option<u32> {
        if self.songs_skipped == 0 || self.songs_played == 0 {
            return None;
        }
        Some(((self.songs_skipped as f64 / self.songs_played as f64) * 100.0) as u32)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// User became active without a qualifying offline gap (e.g. first observation)
    SessionStarted {
        track: TrackRef,
        last_activity: Timestamp,
    },
    /// User became active after being offline longer than the inactivity threshold
    ActiveAfterOffline {
        track: TrackRef,
        offline_for: i64,
        last_activity: Timestamp,
        /// (previous baseline, newest scrobble) when the baseline moved forward
        last_track_start_changed: Option<(Timestamp, Timestamp)>,
        private_mode: Option<PrivateModeWindow>,
    },
    TrackChanged {
        track: TrackRef,
        started_at: Timestamp,
        duration: Option<u64>,
        previous_play: Option<Classification>,
        /// Same track started again
        replay: bool,
    },
    SongOnLoop {
        track: TrackRef,
        repeats: u32,
    },
    Paused {
        track: Option<TrackRef>,
        played_since_resume: i64,
        last_activity: Timestamp,
        break_window: i64,
    },
    Resumed {
        track: TrackRef,
        paused_for: i64,
    },
    SessionEnded(SessionSummary),
    /// Scrobbles that showed up while the user was considered offline, oldest-first
    OfflineEntries {
        entries: Vec<ScrobbleEntry>,
        possible_private_mode: bool,
    },
    Progress {
        track: TrackRef,
        at: Timestamp,
        elapsed: i64,
    },
    Liveness {
        at: Timestamp,
    },
}

/// Result of one tick
#[derive(Debug, Default)]
pub struct TickOutcome {
    pub events: Vec<SessionEvent>,
    /// Activity record to write, if it changed this tick
    pub persist: Option<PersistedActivity>,
}

impl TickOutcome {
    pub fn push(&mut self, event: SessionEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(played: u32, skipped: u32, paused: u64) -> SessionSummary {
        SessionSummary {
            last_track: None,
            started_at: 1_000,
            last_activity: 2_000,
            songs_played: played,
            songs_skipped: skipped,
            songs_looped: 0,
            paused_seconds: paused,
            pause_count: 1,
            final_play: None,
            inactivity_threshold: 180,
        }
    }

    #[test]
    fn summary_percentages() {
        let s = summary(4, 1, 250);
        assert_eq!(s.span_seconds(), 1_000);
        assert_eq!(s.paused_percent(), Some(25));
        assert_eq!(s.skipped_percent(), Some(25));

        let s = summary(0, 0, 0);
        assert_eq!(s.paused_percent(), None);
        assert_eq!(s.skipped_percent(), None);
    }
}
