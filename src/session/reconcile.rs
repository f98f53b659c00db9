// Offline catch-up reconciliation
// Works out what happened between the last known activity and now

use super::events::PrivateModeWindow;
use super::state::SessionState;
use crate::scrobbler::{ScrobbleEntry, Timestamp, TrackRef};

/// Scrobbles this close before the current track start belong to it
const SAME_PLAY_WINDOW: i64 = 60;

/// A newest scrobble this far past the last known activity moves the baseline
const BASELINE_SHIFT: i64 = 60;

/// Consecutive entries sharing a timestamp are left behind when the
/// source hides private-mode plays
pub fn has_duplicate_timestamps(entries: &[ScrobbleEntry]) -> bool {
    entries.windows(2).any(|w| w[0].played_at == w[1].played_at)
}

/// Entries newer than `since`, oldest-first, skipping the ones that are
/// restatements of the play starting at `current_track_started_at`
pub fn entries_since(
    history: &[ScrobbleEntry],
    since: Timestamp,
    current_track_started_at: Timestamp,
) -> Vec<ScrobbleEntry> {
    history
        .iter()
        .rev()
        .filter(|e| e.played_at > since)
        .filter(|e| {
            let before_start = current_track_started_at - e.played_at;
            !(0..=SAME_PLAY_WINDOW).contains(&before_start)
        })
        .cloned()
        .collect()
}

/// What the machine learns when the user comes back online
#[derive(Debug, Clone, PartialEq)]
pub struct Reactivation {
    /// Seconds between the (possibly shifted) baseline and the new track start
    pub gap: i64,
    pub baseline: Timestamp,
    pub last_track_start_changed: Option<(Timestamp, Timestamp)>,
    pub private_mode: Option<PrivateModeWindow>,
    pub continuation_candidate: bool,
}

impl Reactivation {
    /// Gap long enough to report as "active after being offline"
    pub fn is_offline_gap(&self, inactivity_threshold: u64) -> bool {
        self.gap > inactivity_threshold as i64
    }
}

/// Reconcile the Offline -> Online transition at `started_at`
pub fn reactivate(
    state: &SessionState,
    started_at: Timestamp,
    latest_scrobble_ts: Timestamp,
    history: &[ScrobbleEntry],
    new_track: &TrackRef,
) -> Reactivation {
    let original_baseline = state.last_seen_active_at;
    let mut baseline = original_baseline;
    let mut last_track_start_changed = None;

    if latest_scrobble_ts > baseline + BASELINE_SHIFT {
        last_track_start_changed = Some((baseline, latest_scrobble_ts));
        baseline = latest_scrobble_ts;
    }

    let private_mode = has_duplicate_timestamps(history).then_some(PrivateModeWindow {
        from: original_baseline,
        to: started_at,
    });

    let continuation_candidate = state
        .last_known_track
        .as_ref()
        .map(|t| t.same_song(new_track))
        .unwrap_or(false);

    Reactivation {
        gap: started_at - baseline,
        baseline,
        last_track_start_changed,
        private_mode,
        continuation_candidate,
    }
}
