// Listening session state machine
// Turns successive now-playing snapshots into session, track, pause and loop events

pub mod classifier;
pub mod events;
pub mod reconcile;
pub mod state;

use crate::scrobbler::{
    ScrobbleEntry, Snapshot, Timestamp, TrackRef, OFFLINE_HISTORY_DEPTH, REACTIVATION_HISTORY_DEPTH,
};
use classifier::{classify, Classification, Verdict};
use events::{SessionEvent, SessionSummary, TickOutcome};
pub use state::{Phase, PersistedActivity, SessionSettings, SessionState};

/// A newer scrobble this close to a known track start restates that play
const RESTATEMENT_GRACE: i64 = 20;

/// Collaborators the machine calls during a tick
pub trait TickContext {
    /// Up to `depth` recent scrobbles, newest-first
    fn history(&mut self, depth: usize) -> anyhow::Result<Vec<ScrobbleEntry>>;

    fn duration(&mut self, track: &TrackRef) -> Option<u64>;
}

pub struct SessionMachine {
    settings: SessionSettings,
    state: SessionState,
}

impl SessionMachine {
    /// Seed the machine when the user is not playing at startup.
    /// The newer of the newest scrobble and the persisted record is the baseline.
    pub fn start_offline(
        settings: SessionSettings,
        snapshot: &Snapshot,
        persisted: Option<&PersistedActivity>,
    ) -> Self {
        let latest = snapshot.latest_scrobble_ts();
        let mut state = SessionState {
            previous_track_ts_seen: latest,
            previous_track_started_at: latest,
            last_seen_active_at: latest,
            last_known_track: snapshot.recent.first().map(|e| e.track.clone()),
            ..SessionState::default()
        };

        if let Some(activity) = persisted {
            if activity.timestamp > latest {
                state.last_seen_active_at = activity.timestamp;
                state.last_known_track = Some(activity.track());
            }
        }

        Self { settings, state }
    }

    /// Seed the machine when the user is already playing at startup
    pub fn start_online(
        settings: SessionSettings,
        snapshot: &Snapshot,
        now: Timestamp,
        ctx: &mut dyn TickContext,
    ) -> (Self, TickOutcome) {
        let latest = snapshot.latest_scrobble_ts();
        let mut machine = Self {
            settings,
            state: SessionState {
                previous_track_ts_seen: latest,
                previous_track_started_at: latest,
                ..SessionState::default()
            },
        };

        let mut out = TickOutcome::default();
        if let Some(track) = &snapshot.now_playing {
            machine.change_track(track, snapshot, now, false, ctx, &mut out);
        }
        (machine, out)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn settings_mut(&mut self) -> &mut SessionSettings {
        &mut self.settings
    }

    /// Poll interval to sleep before the next tick
    pub fn next_interval(&self, offline_interval: u64) -> u64 {
        if self.state.is_active() {
            self.settings.active_interval
        } else {
            offline_interval
        }
    }

    /// Process one snapshot observed at `now`
    pub fn tick(
        &mut self,
        snapshot: &Snapshot,
        now: Timestamp,
        ctx: &mut dyn TickContext,
    ) -> TickOutcome {
        let mut out = TickOutcome::default();
        let latest = snapshot.latest_scrobble_ts();

        if self.state.phase == Phase::Offline && latest > self.state.previous_track_ts_seen {
            self.catch_up_offline_entries(snapshot, latest, ctx, &mut out);
        }

        match &snapshot.now_playing {
            Some(track) => self.observe_playing(track, snapshot, now, ctx, &mut out),
            None => self.observe_silence(now, &mut out),
        }

        if latest > 0 {
            self.state.previous_track_ts_seen = latest;
        }

        if let Err(e) = self.state.check_invariants() {
            log::error!("Session state invariant violated: {}", e);
        }
        out
    }

    fn catch_up_offline_entries(
        &mut self,
        snapshot: &Snapshot,
        latest: Timestamp,
        ctx: &mut dyn TickContext,
        out: &mut TickOutcome,
    ) {
        let history = ctx.history(OFFLINE_HISTORY_DEPTH).unwrap_or_else(|e| {
            log::warn!("Failed to fetch history of offline entries: {:#}", e);
            snapshot.recent.clone()
        });

        let entries = reconcile::entries_since(
            &history,
            self.state.previous_track_ts_seen,
            self.state.current_track_started_at,
        );
        self.state.previous_track_started_at = latest;

        if !entries.is_empty() {
            self.state.idle_ticks = 0;
            let possible_private_mode = reconcile::has_duplicate_timestamps(&entries);
            out.push(SessionEvent::OfflineEntries {
                entries,
                possible_private_mode,
            });
        }
    }

    fn observe_playing(
        &mut self,
        track: &TrackRef,
        snapshot: &Snapshot,
        now: Timestamp,
        ctx: &mut dyn TickContext,
        out: &mut TickOutcome,
    ) {
        let was_active = self.state.is_active();
        let latest = snapshot.latest_scrobble_ts();

        if self.state.phase == Phase::Paused {
            let st = &mut self.state;
            let paused_for = (now - st.pause_started_at).max(0);
            st.accumulated_pause_seconds += paused_for as u64;
            st.current_track_started_at_after_resume += paused_for;
            st.resumed_at = now;
            st.phase = Phase::Online;
            out.push(SessionEvent::Resumed {
                track: st.current_track.clone().unwrap_or_else(|| track.clone()),
                paused_for,
            });
        }

        let same_identity = self.state.current_track.as_ref() == Some(track);
        if same_identity
            && now <= self.state.current_track_started_at + RESTATEMENT_GRACE
            && latest > self.state.accepted_scrobble_ts
        {
            self.state.accepted_scrobble_ts = latest;
        }

        if !same_identity || self.is_new_start(latest) {
            self.change_track(track, snapshot, now, was_active, ctx, out);
        } else {
            self.state.last_seen_active_at = now;
            if self.state.phase == Phase::Online {
                let elapsed = now + self.settings.active_interval as i64
                    - self.state.current_track_started_at_after_resume;
                out.push(SessionEvent::Progress {
                    track: track.clone(),
                    at: now,
                    elapsed: elapsed.max(0),
                });
            }
        }
    }

    /// A newer scrobble of the current track that is not a restatement of a known start
    fn is_new_start(&self, latest: Timestamp) -> bool {
        let st = &self.state;
        latest > st.accepted_scrobble_ts
            && latest >= st.current_track_started_at - RESTATEMENT_GRACE
            && (latest - st.previous_track_started_at).abs() > RESTATEMENT_GRACE
    }

    fn classify_current(&self, played_for: i64) -> Classification {
        classify(
            played_for.max(0) as u64,
            self.state.resolved_duration_seconds,
            self.state.continuation_candidate,
            self.settings.active_interval,
            &self.settings.thresholds,
        )
    }

    /// Count a classified play and consume the continuation flag
    fn record_play(&mut self, play: &Classification) {
        match play.verdict {
            Verdict::Skipped => self.state.songs_skipped += 1,
            Verdict::Continued => self.state.continuation_candidate = false,
            Verdict::Normal | Verdict::Longer => {}
        }
    }

    fn change_track(
        &mut self,
        track: &TrackRef,
        snapshot: &Snapshot,
        now: Timestamp,
        was_active: bool,
        ctx: &mut dyn TickContext,
        out: &mut TickOutcome,
    ) {
        let latest = snapshot.latest_scrobble_ts();
        let replay = was_active && self.state.current_track.as_ref() == Some(track);

        let previous_play = if was_active
            && self.state.current_track.is_some()
            && self.state.current_track_started_at_after_resume > 0
        {
            let played_for = now - self.state.current_track_started_at_after_resume;
            let play = self.classify_current(played_for);
            self.record_play(&play);
            Some(play)
        } else {
            None
        };

        let mut looped = false;
        if replay {
            self.state.same_track_repeat_count += 1;
            if self.state.same_track_repeat_count == self.settings.loop_threshold {
                self.state.songs_looped += 1;
                looped = true;
            }
        }

        let session_event = if was_active {
            self.state.songs_played += 1;
            if self.state.songs_played == 2 {
                self.state.continuation_candidate = false;
            }
            None
        } else {
            Some(self.begin_session(track, snapshot, now, ctx))
        };
        if !replay {
            self.state.same_track_repeat_count = 1;
        }

        let duration = if replay {
            self.state.resolved_duration_seconds
        } else {
            ctx.duration(track)
        };

        let st = &mut self.state;
        st.previous_track_started_at = if was_active {
            st.current_track_started_at
        } else {
            latest
        };
        st.current_track_started_at = now;
        st.current_track_started_at_after_resume = now;
        st.accepted_scrobble_ts = latest;
        st.current_track = Some(track.clone());
        st.last_known_track = Some(track.clone());
        st.resolved_duration_seconds = duration;
        st.phase = Phase::Online;
        st.last_seen_active_at = now;
        st.idle_ticks = 0;

        out.persist = Some(PersistedActivity::new(now, track));
        if let Some(event) = session_event {
            out.push(event);
        }
        out.push(SessionEvent::TrackChanged {
            track: track.clone(),
            started_at: now,
            duration,
            previous_play,
            replay,
        });
        if looped {
            out.push(SessionEvent::SongOnLoop {
                track: track.clone(),
                repeats: self.state.same_track_repeat_count,
            });
        }
    }

    /// Offline -> Online: reconcile the gap and reset the session counters
    fn begin_session(
        &mut self,
        track: &TrackRef,
        snapshot: &Snapshot,
        now: Timestamp,
        ctx: &mut dyn TickContext,
    ) -> SessionEvent {
        let latest = snapshot.latest_scrobble_ts();
        let baseline_known = self.state.last_seen_active_at > 0;

        let reactivation = baseline_known.then(|| {
            let history = ctx.history(REACTIVATION_HISTORY_DEPTH).unwrap_or_else(|e| {
                log::warn!("Failed to fetch recent history: {:#}", e);
                snapshot.recent.clone()
            });
            reconcile::reactivate(&self.state, now, latest, &history, track)
        });

        let st = &mut self.state;
        st.reset_session_counters();
        st.songs_played = 1;
        st.session_started_at = now;
        st.resumed_at = now;
        st.continuation_candidate = reactivation
            .as_ref()
            .map(|r| r.continuation_candidate)
            .unwrap_or(false);

        match reactivation {
            Some(r) if r.is_offline_gap(self.settings.inactivity_threshold) => {
                SessionEvent::ActiveAfterOffline {
                    track: track.clone(),
                    offline_for: r.gap,
                    last_activity: r.baseline,
                    last_track_start_changed: r.last_track_start_changed,
                    private_mode: r.private_mode,
                }
            }
            Some(r) => SessionEvent::SessionStarted {
                track: track.clone(),
                last_activity: r.baseline,
            },
            None => SessionEvent::SessionStarted {
                track: track.clone(),
                last_activity: now,
            },
        }
    }

    fn observe_silence(&mut self, now: Timestamp, out: &mut TickOutcome) {
        if self.state.phase == Phase::Online && self.state.session_started_at > 0 {
            if let Some(window) = self.settings.break_window() {
                if now - self.state.last_seen_active_at > window {
                    let st = &mut self.state;
                    st.phase = Phase::Paused;
                    st.pause_started_at = st.last_seen_active_at;
                    st.pause_count += 1;
                    out.push(SessionEvent::Paused {
                        track: st.current_track.clone(),
                        played_since_resume: (st.pause_started_at - st.resumed_at).max(0),
                        last_activity: st.last_seen_active_at,
                        break_window: window,
                    });
                }
            }
        }

        if self.state.is_active()
            && now - self.state.last_seen_active_at > self.settings.inactivity_threshold as i64
        {
            self.end_session(now, out);
            return;
        }

        if self.state.phase == Phase::Offline {
            self.state.idle_ticks += 1;
            let every = self.settings.liveness_ticks;
            if every > 0 && self.state.idle_ticks >= every && out.events.is_empty() {
                self.state.idle_ticks = 0;
                out.push(SessionEvent::Liveness { at: now });
            }
        }
    }

    fn end_session(&mut self, now: Timestamp, out: &mut TickOutcome) {
        let final_play = if self.state.current_track.is_some() {
            let play = self.classify_current(
                self.state.last_seen_active_at - self.state.current_track_started_at_after_resume,
            );
            self.record_play(&play);
            Some(play)
        } else {
            None
        };

        let st = &mut self.state;
        let last_track = st.current_track.clone().or_else(|| st.last_known_track.clone());
        let summary = SessionSummary {
            last_track: last_track.clone(),
            started_at: st.session_started_at,
            last_activity: st.last_seen_active_at,
            songs_played: st.songs_played,
            songs_skipped: st.songs_skipped,
            songs_looped: st.songs_looped,
            paused_seconds: st.accumulated_pause_seconds,
            pause_count: st.pause_count,
            final_play,
            inactivity_threshold: self.settings.inactivity_threshold,
        };

        if let Some(track) = &last_track {
            out.persist = Some(PersistedActivity::new(st.last_seen_active_at, track));
        }

        st.reset_session_counters();
        st.phase = Phase::Offline;
        st.current_track = None;
        st.resolved_duration_seconds = None;
        st.accepted_scrobble_ts = 0;
        st.continuation_candidate = false;
        st.session_started_at = 0;
        st.resumed_at = now;
        st.idle_ticks = 0;

        out.push(SessionEvent::SessionEnded(summary));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeContext {
        history: Vec<ScrobbleEntry>,
        durations: HashMap<String, u64>,
        history_calls: usize,
    }

    impl TickContext for FakeContext {
        fn history(&mut self, depth: usize) -> anyhow::Result<Vec<ScrobbleEntry>> {
            self.history_calls += 1;
            Ok(self.history.iter().take(depth).cloned().collect())
        }

        fn duration(&mut self, track: &TrackRef) -> Option<u64> {
            self.durations.get(&track.title).copied()
        }
    }

    fn track(title: &str) -> TrackRef {
        TrackRef::new("Grouper", title, "Dragging a Dead Deer Up a Hill")
    }

    fn scrobble(title: &str, played_at: Timestamp) -> ScrobbleEntry {
        ScrobbleEntry {
            track: track(title),
            played_at,
        }
    }

    fn snap(
        now_playing: Option<&str>,
        latest: Option<(&str, Timestamp)>,
        at: Timestamp,
    ) -> Snapshot {
        Snapshot {
            now_playing: now_playing.map(track),
            recent: latest.map(|(t, ts)| vec![scrobble(t, ts)]).unwrap_or_default(),
            fetched_at: at,
        }
    }

    fn settings() -> SessionSettings {
        SessionSettings {
            liveness_ticks: 0,
            ..SessionSettings::default()
        }
    }

    /// Machine that went online at t=1000 playing "Heavy Water"
    fn online_machine(ctx: &mut FakeContext) -> SessionMachine {
        let snapshot = snap(Some("Heavy Water"), Some(("Disengaged", 700)), 1_000);
        let (machine, out) = SessionMachine::start_online(settings(), &snapshot, 1_000, ctx);
        assert!(matches!(out.events[0], SessionEvent::SessionStarted { .. }));
        machine
    }

    fn has_event(out: &TickOutcome, pred: impl Fn(&SessionEvent) -> bool) -> bool {
        out.events.iter().any(pred)
    }

    fn previous_play(out: &TickOutcome) -> Option<Classification> {
        out.events.iter().find_map(|e| match e {
            SessionEvent::TrackChanged { previous_play, .. } => *previous_play,
            _ => None,
        })
    }

    #[test]
    fn start_online_counts_first_song_and_persists() {
        let mut ctx = FakeContext::default();
        let snapshot = snap(Some("Heavy Water"), Some(("Disengaged", 700)), 1_000);
        let (machine, out) = SessionMachine::start_online(settings(), &snapshot, 1_000, &mut ctx);

        let st = machine.state();
        assert_eq!(st.phase, Phase::Online);
        assert_eq!(st.songs_played, 1);
        assert_eq!(st.session_started_at, 1_000);
        assert_eq!(out.persist.as_ref().unwrap().title, "Heavy Water");
        assert!(has_event(&out, |e| matches!(e, SessionEvent::TrackChanged { .. })));
    }

    #[test]
    fn unchanged_snapshot_is_idempotent() {
        let mut ctx = FakeContext::default();
        let mut machine = online_machine(&mut ctx);

        for i in 1..=10 {
            let now = 1_000 + i * 5;
            let out = machine.tick(&snap(Some("Heavy Water"), Some(("Disengaged", 700)), now), now, &mut ctx);
            assert!(!has_event(&out, |e| matches!(e, SessionEvent::TrackChanged { .. })));
            assert!(out.persist.is_none());
        }
        assert_eq!(machine.state().songs_played, 1);
        assert_eq!(machine.state().songs_skipped, 0);
        assert_eq!(machine.state().last_seen_active_at, 1_050);
    }

    #[test]
    fn skip_without_duration() {
        let mut ctx = FakeContext::default();
        let mut machine = online_machine(&mut ctx);

        let out = machine.tick(&snap(Some("Alley Cat"), Some(("Heavy Water", 1_000)), 1_034), 1_034, &mut ctx);
        assert_eq!(previous_play(&out).unwrap().verdict, Verdict::Skipped);
        assert_eq!(machine.state().songs_skipped, 1);
        assert_eq!(machine.state().songs_played, 2);

        let out = machine.tick(&snap(Some("Tidal Wave"), Some(("Alley Cat", 1_034)), 1_070), 1_070, &mut ctx);
        assert_eq!(previous_play(&out).unwrap().verdict, Verdict::Normal);
        assert_eq!(machine.state().songs_skipped, 1);
        assert_eq!(machine.state().songs_played, 3);
    }

    #[test]
    fn skip_with_resolved_duration() {
        let mut ctx = FakeContext::default();
        ctx.durations.insert("Alley Cat".to_string(), 200);
        let mut machine = online_machine(&mut ctx);

        machine.tick(&snap(Some("Alley Cat"), Some(("Heavy Water", 1_000)), 1_100), 1_100, &mut ctx);
        assert_eq!(machine.state().resolved_duration_seconds, Some(200));

        let out = machine.tick(&snap(Some("Tidal Wave"), Some(("Alley Cat", 1_100)), 1_209), 1_209, &mut ctx);
        let play = previous_play(&out).unwrap();
        assert_eq!(play.verdict, Verdict::Skipped);
        assert_eq!(play.played_for, 109);
    }

    #[test]
    fn restated_start_within_grace_is_not_a_new_track() {
        let mut ctx = FakeContext::default();
        let mut machine = online_machine(&mut ctx);

        // previous track's scrobble arrives right after the change
        let out = machine.tick(&snap(Some("Heavy Water"), Some(("Disengaged", 990)), 1_010), 1_010, &mut ctx);
        assert!(!has_event(&out, |e| matches!(e, SessionEvent::TrackChanged { .. })));
        assert_eq!(machine.state().accepted_scrobble_ts, 990);
    }

    #[test]
    fn late_scrobble_of_previous_track_is_not_a_replay() {
        let mut ctx = FakeContext::default();
        let mut machine = online_machine(&mut ctx);

        // "Disengaged" started at 705, its scrobble shows up long after the change
        let out = machine.tick(&snap(Some("Heavy Water"), Some(("Disengaged", 705)), 1_060), 1_060, &mut ctx);
        assert!(!has_event(&out, |e| matches!(e, SessionEvent::TrackChanged { .. })));
        assert_eq!(machine.state().songs_played, 1);
    }

    #[test]
    fn loop_detected_once_per_run() {
        let mut ctx = FakeContext::default();
        let mut machine = online_machine(&mut ctx);

        // each replay is announced by a scrobble of the previous play of the same track
        let out = machine.tick(&snap(Some("Heavy Water"), Some(("Heavy Water", 998)), 1_200), 1_200, &mut ctx);
        assert!(has_event(&out, |e| matches!(e, SessionEvent::TrackChanged { replay: true, .. })));
        assert_eq!(machine.state().same_track_repeat_count, 2);
        assert_eq!(machine.state().songs_looped, 0);

        let out = machine.tick(&snap(Some("Heavy Water"), Some(("Heavy Water", 1_198)), 1_400), 1_400, &mut ctx);
        assert!(has_event(&out, |e| matches!(e, SessionEvent::SongOnLoop { repeats: 3, .. })));
        assert_eq!(machine.state().songs_looped, 1);

        let out = machine.tick(&snap(Some("Heavy Water"), Some(("Heavy Water", 1_398)), 1_600), 1_600, &mut ctx);
        assert!(!has_event(&out, |e| matches!(e, SessionEvent::SongOnLoop { .. })));
        assert_eq!(machine.state().songs_looped, 1);
        assert_eq!(machine.state().songs_played, 4);

        // plain ticks afterwards change nothing
        for now in [1_605, 1_610, 1_615] {
            machine.tick(&snap(Some("Heavy Water"), Some(("Heavy Water", 1_398)), now), now, &mut ctx);
        }
        assert_eq!(machine.state().songs_looped, 1);
        assert_eq!(machine.state().same_track_repeat_count, 4);
    }

    #[test]
    fn pause_and_resume_accounting() {
        let mut ctx = FakeContext::default();
        let mut machine = online_machine(&mut ctx);
        machine.tick(&snap(Some("Heavy Water"), Some(("Disengaged", 700)), 1_010), 1_010, &mut ctx);

        // break window is 4 * 5 = 20 seconds
        let out = machine.tick(&snap(None, Some(("Disengaged", 700)), 1_030), 1_030, &mut ctx);
        assert!(out.events.is_empty());
        let out = machine.tick(&snap(None, Some(("Disengaged", 700)), 1_031), 1_031, &mut ctx);
        assert!(has_event(&out, |e| matches!(e, SessionEvent::Paused { .. })));
        assert_eq!(machine.state().phase, Phase::Paused);
        assert_eq!(machine.state().pause_started_at, 1_010);
        assert_eq!(machine.state().pause_count, 1);

        let paused = 90;
        let before = machine.state().current_track_started_at_after_resume;
        let now = 1_010 + paused;
        let out = machine.tick(&snap(Some("Heavy Water"), Some(("Disengaged", 700)), now), now, &mut ctx);
        assert!(has_event(&out, |e| matches!(e, SessionEvent::Resumed { paused_for: 90, .. })));
        assert_eq!(machine.state().phase, Phase::Online);
        assert_eq!(machine.state().accumulated_pause_seconds, paused as u64);
        assert_eq!(machine.state().current_track_started_at_after_resume, before + paused);
    }

    #[test]
    fn pause_shifts_played_for_of_the_track() {
        let mut ctx = FakeContext::default();
        let mut machine = online_machine(&mut ctx);
        machine.tick(&snap(Some("Heavy Water"), Some(("Disengaged", 700)), 1_020), 1_020, &mut ctx);
        machine.tick(&snap(None, Some(("Disengaged", 700)), 1_050), 1_050, &mut ctx);
        assert_eq!(machine.state().phase, Phase::Paused);

        // resumed after 100s, then changed track 20s later: 40s of actual play
        machine.tick(&snap(Some("Heavy Water"), Some(("Disengaged", 700)), 1_120), 1_120, &mut ctx);
        let out = machine.tick(&snap(Some("Alley Cat"), Some(("Heavy Water", 1_000)), 1_140), 1_140, &mut ctx);
        let play = previous_play(&out).unwrap();
        assert_eq!(play.played_for, 40);
        assert_eq!(play.verdict, Verdict::Normal);
    }

    #[test]
    fn session_ends_after_inactivity() {
        let mut ctx = FakeContext::default();
        let mut machine = online_machine(&mut ctx);
        machine.tick(&snap(Some("Alley Cat"), Some(("Heavy Water", 1_000)), 1_200), 1_200, &mut ctx);
        machine.tick(&snap(Some("Alley Cat"), Some(("Heavy Water", 1_000)), 1_400), 1_400, &mut ctx);

        let out = machine.tick(&snap(None, Some(("Alley Cat", 1_200)), 1_500), 1_500, &mut ctx);
        assert!(has_event(&out, |e| matches!(e, SessionEvent::Paused { .. })));
        assert_eq!(machine.state().phase, Phase::Paused);

        let out = machine.tick(&snap(None, Some(("Alley Cat", 1_200)), 1_581), 1_581, &mut ctx);
        let summary = out
            .events
            .iter()
            .find_map(|e| match e {
                SessionEvent::SessionEnded(s) => Some(s.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(summary.songs_played, 2);
        assert_eq!(summary.started_at, 1_000);
        assert_eq!(summary.last_activity, 1_400);
        assert_eq!(summary.final_play.unwrap().played_for, 200);
        assert_eq!(out.persist.as_ref().unwrap().timestamp, 1_400);

        let st = machine.state();
        assert_eq!(st.phase, Phase::Offline);
        assert!(st.current_track.is_none());
        assert_eq!(st.songs_played, 0);
        assert_eq!(st.accumulated_pause_seconds, 0);
        assert!(st.check_invariants().is_ok());
    }

    fn ended_machine(ctx: &mut FakeContext) -> SessionMachine {
        let mut machine = online_machine(ctx);
        machine.tick(&snap(Some("Heavy Water"), Some(("Disengaged", 700)), 1_100), 1_100, ctx);
        machine.tick(&snap(None, Some(("Disengaged", 700)), 1_300), 1_300, ctx);
        assert_eq!(machine.state().phase, Phase::Offline);
        assert_eq!(machine.state().last_seen_active_at, 1_100);
        machine
    }

    #[test]
    fn reactivation_after_long_gap_reports_gap_once() {
        let mut ctx = FakeContext::default();
        let mut machine = ended_machine(&mut ctx);

        let gap = 5_000;
        let now = 1_100 + gap;
        let out = machine.tick(&snap(Some("Alley Cat"), Some(("Heavy Water", 1_000)), now), now, &mut ctx);
        let active: Vec<_> = out
            .events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::ActiveAfterOffline { offline_for, .. } => Some(*offline_for),
                _ => None,
            })
            .collect();
        assert_eq!(active, vec![gap]);
        assert_eq!(machine.state().phase, Phase::Online);
        assert_eq!(machine.state().songs_played, 1);
        assert_eq!(machine.state().session_started_at, now);

        let out = machine.tick(&snap(Some("Alley Cat"), Some(("Heavy Water", 1_000)), now + 5), now + 5, &mut ctx);
        assert!(!has_event(&out, |e| matches!(e, SessionEvent::ActiveAfterOffline { .. })));
    }

    #[test]
    fn short_gap_starts_session_without_offline_report() {
        let mut ctx = FakeContext::default();
        let mut machine = ended_machine(&mut ctx);

        // baseline 1_100, inactivity 180
        let now = 1_100 + 180;
        let out = machine.tick(&snap(Some("Alley Cat"), Some(("Heavy Water", 1_000)), now), now, &mut ctx);
        assert!(!has_event(&out, |e| matches!(e, SessionEvent::ActiveAfterOffline { .. })));
        assert!(has_event(&out, |e| matches!(e, SessionEvent::SessionStarted { .. })));
    }

    #[test]
    fn continuation_suppresses_first_short_play() {
        let mut ctx = FakeContext::default();
        let mut machine = ended_machine(&mut ctx);

        // back with the same track that was playing before going offline
        let now = 10_000;
        machine.tick(&snap(Some("Heavy Water"), Some(("Heavy Water", 1_000)), now), now, &mut ctx);
        assert!(machine.state().continuation_candidate);

        let out = machine.tick(&snap(Some("Alley Cat"), Some(("Heavy Water", 1_000)), now + 20), now + 20, &mut ctx);
        assert_eq!(previous_play(&out).unwrap().verdict, Verdict::Continued);
        assert_eq!(machine.state().songs_skipped, 0);
        assert!(!machine.state().continuation_candidate);

        let out = machine.tick(&snap(Some("Tidal Wave"), Some(("Alley Cat", now + 20)), now + 40), now + 40, &mut ctx);
        assert_eq!(previous_play(&out).unwrap().verdict, Verdict::Skipped);
        assert_eq!(machine.state().songs_skipped, 1);
    }

    #[test]
    fn continuation_takes_precedence_over_replay_count() {
        let mut ctx = FakeContext::default();
        let mut machine = ended_machine(&mut ctx);

        let now = 10_000;
        let back = snap(Some("Heavy Water"), Some(("Heavy Water", 1_000)), now);
        machine.tick(&back, now, &mut ctx);
        assert!(machine.state().continuation_candidate);

        // the same track starts over with a fresh scrobble, outside the restatement grace
        let replay = snap(Some("Heavy Water"), Some(("Heavy Water", now + 5)), now + 30);
        let out = machine.tick(&replay, now + 30, &mut ctx);

        let play = previous_play(&out).unwrap();
        assert_eq!(play.verdict, Verdict::Continued);
        assert_eq!(play.played_for, 30);
        assert!(has_event(&out, |e| matches!(e, SessionEvent::TrackChanged { replay: true, .. })));
        assert_eq!(machine.state().same_track_repeat_count, 2);
        assert_eq!(machine.state().songs_skipped, 0);
        assert!(!machine.state().continuation_candidate);
    }

    #[test]
    fn new_scrobbles_while_offline_are_reported_without_phase_change() {
        let mut ctx = FakeContext::default();
        let mut machine = ended_machine(&mut ctx);
        ctx.history = vec![
            scrobble("Tidal Wave", 3_000),
            scrobble("Alley Cat", 2_700),
            scrobble("Heavy Water", 700),
        ];

        let out = machine.tick(&snap(None, Some(("Tidal Wave", 3_000)), 3_400), 3_400, &mut ctx);
        let entries = out
            .events
            .iter()
            .find_map(|e| match e {
                SessionEvent::OfflineEntries { entries, .. } => Some(entries.clone()),
                _ => None,
            })
            .unwrap();
        let titles: Vec<_> = entries.iter().map(|e| e.track.title.as_str()).collect();
        assert_eq!(titles, vec!["Alley Cat", "Tidal Wave"]);
        assert_eq!(machine.state().phase, Phase::Offline);
        assert_eq!(machine.state().previous_track_ts_seen, 3_000);

        // same history again is not reported twice
        let out = machine.tick(&snap(None, Some(("Tidal Wave", 3_000)), 3_415), 3_415, &mut ctx);
        assert!(out.events.is_empty());
    }

    #[test]
    fn restart_uses_persisted_activity_as_baseline() {
        let mut ctx = FakeContext::default();
        let persisted = PersistedActivity::new(1_100, &track("Heavy Water"));
        let startup = snap(None, Some(("Disengaged", 700)), 1_500);
        let mut machine = SessionMachine::start_offline(settings(), &startup, Some(&persisted));
        assert_eq!(machine.state().last_seen_active_at, 1_100);
        assert_eq!(machine.state().phase, Phase::Offline);

        let now = 6_100;
        let out = machine.tick(&snap(Some("Alley Cat"), Some(("Disengaged", 700)), now), now, &mut ctx);
        assert!(has_event(&out, |e| matches!(
            e,
            SessionEvent::ActiveAfterOffline { offline_for: 5_000, last_activity: 1_100, .. }
        )));
    }

    #[test]
    fn newer_history_wins_over_stale_persisted_record() {
        let persisted = PersistedActivity::new(500, &track("Heavy Water"));
        let startup = snap(None, Some(("Disengaged", 700)), 1_500);
        let machine = SessionMachine::start_offline(settings(), &startup, Some(&persisted));
        assert_eq!(machine.state().last_seen_active_at, 700);
        assert_eq!(machine.state().last_known_track.as_ref().unwrap().title, "Disengaged");
    }

    #[test]
    fn liveness_heartbeat_while_offline() {
        let mut ctx = FakeContext::default();
        let startup = snap(None, Some(("Disengaged", 700)), 1_000);
        let mut machine = SessionMachine::start_offline(
            SessionSettings {
                liveness_ticks: 3,
                ..SessionSettings::default()
            },
            &startup,
            None,
        );

        let mut beats = 0;
        for i in 1..=7 {
            let now = 1_000 + i * 15;
            let out = machine.tick(&snap(None, Some(("Disengaged", 700)), now), now, &mut ctx);
            beats += out
                .events
                .iter()
                .filter(|e| matches!(e, SessionEvent::Liveness { .. }))
                .count();
        }
        assert_eq!(beats, 2);
        assert_eq!(machine.state().phase, Phase::Offline);
    }
}
