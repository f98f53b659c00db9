// Monitor loop
// Seeds the session machine, polls on a timer and dispatches the events it emits

use crate::config::{Config, RuntimeFlags};
use crate::duration::DurationResolver;
use crate::error_burst::{Disposition, ErrorBurstSuppressor};
use crate::humanize;
use crate::links::{search_links, SearchLinks};
use crate::notify::messages::{self, Reactivation};
use crate::notify::{Notification, Notifier, SmtpNotifier};
use crate::recorder::{ActivityStore, CsvRecorder};
use crate::scrobbler::lastfm::LastFmSource;
use crate::scrobbler::{
    ScrobbleEntry, ScrobbleSource, Snapshot, SnapshotFetcher, Timestamp, TrackRef,
    REACTIVATION_HISTORY_DEPTH, STEADY_HISTORY_DEPTH,
};
use crate::session::classifier::Verdict;
use crate::session::events::{SessionEvent, SessionSummary, TickOutcome};
use crate::session::{SessionMachine, TickContext};
use crate::signals::{ControlMessage, SignalQueue};
use crate::spotify::playback::{select_controller, PlayTarget, PlaybackController};
use crate::spotify::{DurationLookup, SpotifyClient, SpotifyTrack};
use crate::text_cleanup::TextCleaner;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

const SEPARATOR: &str =
    "-----------------------------------------------------------------------------------";

/// External services the monitor talks to
pub struct Services {
    pub source: Box<dyn ScrobbleSource>,
    pub spotify: Option<Box<dyn DurationLookup>>,
    pub notifier: Option<Box<dyn Notifier>>,
    pub playback: Box<dyn PlaybackController>,
}

impl Services {
    pub fn from_config(config: &Config, flags: &RuntimeFlags) -> Result<Self> {
        let timeout = Duration::from_secs(config.timers.http_timeout);
        let source = Box::new(LastFmSource::new(config.lastfm.api_key.clone(), timeout));

        let spotify = if config.spotify.enabled {
            Some(Box::new(SpotifyClient::new(
                config.spotify.client_id.clone(),
                config.spotify.client_secret.clone(),
                timeout,
            )) as Box<dyn DurationLookup>)
        } else {
            None
        };

        let notifier = match config.validate_smtp() {
            Ok(()) => {
                Some(Box::new(SmtpNotifier::new(&config.smtp, timeout)?) as Box<dyn Notifier>)
            }
            Err(e) if flags.any_notification() => return Err(e),
            Err(_) => {
                if flags.error_notification {
                    log::debug!("SMTP is not configured, error notifications are off");
                }
                None
            }
        };

        Ok(Self {
            source,
            spotify,
            notifier,
            playback: select_controller(flags.track_songs),
        })
    }
}

/// Track and album names watched for, matched case-insensitively
#[derive(Debug, Default, Clone)]
pub struct TrackedList {
    names: Vec<String>,
}

impl TrackedList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        Self { names }
    }

    /// One name per line
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read tracked list: {:?}", path))?;
        Ok(Self::new(content.lines()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn matches(&self, track: &TrackRef) -> bool {
        let title = track.title.to_lowercase();
        let album = track.album.to_lowercase();
        self.names.iter().any(|n| *n == title || (!album.is_empty() && *n == album))
    }
}

/// Per-run settings that do not live in the config file
pub struct MonitorOptions {
    pub user: String,
    pub config_path: PathBuf,
    pub csv_file: Option<PathBuf>,
    pub tracked: TrackedList,
    pub output_dir: PathBuf,
    pub log_file: Option<PathBuf>,
}

/// Adapts the monitor's collaborators to what the session machine needs
struct Collaborators<'a> {
    user: &'a str,
    fetcher: &'a SnapshotFetcher,
    durations: &'a mut DurationResolver,
}

impl TickContext for Collaborators<'_> {
    fn history(&mut self, depth: usize) -> Result<Vec<ScrobbleEntry>> {
        Ok(self.fetcher.history(self.user, depth)?)
    }

    fn duration(&mut self, track: &TrackRef) -> Option<u64> {
        self.durations.resolve(self.fetcher.source(), track)
    }
}

pub struct Monitor {
    options: MonitorOptions,
    config: Config,
    flags: RuntimeFlags,
    fetcher: SnapshotFetcher,
    durations: DurationResolver,
    notifier: Option<Box<dyn Notifier>>,
    playback: Box<dyn PlaybackController>,
    recorder: Option<CsvRecorder>,
    store: ActivityStore,
    cleaner: TextCleaner,
    suppressor: ErrorBurstSuppressor,
    machine: Option<SessionMachine>,
}

impl Monitor {
    pub fn new(
        options: MonitorOptions,
        config: Config,
        flags: RuntimeFlags,
        services: Services,
    ) -> Result<Self> {
        let recorder = match &options.csv_file {
            Some(path) => Some(CsvRecorder::open(path)?),
            None => None,
        };
        let store = ActivityStore::for_user(&options.output_dir, &options.user);
        let suppressor = ErrorBurstSuppressor::new(config.burst_settings())?;

        Ok(Self {
            fetcher: SnapshotFetcher::new(services.source),
            durations: DurationResolver::new(services.spotify, config.spotify.use_for_durations),
            notifier: services.notifier,
            playback: services.playback,
            recorder,
            store,
            cleaner: TextCleaner::new(&config.cleanup),
            suppressor,
            machine: None,
            options,
            config,
            flags,
        })
    }

    #[cfg(test)]
    pub fn flags(&self) -> &RuntimeFlags {
        &self.flags
    }

    #[cfg(test)]
    pub fn machine(&self) -> Option<&SessionMachine> {
        self.machine.as_ref()
    }

    /// Print the effective settings
    pub fn print_banner(&self) {
        let t = &self.config.timers;
        let f = &self.flags;
        log::info!(
            "Last.fm timers:\t\t\t[check interval: {}] [active check interval: {}] [inactivity: {}]",
            humanize::display_time(t.check_interval as i64, 2),
            humanize::display_time(t.active_check_interval as i64, 2),
            humanize::display_time(f.inactivity as i64, 2)
        );
        log::info!(
            "Email notifications:\t\t[active = {}] [inactive = {}] [tracked = {}] [every song = {}]",
            f.active_notification,
            f.inactive_notification,
            f.tracked_notification,
            f.song_notification
        );
        log::info!(
            "\t\t\t\t[songs on loop = {}] [offline entries = {}] [errors = {}]",
            f.song_on_loop_notification,
            f.offline_entries_notification,
            f.error_notification
        );
        log::info!("Progress indicator enabled:\t{}", f.progress_indicator);
        log::info!("Track listened songs:\t\t{}", f.track_songs);
        let break_detection = match self.config.session_settings().break_window() {
            Some(w) => format!("{} ({}x)", humanize::display_time(w, 2), t.break_multiplier),
            None => "off".to_string(),
        };
        log::info!("Play break detection:\t\t{}", break_detection);
        match &self.options.csv_file {
            Some(path) => log::info!("CSV logging enabled:\t\ttrue ({})", path.display()),
            None => log::info!("CSV logging enabled:\t\tfalse"),
        }
        match &self.options.log_file {
            Some(path) => log::info!("Output logging enabled:\t\ttrue ({})", path.display()),
            None => log::info!("Output logging enabled:\t\tfalse"),
        }
        if !self.options.tracked.is_empty() {
            log::info!("Tracked songs/albums:\t\t{}", self.options.tracked.len());
        }
        log::info!("{}", SEPARATOR);
    }

    /// Seed the session from the first fetch. A failure here is fatal.
    pub fn start(&mut self, now: Timestamp) -> Result<()> {
        let user = self.options.user.clone();
        let snapshot = self
            .fetcher
            .fetch(&user, REACTIVATION_HISTORY_DEPTH)
            .with_context(|| format!("Failed to get recent tracks for user '{}'", user))?;

        let persisted = match self.store.load() {
            Ok(Some(activity)) => {
                let modified = self
                    .store
                    .modified()
                    .map(|m| m.format("%a %d %b %Y, %H:%M:%S").to_string())
                    .unwrap_or_default();
                log::info!("Last activity loaded from file {:?} ({})", self.store.path(), modified);
                Some(activity)
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("Cannot load last activity: {:#}", e);
                None
            }
        };

        log::info!("Recently played tracks:");
        for line in recent_table(&snapshot.recent) {
            log::info!("{}", line);
        }
        log::info!("{}", SEPARATOR);

        let settings = self.session_settings();
        if snapshot.now_playing.is_none() {
            let machine = SessionMachine::start_offline(settings, &snapshot, persisted.as_ref());
            let st = machine.state();
            if let Some(track) = &st.last_known_track {
                log::info!("Last played:\t\t\t{}", track);
            }
            log::info!("Last activity:\t\t\t{}", humanize::date(st.last_seen_active_at));
            log::info!(
                "*** User is OFFLINE for {}",
                humanize::timespan(now, st.last_seen_active_at)
            );
            log::info!("{}", SEPARATOR);
            self.machine = Some(machine);
            return Ok(());
        }

        let mut ctx = Collaborators {
            user: &self.options.user,
            fetcher: &self.fetcher,
            durations: &mut self.durations,
        };
        let (machine, outcome) = SessionMachine::start_online(settings, &snapshot, now, &mut ctx);
        self.machine = Some(machine);
        log::info!("*** User is currently ACTIVE");
        self.dispatch(outcome, now);
        Ok(())
    }

    fn session_settings(&self) -> crate::session::SessionSettings {
        let mut settings = self.config.session_settings();
        settings.inactivity_threshold = self.flags.inactivity;
        settings
    }

    /// Poll forever
    pub fn run(mut self, mut signals: SignalQueue) -> Result<()> {
        loop {
            for message in signals.drain() {
                self.apply_control(message);
            }

            let now = chrono::Utc::now().timestamp();
            self.step(now);

            let interval = self
                .machine
                .as_ref()
                .map(|m| m.next_interval(self.config.timers.check_interval))
                .unwrap_or(self.config.timers.check_interval);
            thread::sleep(Duration::from_secs(interval));
        }
    }

    /// One guarded tick
    pub fn step(&mut self, now: Timestamp) {
        match self.tick(now) {
            Ok(()) => self.suppressor.tick_succeeded(),
            Err(e) => self.handle_error(&e, now),
        }
    }

    fn tick(&mut self, now: Timestamp) -> Result<()> {
        let snapshot: Snapshot = self.fetcher.fetch(&self.options.user, STEADY_HISTORY_DEPTH)?;

        let Some(machine) = self.machine.as_mut() else {
            anyhow::bail!("Monitor was not started");
        };
        machine.settings_mut().inactivity_threshold = self.flags.inactivity;

        let mut ctx = Collaborators {
            user: &self.options.user,
            fetcher: &self.fetcher,
            durations: &mut self.durations,
        };
        let outcome = machine.tick(&snapshot, now, &mut ctx);
        log::debug!(
            "Tick at {}: {} event(s), phase {}",
            now,
            outcome.events.len(),
            machine.state().phase
        );

        self.dispatch(outcome, now);
        Ok(())
    }

    fn handle_error(&mut self, err: &anyhow::Error, now: Timestamp) {
        let interval = self
            .machine
            .as_ref()
            .map(|m| m.next_interval(self.config.timers.check_interval))
            .unwrap_or(self.config.timers.check_interval);
        let retry_in = humanize::display_time(interval as i64, 2);

        match self.suppressor.on_error(err, now) {
            Disposition::Suppressed => {}
            Disposition::Surface(line) => {
                log::error!("Error, retrying in {}: {}", retry_in, line);
            }
            Disposition::SurfaceAndNotify(line) => {
                log::error!("Error, retrying in {}: {}", retry_in, line);
                if self.flags.error_notification {
                    log::info!("Sending email notification to {}", self.config.smtp.receiver);
                    let message = messages::error(&self.options.user, &line, now);
                    self.send(&message);
                }
            }
        }
    }

    pub fn apply_control(&mut self, message: ControlMessage) {
        log::info!("{}", SEPARATOR);
        match message.apply(&mut self.flags, self.config.timers.inactivity_signal_step) {
            Some(line) => log::info!("* Signal received: {} ({})", line, humanize::now_stamp()),
            None => match self.reload_secrets() {
                Ok(()) => {
                    log::info!("* Signal received: secrets reloaded ({})", humanize::now_stamp())
                }
                Err(e) => log::error!("Failed to reload secrets: {:#}", e),
            },
        }
        log::info!("{}", SEPARATOR);
    }

    fn reload_secrets(&mut self) -> Result<()> {
        let mut config = self.config.clone();
        config.reload_secrets(&self.options.config_path)?;
        let services = Services::from_config(&config, &self.flags)?;

        self.fetcher = SnapshotFetcher::new(services.source);
        self.durations = DurationResolver::new(services.spotify, config.spotify.use_for_durations);
        self.notifier = services.notifier;
        self.config = config;
        Ok(())
    }

    fn send(&self, message: &Notification) {
        let Some(notifier) = &self.notifier else {
            log::debug!("No notifier configured, dropping: {}", message.subject);
            return;
        };
        if let Err(e) = notifier.send(message) {
            log::error!("Error sending email: {:#}", e);
        }
    }

    fn record(&self, started_at: Timestamp, track: &TrackRef) {
        if let Some(recorder) = &self.recorder {
            if let Err(e) = recorder.record(started_at, track) {
                log::warn!("Cannot write CSV entry: {:#}", e);
            }
        }
    }

    fn links(&self, track: &TrackRef) -> SearchLinks {
        search_links(track, &self.cleaner)
    }

    fn dispatch(&mut self, outcome: TickOutcome, now: Timestamp) {
        if let Some(activity) = &outcome.persist {
            if let Err(e) = self.store.save(activity) {
                log::warn!("Cannot save last activity: {:#}", e);
            }
        }

        // at most one email about the current track per tick
        let mut track_email_sent = false;

        for event in outcome.events {
            match event {
                SessionEvent::SessionStarted { track, last_activity } => {
                    log::info!("*** User got ACTIVE: {}", track);
                    if self.flags.active_notification {
                        let message = messages::active(
                            &self.options.user,
                            &track,
                            self.current_duration(),
                            &self.links(&track),
                            last_activity,
                            None,
                            now,
                        );
                        self.send(&message);
                        track_email_sent = true;
                    }
                }
                SessionEvent::ActiveAfterOffline {
                    track,
                    offline_for,
                    last_activity,
                    last_track_start_changed,
                    private_mode,
                } => {
                    if let Some((old, new)) = last_track_start_changed {
                        log::info!(
                            "* Last track start changed from {} to {} (offline mode?)",
                            humanize::date(old),
                            humanize::date(new)
                        );
                    }
                    if let Some(window) = &private_mode {
                        log::info!(
                            "* Duplicate entries found, possible PRIVATE MODE between {}",
                            humanize::date_range(window.from, window.to, true)
                        );
                    }
                    log::info!(
                        "*** User got ACTIVE after being offline for {} ({})",
                        humanize::timespan(now, last_activity),
                        humanize::date(last_activity)
                    );
                    if self.flags.active_notification {
                        let reactivation = Reactivation {
                            offline_for,
                            last_track_start_changed,
                            private_mode: private_mode.as_ref(),
                        };
                        let message = messages::active(
                            &self.options.user,
                            &track,
                            self.current_duration(),
                            &self.links(&track),
                            last_activity,
                            Some(&reactivation),
                            now,
                        );
                        self.send(&message);
                        track_email_sent = true;
                    }
                }
                SessionEvent::TrackChanged {
                    track,
                    started_at,
                    duration,
                    previous_play,
                    replay,
                } => {
                    if let Some(play) = &previous_play {
                        log_previous_play(play.verdict, play.played_for, play.percent);
                    }
                    self.on_track_changed(
                        &track,
                        started_at,
                        duration,
                        replay,
                        &mut track_email_sent,
                        previous_play.as_ref(),
                        now,
                    );
                }
                SessionEvent::SongOnLoop { track, repeats } => {
                    log::info!("*** User plays song on LOOP ({} times): {}", repeats, track);
                    if self.flags.song_on_loop_notification {
                        let links = self.links(&track);
                        let message =
                            messages::song_on_loop(&self.options.user, &track, repeats, &links, now);
                        self.send(&message);
                    }
                }
                SessionEvent::Paused {
                    track,
                    played_since_resume,
                    last_activity,
                    break_window,
                } => {
                    log::info!(
                        "*** User PAUSED playback after {} ({}), no activity for {}",
                        humanize::display_time(played_since_resume, 2),
                        humanize::hour_min(last_activity, true),
                        humanize::display_time(break_window, 2)
                    );
                    if let Some(track) = track {
                        log::debug!("Paused on {}", track);
                    }
                    if self.flags.track_songs {
                        self.playback.pause();
                    }
                }
                SessionEvent::Resumed { track, paused_for } => {
                    log::info!(
                        "*** User RESUMED playback of {} after {}",
                        track,
                        humanize::display_time(paused_for, 2)
                    );
                    if self.flags.track_songs {
                        self.playback.resume();
                    }
                }
                SessionEvent::SessionEnded(summary) => self.on_session_ended(&summary, now),
                SessionEvent::OfflineEntries {
                    entries,
                    possible_private_mode,
                } => {
                    log::info!("*** New Last.fm entries showed up while user was offline:");
                    for line in recent_table(&entries.iter().rev().cloned().collect::<Vec<_>>()) {
                        log::info!("{}", line);
                    }
                    for entry in &entries {
                        self.record(entry.played_at, &entry.track);
                    }
                    if self.flags.offline_entries_notification {
                        let message = messages::offline_entries(
                            &self.options.user,
                            &entries,
                            possible_private_mode,
                            now,
                        );
                        self.send(&message);
                    }
                    log::info!("{}", SEPARATOR);
                }
                SessionEvent::Progress { at, elapsed, .. } => {
                    if self.flags.progress_indicator {
                        log::info!(
                            "# {} +{}",
                            humanize::hour_min(at, true),
                            humanize::clock(elapsed)
                        );
                    }
                }
                SessionEvent::Liveness { at } => {
                    log::info!("alive check, timestamp: {}", humanize::date(at));
                }
            }
        }
    }

    fn current_duration(&self) -> Option<u64> {
        self.machine
            .as_ref()
            .and_then(|m| m.state().resolved_duration_seconds)
    }

    #[allow(clippy::too_many_arguments)]
    fn on_track_changed(
        &mut self,
        track: &TrackRef,
        started_at: Timestamp,
        duration: Option<u64>,
        replay: bool,
        track_email_sent: &mut bool,
        previous_play: Option<&crate::session::classifier::Classification>,
        now: Timestamp,
    ) {
        let links = self.links(track);
        log::info!("{}", SEPARATOR);
        log::info!("Last.fm user:\t\t{}", self.options.user);
        log::info!("Track:\t\t\t{}{}", track, if replay { " (again)" } else { "" });
        if let Some(duration) = duration {
            log::info!("Duration:\t\t{}", humanize::display_time(duration as i64, 2));
        }
        log::info!("Album:\t\t\t{}", track.album);
        log::info!("Spotify search URL:\t{}", links.spotify);
        log::info!("Apple search URL:\t{}", links.apple);
        log::info!("Genius lyrics URL:\t{}", links.genius);
        log::info!("Started at:\t\t{}", humanize::date(started_at));

        self.record(started_at, track);

        let tracked = self.options.tracked.matches(track);
        if tracked {
            log::info!("*** Track/album matched: {}", track);
        }

        if !*track_email_sent {
            let message = if tracked && self.flags.tracked_notification {
                Some(messages::tracked(&self.options.user, track, duration, &links, now))
            } else if self.flags.song_notification {
                Some(messages::song(
                    &self.options.user,
                    track,
                    duration,
                    &links,
                    previous_play,
                    now,
                ))
            } else {
                None
            };
            if let Some(message) = message {
                self.send(&message);
                *track_email_sent = true;
            }
        }

        if self.flags.track_songs {
            let target = match self.durations.spotify_match(track) {
                Some(found) => PlayTarget::Track(found),
                None => PlayTarget::SearchUrl(links.spotify.clone()),
            };
            self.playback.play(&target);
        }
    }

    fn on_session_ended(&mut self, summary: &SessionSummary, now: Timestamp) {
        log::info!("{}", SEPARATOR);
        if let Some(play) = &summary.final_play {
            log_previous_play(play.verdict, play.played_for, play.percent);
        }
        log::info!(
            "*** User got INACTIVE after listening to music for {}",
            humanize::display_time(summary.span_seconds(), 3)
        );
        log::info!(
            "*** User played music from {}",
            humanize::date_range(summary.started_at, summary.last_activity, true)
        );
        if summary.paused_seconds > 0 {
            log::info!(
                "*** User paused music {} times for {}{}",
                summary.pause_count,
                humanize::display_time(summary.paused_seconds as i64, 2),
                summary.paused_percent().map(|p| format!(" ({}%)", p)).unwrap_or_default()
            );
        }
        log::info!(
            "*** User played {} songs, skipped {}{}, on loop {}",
            summary.songs_played,
            summary.songs_skipped,
            summary.skipped_percent().map(|p| format!(" ({}%)", p)).unwrap_or_default(),
            summary.songs_looped
        );
        log::info!("*** Last activity: {}", humanize::date(summary.last_activity));

        if self.flags.inactive_notification {
            let links = summary.last_track.as_ref().map(|t| self.links(t));
            let message = messages::inactive(&self.options.user, summary, links.as_ref(), now);
            self.send(&message);
        }

        if self.flags.track_songs {
            let offline_track = self.config.spotify.offline_track_id.trim();
            if offline_track.is_empty() {
                self.playback.pause();
            } else {
                self.playback.play(&PlayTarget::Track(SpotifyTrack {
                    id: offline_track.to_string(),
                    duration: 0,
                }));
                thread::sleep(Duration::from_secs(self.config.spotify.offline_pause_delay));
                self.playback.pause();
            }
        }
        log::info!("{}", SEPARATOR);
    }
}

fn log_previous_play(verdict: Verdict, played_for: u64, percent: Option<u32>) {
    let played = humanize::display_time(played_for as i64, 2);
    let percent = percent.map(|p| format!(" ({}%)", p)).unwrap_or_default();
    match verdict {
        Verdict::Skipped => {
            log::info!("*** User SKIPPED the previous track after {}{}", played, percent)
        }
        Verdict::Continued => {
            log::info!("*** User CONT the previous track for {}{}", played, percent)
        }
        Verdict::Longer => {
            log::info!("*** User played the previous track LONGER: {}{}", played, percent)
        }
        Verdict::Normal => {
            log::info!("*** User played the previous track for {}{}", played, percent)
        }
    }
}

/// Numbered history lines, oldest first, marking repeated timestamps
pub fn recent_table(newest_first: &[ScrobbleEntry]) -> Vec<String> {
    let mut lines = Vec::with_capacity(newest_first.len() + 1);
    let mut previous: Option<Timestamp> = None;
    let mut duplicates = false;

    for (i, entry) in newest_first.iter().rev().enumerate() {
        let mut line = format!("{}\t{}\t{}", i + 1, humanize::date(entry.played_at), entry.track);
        if previous == Some(entry.played_at) {
            line.push_str("\tDUPLICATE ENTRY");
            duplicates = true;
        }
        previous = Some(entry.played_at);
        lines.push(line);
    }

    if duplicates {
        lines.push("*** Duplicate entries found, possible PRIVATE MODE".to_string());
    }
    lines
}

/// `--list-recent`: print the user's history and current state
pub fn list_recent(
    source: Box<dyn ScrobbleSource>,
    user: &str,
    count: usize,
    now: Timestamp,
) -> Result<()> {
    let fetcher = SnapshotFetcher::new(source);
    let snapshot = fetcher
        .fetch(user, count)
        .with_context(|| format!("Failed to get recent tracks for user '{}'", user))?;

    log::info!("List of recently listened tracks for user '{}':", user);
    log::info!("{}", SEPARATOR);
    for line in recent_table(&snapshot.recent) {
        log::info!("{}", line);
    }
    log::info!("{}", SEPARATOR);

    match (&snapshot.now_playing, snapshot.recent.first()) {
        (Some(track), _) => log::info!("*** User is currently ACTIVE: {}", track),
        (None, Some(last)) => log::info!(
            "*** User played last time {} ago ({})",
            humanize::timespan(now, last.played_at),
            humanize::date(last.played_at)
        ),
        (None, None) => log::info!("*** No listening history"),
    }
    Ok(())
}
