// Subjects and bodies of the notification emails

use super::Notification;
use crate::humanize;
use crate::links::SearchLinks;
use crate::scrobbler::{ScrobbleEntry, Timestamp, TrackRef};
use crate::session::classifier::{Classification, Verdict};
use crate::session::events::{PrivateModeWindow, SessionSummary};

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Builds the plain and HTML bodies side by side
struct Body {
    plain: String,
    html: String,
}

impl Body {
    fn new() -> Self {
        Self {
            plain: String::new(),
            html: String::new(),
        }
    }

    fn newline(&mut self) {
        self.plain.push('\n');
        self.html.push_str("<br>");
    }

    fn text(&mut self, text: &str) {
        self.plain.push_str(text);
        self.html.push_str(&escape(text));
    }

    fn line(&mut self, text: &str) {
        if !self.plain.is_empty() {
            self.newline();
        }
        self.text(text);
    }

    fn field(&mut self, label: &str, value: &str) {
        self.line(&format!("{}: ", label));
        self.text(value);
    }

    fn bold_field(&mut self, label: &str, value: &str) {
        self.line(&format!("{}: ", label));
        self.plain.push_str(value);
        self.html.push_str(&format!("<b>{}</b>", escape(value)));
    }

    fn link_field(&mut self, label: &str, url: &str, title: &str, bold: bool) {
        self.line(&format!("{}: ", label));
        self.plain.push_str(url);
        let link = format!("<a href=\"{}\">{}</a>", escape(url), escape(title));
        if bold {
            self.html.push_str(&format!("<b>{}</b>", link));
        } else {
            self.html.push_str(&link);
        }
    }

    fn paragraph(&mut self) {
        self.newline();
    }

    fn finish(mut self, subject: String, now: Timestamp) -> Notification {
        self.paragraph();
        self.field("Timestamp", &humanize::date(now));
        Notification {
            subject,
            plain: self.plain,
            html: format!("<html><head></head><body>{}</body></html>", self.html),
        }
    }
}

/// Track block shared by the track-related messages
fn track_block(
    body: &mut Body,
    label: &str,
    track: &TrackRef,
    duration: Option<u64>,
    links: &SearchLinks,
) {
    body.link_field(label, &links.spotify, &track.to_string(), true);
    if let Some(duration) = duration {
        body.field("Duration", &humanize::display_time(duration as i64, 2));
    }
    body.field("Album", &track.album);
    body.paragraph();
    body.link_field("Apple search URL", &links.apple, &track.to_string(), false);
    body.link_field("Genius lyrics URL", &links.genius, &track.to_string(), false);
}

fn previous_play_line(body: &mut Body, play: &Classification) {
    let played = humanize::display_time(play.played_for as i64, 2);
    let percent = play.percent.map(|p| format!(" ({}%)", p)).unwrap_or_default();
    let text = match play.verdict {
        Verdict::Skipped => format!("User SKIPPED the previous track after: {}{}", played, percent),
        Verdict::Continued => format!("User CONT the previous track for: {}{}", played, percent),
        Verdict::Longer => format!(
            "User played the previous track LONGER than its duration: {}{}",
            played, percent
        ),
        Verdict::Normal => format!("User played the previous track for: {}{}", played, percent),
    };
    body.paragraph();
    body.line(&text);
}

/// Details of an Offline -> Online transition
pub struct Reactivation<'a> {
    pub offline_for: i64,
    pub last_track_start_changed: Option<(Timestamp, Timestamp)>,
    pub private_mode: Option<&'a PrivateModeWindow>,
}

pub fn active(
    user: &str,
    track: &TrackRef,
    duration: Option<u64>,
    links: &SearchLinks,
    last_activity: Timestamp,
    reactivation: Option<&Reactivation<'_>>,
    now: Timestamp,
) -> Notification {
    let subject = match reactivation {
        Some(r) => format!(
            "Last.fm user {} is active: '{}' (after {} - {})",
            user,
            track,
            humanize::display_time(r.offline_for, 2),
            humanize::short_date(last_activity)
        ),
        None => format!("Last.fm user {} is active: '{}'", user, track),
    };

    let mut body = Body::new();
    track_block(&mut body, "Track", track, duration, links);
    if let Some(r) = reactivation {
        body.paragraph();
        body.bold_field(
            "Friend got active after being offline for",
            &humanize::display_time(r.offline_for, 3),
        );
        if let Some((old, new)) = r.last_track_start_changed {
            body.line(&format!(
                "Last track start changed from {} to {} (offline mode?)",
                humanize::date(old),
                humanize::date(new)
            ));
        }
        if let Some(window) = r.private_mode {
            body.line(&format!(
                "Possible PRIVATE MODE between {}",
                humanize::date_range(window.from, window.to, true)
            ));
        }
    }
    body.paragraph();
    body.bold_field("Last activity", &humanize::date(last_activity));
    body.finish(subject, now)
}

pub fn song(
    user: &str,
    track: &TrackRef,
    duration: Option<u64>,
    links: &SearchLinks,
    previous_play: Option<&Classification>,
    now: Timestamp,
) -> Notification {
    let subject = format!("Last.fm user {}: '{}'", user, track);
    let mut body = Body::new();
    track_block(&mut body, "Track", track, duration, links);
    if let Some(play) = previous_play {
        previous_play_line(&mut body, play);
    }
    body.finish(subject, now)
}

pub fn tracked(
    user: &str,
    track: &TrackRef,
    duration: Option<u64>,
    links: &SearchLinks,
    now: Timestamp,
) -> Notification {
    let subject = format!("Last.fm user {} is playing a tracked song: '{}'", user, track);
    let mut body = Body::new();
    track_block(&mut body, "Track", track, duration, links);
    body.paragraph();
    body.line("Track/album matched the tracked list");
    body.finish(subject, now)
}

pub fn song_on_loop(
    user: &str,
    track: &TrackRef,
    repeats: u32,
    links: &SearchLinks,
    now: Timestamp,
) -> Notification {
    let subject = format!("Last.fm user {} plays song on loop: '{}'", user, track);
    let mut body = Body::new();
    track_block(&mut body, "Track", track, None, links);
    body.paragraph();
    body.bold_field("User plays this song on LOOP, times in a row", &repeats.to_string());
    body.finish(subject, now)
}

pub fn inactive(
    user: &str,
    summary: &SessionSummary,
    links: Option<&SearchLinks>,
    now: Timestamp,
) -> Notification {
    let listened = humanize::display_time(summary.span_seconds(), 3);
    let range = humanize::date_range(summary.started_at, summary.last_activity, true);
    let title = summary
        .last_track
        .as_ref()
        .map(|t| t.to_string())
        .unwrap_or_default();
    let subject = format!(
        "Last.fm user {} is inactive: '{}' (after {}: {})",
        user,
        title,
        humanize::display_time(summary.span_seconds(), 2),
        range
    );

    let mut body = Body::new();
    if let (Some(track), Some(links)) = (&summary.last_track, links) {
        track_block(&mut body, "Last played", track, None, links);
        body.paragraph();
    }
    body.bold_field("User got inactive after listening to music for", &listened);
    body.bold_field("User played music from", &range);

    if summary.paused_seconds > 0 {
        let percent = summary
            .paused_percent()
            .map(|p| format!(" ({}%)", p))
            .unwrap_or_default();
        body.paragraph();
        body.line(&format!(
            "User paused music {} times for {}{}",
            summary.pause_count,
            humanize::display_time(summary.paused_seconds as i64, 2),
            percent
        ));
    }

    body.paragraph();
    body.field("Songs played", &summary.songs_played.to_string());
    if summary.songs_skipped > 0 {
        let percent = summary
            .skipped_percent()
            .map(|p| format!(" ({}%)", p))
            .unwrap_or_default();
        body.field("Songs skipped", &format!("{}{}", summary.songs_skipped, percent));
    }
    if summary.songs_looped > 0 {
        body.field("Songs on loop", &summary.songs_looped.to_string());
    }
    if let Some(play) = &summary.final_play {
        previous_play_line(&mut body, play);
    }

    body.paragraph();
    body.bold_field("Last activity", &humanize::date(summary.last_activity));
    body.field(
        "Inactivity timer",
        &humanize::display_time(summary.inactivity_threshold as i64, 2),
    );
    body.finish(subject, now)
}

pub fn offline_entries(
    user: &str,
    entries: &[ScrobbleEntry],
    possible_private_mode: bool,
    now: Timestamp,
) -> Notification {
    let subject = format!("Last.fm user {}: new entries showed up while user was offline", user);
    let mut body = Body::new();
    body.line("New last.fm entries showed up while user was offline!");
    body.paragraph();
    for (i, entry) in entries.iter().enumerate() {
        body.line(&format!("{}\t{}\t{}", i + 1, humanize::date(entry.played_at), entry.track));
    }
    if possible_private_mode {
        body.paragraph();
        body.line("Duplicate entries found, possible PRIVATE MODE");
    }
    body.finish(subject, now)
}

pub fn error(user: &str, message: &str, now: Timestamp) -> Notification {
    let subject = format!("lastfm_monitor: API key error! (user: {})", user);
    let mut body = Body::new();
    body.field("API key might not be valid anymore", message);
    body.finish(subject, now)
}
