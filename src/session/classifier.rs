// Play classification
// Decides whether a finished play was skipped, continued, normal or longer than the track

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Skip limit in seconds when the duration is unknown
    pub skip_no_duration: u64,
    /// Skip limit as a fraction of the duration
    pub skip_fraction: f64,
    /// Played/duration ratio at which a play counts as longer than the track
    pub longer_fraction: f64,
    /// Seconds over the duration at which a play counts as longer than the track
    pub longer_seconds: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            skip_no_duration: 35,
            skip_fraction: 0.55,
            longer_fraction: 1.30,
            longer_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Skipped,
    /// Short play that resumes what was playing before going offline
    Continued,
    Normal,
    Longer,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Skipped => "SKIPPED",
            Self::Continued => "CONT",
            Self::Normal => "played",
            Self::Longer => "LONGER",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub verdict: Verdict,
    pub played_for: u64,
    pub duration: Option<u64>,
    /// Listened percentage, only when the duration is known
    pub percent: Option<u32>,
}

/// Classify a play of `played_for` seconds.
///
/// Polling happens every `tick_interval` seconds, so near the end of a track the
/// boundary is only known to within one interval.
pub fn classify(
    played_for: u64,
    duration: Option<u64>,
    is_continuation_candidate: bool,
    tick_interval: u64,
    thresholds: &Thresholds,
) -> Classification {
    let short_play = if is_continuation_candidate {
        Verdict::Continued
    } else {
        Verdict::Skipped
    };

    let duration = duration.filter(|d| *d > 1);
    let Some(duration) = duration else {
        let verdict = if played_for <= thresholds.skip_no_duration {
            short_play
        } else {
            Verdict::Normal
        };
        return Classification {
            verdict,
            played_for,
            duration: None,
            percent: None,
        };
    };

    let ratio = played_for as f64 / (duration - 1) as f64;
    let percent = Some((ratio * 100.0) as u32);
    let near_end = duration.saturating_sub(tick_interval + 1);

    let verdict = if played_for < near_end {
        if ratio <= thresholds.skip_fraction {
            short_play
        } else {
            Verdict::Normal
        }
    } else if ratio >= thresholds.longer_fraction
        || played_for.saturating_sub(duration) >= thresholds.longer_seconds
    {
        Verdict::Longer
    } else {
        Verdict::Normal
    };

    Classification {
        verdict,
        played_for,
        duration: Some(duration),
        percent,
    }
}
