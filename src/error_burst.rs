// Error-burst suppression
// Keeps sporadic upstream noise out of the log until it turns into sustained failure

use crate::scrobbler::{Timestamp, UpstreamError, UpstreamKind};
use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use std::fmt;

const SERVER_ERROR_PATTERN: &str =
    r"\b50[0-9]\b|internal server error|bad gateway|service unavailable|gateway time-?out|operation failed";
const NETWORK_PATTERN: &str = r"timed? ?out|connection (reset|refused|aborted)|name resolution|failed to resolve|network is unreachable|broken pipe|rate limit|\b429\b";
const CREDENTIAL_PATTERN: &str =
    r"invalid api key|api key suspended|invalid session key|invalid authentication token|401 unauthorized";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Upstream5xx,
    NetworkTransient,
    Other,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Upstream5xx => "upstream server",
            Self::NetworkTransient => "network",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// What the loop should do with a failed tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Suppressed,
    /// Log one line
    Surface(String),
    /// Log one line and send the error notification
    SurfaceAndNotify(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstSettings {
    /// Errors of one class needed before a line is surfaced
    pub count: u32,
    /// Seconds that must have passed since the first error of the run
    pub window: i64,
}

impl Default for BurstSettings {
    fn default() -> Self {
        Self {
            count: 15,
            window: 120,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct BurstCounter {
    count: u32,
    window_start: Timestamp,
}

impl BurstCounter {
    /// Count one error at `now`, returns the run length once both the count
    /// and the elapsed time since the first error reach their thresholds
    fn record(&mut self, now: Timestamp, settings: &BurstSettings) -> Option<(u32, i64)> {
        if self.count == 0 {
            self.window_start = now;
        }
        self.count += 1;

        let elapsed = now - self.window_start;
        if self.count < settings.count || elapsed < settings.window {
            return None;
        }
        let burst = (self.count, elapsed);
        *self = Self::default();
        Some(burst)
    }
}

pub struct ErrorBurstSuppressor {
    settings: BurstSettings,
    server: BurstCounter,
    network: BurstCounter,
    server_re: Regex,
    network_re: Regex,
    credential_re: Regex,
    /// Credential notification already sent during the current failure streak
    notified: bool,
}

fn case_insensitive(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("Invalid error pattern: {}", pattern))
}

impl ErrorBurstSuppressor {
    pub fn new(settings: BurstSettings) -> Result<Self> {
        Ok(Self {
            settings,
            server: BurstCounter::default(),
            network: BurstCounter::default(),
            server_re: case_insensitive(SERVER_ERROR_PATTERN)?,
            network_re: case_insensitive(NETWORK_PATTERN)?,
            credential_re: case_insensitive(CREDENTIAL_PATTERN)?,
            notified: false,
        })
    }

    /// Classify by the upstream kind when one is attached, otherwise by message
    pub fn classify(&self, err: &anyhow::Error) -> ErrorClass {
        if let Some(upstream) = err.downcast_ref::<UpstreamError>() {
            match upstream.kind {
                UpstreamKind::ServerError => return ErrorClass::Upstream5xx,
                UpstreamKind::NetworkError | UpstreamKind::RateLimited => {
                    return ErrorClass::NetworkTransient
                }
                UpstreamKind::NotFound | UpstreamKind::Other => {}
            }
        }

        let message = format!("{:#}", err);
        if self.server_re.is_match(&message) {
            ErrorClass::Upstream5xx
        } else if self.network_re.is_match(&message) {
            ErrorClass::NetworkTransient
        } else {
            ErrorClass::Other
        }
    }

    pub fn is_credential_error(&self, err: &anyhow::Error) -> bool {
        self.credential_re.is_match(&format!("{:#}", err))
    }

    /// Decide what to do with the error of a failed tick observed at `now`
    pub fn on_error(&mut self, err: &anyhow::Error, now: Timestamp) -> Disposition {
        let class = self.classify(err);
        let counter = match class {
            ErrorClass::Upstream5xx => &mut self.server,
            ErrorClass::NetworkTransient => &mut self.network,
            ErrorClass::Other => {
                let line = format!("{:#}", err);
                if self.is_credential_error(err) && !self.notified {
                    self.notified = true;
                    return Disposition::SurfaceAndNotify(line);
                }
                return Disposition::Surface(line);
            }
        };

        match counter.record(now, &self.settings) {
            Some((count, elapsed)) => Disposition::Surface(format!(
                "{} {} errors in {}s, last one: {:#}",
                count, class, elapsed, err
            )),
            None => {
                log::debug!("Suppressed {} error: {:#}", class, err);
                Disposition::Suppressed
            }
        }
    }

    /// A tick finished without error, ending the current failure streak
    pub fn tick_succeeded(&mut self) {
        self.notified = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suppressor() -> ErrorBurstSuppressor {
        ErrorBurstSuppressor::new(BurstSettings::default()).unwrap()
    }

    fn upstream(kind: UpstreamKind, message: &str) -> anyhow::Error {
        UpstreamError::new("Last.fm", kind, message).into()
    }

    #[test]
    fn classifies_by_kind_then_message() {
        let s = suppressor();
        assert_eq!(s.classify(&upstream(UpstreamKind::ServerError, "x")), ErrorClass::Upstream5xx);
        assert_eq!(
            s.classify(&upstream(UpstreamKind::RateLimited, "x")),
            ErrorClass::NetworkTransient
        );
        assert_eq!(
            s.classify(&upstream(UpstreamKind::NetworkError, "x")),
            ErrorClass::NetworkTransient
        );
        assert_eq!(
            s.classify(&anyhow::anyhow!("HTTP 503 Service Unavailable")),
            ErrorClass::Upstream5xx
        );
        assert_eq!(s.classify(&anyhow::anyhow!("read timed out")), ErrorClass::NetworkTransient);
        assert_eq!(
            s.classify(&upstream(UpstreamKind::Other, "Invalid API key")),
            ErrorClass::Other
        );
    }

    #[test]
    fn sustained_failure_at_offline_rate_surfaces_once() {
        let mut s = suppressor();
        let err = upstream(UpstreamKind::ServerError, "Operation failed");

        // one failed tick every 15s
        let surfaced: Vec<i64> = (0..25)
            .filter(|i| s.on_error(&err, 1_000 + i * 15) != Disposition::Suppressed)
            .collect();
        assert_eq!(surfaced, vec![14]);
    }

    #[test]
    fn surfaced_line_reports_run_length() {
        let mut s = suppressor();
        let err = upstream(UpstreamKind::NetworkError, "connection reset");

        for i in 0..14 {
            assert_eq!(s.on_error(&err, 1_000 + i * 15), Disposition::Suppressed);
        }
        match s.on_error(&err, 1_210) {
            Disposition::Surface(line) => assert!(line.starts_with("15 network errors in 210s")),
            other => panic!("unexpected {:?}", other),
        }

        // counters were reset by surfacing
        assert_eq!(s.on_error(&err, 1_225), Disposition::Suppressed);
    }

    #[test]
    fn fast_burst_waits_for_the_window() {
        let mut s = suppressor();
        let err = upstream(UpstreamKind::NetworkError, "connection reset");

        // the count is reached after 14s, the window only after 120s
        for i in 0..120 {
            assert_eq!(s.on_error(&err, 1_000 + i), Disposition::Suppressed);
        }
        match s.on_error(&err, 1_120) {
            Disposition::Surface(line) => assert!(line.starts_with("121 network errors in 120s")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn classes_are_counted_separately() {
        let mut s = suppressor();
        let server = upstream(UpstreamKind::ServerError, "Operation failed");
        let network = upstream(UpstreamKind::NetworkError, "timed out");

        for i in 0..14 {
            assert_eq!(s.on_error(&server, 1_000 + i * 10), Disposition::Suppressed);
            assert_eq!(s.on_error(&network, 1_000 + i * 10), Disposition::Suppressed);
        }
        assert!(matches!(s.on_error(&server, 1_140), Disposition::Surface(_)));
        assert!(matches!(s.on_error(&network, 1_140), Disposition::Surface(_)));
    }

    #[test]
    fn other_errors_surface_immediately() {
        let mut s = suppressor();
        let err = anyhow::anyhow!("unexpected JSON");
        assert_eq!(s.on_error(&err, 1_000), Disposition::Surface("unexpected JSON".to_string()));
    }

    #[test]
    fn credential_notification_once_per_streak() {
        let mut s = suppressor();
        let err = upstream(
            UpstreamKind::Other,
            "Invalid API key - You must be granted a valid key by last.fm",
        );

        assert!(matches!(s.on_error(&err, 1_000), Disposition::SurfaceAndNotify(_)));
        assert!(matches!(s.on_error(&err, 1_015), Disposition::Surface(_)));
        assert!(matches!(s.on_error(&err, 1_030), Disposition::Surface(_)));

        s.tick_succeeded();
        assert!(matches!(s.on_error(&err, 1_045), Disposition::SurfaceAndNotify(_)));
    }
}
