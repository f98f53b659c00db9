// Scrobble source module
// Last.fm client and the per-tick snapshot fetcher

pub mod lastfm;
pub mod traits;

pub use traits::{
    RecentTracks, ScrobbleEntry, ScrobbleSource, Snapshot, Timestamp, TrackRef, UpstreamError,
    UpstreamKind,
};

/// History depth requested on steady-state ticks
pub const STEADY_HISTORY_DEPTH: usize = 1;

/// History depth used when listing what was scrobbled while offline
pub const OFFLINE_HISTORY_DEPTH: usize = 100;

/// History depth used to look for duplicate entries on reactivation
pub const REACTIVATION_HISTORY_DEPTH: usize = 10;

/// Wraps a scrobble source to produce one snapshot per tick.
/// Errors are returned as-is, there are no retries.
pub struct SnapshotFetcher {
    source: Box<dyn ScrobbleSource>,
}

impl SnapshotFetcher {
    pub fn new(source: Box<dyn ScrobbleSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &dyn ScrobbleSource {
        self.source.as_ref()
    }

    /// Now playing and history come from the same listing so they cannot disagree
    pub fn fetch(&self, user: &str, history_depth: usize) -> Result<Snapshot, UpstreamError> {
        let listing = self.source.recent_tracks(user, history_depth)?;

        Ok(Snapshot {
            now_playing: listing.now_playing,
            recent: listing.entries,
            fetched_at: chrono::Utc::now().timestamp(),
        })
    }

    pub fn history(&self, user: &str, depth: usize) -> Result<Vec<ScrobbleEntry>, UpstreamError> {
        self.source.recent(user, depth)
    }
}


#[cfg(test)]
mod tests {
    use super::fake::FakeSource;
    use super::*;
    use std::rc::Rc;

    #[test]
    fn fetch_combines_now_playing_and_history() {
        let source = FakeSource::default();
        source
            .now_playing
            .borrow_mut()
            .push_back(Ok(Some(TrackRef::new("Low", "Words", "I Could Live in Hope"))));
        source.history.borrow_mut().extend([
            ScrobbleEntry { track: TrackRef::new("Low", "Lazy", ""), played_at: 200 },
            ScrobbleEntry { track: TrackRef::new("Low", "Slide", ""), played_at: 100 },
        ]);

        let source = Rc::new(source);
        let fetcher = SnapshotFetcher::new(Box::new(Rc::clone(&source)));
        let snapshot = fetcher.fetch("rj", STEADY_HISTORY_DEPTH).unwrap();
        assert_eq!(snapshot.now_playing.as_ref().unwrap().title, "Words");
        assert_eq!(snapshot.recent.len(), 1);
        assert_eq!(snapshot.latest_scrobble_ts(), 200);
        // one request per tick
        assert_eq!(source.listings.get(), 1);
    }

    #[test]
    fn fetch_propagates_errors() {
        let source = FakeSource::default();
        source.now_playing.borrow_mut().push_back(Err(UpstreamError::new(
            "Last.fm",
            UpstreamKind::ServerError,
            "HTTP 502",
        )));

        let fetcher = SnapshotFetcher::new(Box::new(source));
        let err = fetcher.fetch("rj", STEADY_HISTORY_DEPTH).unwrap_err();
        assert_eq!(err.kind, UpstreamKind::ServerError);
    }
}
