// Listening history recorder and last-activity persistence

use crate::scrobbler::{Timestamp, TrackRef};
use crate::session::PersistedActivity;
use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

const CSV_HEADER: [&str; 4] = ["Date", "Artist", "Track", "Album"];

/// Appends one row per listened track to a CSV file
pub struct CsvRecorder {
    path: PathBuf,
}

impl CsvRecorder {
    /// Open the recorder, writing the header if the file is new or empty
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let is_new = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);

        let recorder = Self { path };
        if is_new {
            let mut writer = recorder.writer()?;
            writer
                .write_record(CSV_HEADER)
                .with_context(|| format!("Failed to write CSV header to {:?}", recorder.path))?;
            writer.flush()?;
        }
        Ok(recorder)
    }

    fn writer(&self) -> Result<csv::Writer<fs::File>> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open CSV file: {:?}", self.path))?;

        Ok(csv::WriterBuilder::new()
            .has_headers(false)
            .quote_style(csv::QuoteStyle::NonNumeric)
            .from_writer(file))
    }

    /// Append a track that started playing at `started_at`
    pub fn record(&self, started_at: Timestamp, track: &TrackRef) -> Result<()> {
        let mut writer = self.writer()?;
        writer
            .write_record([
                csv_date(started_at).as_str(),
                track.artist.as_str(),
                track.title.as_str(),
                track.album.as_str(),
            ])
            .with_context(|| format!("Failed to write CSV entry to {:?}", self.path))?;
        writer.flush()?;
        Ok(())
    }
}

fn csv_date(ts: Timestamp) -> String {
    Local
        .timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// JSON file holding the last known activity of a user
pub struct ActivityStore {
    path: PathBuf,
}

impl ActivityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store next to the working directory, named after the user
    pub fn for_user(dir: &Path, user: &str) -> Self {
        Self::new(dir.join(format!("lastfm_{}_last_activity.json", user)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record, `None` when no file exists yet
    pub fn load(&self) -> Result<Option<PersistedActivity>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read activity file: {:?}", self.path))
            }
        };

        let activity = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse activity file: {:?}", self.path))?;
        Ok(Some(activity))
    }

    /// Rewrite the whole file with `activity`
    pub fn save(&self, activity: &PersistedActivity) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {:?}", parent))?;
            }
        }

        let contents =
            serde_json::to_string_pretty(activity).context("Failed to serialize activity")?;
        fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write activity file: {:?}", self.path))?;
        Ok(())
    }

    /// When the file was last written
    pub fn modified(&self) -> Option<DateTime<Local>> {
        let modified = fs::metadata(&self.path).and_then(|m| m.modified()).ok()?;
        Some(DateTime::<Local>::from(modified))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn track() -> TrackRef {
        TrackRef::new("Cocteau Twins", "Heaven or Las Vegas", "Heaven or Las Vegas")
    }

    #[test]
    fn csv_header_written_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv");

        let recorder = CsvRecorder::open(&path).unwrap();
        recorder.record(1_700_000_000, &track()).unwrap();
        let recorder = CsvRecorder::open(&path).unwrap();
        recorder.record(1_700_000_300, &track()).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], r#""Date","Artist","Track","Album""#);
        assert!(lines[1].ends_with(r#","Cocteau Twins","Heaven or Las Vegas","Heaven or Las Vegas""#));
    }

    #[test]
    fn csv_rows_are_readable_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv");
        let recorder = CsvRecorder::open(&path).unwrap();
        recorder
            .record(1_700_000_000, &TrackRef::new("Artist, The", "Say \"hi\"", ""))
            .unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[1], "Artist, The");
        assert_eq!(&row[2], "Say \"hi\"");
    }

    #[test]
    fn missing_activity_file_loads_as_none() {
        let dir = TempDir::new().unwrap();
        let store = ActivityStore::for_user(dir.path(), "rj");
        assert!(store.load().unwrap().is_none());
        assert!(store.modified().is_none());
    }

    #[test]
    fn activity_round_trip_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = ActivityStore::for_user(dir.path(), "rj");

        store.save(&PersistedActivity::new(1_000, &track())).unwrap();
        store.save(&PersistedActivity::new(2_000, &track())).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.timestamp, 2_000);
        assert_eq!(loaded.track(), track());
        assert!(store.path().ends_with("lastfm_rj_last_activity.json"));
    }

    #[test]
    fn corrupt_activity_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = ActivityStore::for_user(dir.path(), "rj");
        fs::write(store.path(), "[1000, \"a\"").unwrap();
        assert!(store.load().is_err());
    }
}
