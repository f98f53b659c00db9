// Configuration management module
// Handles loading, saving, and validating configuration

use crate::error_burst::BurstSettings;
use crate::session::classifier::Thresholds;
use crate::session::SessionSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub lastfm: LastFmConfig,
    pub spotify: SpotifyConfig,
    pub smtp: SmtpConfig,
    pub timers: TimersConfig,
    pub thresholds: ThresholdsConfig,
    pub errors: ErrorsConfig,
    /// Title cleanup applied to lyrics search queries
    pub cleanup: CleanupConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LastFmConfig {
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub enabled: bool,
    pub client_id: String,
    pub client_secret: String,
    /// Prefer Spotify track lengths over Last.fm metadata
    pub use_for_durations: bool,
    /// Track played when the session ends in track-songs mode, empty to only pause
    pub offline_track_id: String,
    /// Seconds to let the offline track play before pausing
    pub offline_pause_delay: u64,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            client_id: String::new(),
            client_secret: String::new(),
            use_for_durations: true,
            offline_track_id: String::new(),
            offline_pause_delay: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub starttls: bool,
    pub sender: String,
    pub receiver: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 587,
            user: String::new(),
            password: String::new(),
            starttls: true,
            sender: String::new(),
            receiver: String::new(),
        }
    }
}

/// All values in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimersConfig {
    /// Poll interval while the user is offline
    pub check_interval: u64,
    /// Poll interval while the user is online or paused
    pub active_check_interval: u64,
    pub inactivity: u64,
    pub break_multiplier: u64,
    /// Heartbeat log line period while offline, 0 disables it
    pub liveness_interval: u64,
    /// Change of the inactivity threshold per signal
    pub inactivity_signal_step: u64,
    pub http_timeout: u64,
}

impl Default for TimersConfig {
    fn default() -> Self {
        Self {
            check_interval: 15,
            active_check_interval: 5,
            inactivity: 180,
            break_multiplier: 4,
            liveness_interval: 21600,
            inactivity_signal_step: 30,
            http_timeout: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    pub skip_no_duration: u64,
    pub skip_fraction: f64,
    pub longer_fraction: f64,
    pub longer_seconds: u64,
    pub loop_count: u32,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            skip_no_duration: 35,
            skip_fraction: 0.55,
            longer_fraction: 1.30,
            longer_seconds: 30,
            loop_count: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorsConfig {
    pub burst_count: u32,
    pub burst_window: i64,
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        Self {
            burst_count: 15,
            burst_window: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Enable text cleanup
    pub enabled: bool,

    /// Regex patterns removed from "artist title" before searching lyrics.
    /// Applied in order, case-insensitive.
    pub patterns: Vec<String>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            patterns: vec![
                r"\s+-\s+(\d*)\s*remaster(ed)?( version)?( \d*)*.*$".to_string(),
                r"\s+\((\d*)\s*remaster(ed)?\)$".to_string(),
                r"\s+\(\d+.*remaster.*\)$".to_string(),
                r"\s+-\s+(.*;\s*)?extended( mix| version)?$".to_string(),
                r"\s+-\s+(.*\s)?remix(ed by .*)?$".to_string(),
                r"\s+-\s+original mix$".to_string(),
                r"\s+-\s+.*original soundtrack$".to_string(),
                r"\s+-\s+.*radio( |-)edit$".to_string(),
                r"\s+\(feat\. .*\)$".to_string(),
                r"\s+\(.*version\)".to_string(),
                r"\s+-\s+.*version".to_string(),
            ],
        }
    }
}

impl Config {
    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;

        Ok(config_dir.join("lastfm_monitor.conf"))
    }

    /// Load configuration from file, or create default if it doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("Config file not found, creating default at {:?}", path);
            let default_config = Self::default();
            default_config.save(path)?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content).context("Failed to write config file")?;

        log::info!("Config saved to {:?}", path);

        Ok(())
    }

    /// Overlay secrets from the environment, if set
    pub fn apply_env_secrets(&mut self) {
        let overrides: [(&str, &mut String); 5] = [
            ("LASTFM_API_KEY", &mut self.lastfm.api_key),
            ("LASTFM_API_SECRET", &mut self.lastfm.api_secret),
            ("SPOTIFY_CLIENT_ID", &mut self.spotify.client_id),
            ("SPOTIFY_CLIENT_SECRET", &mut self.spotify.client_secret),
            ("SMTP_PASSWORD", &mut self.smtp.password),
        ];
        for (var, field) in overrides {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    *field = value;
                }
            }
        }
    }

    /// Re-read credentials from `path` and the environment, leaving timers untouched
    pub fn reload_secrets(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let fresh: Config = toml::from_str(&content).context("Failed to parse config file")?;

        self.lastfm = fresh.lastfm;
        self.spotify.client_id = fresh.spotify.client_id;
        self.spotify.client_secret = fresh.spotify.client_secret;
        self.smtp = fresh.smtp;
        self.apply_env_secrets();
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let timers = &self.timers;
        if timers.check_interval == 0 || timers.active_check_interval == 0 {
            anyhow::bail!("check intervals must be greater than 0");
        }
        if timers.inactivity == 0 {
            anyhow::bail!("inactivity must be greater than 0");
        }
        if timers.http_timeout == 0 {
            anyhow::bail!("http_timeout must be greater than 0");
        }
        if timers.break_multiplier > 0
            && timers.break_multiplier * timers.active_check_interval >= timers.inactivity
        {
            log::warn!(
                "break_multiplier * active_check_interval ({}s) is not below inactivity ({}s), pause detection is off",
                timers.break_multiplier * timers.active_check_interval,
                timers.inactivity
            );
        }

        let t = &self.thresholds;
        if !(t.skip_fraction > 0.0 && t.skip_fraction <= 1.0) {
            anyhow::bail!("skip_fraction must be in (0, 1]");
        }
        if t.longer_fraction < 1.0 {
            anyhow::bail!("longer_fraction must be at least 1.0");
        }
        if t.loop_count < 2 {
            anyhow::bail!("loop_count must be at least 2");
        }

        if self.errors.burst_count == 0 || self.errors.burst_window <= 0 {
            anyhow::bail!("burst_count and burst_window must be greater than 0");
        }

        if self.lastfm.api_key.is_empty() {
            anyhow::bail!("Last.fm api_key is required");
        }

        if self.spotify.enabled
            && (self.spotify.client_id.is_empty() || self.spotify.client_secret.is_empty())
        {
            anyhow::bail!("Spotify client_id and client_secret are required when Spotify is enabled");
        }

        Ok(())
    }

    /// SMTP settings are only needed when some notification is switched on
    pub fn validate_smtp(&self) -> Result<()> {
        let smtp = &self.smtp;
        if smtp.host.is_empty() {
            anyhow::bail!("SMTP host is required for email notifications");
        }
        if smtp.sender.is_empty() || smtp.receiver.is_empty() {
            anyhow::bail!("SMTP sender and receiver are required for email notifications");
        }
        Ok(())
    }

    pub fn classifier_thresholds(&self) -> Thresholds {
        Thresholds {
            skip_no_duration: self.thresholds.skip_no_duration,
            skip_fraction: self.thresholds.skip_fraction,
            longer_fraction: self.thresholds.longer_fraction,
            longer_seconds: self.thresholds.longer_seconds,
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        let liveness_ticks = if self.timers.liveness_interval > 0 {
            (self.timers.liveness_interval / self.timers.check_interval.max(1)).max(1)
        } else {
            0
        };

        SessionSettings {
            active_interval: self.timers.active_check_interval,
            inactivity_threshold: self.timers.inactivity,
            break_multiplier: self.timers.break_multiplier,
            loop_threshold: self.thresholds.loop_count,
            liveness_ticks,
            thresholds: self.classifier_thresholds(),
        }
    }

    pub fn burst_settings(&self) -> BurstSettings {
        BurstSettings {
            count: self.errors.burst_count,
            window: self.errors.burst_window,
        }
    }
}

/// Switches that can be flipped while the monitor runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeFlags {
    pub active_notification: bool,
    pub inactive_notification: bool,
    pub song_notification: bool,
    pub tracked_notification: bool,
    pub song_on_loop_notification: bool,
    pub offline_entries_notification: bool,
    pub error_notification: bool,
    pub progress_indicator: bool,
    pub track_songs: bool,
    pub inactivity: u64,
}

impl RuntimeFlags {
    /// Any email other than error reports is switched on
    pub fn any_notification(&self) -> bool {
        self.active_notification
            || self.inactive_notification
            || self.song_notification
            || self.tracked_notification
            || self.song_on_loop_notification
            || self.offline_entries_notification
    }
}
