// Command-line interface

use crate::config::{Config, RuntimeFlags};
use clap::Parser;
use std::path::PathBuf;

/// Real-time monitoring of a Last.fm user's listening activity
#[derive(Parser, Debug)]
#[command(name = "lastfm_monitor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Last.fm username to monitor
    #[arg(required_unless_present = "list_recent")]
    pub user: Option<String>,

    /// List recently played tracks for the user and exit
    #[arg(short = 'l', long, value_name = "USERNAME")]
    pub list_recent: Option<String>,

    /// Number of tracks to display with --list-recent
    #[arg(short = 'n', long, default_value_t = 30)]
    pub number_of_recent_tracks: usize,

    /// File with track or album names to watch for, one per line
    #[arg(short = 's', long, value_name = "FILENAME", value_hint = clap::ValueHint::FilePath)]
    pub tracked_file: Option<PathBuf>,

    /// Write every listened track to a CSV file
    #[arg(short = 'b', long, value_name = "CSV_FILENAME", value_hint = clap::ValueHint::FilePath)]
    pub csv_file: Option<PathBuf>,

    /// Email when the user gets active
    #[arg(short = 'a', long)]
    pub active_notification: bool,

    /// Email when the user gets inactive
    #[arg(short = 'i', long)]
    pub inactive_notification: bool,

    /// Email when a tracked song or album is played
    #[arg(short = 't', long)]
    pub track_notification: bool,

    /// Email on every song change
    #[arg(short = 'j', long)]
    pub song_notification: bool,

    /// Email when a song is played on loop
    #[arg(short = 'x', long)]
    pub song_on_loop_notification: bool,

    /// Email when new entries show up while the user is offline
    #[arg(short = 'f', long)]
    pub offline_entries_notification: bool,

    /// Do not email on errors such as an invalid API key
    #[arg(short = 'e', long)]
    pub disable_error_notification: bool,

    /// Seconds between checks while the user is offline
    #[arg(short = 'c', long)]
    pub check_interval: Option<u64>,

    /// Seconds between checks while the user is active
    #[arg(short = 'k', long)]
    pub active_check_interval: Option<u64>,

    /// Seconds without activity before the user is considered offline
    #[arg(short = 'o', long)]
    pub offline_timer: Option<u64>,

    /// Pause is reported after this many active check intervals, 0 disables it
    #[arg(short = 'm', long)]
    pub play_break_multiplier: Option<u64>,

    /// Do not write the lastfm_monitor_<user>.log file
    #[arg(short = 'd', long)]
    pub disable_logging: bool,

    /// Show a progress line on every check while listening
    #[arg(short = 'p', long)]
    pub progress_indicator: bool,

    /// Follow the listened songs in the local Spotify client
    #[arg(short = 'g', long)]
    pub track_songs: bool,

    /// Configuration file (default: <config dir>/lastfm_monitor.conf)
    #[arg(long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Directory for the log and last activity files
    #[arg(long, value_name = "DIR", default_value = ".", value_hint = clap::ValueHint::DirPath)]
    pub output_dir: PathBuf,

    #[arg(long, env = "LASTFM_API_KEY", hide_env_values = true)]
    pub lastfm_api_key: Option<String>,

    #[arg(long, env = "LASTFM_API_SECRET", hide_env_values = true)]
    pub lastfm_api_secret: Option<String>,

    #[arg(long, env = "SPOTIFY_CLIENT_ID", hide_env_values = true)]
    pub spotify_client_id: Option<String>,

    #[arg(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    pub spotify_client_secret: Option<String>,

    #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true)]
    pub smtp_password: Option<String>,
}

impl Cli {
    /// Overlay command-line values on the file configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(v) = self.check_interval {
            config.timers.check_interval = v;
        }
        if let Some(v) = self.active_check_interval {
            config.timers.active_check_interval = v;
        }
        if let Some(v) = self.offline_timer {
            config.timers.inactivity = v;
        }
        if let Some(v) = self.play_break_multiplier {
            config.timers.break_multiplier = v;
        }

        let secrets = [
            (&self.lastfm_api_key, &mut config.lastfm.api_key),
            (&self.lastfm_api_secret, &mut config.lastfm.api_secret),
            (&self.spotify_client_id, &mut config.spotify.client_id),
            (&self.spotify_client_secret, &mut config.spotify.client_secret),
            (&self.smtp_password, &mut config.smtp.password),
        ];
        for (value, field) in secrets {
            if let Some(value) = value.as_ref().filter(|v| !v.is_empty()) {
                *field = value.clone();
            }
        }
    }

    pub fn runtime_flags(&self, config: &Config) -> RuntimeFlags {
        RuntimeFlags {
            active_notification: self.active_notification,
            inactive_notification: self.inactive_notification,
            song_notification: self.song_notification,
            tracked_notification: self.track_notification,
            song_on_loop_notification: self.song_on_loop_notification,
            offline_entries_notification: self.offline_entries_notification,
            error_notification: !self.disable_error_notification,
            progress_indicator: self.progress_indicator,
            track_songs: self.track_songs,
            inactivity: config.timers.inactivity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn user_or_listing_is_required() {
        assert!(Cli::try_parse_from(["lastfm_monitor"]).is_err());
        let cli = Cli::try_parse_from(["lastfm_monitor", "-l", "rj", "-n", "10"]).unwrap();
        assert_eq!(cli.list_recent.as_deref(), Some("rj"));
        assert_eq!(cli.number_of_recent_tracks, 10);
    }

    #[test]
    fn overrides_timers_and_flags() {
        let cli = Cli::try_parse_from([
            "lastfm_monitor", "rj", "-a", "-x", "-e", "-o", "300", "-k", "3", "-m", "0",
        ])
        .unwrap();
        let mut config = Config::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.timers.inactivity, 300);
        assert_eq!(config.timers.active_check_interval, 3);
        assert_eq!(config.timers.break_multiplier, 0);
        assert_eq!(config.timers.check_interval, 15);

        let flags = cli.runtime_flags(&config);
        assert!(flags.active_notification);
        assert!(!flags.inactive_notification);
        assert!(flags.song_on_loop_notification);
        assert!(!flags.error_notification);
        assert_eq!(flags.inactivity, 300);
    }
}
