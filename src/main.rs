//! # lastfm-monitor
//!
//! Follows a Last.fm user's "now playing" state and turns it into listening
//! sessions: when they get active or inactive, which tracks they skip, when
//! they pause and which songs they keep on loop.
//!
//! ## Usage
//!
//! ```bash
//! # Monitor a user, email on activity changes and songs on loop
//! lastfm_monitor some_user -a -i -x
//!
//! # List the last 50 scrobbles and exit
//! lastfm_monitor -l some_user -n 50
//! ```

mod cli;
mod config;
mod duration;
mod error_burst;
mod humanize;
mod links;
mod logging;
mod monitor;
mod notify;
mod recorder;
mod scrobbler;
mod session;
mod signals;
mod spotify;
mod text_cleanup;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use config::Config;
use monitor::{Monitor, MonitorOptions, Services, TrackedList};
use scrobbler::lastfm::LastFmSource;
use std::time::Duration;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let listing = cli.list_recent.is_some();
    let user = cli
        .list_recent
        .clone()
        .or_else(|| cli.user.clone())
        .context("A Last.fm username is required")?;

    let log_file = if cli.disable_logging || listing {
        None
    } else {
        Some(cli.output_dir.join(logging::log_file_name(&user)))
    };
    logging::init(log_file.as_deref())?;

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    let mut config = Config::load(&config_path)?;
    config.apply_env_secrets();
    cli.apply_overrides(&mut config);
    config.validate().context("Invalid configuration")?;

    if listing {
        let source = LastFmSource::new(
            config.lastfm.api_key.clone(),
            Duration::from_secs(config.timers.http_timeout),
        );
        let now = chrono::Utc::now().timestamp();
        return monitor::list_recent(Box::new(source), &user, cli.number_of_recent_tracks, now);
    }

    let flags = cli.runtime_flags(&config);
    let services = Services::from_config(&config, &flags)?;

    let tracked = match &cli.tracked_file {
        Some(path) => TrackedList::load(path)?,
        None => TrackedList::default(),
    };

    log::info!("Last.fm monitor v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Monitoring user {} (config: {:?})", user, config_path);

    let options = MonitorOptions {
        user,
        config_path,
        csv_file: cli.csv_file.clone(),
        tracked,
        output_dir: cli.output_dir.clone(),
        log_file,
    };
    let mut monitor = Monitor::new(options, config, flags, services)?;
    monitor.print_banner();
    monitor.start(chrono::Utc::now().timestamp())?;

    let signals = signals::install()?;
    monitor.run(signals)
}
