// Local Spotify client control
// Best-effort: every failure is logged and swallowed

use super::SpotifyTrack;
use std::process::{Command, Stdio};

/// What to start playing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayTarget {
    Track(SpotifyTrack),
    /// No catalogue match, open the search page instead
    SearchUrl(String),
}

pub trait PlaybackController {
    fn play(&self, target: &PlayTarget);
    fn pause(&self);
    fn resume(&self);
}

/// Pick the controller for the running platform
pub fn select_controller(enabled: bool) -> Box<dyn PlaybackController> {
    if !enabled {
        return Box::new(Disabled);
    }
    if cfg!(target_os = "macos") {
        Box::new(MacOs)
    } else if cfg!(target_os = "windows") {
        Box::new(Windows)
    } else {
        Box::new(Linux)
    }
}

fn run(program: &str, args: &[&str]) {
    log::debug!("Running {} {:?}", program, args);
    let result = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output();

    match result {
        Ok(output) if output.status.success() => {}
        Ok(output) => log::warn!(
            "{} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ),
        Err(e) => log::warn!("Failed to run {}: {}", program, e),
    }
}

/// Drives the Spotify app through AppleScript
pub struct MacOs;

impl MacOs {
    fn tell(script: &str) {
        let script = format!("tell app \"Spotify\" to {}", script);
        run("osascript", &["-e", &script]);
    }
}

impl PlaybackController for MacOs {
    fn play(&self, target: &PlayTarget) {
        match target {
            PlayTarget::Track(track) => Self::tell(&format!("play track \"{}\"", track.uri())),
            PlayTarget::SearchUrl(url) => run("open", &[url]),
        }
    }

    fn pause(&self) {
        Self::tell("pause");
    }

    fn resume(&self) {
        Self::tell("play");
    }
}

/// Opens links with xdg-open, pause/resume through playerctl (MPRIS)
pub struct Linux;

impl PlaybackController for Linux {
    fn play(&self, target: &PlayTarget) {
        match target {
            PlayTarget::Track(track) => run("xdg-open", &[&track.url()]),
            PlayTarget::SearchUrl(url) => run("xdg-open", &[url]),
        }
    }

    fn pause(&self) {
        run("playerctl", &["--player=spotify", "pause"]);
    }

    fn resume(&self) {
        run("playerctl", &["--player=spotify", "play"]);
    }
}

/// Opens links with the shell; there is no scriptable pause/resume
pub struct Windows;

impl PlaybackController for Windows {
    fn play(&self, target: &PlayTarget) {
        let url = match target {
            PlayTarget::Track(track) => track.url(),
            PlayTarget::SearchUrl(url) => url.clone(),
        };
        run("cmd", &["/C", "start", "", &url]);
    }

    fn pause(&self) {
        log::debug!("Pausing Spotify is not supported on Windows");
    }

    fn resume(&self) {
        log::debug!("Resuming Spotify is not supported on Windows");
    }
}

/// Track-songs mode is off
pub struct Disabled;

impl PlaybackController for Disabled {
    fn play(&self, _target: &PlayTarget) {}
    fn pause(&self) {}
    fn resume(&self) {}
}
