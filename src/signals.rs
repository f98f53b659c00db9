// OS signal control
// Signals are queued and drained by the monitor loop between ticks

use crate::config::RuntimeFlags;
use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    ToggleActiveInactive,
    ToggleSong,
    ToggleTracked,
    ToggleLoop,
    ToggleProgress,
    IncreaseInactivity,
    DecreaseInactivity,
    ReloadSecrets,
}

impl ControlMessage {
    /// Apply a flag change, returning a line describing the new value.
    /// `ReloadSecrets` is left to the caller.
    pub fn apply(self, flags: &mut RuntimeFlags, step: u64) -> Option<String> {
        fn toggle(flag: &mut bool, name: &str) -> String {
            *flag = !*flag;
            format!("{} notifications: {}", name, flag)
        }

        let line = match self {
            Self::ToggleActiveInactive => {
                flags.inactive_notification = !flags.inactive_notification;
                toggle(&mut flags.active_notification, "Active")
                    + &format!(", inactive notifications: {}", flags.inactive_notification)
            }
            Self::ToggleSong => toggle(&mut flags.song_notification, "Every song"),
            Self::ToggleTracked => toggle(&mut flags.tracked_notification, "Tracked song"),
            Self::ToggleLoop => toggle(&mut flags.song_on_loop_notification, "Song on loop"),
            Self::ToggleProgress => {
                flags.progress_indicator = !flags.progress_indicator;
                format!("Progress indicator: {}", flags.progress_indicator)
            }
            Self::IncreaseInactivity => {
                flags.inactivity += step;
                format!("Inactivity timer: {}s", flags.inactivity)
            }
            Self::DecreaseInactivity => {
                if flags.inactivity > step {
                    flags.inactivity -= step;
                }
                format!("Inactivity timer: {}s", flags.inactivity)
            }
            Self::ReloadSecrets => return None,
        };
        Some(line)
    }
}

#[cfg(unix)]
mod platform {
    use super::ControlMessage;
    use anyhow::{Context, Result};
    use signal_hook::consts::signal::{
        SIGABRT, SIGCONT, SIGHUP, SIGPIPE, SIGTRAP, SIGURG, SIGUSR1, SIGUSR2,
    };
    use signal_hook::iterator::Signals;

    pub struct SignalQueue {
        signals: Signals,
    }

    fn message_for(signal: i32) -> Option<ControlMessage> {
        match signal {
            SIGUSR1 => Some(ControlMessage::ToggleActiveInactive),
            SIGUSR2 => Some(ControlMessage::ToggleSong),
            SIGCONT => Some(ControlMessage::ToggleTracked),
            SIGPIPE => Some(ControlMessage::ToggleLoop),
            SIGURG => Some(ControlMessage::ToggleProgress),
            SIGTRAP => Some(ControlMessage::IncreaseInactivity),
            SIGABRT => Some(ControlMessage::DecreaseInactivity),
            SIGHUP => Some(ControlMessage::ReloadSecrets),
            _ => None,
        }
    }

    impl SignalQueue {
        pub fn install() -> Result<Self> {
            let signals = Signals::new([
                SIGUSR1, SIGUSR2, SIGCONT, SIGPIPE, SIGURG, SIGTRAP, SIGABRT, SIGHUP,
            ])
            .context("Failed to register signal handlers")?;
            Ok(Self { signals })
        }

        /// Messages for the signals received since the last call
        pub fn drain(&mut self) -> Vec<ControlMessage> {
            self.signals.pending().filter_map(message_for).collect()
        }
    }

}

#[cfg(not(unix))]
mod platform {
    use super::ControlMessage;
    use anyhow::Result;

    pub struct SignalQueue;

    impl SignalQueue {
        pub fn install() -> Result<Self> {
            log::debug!("Signal control is not available on this platform");
            Ok(Self)
        }

        pub fn drain(&mut self) -> Vec<ControlMessage> {
            Vec::new()
        }
    }
}

pub use platform::SignalQueue;

/// Register the control signals
pub fn install() -> Result<SignalQueue> {
    SignalQueue::install()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags() -> RuntimeFlags {
        RuntimeFlags {
            active_notification: false,
            inactive_notification: false,
            song_notification: false,
            tracked_notification: false,
            song_on_loop_notification: false,
            offline_entries_notification: false,
            error_notification: true,
            progress_indicator: false,
            track_songs: false,
            inactivity: 180,
        }
    }

    #[test]
    fn toggles_flip_flags() {
        let mut f = flags();
        let line = ControlMessage::ToggleSong.apply(&mut f, 30).unwrap();
        assert!(f.song_notification);
        assert_eq!(line, "Every song notifications: true");

        ControlMessage::ToggleSong.apply(&mut f, 30);
        assert!(!f.song_notification);

        ControlMessage::ToggleProgress.apply(&mut f, 30);
        assert!(f.progress_indicator);
    }

    #[test]
    fn inactivity_never_drops_to_zero() {
        let mut f = flags();
        ControlMessage::IncreaseInactivity.apply(&mut f, 30);
        assert_eq!(f.inactivity, 210);

        f.inactivity = 30;
        ControlMessage::DecreaseInactivity.apply(&mut f, 30);
        assert_eq!(f.inactivity, 30);
    }

    #[test]
    fn reload_is_left_to_caller() {
        let mut f = flags();
        assert!(ControlMessage::ReloadSecrets.apply(&mut f, 30).is_none());
        assert_eq!(f, flags());
    }
}
