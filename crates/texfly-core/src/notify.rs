//! Optional status notifications. Purely cosmetic: nothing here can change
//! the outcome of a run.

use crate::exec::{CommandExecutor, RealCommandExecutor};
use log::debug;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Speech programs tried in order.
const SPEAKERS: &[&str] = &["say", "spd-say", "espeak"];

/// Where status notifications go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NotifyChannel {
    #[default]
    Off,
    /// Ring the terminal bell.
    Bell,
    /// Speak the message aloud.
    Speech,
}

impl std::str::FromStr for NotifyChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(Self::Off),
            "bell" => Ok(Self::Bell),
            "speech" | "speak" => Ok(Self::Speech),
            other => Err(format!("unknown notification channel `{}`", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notifier {
    channel: NotifyChannel,
    executor: Arc<dyn CommandExecutor>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(NotifyChannel::Off)
    }
}

impl Notifier {
    pub fn new(channel: NotifyChannel) -> Self {
        Self::with_executor(channel, Arc::new(RealCommandExecutor))
    }

    pub fn with_executor(channel: NotifyChannel, executor: Arc<dyn CommandExecutor>) -> Self {
        Self { channel, executor }
    }

    pub fn channel(&self) -> NotifyChannel {
        self.channel
    }

    pub fn notify(&self, message: &str) {
        match self.channel {
            NotifyChannel::Off => {}
            NotifyChannel::Bell => {
                let mut stderr = std::io::stderr();
                let _ = stderr.write_all(b"\x07");
                let _ = stderr.flush();
            }
            NotifyChannel::Speech => self.speak(message),
        }
    }

    /// Uses the first speech program that launches; its exit status is ignored.
    fn speak(&self, message: &str) {
        for speaker in SPEAKERS {
            match self.executor.execute(Path::new(speaker), &[message]) {
                Ok(_) => return,
                Err(e) => debug!("{} unavailable: {:#}", speaker, e),
            }
        }
        debug!("No speech program found for notification: {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{MockCommandExecutor, MockOutput};

    #[test]
    fn test_parse_channel() {
        assert_eq!("off".parse::<NotifyChannel>(), Ok(NotifyChannel::Off));
        assert_eq!("Bell".parse::<NotifyChannel>(), Ok(NotifyChannel::Bell));
        assert_eq!("speech".parse::<NotifyChannel>(), Ok(NotifyChannel::Speech));
        assert!("smoke-signal".parse::<NotifyChannel>().is_err());
    }

    #[test]
    fn test_off_is_silent() {
        Notifier::new(NotifyChannel::Off).notify("nothing happens");
        assert_eq!(Notifier::default().channel(), NotifyChannel::Off);
    }

    #[test]
    fn test_off_runs_nothing() {
        let mock = Arc::new(MockCommandExecutor::default());
        Notifier::with_executor(NotifyChannel::Off, mock.clone()).notify("done");
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_speech_falls_back_in_order() {
        let mock = Arc::new(MockCommandExecutor::default().with_missing("say"));
        let notifier = Notifier::with_executor(NotifyChannel::Speech, mock.clone());
        notifier.notify("Installing packages");
        assert_eq!(
            mock.calls(),
            vec!["say Installing packages", "spd-say Installing packages"]
        );
    }

    #[test]
    fn test_speech_failure_still_counts_as_spoken() {
        let mock = Arc::new(
            MockCommandExecutor::default().with_output("say done", MockOutput::failure("", 1)),
        );
        Notifier::with_executor(NotifyChannel::Speech, mock.clone()).notify("done");
        assert_eq!(mock.calls(), vec!["say done"]);
    }

    #[test]
    fn test_no_speech_program_is_harmless() {
        let mock = Arc::new(
            MockCommandExecutor::default()
                .with_missing("say")
                .with_missing("spd-say")
                .with_missing("espeak"),
        );
        Notifier::with_executor(NotifyChannel::Speech, mock.clone()).notify("done");
        assert_eq!(mock.calls().len(), 3);
    }
}
