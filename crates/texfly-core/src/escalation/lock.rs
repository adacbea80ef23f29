use crate::error::EscalationError;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

/// How the caller waits for a spawned terminal to finish.
///
/// The terminal is not the caller's own, so the only signal available is the
/// lock file disappearing. There is no timeout by default: a password prompt
/// can sit there for as long as the operator likes. If the terminal window
/// is closed before the script ends, the wait never returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockPoll {
    pub interval: Duration,
    pub timeout: Option<Duration>,
}

/// Poll every 100ms, forever.
pub const DEFAULT_LOCK_POLL: LockPoll = LockPoll {
    interval: Duration::from_millis(100),
    timeout: None,
};

impl Default for LockPoll {
    fn default() -> Self {
        DEFAULT_LOCK_POLL
    }
}

impl LockPoll {
    /// Blocks until `lock` no longer exists.
    pub fn wait_for_removal(&self, lock: &Path) -> Result<(), EscalationError> {
        let started = Instant::now();
        while lock.exists() {
            if self.timeout.is_some_and(|limit| started.elapsed() >= limit) {
                return Err(EscalationError::TimedOut {
                    lock: lock.to_path_buf(),
                });
            }
            thread::sleep(self.interval);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_lock_returns_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let poll = LockPoll {
            interval: Duration::from_secs(60),
            timeout: None,
        };
        poll.wait_for_removal(&dir.path().join("lock")).unwrap();
    }

    #[test]
    fn test_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let lock = dir.path().join("lock");
        std::fs::write(&lock, "held").unwrap();

        let poll = LockPoll {
            interval: Duration::from_millis(5),
            timeout: Some(Duration::from_millis(30)),
        };
        let err = poll.wait_for_removal(&lock).unwrap_err();
        assert!(matches!(err, EscalationError::TimedOut { .. }));
    }

    #[test]
    fn test_removed_by_other_thread() {
        let dir = tempfile::tempdir().unwrap();
        let lock = dir.path().join("lock");
        std::fs::write(&lock, "held").unwrap();

        let remover = {
            let lock = lock.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                std::fs::remove_file(lock).unwrap();
            })
        };
        let poll = LockPoll {
            interval: Duration::from_millis(5),
            timeout: Some(Duration::from_secs(10)),
        };
        poll.wait_for_removal(&lock).unwrap();
        remover.join().unwrap();
    }
}
