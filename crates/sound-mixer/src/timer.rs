use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::task::JoinHandle;

pub(crate) const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimerMode {
    StopAll,
    StartAll,
}

impl std::fmt::Display for TimerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerMode::StopAll => write!(f, "stop-all"),
            TimerMode::StartAll => write!(f, "start-all"),
        }
    }
}

/// Delay picked in the timer dialog. Minutes are clamped to `0..=59`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct TimerDuration {
    hours: u32,
    minutes: u32,
}

impl TimerDuration {
    pub fn new(hours: u32, minutes: u32) -> Self {
        Self {
            hours,
            minutes: minutes.min(59),
        }
    }

    pub fn hours(&self) -> u32 {
        self.hours
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.hours) * 3600 + u64::from(self.minutes) * 60)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerStatus {
    pub mode: TimerMode,
    pub total: Duration,
    /// Countdown shown to the user. Cosmetic only, firing is scheduled separately.
    pub remaining: Duration,
}

impl TimerStatus {
    /// `H:MM:SS`, or `MM:SS` below one hour.
    pub fn countdown_label(&self) -> String {
        let secs = self.remaining.as_secs();
        let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);

        if hours > 0 {
            format!("{}:{:02}:{:02}", hours, minutes, seconds)
        } else {
            format!("{:02}:{:02}", minutes, seconds)
        }
    }
}

pub(crate) struct PendingTimer {
    pub(crate) id: u64,
    pub(crate) mode: TimerMode,
    pub(crate) total: Duration,
    pub(crate) remaining: Duration,
    pub(crate) fire_task: JoinHandle<()>,
    pub(crate) tick_task: JoinHandle<()>,
}

impl PendingTimer {
    pub(crate) fn status(&self) -> TimerStatus {
        TimerStatus {
            mode: self.mode,
            total: self.total,
            remaining: self.remaining,
        }
    }

    pub(crate) fn cancel(self) {
        self.fire_task.abort();
        self.tick_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_clamp_minutes() {
        let duration = TimerDuration::new(1, 75);

        assert_eq!(duration.minutes(), 59);
        assert_eq!(duration.as_duration(), Duration::from_secs(3600 + 59 * 60));
    }

    #[test]
    fn should_be_zero_when_nothing_is_picked() {
        assert!(TimerDuration::new(0, 0).as_duration().is_zero());
    }

    #[test]
    fn should_format_countdown() {
        let status = |secs| TimerStatus {
            mode: TimerMode::StopAll,
            total: Duration::from_secs(7200),
            remaining: Duration::from_secs(secs),
        };

        assert_eq!(status(3725).countdown_label(), "1:02:05");
        assert_eq!(status(59).countdown_label(), "00:59");
        assert_eq!(status(0).countdown_label(), "00:00");
    }
}
