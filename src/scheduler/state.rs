use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Where the scheduler is in its fire cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulePhase {
    /// No timer armed.
    Idle,
    /// Waiting for `next_run_at`.
    Armed,
    /// A timer-driven tick is in progress.
    Running,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleState {
    pub phase: SchedulePhase,
    pub next_run_at: Option<DateTime<Utc>>,
    pub period: Duration,
}

impl ScheduleState {
    pub(super) fn idle(period: Duration) -> Self {
        Self {
            phase: SchedulePhase::Idle,
            next_run_at: None,
            period,
        }
    }

    /// Arms the timer for one period after `now`, replacing any pending run.
    pub(super) fn arm(&mut self, now: DateTime<Utc>) {
        self.phase = SchedulePhase::Armed;
        self.next_run_at = Some(advance(now, self.period));
    }

    pub(super) fn disarm(&mut self) {
        self.phase = SchedulePhase::Idle;
        self.next_run_at = None;
    }

    /// Time left until the next fire, zero when overdue, `None` when idle or
    /// a tick is already running.
    pub(super) fn time_until_due(&self, now: DateTime<Utc>) -> Option<Duration> {
        match (self.phase, self.next_run_at) {
            (SchedulePhase::Armed, Some(next)) => {
                Some((next - now).to_std().unwrap_or(Duration::ZERO))
            }
            _ => None,
        }
    }
}

/// `now + period`, saturating instead of overflowing.
fn advance(now: DateTime<Utc>, period: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(period)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_due_time_counts_down_to_zero() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut state = ScheduleState::idle(Duration::from_secs(60));
        assert_eq!(state.time_until_due(now), None);

        state.arm(now);
        assert_eq!(state.time_until_due(now), Some(Duration::from_secs(60)));
        assert_eq!(
            state.time_until_due(now + chrono::Duration::seconds(90)),
            Some(Duration::ZERO)
        );

        state.phase = SchedulePhase::Running;
        assert_eq!(state.time_until_due(now), None);

        state.disarm();
        assert_eq!(state.next_run_at, None);
    }

    #[test]
    fn test_advance_saturates() {
        let max = DateTime::<Utc>::MAX_UTC;
        assert_eq!(advance(max, Duration::from_secs(1)), max);
    }
}
