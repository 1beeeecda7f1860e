//! Restartable, pausable single-shot countdown.
//!
//! A [`CountdownTimer`] is a plain state machine over `tokio::time` rather
//! than a spawned task: the owning actor selects on [`CountdownTimer::expired`]
//! inside its message loop, so an expiry is only ever observed between
//! fully-processed messages. Every phase transition that makes a running
//! countdown obsolete must call [`CountdownTimer::reset`] (or re-arm with
//! [`CountdownTimer::start`]) before arming a new one — a stale deadline
//! left running would fire against superseded state.
//!
//! `pause` freezes the remaining time; `resume` continues from exactly that
//! remainder. `pause`/`resume`/`reset` while disarmed are no-ops.

use std::future::pending;
use tokio::time::{sleep_until, Duration, Instant};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    /// No countdown armed; `expired` never resolves.
    #[default]
    Disarmed,
    /// Counting down towards `deadline`.
    Running { deadline: Instant },
    /// Frozen with `remaining` time left on the clock.
    Paused { remaining: Duration },
}

/// A single-shot countdown clock. Only one arming is active at a time;
/// `start` implicitly discards any prior arming.
#[derive(Debug, Default)]
pub struct CountdownTimer {
    state: TimerState,
}

impl CountdownTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the countdown for `duration` from now, discarding any prior
    /// arming (running or paused).
    pub fn start(&mut self, duration: Duration) {
        self.state = TimerState::Running {
            deadline: Instant::now() + duration,
        };
    }

    /// Freeze the remaining time. No-op unless running.
    pub fn pause(&mut self) {
        if let TimerState::Running { deadline } = self.state {
            self.state = TimerState::Paused {
                remaining: deadline.saturating_duration_since(Instant::now()),
            };
        }
    }

    /// Continue counting down from the frozen remainder. No-op unless
    /// paused.
    pub fn resume(&mut self) {
        if let TimerState::Paused { remaining } = self.state {
            self.state = TimerState::Running {
                deadline: Instant::now() + remaining,
            };
        }
    }

    /// Disarm and discard the remaining time. Guarantees `expired` will
    /// not resolve for the discarded arming. No-op while disarmed.
    pub fn reset(&mut self) {
        self.state = TimerState::Disarmed;
    }

    /// Whether a countdown is armed (running or paused).
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.state != TimerState::Disarmed
    }

    /// Time left on the clock, if armed.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        match self.state {
            TimerState::Disarmed => None,
            TimerState::Running { deadline } => {
                Some(deadline.saturating_duration_since(Instant::now()))
            }
            TimerState::Paused { remaining } => Some(remaining),
        }
    }

    /// Resolves when the running countdown reaches its deadline; pending
    /// forever while paused or disarmed.
    ///
    /// Intended for `tokio::select!` arms: the future borrows the timer
    /// state at creation, so it must be re-created each loop iteration
    /// (which `select!` does naturally).
    pub async fn expired(&self) {
        match self.state {
            TimerState::Running { deadline } => sleep_until(deadline).await,
            TimerState::Disarmed | TimerState::Paused { .. } => pending().await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tokio::time::{advance, timeout};

    /// Expiry fires once the full duration has elapsed, and not before.
    #[tokio::test(start_paused = true)]
    async fn test_expires_after_duration() {
        let mut timer = CountdownTimer::new();
        timer.start(Duration::from_secs(5));

        advance(Duration::from_millis(4_999)).await;
        assert!(
            timeout(Duration::from_millis(0), timer.expired())
                .await
                .is_err(),
            "must not expire before the deadline"
        );

        advance(Duration::from_millis(1)).await;
        timer.expired().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_suppresses_expiry() {
        let mut timer = CountdownTimer::new();
        timer.start(Duration::from_secs(5));
        timer.reset();

        advance(Duration::from_secs(60)).await;
        assert!(
            timeout(Duration::from_millis(0), timer.expired())
                .await
                .is_err(),
            "a reset timer never expires"
        );
        assert!(!timer.is_armed());
        assert_eq!(timer.remaining(), None);
    }

    /// Reset after a pause mid-countdown also suppresses expiry.
    #[tokio::test(start_paused = true)]
    async fn test_reset_after_pause_suppresses_expiry() {
        let mut timer = CountdownTimer::new();
        timer.start(Duration::from_secs(5));
        advance(Duration::from_secs(2)).await;
        timer.pause();
        timer.reset();

        advance(Duration::from_secs(60)).await;
        assert!(timeout(Duration::from_millis(0), timer.expired())
            .await
            .is_err());
    }

    /// The pause window contributes nothing to the countdown: remaining
    /// time is preserved exactly across pause/resume.
    #[tokio::test(start_paused = true)]
    async fn test_pause_resume_preserves_remaining() {
        let mut timer = CountdownTimer::new();
        timer.start(Duration::from_secs(10));

        advance(Duration::from_secs(4)).await;
        timer.pause();
        assert_eq!(timer.remaining(), Some(Duration::from_secs(6)));

        // A long pause burns no clock time.
        advance(Duration::from_secs(120)).await;
        assert_eq!(timer.remaining(), Some(Duration::from_secs(6)));
        assert!(timeout(Duration::from_millis(0), timer.expired())
            .await
            .is_err());

        timer.resume();
        advance(Duration::from_millis(5_999)).await;
        assert!(timeout(Duration::from_millis(0), timer.expired())
            .await
            .is_err());
        advance(Duration::from_millis(1)).await;
        timer.expired().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_rearms_discarding_previous() {
        let mut timer = CountdownTimer::new();
        timer.start(Duration::from_secs(2));
        advance(Duration::from_secs(1)).await;

        // Re-arm for longer; the old deadline must not fire.
        timer.start(Duration::from_secs(10));
        advance(Duration::from_secs(5)).await;
        assert!(timeout(Duration::from_millis(0), timer.expired())
            .await
            .is_err());

        advance(Duration::from_secs(5)).await;
        timer.expired().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_ops_while_disarmed_are_noops() {
        let mut timer = CountdownTimer::new();
        timer.pause();
        timer.resume();
        timer.reset();
        assert!(!timer.is_armed());

        advance(Duration::from_secs(60)).await;
        assert!(timeout(Duration::from_millis(0), timer.expired())
            .await
            .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_without_pause_is_noop() {
        let mut timer = CountdownTimer::new();
        timer.start(Duration::from_secs(3));
        timer.resume();
        advance(Duration::from_secs(3)).await;
        timer.expired().await;
    }
}
