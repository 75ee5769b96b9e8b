//! Rate Governor — rolling-hour action ceiling for one loop.
//!
//! The window is advanced lazily when `can_act` is checked, never reset
//! backwards. Uses the tokio monotonic clock so paused-time tests can drive it.

use std::time::Duration;

use tokio::time::Instant;

/// Length of one accounting window.
pub const WINDOW: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
pub struct RateGovernor {
    max_actions_per_hour: u32,
    actions_this_hour: u32,
    window_start: Instant,
}

impl RateGovernor {
    pub fn new(max_actions_per_hour: u32) -> Self {
        Self {
            max_actions_per_hour,
            actions_this_hour: 0,
            window_start: Instant::now(),
        }
    }

    /// Whether another action fits in the current window.
    pub fn can_act(&mut self) -> bool {
        self.can_act_at(Instant::now())
    }

    pub fn can_act_at(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.window_start) >= WINDOW {
            self.actions_this_hour = 0;
            self.window_start = now;
        }
        self.actions_this_hour < self.max_actions_per_hour
    }

    pub fn record_action(&mut self) {
        self.actions_this_hour = self.actions_this_hour.saturating_add(1);
    }

    pub fn actions_this_hour(&self) -> u32 {
        self.actions_this_hour
    }

    pub fn max_actions_per_hour(&self) -> u32 {
        self.max_actions_per_hour
    }

    pub fn remaining(&self) -> u32 {
        self.max_actions_per_hour.saturating_sub(self.actions_this_hour)
    }

    /// Time until the current window rolls over.
    pub fn resets_in(&self) -> Duration {
        WINDOW.saturating_sub(self.window_start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceiling() {
        let mut gov = RateGovernor::new(2);
        let now = Instant::now();
        assert!(gov.can_act_at(now));
        gov.record_action();
        assert!(gov.can_act_at(now));
        gov.record_action();
        assert!(!gov.can_act_at(now));
        assert_eq!(gov.remaining(), 0);
    }

    #[test]
    fn test_window_rolls_over() {
        let mut gov = RateGovernor::new(1);
        let start = Instant::now();
        gov.record_action();
        assert!(!gov.can_act_at(start + Duration::from_secs(3599)));
        assert!(gov.can_act_at(start + WINDOW));
        assert_eq!(gov.actions_this_hour(), 0);
    }

    #[test]
    fn test_window_never_moves_backwards() {
        let mut gov = RateGovernor::new(1);
        let start = Instant::now();
        assert!(gov.can_act_at(start + WINDOW));
        gov.record_action();
        // An earlier reading must not reopen the window.
        assert!(!gov.can_act_at(start));
        assert_eq!(gov.actions_this_hour(), 1);
    }

    #[test]
    fn test_zero_ceiling_never_acts() {
        let mut gov = RateGovernor::new(0);
        assert!(!gov.can_act());
    }

    #[tokio::test(start_paused = true)]
    async fn test_paused_clock_advance() {
        let mut gov = RateGovernor::new(1);
        gov.record_action();
        assert!(!gov.can_act());
        tokio::time::advance(WINDOW).await;
        assert!(gov.can_act());
        assert_eq!(gov.resets_in(), WINDOW);
    }
}
