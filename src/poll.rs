//! Bounded sleep-and-repoll
//!
//! The E22 gives no interrupts the driver can rely on, so every wait is a
//! poll of some condition (AUX high, bytes available) separated by short
//! delays. [`PollBudget`] tracks how much of a timeout is left and hands out
//! the next sleep step; [`poll_until`] and [`poll_until_async`] drive it with a
//! blocking or an async delay provider.
//!
//! The total time slept by one budget never exceeds the timeout it was
//! created with.

/// Remaining time of a bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollBudget {
    remaining_us: u32,
    interval_us: u32,
}

impl PollBudget {
    /// Creates a budget of `timeout_ms` consumed in steps of `interval_us`.
    ///
    /// A zero interval is bumped to one microsecond so the budget always drains.
    pub fn new(timeout_ms: u32, interval_us: u32) -> Self {
        Self {
            remaining_us: timeout_ms.saturating_mul(1_000),
            interval_us: interval_us.max(1),
        }
    }

    /// Returns the next sleep step in microseconds, or `None` once the budget
    /// is spent. The final step is shortened to what is left.
    pub fn tick(&mut self) -> Option<u32> {
        if self.remaining_us == 0 {
            return None;
        }
        let step = self.interval_us.min(self.remaining_us);
        self.remaining_us -= step;
        Some(step)
    }

    /// Microseconds left in the budget.
    pub fn remaining_us(&self) -> u32 {
        self.remaining_us
    }

    /// Returns true once the budget is spent.
    pub fn is_exhausted(&self) -> bool {
        self.remaining_us == 0
    }
}

/// Polls `ready` until it reports true or `budget` runs out.
///
/// The condition is sampled once more after the last sleep, so a condition
/// that becomes true right at the deadline is still seen. Returns `Ok(false)`
/// on timeout; errors from `ready` abort the wait immediately.
pub fn poll_until<D, E, F>(delay: &mut D, budget: &mut PollBudget, mut ready: F) -> Result<bool, E>
where
    D: embedded_hal::delay::DelayNs,
    F: FnMut() -> Result<bool, E>,
{
    loop {
        if ready()? {
            return Ok(true);
        }
        match budget.tick() {
            Some(step) => delay.delay_us(step),
            None => return Ok(false),
        }
    }
}

/// Async version of [`poll_until`].
pub async fn poll_until_async<D, E, F>(
    delay: &mut D,
    budget: &mut PollBudget,
    mut ready: F,
) -> Result<bool, E>
where
    D: embedded_hal_async::delay::DelayNs,
    F: FnMut() -> Result<bool, E>,
{
    loop {
        if ready()? {
            return Ok(true);
        }
        match budget.tick() {
            Some(step) => delay.delay_us(step).await,
            None => return Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::CountingDelay;

    #[test]
    fn budget_drains_in_interval_steps() {
        let mut budget = PollBudget::new(1, 300);

        assert_eq!(budget.tick(), Some(300));
        assert_eq!(budget.tick(), Some(300));
        assert_eq!(budget.tick(), Some(300));
        // Last step is shortened to what is left
        assert_eq!(budget.tick(), Some(100));
        assert_eq!(budget.tick(), None);
        assert!(budget.is_exhausted());
    }

    #[test]
    fn zero_timeout_has_no_steps() {
        let mut budget = PollBudget::new(0, 1_000);
        assert_eq!(budget.tick(), None);
    }

    #[test]
    fn poll_returns_as_soon_as_ready() {
        let mut delay = CountingDelay::default();
        let mut budget = PollBudget::new(10, 1_000);
        let mut calls = 0;

        let ready = poll_until(&mut delay, &mut budget, || -> Result<bool, ()> {
            calls += 1;
            Ok(calls == 3)
        })
        .unwrap();

        assert!(ready);
        assert_eq!(calls, 3);
        assert_eq!(delay.elapsed_us(), 2_000);
    }

    #[test]
    fn poll_gives_up_within_the_timeout() {
        let mut delay = CountingDelay::default();
        let mut budget = PollBudget::new(25, 1_000);

        let ready = poll_until(&mut delay, &mut budget, || -> Result<bool, ()> { Ok(false) }).unwrap();

        assert!(!ready);
        assert_eq!(delay.elapsed_us(), 25_000);
    }

    #[test]
    fn poll_propagates_condition_errors() {
        let mut delay = CountingDelay::default();
        let mut budget = PollBudget::new(25, 1_000);

        let result = poll_until(&mut delay, &mut budget, || -> Result<bool, u8> { Err(7) });

        assert_eq!(result, Err(7));
        assert_eq!(delay.elapsed_us(), 0);
    }

    #[test]
    fn async_poll_matches_blocking_poll() {
        let mut delay = CountingDelay::default();
        let mut budget = PollBudget::new(5, 1_000);

        let ready = futures::executor::block_on(poll_until_async(
            &mut delay,
            &mut budget,
            || -> Result<bool, ()> { Ok(false) },
        ))
        .unwrap();

        assert!(!ready);
        assert_eq!(delay.elapsed_us(), 5_000);
    }
}
