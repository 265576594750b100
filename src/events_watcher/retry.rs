use std::time::Duration;

use backoff::backoff::Backoff;

/// A backoff policy that always returns the same interval, and gives up
/// after a fixed number of retries.
///
/// Used where a failure deserves a bounded grace window rather than an
/// endless one, like waiting for an operator to top up the signer account.
#[derive(Debug, Clone)]
pub struct ConstantWithMaxRetryCount {
    interval: Duration,
    max_retry_count: usize,
    count: usize,
}

impl ConstantWithMaxRetryCount {
    /// Creates a new policy waiting `interval` between attempts, giving up
    /// after `max_retry_count` retries.
    pub fn new(interval: Duration, max_retry_count: usize) -> Self {
        Self {
            interval,
            max_retry_count,
            count: 0,
        }
    }
}

impl Backoff for ConstantWithMaxRetryCount {
    fn next_backoff(&mut self) -> Option<Duration> {
        (self.count < self.max_retry_count).then(|| {
            self.count += 1;
            self.interval
        })
    }

    fn reset(&mut self) {
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_the_interval_exactly_max_count_times() {
        let mut policy =
            ConstantWithMaxRetryCount::new(Duration::from_millis(100), 3);
        for _ in 0..3 {
            assert_eq!(
                policy.next_backoff(),
                Some(Duration::from_millis(100))
            );
        }
        assert_eq!(policy.next_backoff(), None);
    }

    #[test]
    fn reset_restores_the_full_allowance() {
        let mut policy =
            ConstantWithMaxRetryCount::new(Duration::from_millis(10), 1);
        assert!(policy.next_backoff().is_some());
        assert!(policy.next_backoff().is_none());
        policy.reset();
        assert!(policy.next_backoff().is_some());
    }
}
