//! Per-stage failure counting.

use std::sync::atomic::{AtomicU32, Ordering};

/// Result of recording one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorTally {
    /// Below the threshold; the worker may try again.
    Retry { errors: u32 },
    /// The threshold is reached; the stage is finished.
    Exhausted { errors: u32 },
}

/// Monotonic failure count shared by every worker of one stage.
///
/// The count is never reset. Once it reaches the threshold every worker of
/// the stage stops at its next check.
///
/// # Examples
/// ```
/// use laff::domain::{ErrorTally, StageErrorCounter};
///
/// let counter = StageErrorCounter::new(2);
/// assert_eq!(counter.record_failure(), ErrorTally::Retry { errors: 1 });
/// assert_eq!(counter.record_failure(), ErrorTally::Exhausted { errors: 2 });
/// assert_eq!(counter.tripped(), Some(2));
/// ```
#[derive(Debug)]
pub struct StageErrorCounter {
    errors: AtomicU32,
    max_errors: u32,
}

impl StageErrorCounter {
    pub fn new(max_errors: u32) -> Self {
        Self {
            errors: AtomicU32::new(0),
            max_errors,
        }
    }

    /// Failures recorded so far.
    pub fn count(&self) -> u32 {
        self.errors.load(Ordering::Acquire)
    }

    /// The current count once the threshold is reached.
    pub fn tripped(&self) -> Option<u32> {
        let errors = self.count();
        (errors >= self.max_errors).then_some(errors)
    }

    /// Count one failure and report whether the stage may continue.
    pub fn record_failure(&self) -> ErrorTally {
        let previous = match self.errors.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
            Some(n.saturating_add(1))
        }) {
            Ok(previous) | Err(previous) => previous,
        };
        let errors = previous.saturating_add(1);
        if errors >= self.max_errors {
            ErrorTally::Exhausted { errors }
        } else {
            ErrorTally::Retry { errors }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rstest::rstest;

    use super::*;

    #[rstest]
    fn fresh_counter_is_not_tripped() {
        let counter = StageErrorCounter::new(3);
        assert_eq!(counter.count(), 0);
        assert_eq!(counter.tripped(), None);
    }

    #[rstest]
    fn threshold_of_one_trips_on_first_failure() {
        let counter = StageErrorCounter::new(1);
        assert_eq!(counter.record_failure(), ErrorTally::Exhausted { errors: 1 });
    }

    #[rstest]
    fn count_keeps_growing_past_threshold() {
        let counter = StageErrorCounter::new(1);
        counter.record_failure();
        assert_eq!(counter.record_failure(), ErrorTally::Exhausted { errors: 2 });
        assert_eq!(counter.tripped(), Some(2));
    }

    #[rstest]
    fn concurrent_failures_are_all_counted() {
        let counter = Arc::new(StageErrorCounter::new(u32::MAX));
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        counter.record_failure();
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().expect("counter thread");
        }
        assert_eq!(counter.count(), 800);
    }
}
