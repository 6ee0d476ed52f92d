use std::time::{Duration, Instant};

/// Wall clock budget of a planning call. Planners poll it between iterations; a budget is
/// never interrupted from outside.
#[derive(Debug, Clone, Copy)]
pub struct TimeBudget {
    started: Instant,
    limit: Duration,
}

impl TimeBudget {
    /// Budget starting now.
    pub fn new(limit: Duration) -> Self {
        Self { started: Instant::now(), limit }
    }

    /// Budget in seconds. Negative and NaN values give a zero budget, values too large to
    /// represent give an unlimited one.
    pub fn from_secs(seconds: f64) -> Self {
        let limit = if seconds.is_nan() || seconds <= 0.0 {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
        };
        Self::new(limit)
    }

    pub fn unlimited() -> Self {
        Self::new(Duration::MAX)
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        self.limit.saturating_sub(self.elapsed())
    }

    pub fn is_expired(&self) -> bool {
        self.elapsed() >= self.limit
    }

    /// Budget starting now that ends no later than this one, and lasts at most `limit`.
    pub fn slice(&self, limit: Duration) -> TimeBudget {
        TimeBudget::new(limit.min(self.remaining()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_budget_is_expired() {
        assert!(TimeBudget::new(Duration::ZERO).is_expired());
        assert!(TimeBudget::from_secs(-1.0).is_expired());
        assert!(TimeBudget::from_secs(f64::NAN).is_expired());
    }

    #[test]
    fn test_slice_never_exceeds_remaining() {
        let budget = TimeBudget::from_secs(1.0);
        assert!(!budget.is_expired());
        assert!(budget.slice(Duration::from_secs(10)).limit() <= Duration::from_secs(1));
        assert_eq!(budget.slice(Duration::from_millis(10)).limit(), Duration::from_millis(10));
        assert!(!TimeBudget::from_secs(f64::INFINITY).is_expired());
        assert!(!TimeBudget::unlimited().is_expired());
    }
}
