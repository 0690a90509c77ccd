use std::time::{Duration, Instant};

/// A cooperative time limit passed down through search and evolution.
///
/// Work holding a deadline polls `expired()` at loop boundaries and
/// returns its best result so far when time is up; nothing is ever
/// interrupted mid-step. A zero-length budget is expired from the start,
/// and `unbounded()` never expires (used by tests and by callers that
/// limit work by iteration count instead).
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Some(Instant::now() + budget),
        }
    }

    pub fn at(instant: Instant) -> Self {
        Self { at: Some(instant) }
    }

    pub fn unbounded() -> Self {
        Self { at: None }
    }

    pub fn expired(&self) -> bool {
        self.at.map_or(false, |at| Instant::now() >= at)
    }

    /// Time left, saturating at zero. `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.at.map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// This deadline pulled earlier by `margin`, floored at "already
    /// expired".
    pub fn less(&self, margin: Duration) -> Self {
        match self.at {
            None => *self,
            Some(at) => Self {
                at: Some(at.checked_sub(margin).unwrap_or_else(Instant::now)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_budget_is_expired_immediately() {
        assert!(Deadline::after(Duration::ZERO).expired());
    }

    #[test]
    fn test_unbounded_never_expires() {
        let deadline = Deadline::unbounded();
        assert!(!deadline.expired());
        assert_eq!(deadline.remaining(), None);
    }

    #[test]
    fn test_future_deadline_not_expired() {
        let deadline = Deadline::after(Duration::from_secs(60));
        assert!(!deadline.expired());
        assert!(deadline.remaining().unwrap() > Duration::from_secs(59));
    }

    #[test]
    fn test_less_pulls_the_deadline_earlier() {
        let deadline = Deadline::after(Duration::from_secs(60));
        let earlier = deadline.less(Duration::from_secs(30));
        assert!(earlier.remaining().unwrap() < deadline.remaining().unwrap());
        // A margin larger than the budget expires it outright.
        assert!(deadline.less(Duration::from_secs(120)).expired());
    }
}
