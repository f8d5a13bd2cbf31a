//! Bounded polling

use std::future::Future;
use std::time::Duration;

/// Attempt budget and spacing for a poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// Result of [`poll_until`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready { value: T, attempts: u32 },
    Exhausted { attempts: u32 },
}

impl<T> PollOutcome<T> {
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Ready { value, .. } => Some(value),
            Self::Exhausted { .. } => None,
        }
    }
}

/// Call `probe` until it yields `Some`, sleeping `policy.delay` between
/// attempts. Errors abort the loop immediately.
pub async fn poll_until<T, E, F, Fut>(policy: RetryPolicy, mut probe: F) -> Result<PollOutcome<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    for attempt in 1..=policy.max_attempts {
        if let Some(value) = probe(attempt).await? {
            return Ok(PollOutcome::Ready { value, attempts: attempt });
        }
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.delay).await;
        }
    }
    Ok(PollOutcome::Exhausted {
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_ready_on_third_attempt() {
        let start = Instant::now();
        let outcome: Result<_, ()> = poll_until(RetryPolicy::new(5, Duration::from_secs(3)), |n| async move {
            Ok((n == 3).then_some(n * 10))
        })
        .await;
        assert_eq!(
            outcome.unwrap(),
            PollOutcome::Ready {
                value: 30,
                attempts: 3
            }
        );
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_without_trailing_sleep() {
        let start = Instant::now();
        let outcome: Result<PollOutcome<()>, ()> =
            poll_until(RetryPolicy::new(20, Duration::from_secs(3)), |_| async { Ok(None) }).await;
        assert_eq!(outcome.unwrap(), PollOutcome::Exhausted { attempts: 20 });
        assert_eq!(start.elapsed(), Duration::from_secs(57));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_aborts() {
        let mut calls = 0;
        let outcome: Result<PollOutcome<()>, &str> =
            poll_until(RetryPolicy::new(5, Duration::from_secs(1)), |_| {
                calls += 1;
                async { Err("boom") }
            })
            .await;
        assert_eq!(outcome.unwrap_err(), "boom");
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
