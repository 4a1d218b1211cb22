//! Bounded polling with linear backoff.
//!
//! Used where an environment's native failure signal cannot be trusted: the
//! poll keeps checking a predicate and only reports when it gives up. Success
//! is never signalled from here, the caller's event path owns that.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Wait used in place of a zero delay, so every check still yields.
const NEAR_ZERO: Duration = Duration::from_micros(100);

/// How many checks a poll may make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Attempts {
    Limited(u32),
    /// Keep polling until the predicate holds, the budget elapses, or the poll
    /// is cancelled.
    Unlimited,
}

/// `-1` is the only value meaning unlimited. Any other negative count
/// allows no checks at all.
impl From<i64> for Attempts {
    fn from(n: i64) -> Self {
        match n {
            -1 => Attempts::Unlimited,
            n if n < 0 => Attempts::Limited(0),
            n => Attempts::Limited(u32::try_from(n).unwrap_or(u32::MAX)),
        }
    }
}

impl From<Attempts> for i64 {
    fn from(a: Attempts) -> Self {
        match a {
            Attempts::Limited(n) => n as i64,
            Attempts::Unlimited => -1,
        }
    }
}

/// Parameters of one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub times: Attempts,
    /// Wait before the first check.
    pub delay: Duration,
    /// Added to the wait after every failed check.
    pub delay_more: Duration,
    /// Wall-clock limit for the whole cycle.
    pub budget: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::script_default()
    }
}

impl RetryPolicy {
    /// 15 checks, one second apart.
    pub const fn script_default() -> Self {
        Self {
            times: Attempts::Limited(15),
            delay: Duration::from_millis(1000),
            delay_more: Duration::ZERO,
            budget: None,
        }
    }

    pub fn limited(times: u32, delay: Duration) -> Self {
        Self {
            times: Attempts::Limited(times),
            delay,
            delay_more: Duration::ZERO,
            budget: None,
        }
    }

    pub fn unlimited(delay: Duration) -> Self {
        Self {
            times: Attempts::Unlimited,
            delay,
            delay_more: Duration::ZERO,
            budget: None,
        }
    }

    pub fn with_delay_more(mut self, delay_more: Duration) -> Self {
        self.delay_more = delay_more;
        self
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }
}

/// How a poll cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Succeeded { checks: u32 },
    Exhausted { checks: u32 },
    BudgetElapsed { checks: u32 },
    Cancelled { checks: u32 },
}

impl PollOutcome {
    /// Whether the failure handler should run for this outcome.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            PollOutcome::Exhausted { .. } | PollOutcome::BudgetElapsed { .. }
        )
    }
}

/// Run a poll cycle to completion.
pub async fn poll<T>(policy: &RetryPolicy, mut test: T, cancel: &CancellationToken) -> PollOutcome
where
    T: FnMut() -> bool,
{
    let deadline = policy.budget.map(|b| Instant::now() + b);
    let mut remaining = policy.times;
    let mut delay = policy.delay;
    let mut checks = 0u32;

    loop {
        match remaining {
            Attempts::Limited(0) => return PollOutcome::Exhausted { checks },
            Attempts::Limited(n) => remaining = Attempts::Limited(n - 1),
            Attempts::Unlimited => {}
        }

        let wait = if delay.is_zero() { NEAR_ZERO } else { delay };
        let budget_elapsed = async {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollOutcome::Cancelled { checks },
            _ = budget_elapsed => return PollOutcome::BudgetElapsed { checks },
            _ = tokio::time::sleep(wait) => {}
        }

        checks += 1;
        if test() {
            return PollOutcome::Succeeded { checks };
        }
        delay += policy.delay_more;
    }
}

/// Spawn a poll cycle that calls `failure` once if it gives up.
///
/// Cancellation is not a failure: a cancelled cycle ends silently.
pub fn schedule<T, F>(
    policy: RetryPolicy,
    test: T,
    failure: F,
    cancel: CancellationToken,
) -> JoinHandle<PollOutcome>
where
    T: FnMut() -> bool + Send + 'static,
    F: FnOnce(PollOutcome) + Send + 'static,
{
    tokio::spawn(async move {
        let outcome = poll(&policy, test, &cancel).await;
        if outcome.is_failure() {
            failure(outcome);
        }
        outcome
    })
}
