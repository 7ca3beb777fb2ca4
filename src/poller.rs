/// Bounded status polling.
///
/// Both the bundle watcher and the signature watcher are the same loop:
///
/// ```text
///  for attempt in 1..=max_attempts:
///      sleep(interval)                     ← cancellable
///      observation = query() ≤ query_timeout
///          transport error / timeout       → logged, attempt is spent
///          any other error                 → Aborted
///      classify(observation)               → Continue | Done(value)
///  → Exhausted
/// ```
///
/// Every query is bounded, so the loop ends within
/// `max_attempts × (interval + query_timeout)`.  Running out of attempts is
/// an outcome, not an error: the caller learns the final status is unknown.
use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{JitoRpcError, Result};

// ─── Policy ─────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    /// Sleep before every attempt, including the first.
    pub interval: Duration,
    /// Upper bound on a single query.  A query that overruns it counts as a
    /// failed attempt.
    pub query_timeout: Duration,
}

impl PollPolicy {
    pub const BUNDLE_MAX_ATTEMPTS: u32 = 60;
    pub const BUNDLE_INTERVAL: Duration = Duration::from_secs(5);
    pub const TRANSACTION_MAX_ATTEMPTS: u32 = 120;
    pub const TRANSACTION_INTERVAL: Duration = Duration::from_secs(1);

    /// The query timeout starts equal to `interval`.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            query_timeout: interval,
        }
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    /// 60 attempts, 5 s apart.
    pub fn bundle() -> Self {
        Self::new(Self::BUNDLE_MAX_ATTEMPTS, Self::BUNDLE_INTERVAL)
    }

    /// 120 attempts, 1 s apart.
    pub fn transaction() -> Self {
        Self::new(Self::TRANSACTION_MAX_ATTEMPTS, Self::TRANSACTION_INTERVAL)
    }

    /// Upper bound on wall-clock time if no terminal state is ever reached.
    /// Saturates at `Duration::MAX`.
    pub fn worst_case_wait(&self) -> Duration {
        self.interval
            .saturating_add(self.query_timeout)
            .saturating_mul(self.max_attempts)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::bundle()
    }
}

// ─── Steps and outcomes ─────────────────────────────────────────────────────

/// Verdict of a classifier on one observation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollStep<T> {
    Continue,
    Done(T),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The classifier reached a terminal verdict on attempt `attempts`.
    Completed { value: T, attempts: u32 },
    /// Every attempt was spent without a terminal verdict.
    Exhausted {
        attempts: u32,
        /// Error from the final attempt, if it failed.
        last_error: Option<String>,
    },
    /// A query failed in a way retrying cannot fix.
    Aborted { attempts: u32, error: String },
    /// The cancel signal fired after `attempts` completed attempts.
    Cancelled { attempts: u32 },
}

impl<T> PollOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Completed { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::Aborted { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
        }
    }
}

// ─── Loop ───────────────────────────────────────────────────────────────────

/// Run `query` up to `policy.max_attempts` times, feeding each successful
/// observation to `classify`.
///
/// `cancel` is checked only while sleeping between attempts.  A query is
/// dropped only when it overruns `policy.query_timeout`; status queries are
/// reads, so nothing is left half submitted.
///
/// Errors for which [`JitoRpcError::is_transport`] is false end the loop
/// with [`PollOutcome::Aborted`].
pub async fn poll<T, R, Q, Fut, C>(
    policy: &PollPolicy,
    mut cancel: Option<watch::Receiver<bool>>,
    mut query: Q,
    mut classify: C,
) -> PollOutcome<T>
where
    Q: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<R>>,
    C: FnMut(u32, R) -> PollStep<T>,
{
    let max_attempts = policy.max_attempts;
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        if sleep_or_cancel(policy.interval, cancel.as_mut()).await {
            info!(completed = attempt - 1, "polling cancelled");
            return PollOutcome::Cancelled {
                attempts: attempt - 1,
            };
        }

        debug!(attempt, max_attempts, "polling status");

        let result = match tokio::time::timeout(policy.query_timeout, query(attempt)).await {
            Ok(result) => result,
            Err(_) => Err(JitoRpcError::Timeout(policy.query_timeout)),
        };

        match result {
            Ok(observation) => {
                last_error = None;
                if let PollStep::Done(value) = classify(attempt, observation) {
                    return PollOutcome::Completed {
                        value,
                        attempts: attempt,
                    };
                }
            }
            Err(e) if e.is_transport() => {
                warn!(attempt, max_attempts, error = %e, "status query failed");
                last_error = Some(e.to_string());
            }
            Err(e) => {
                warn!(attempt, error = %e, "status query cannot succeed, giving up");
                return PollOutcome::Aborted {
                    attempts: attempt,
                    error: e.to_string(),
                };
            }
        }
    }

    warn!(max_attempts, "maximum polling attempts reached, final status unknown");
    PollOutcome::Exhausted {
        attempts: max_attempts,
        last_error,
    }
}

/// Sleep for `interval`; returns `true` if cancellation was signalled first.
async fn sleep_or_cancel(interval: Duration, cancel: Option<&mut watch::Receiver<bool>>) -> bool {
    let Some(rx) = cancel else {
        tokio::time::sleep(interval).await;
        return false;
    };

    let sleep = tokio::time::sleep(interval);
    tokio::pin!(sleep);

    loop {
        if *rx.borrow_and_update() {
            return true;
        }
        tokio::select! {
            _ = &mut sleep => return false,
            changed = rx.changed() => {
                if changed.is_err() {
                    // Sender gone: nobody can cancel any more.
                    (&mut sleep).await;
                    return false;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use tokio::time::Instant;

    fn policy(max_attempts: u32) -> PollPolicy {
        PollPolicy::new(max_attempts, Duration::from_secs(5))
    }

    fn transient() -> JitoRpcError {
        JitoRpcError::SolanaRpc("connection reset".into())
    }

    #[test]
    fn presets() {
        assert_eq!(PollPolicy::bundle().max_attempts, 60);
        assert_eq!(PollPolicy::bundle().interval, Duration::from_secs(5));
        assert_eq!(PollPolicy::transaction().max_attempts, 120);
        assert_eq!(PollPolicy::transaction().interval, Duration::from_secs(1));
        assert_eq!(PollPolicy::bundle().query_timeout, Duration::from_secs(5));
        assert_eq!(PollPolicy::bundle().worst_case_wait(), Duration::from_secs(600));
        assert_eq!(PollPolicy::default(), PollPolicy::bundle());
    }

    #[tokio::test(start_paused = true)]
    async fn completes_when_classifier_says_done() {
        let mut script: VecDeque<u32> = VecDeque::from(vec![1, 2, 3, 4]);
        let start = Instant::now();

        let outcome = poll(
            &policy(10),
            None,
            |_| {
                let next = script.pop_front().unwrap_or(0);
                async move { Ok::<_, JitoRpcError>(next) }
            },
            |_, n| if n == 3 { PollStep::Done(n * 10) } else { PollStep::Continue },
        )
        .await;

        assert_eq!(outcome, PollOutcome::Completed { value: 30, attempts: 3 });
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn errors_consume_attempts_without_aborting() {
        let mut calls = 0u32;

        let outcome = poll(
            &policy(5),
            None,
            |attempt| {
                calls += 1;
                async move {
                    if attempt < 3 {
                        Err(transient())
                    } else {
                        Ok(attempt)
                    }
                }
            },
            |_, n| PollStep::Done(n),
        )
        .await;

        assert_eq!(outcome, PollOutcome::Completed { value: 3, attempts: 3 });
        assert_eq!(calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_exactly_max_attempts() {
        let mut calls = 0u32;
        let start = Instant::now();

        let outcome: PollOutcome<()> = poll(
            &policy(7),
            None,
            |_| {
                calls += 1;
                async { Err::<(), _>(transient()) }
            },
            |_, _| PollStep::Continue,
        )
        .await;

        assert_eq!(calls, 7);
        assert_eq!(start.elapsed(), Duration::from_secs(35));
        match outcome {
            PollOutcome::Exhausted { attempts, last_error } => {
                assert_eq!(attempts, 7);
                assert!(last_error.unwrap().contains("connection reset"));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn last_error_cleared_by_later_success() {
        let outcome: PollOutcome<()> = poll(
            &policy(2),
            None,
            |attempt| async move {
                if attempt == 1 {
                    Err(transient())
                } else {
                    Ok(())
                }
            },
            |_, _| PollStep::Continue,
        )
        .await;

        assert_eq!(
            outcome,
            PollOutcome::Exhausted {
                attempts: 2,
                last_error: None
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_first_attempt() {
        let (tx, rx) = watch::channel(true);
        let mut calls = 0u32;

        let outcome: PollOutcome<()> = poll(
            &policy(10),
            Some(rx),
            |_| {
                calls += 1;
                async { Ok(()) }
            },
            |_, _| PollStep::Continue,
        )
        .await;

        assert_eq!(outcome, PollOutcome::Cancelled { attempts: 0 });
        assert_eq!(calls, 0);
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_between_attempts() {
        let (tx, rx) = watch::channel(false);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(12)).await;
            tx.send(true).ok();
        });

        let outcome: PollOutcome<()> = poll(
            &policy(10),
            Some(rx),
            |_| async { Ok(()) },
            |_, _| PollStep::Continue,
        )
        .await;

        assert_eq!(outcome, PollOutcome::Cancelled { attempts: 2 });
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_sender_does_not_cancel() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let start = Instant::now();

        let outcome: PollOutcome<()> = poll(
            &policy(3),
            Some(rx),
            |_| async { Ok(()) },
            |_, _| PollStep::Continue,
        )
        .await;

        assert_eq!(outcome.attempts(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[test]
    fn worst_case_wait_saturates() {
        let p = PollPolicy::new(u32::MAX, Duration::from_secs(u64::MAX));
        assert_eq!(p.worst_case_wait(), Duration::MAX);

        let p = PollPolicy::new(4, Duration::from_secs(2)).with_query_timeout(Duration::from_secs(3));
        assert_eq!(p.worst_case_wait(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_query_times_out_and_spends_attempt() {
        let start = Instant::now();
        let p = policy(3).with_query_timeout(Duration::from_secs(2));

        let outcome: PollOutcome<()> = poll(
            &p,
            None,
            |_| std::future::pending::<Result<()>>(),
            |_, _| PollStep::Continue,
        )
        .await;

        match outcome {
            PollOutcome::Exhausted { attempts, last_error } => {
                assert_eq!(attempts, 3);
                assert!(last_error.unwrap().contains("timed out"));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
        assert_eq!(start.elapsed(), Duration::from_secs(21));
        assert!(start.elapsed() <= p.worst_case_wait());
    }

    #[tokio::test(start_paused = true)]
    async fn non_transport_error_aborts() {
        let mut calls = 0u32;

        let outcome: PollOutcome<()> = poll(
            &policy(10),
            None,
            |_| {
                calls += 1;
                async { Err::<(), _>(JitoRpcError::InvalidSignature("bogus".into())) }
            },
            |_, _| PollStep::Continue,
        )
        .await;

        assert_eq!(calls, 1);
        match outcome {
            PollOutcome::Aborted { attempts, error } => {
                assert_eq!(attempts, 1);
                assert!(error.contains("bogus"));
            }
            other => panic!("expected Aborted, got {other:?}"),
        }
    }
}
