//! Polling primitives.
//!
//! The game-room API is poll-driven: every phase of a session repeatedly
//! fetches server state until a condition is met, and every phase also has an
//! unconditional wall-clock exit so a silent server can never wedge the
//! client. [`poll_until`] packages that contract once, instead of each phase
//! hand-rolling its own interval plus safety timer.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::warn;

use crate::error::Result;

/// How a [`poll_until`] loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// A tick reported completion with this value.
    Completed(T),
    /// The hard timeout elapsed before any tick reported completion.
    TimedOut,
}

impl<T> PollOutcome<T> {
    /// Returns the completion value, if any.
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::TimedOut => None,
        }
    }
}

/// Runs `tick` every `interval` until it reports completion or `hard_timeout`
/// elapses, whichever comes first.
///
/// The first tick fires immediately. A tick returning `Ok(Some(value))` ends
/// the loop; `Ok(None)` keeps polling. Errors are logged and swallowed — the
/// next tick simply retries — because a transient fetch failure must never
/// end a polling phase on its own. The hard timeout is enforced on the wall
/// clock and may cut a tick off mid-flight.
pub async fn poll_until<T, F, Fut>(
    interval: Duration,
    hard_timeout: Duration,
    mut tick: F,
) -> PollOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let poll_loop = async {
        loop {
            ticker.tick().await;
            match tick().await {
                Ok(Some(value)) => return value,
                Ok(None) => {}
                Err(e) => warn!("poll tick failed, retrying next tick: {e}"),
            }
        }
    };

    match tokio::time::timeout(hard_timeout, poll_loop).await {
        Ok(value) => PollOutcome::Completed(value),
        Err(_) => PollOutcome::TimedOut,
    }
}

/// Runs `op` up to `attempts` times, sleeping `backoff` between attempts.
///
/// Returns the first success, or the last error once attempts are exhausted.
pub async fn with_retries<T, F, Fut>(attempts: u32, backoff: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                warn!("attempt {attempt}/{attempts} failed, retrying in {backoff:?}: {e}");
                tokio::time::sleep(backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::error::TriviaError;

    #[tokio::test(start_paused = true)]
    async fn completes_when_tick_reports_a_value() {
        let mut calls = 0;
        let outcome = poll_until(
            Duration::from_millis(500),
            Duration::from_secs(30),
            move || {
                calls += 1;
                let calls = calls;
                async move { Ok(if calls == 3 { Some(calls) } else { None }) }
            },
        )
        .await;
        assert_eq!(outcome, PollOutcome::Completed(3));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_no_tick_completes() {
        let outcome = poll_until::<(), _, _>(
            Duration::from_millis(500),
            Duration::from_secs(5),
            || async move { Ok(None) },
        )
        .await;
        assert_eq!(outcome, PollOutcome::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn tick_errors_are_swallowed_and_retried() {
        let mut calls = 0;
        let outcome = poll_until(
            Duration::from_millis(500),
            Duration::from_secs(30),
            move || {
                calls += 1;
                let calls = calls;
                async move {
                    if calls < 3 {
                        Err(TriviaError::Http("transient".into()))
                    } else {
                        Ok(Some(calls))
                    }
                }
            },
        )
        .await;
        assert_eq!(outcome, PollOutcome::Completed(3));
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_fires_immediately() {
        let outcome = poll_until(
            Duration::from_secs(3600),
            Duration::from_secs(7200),
            || async move { Ok(Some(())) },
        )
        .await;
        assert_eq!(outcome, PollOutcome::Completed(()));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_succeed_after_transient_failures() {
        let mut calls = 0;
        let value = with_retries(3, Duration::from_secs(1), move || {
            calls += 1;
            let calls = calls;
            async move {
                if calls < 3 {
                    Err(TriviaError::Http("flaky".into()))
                } else {
                    Ok(calls)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_return_last_error_when_exhausted() {
        let mut calls = 0;
        let err = with_retries::<(), _, _>(3, Duration::from_secs(1), || {
            calls += 1;
            let msg = format!("attempt {calls}");
            async move { Err(TriviaError::Http(msg)) }
        })
        .await
        .unwrap_err();
        assert_eq!(calls, 3);
        assert!(matches!(err, TriviaError::Http(msg) if msg == "attempt 3"));
    }
}
