use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{
    audit::{self, AuditEvent, AuditLog},
    errors::Error,
    Result,
};

#[derive(Debug, Default)]
struct GuardStats {
    backoffs: AtomicUsize,
    waited_ms: AtomicU64,
}

/// Shields remote calls from the platform's mandatory cool-down signal.
///
/// On [`Error::RateLimited`] the guard sleeps exactly the mandated wait and
/// re-issues the call, with no retry cap and no jitter. Every other error is
/// returned untouched. Sleeps end early with [`Error::Cancelled`] once the
/// run's token is cancelled.
#[derive(Clone, Debug)]
pub struct RateLimitGuard {
    cancel: CancellationToken,
    audit: Option<Arc<AuditLog>>,
    stats: Arc<GuardStats>,
}

impl RateLimitGuard {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            audit: None,
            stats: Arc::new(GuardStats::default()),
        }
    }

    pub fn with_audit(mut self, audit: Option<Arc<AuditLog>>) -> Self {
        self.audit = audit;
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Rate-limit suspensions taken so far.
    pub fn backoffs(&self) -> usize {
        self.stats.backoffs.load(Ordering::Relaxed)
    }

    pub fn total_wait(&self) -> Duration {
        Duration::from_millis(self.stats.waited_ms.load(Ordering::Relaxed))
    }

    /// Run `op` until it returns something other than a rate-limit signal.
    pub async fn call<T, F, Fut>(&self, call: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            match op().await {
                Err(Error::RateLimited { wait }) => self.backoff(call, wait).await?,
                other => return other,
            }
        }
    }

    /// Sleep out a platform-mandated wait and count it.
    pub async fn backoff(&self, call: &str, wait: Duration) -> Result<()> {
        tracing::warn!(call, wait_secs = wait.as_secs_f64(), "rate limited, sleeping");
        self.stats.backoffs.fetch_add(1, Ordering::Relaxed);
        self.stats
            .waited_ms
            .fetch_add(wait.as_millis() as u64, Ordering::Relaxed);
        audit::record(self.audit.as_deref(), || AuditEvent::rate_limit(call, wait));
        self.pause(wait).await
    }

    /// Cancellable sleep.
    pub async fn pause(&self, d: Duration) -> Result<()> {
        if d.is_zero() {
            return if self.cancel.is_cancelled() {
                Err(Error::Cancelled)
            } else {
                Ok(())
            };
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            _ = sleep(d) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn rate_limited_call_sleeps_once_and_retries() {
        let guard = RateLimitGuard::new(CancellationToken::new());
        let calls = AtomicUsize::new(0);
        let started = Instant::now();

        let out = guard
            .call("search", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(Error::rate_limited_secs(5))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(out, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(guard.backoffs(), 1);
        assert_eq!(guard.total_wait(), Duration::from_secs(5));
        let slept = started.elapsed();
        assert!(slept >= Duration::from_secs(5));
        assert!(slept < Duration::from_millis(5_010));
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_rate_limits_keep_retrying() {
        let guard = RateLimitGuard::new(CancellationToken::new());
        let calls = AtomicUsize::new(0);

        guard
            .call("delete", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 4 {
                        Err(Error::rate_limited_secs(1))
                    } else {
                        Ok(())
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(guard.backoffs(), 4);
    }

    #[tokio::test]
    async fn other_errors_propagate_without_retry() {
        let guard = RateLimitGuard::new(CancellationToken::new());
        let calls = AtomicUsize::new(0);

        let err = guard
            .call("delete", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(Error::External("boom".to_string())) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::External(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(guard.backoffs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_a_long_backoff() {
        let cancel = CancellationToken::new();
        let guard = RateLimitGuard::new(cancel.clone());
        let started = Instant::now();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let err = guard
            .call("search", || async {
                Err::<(), _>(Error::rate_limited_secs(3600))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn cancelled_guard_issues_no_calls() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let guard = RateLimitGuard::new(cancel);
        let calls = AtomicUsize::new(0);

        let err = guard
            .call("search", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, Error>(()) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
