use std::time::Duration;

use tracing::{debug, info, warn};

use crate::errors::{RelayError, RunFailure};
use crate::service::AssistantService;

/// Delay between run status queries.
///
/// This cadence is the only rate limit the relay applies to the service.
pub const RUN_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default cap on status queries per run (about ten minutes at the default interval).
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 1_200;

/// How `RunWaiter` spaces and bounds its status queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Delay after the first pending answer.
    pub interval: Duration,
    /// Factor applied to the delay after each further pending answer. `1` keeps it fixed.
    pub multiplier: u32,
    /// Upper bound for the delay once backoff kicks in.
    pub max_interval: Duration,
    /// Maximum number of status queries; `None` polls until a terminal state.
    pub max_attempts: Option<u32>,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::fixed(RUN_POLL_INTERVAL)
    }
}

impl WaitPolicy {
    /// Fixed-interval polling with the default attempt cap.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            multiplier: 1,
            max_interval: interval,
            max_attempts: Some(DEFAULT_MAX_POLL_ATTEMPTS),
        }
    }

    /// Grows the delay by `multiplier` after each pending answer, up to `max_interval`.
    pub fn with_backoff(mut self, multiplier: u32, max_interval: Duration) -> Self {
        self.multiplier = multiplier.max(1);
        self.max_interval = max_interval.max(self.interval);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }

    /// Removes the attempt cap.
    pub fn unbounded(mut self) -> Self {
        self.max_attempts = None;
        self
    }

    /// Delay to sleep after the `attempt`-th pending answer (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        if self.multiplier <= 1 {
            return self.interval;
        }
        let mut delay = self.interval;
        for _ in 1..attempt {
            delay = delay.saturating_mul(self.multiplier);
            if delay >= self.max_interval {
                return self.max_interval;
            }
        }
        delay
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

/// Polls a run until it leaves its pending states.
pub struct RunWaiter<'a> {
    service: &'a dyn AssistantService,
    policy: &'a WaitPolicy,
}

impl<'a> RunWaiter<'a> {
    pub fn new(service: &'a dyn AssistantService, policy: &'a WaitPolicy) -> Self {
        Self { service, policy }
    }

    /// Waits for the run to reach a terminal state.
    ///
    /// Returns `Ok(())` for `completed` and `RelayError::RunFailed` for every
    /// failure terminal or when the policy runs out of attempts. A failed status
    /// query is returned as `RelayError::Service` at once, without polling again.
    pub async fn await_completion(&self, thread_id: &str, run_id: &str) -> Result<(), RelayError> {
        let mut attempts = 0_u32;
        loop {
            let run = self.service.get_run(thread_id, run_id).await?;
            attempts = attempts.saturating_add(1);
            debug!(
                thread_id,
                run_id,
                attempt = attempts,
                status = %run.status,
                "polled run status"
            );

            if run.status.is_success() {
                info!(thread_id, run_id, attempts, "run completed");
                return Ok(());
            }
            if !run.status.is_pending() {
                warn!(
                    thread_id,
                    run_id,
                    attempts,
                    status = %run.status,
                    "run ended without completing"
                );
                return Err(RunFailure::Terminal(run.status).into());
            }
            if self.policy.exhausted(attempts) {
                warn!(thread_id, run_id, attempts, "run still pending after final status check");
                return Err(RunFailure::TimedOut { attempts }.into());
            }

            tokio::time::sleep(self.policy.delay_after(attempts)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ServiceError;
    use crate::service::RunStatus;
    use crate::testing::FakeService;

    #[tokio::test(start_paused = true)]
    async fn pending_answers_then_completed_use_n_plus_one_queries() {
        let service = FakeService::with_statuses(vec![
            RunStatus::Queued,
            RunStatus::InProgress,
            RunStatus::InProgress,
            RunStatus::Completed,
        ]);
        let policy = WaitPolicy::default();
        let started = tokio::time::Instant::now();

        RunWaiter::new(&service, &policy)
            .await_completion("thread_1", "run_1")
            .await
            .expect("completed");

        assert_eq!(FakeService::count(&service.status_queries), 4);
        assert_eq!(started.elapsed(), RUN_POLL_INTERVAL * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_completion_does_not_sleep() {
        let service = FakeService::with_statuses(vec![RunStatus::Completed]);
        let policy = WaitPolicy::default();
        let started = tokio::time::Instant::now();

        RunWaiter::new(&service, &policy)
            .await_completion("t", "r")
            .await
            .expect("completed");

        assert_eq!(FakeService::count(&service.status_queries), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn every_failure_terminal_carries_its_status() {
        for status in [
            RunStatus::Cancelling,
            RunStatus::Cancelled,
            RunStatus::Failed,
            RunStatus::Expired,
        ] {
            let service = FakeService::with_statuses(vec![RunStatus::Queued, status]);
            let policy = WaitPolicy::default();
            let err = RunWaiter::new(&service, &policy)
                .await_completion("t", "r")
                .await
                .expect_err("failure terminal");
            assert_eq!(err, RelayError::RunFailed(RunFailure::Terminal(status)));
            assert_eq!(err.frame_detail(), status.as_str());
            assert_eq!(FakeService::count(&service.status_queries), 2);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_stops_polling_immediately() {
        let service = FakeService::with_statuses(vec![RunStatus::InProgress])
            .status_error(ServiceError::transport("connection refused"));
        let policy = WaitPolicy::default();
        let err = RunWaiter::new(&service, &policy)
            .await_completion("t", "r")
            .await
            .expect_err("transport failure");
        assert!(matches!(err, RelayError::Service(ServiceError::Transport { .. })));
        assert_eq!(FakeService::count(&service.status_queries), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_cap_turns_endless_pending_into_timeout() {
        let service = FakeService::with_statuses(vec![RunStatus::Queued]);
        let policy = WaitPolicy::default().with_max_attempts(3);
        let started = tokio::time::Instant::now();

        let err = RunWaiter::new(&service, &policy)
            .await_completion("t", "r")
            .await
            .expect_err("timed out");

        assert_eq!(
            err,
            RelayError::RunFailed(RunFailure::TimedOut { attempts: 3 })
        );
        assert_eq!(FakeService::count(&service.status_queries), 3);
        assert_eq!(started.elapsed(), RUN_POLL_INTERVAL * 2);
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = WaitPolicy::fixed(Duration::from_millis(100))
            .with_backoff(2, Duration::from_millis(350));
        let delays: Vec<_> = (1..=4).map(|attempt| policy.delay_after(attempt)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(350),
                Duration::from_millis(350),
            ]
        );
    }

    #[test]
    fn default_policy_is_fixed_half_second_and_bounded() {
        let policy = WaitPolicy::default();
        assert_eq!(policy.delay_after(1), RUN_POLL_INTERVAL);
        assert_eq!(policy.delay_after(50), RUN_POLL_INTERVAL);
        assert_eq!(policy.max_attempts, Some(DEFAULT_MAX_POLL_ATTEMPTS));
        assert_eq!(policy.unbounded().max_attempts, None);
    }
}
