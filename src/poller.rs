use crate::config::RetryBudget;
use crate::core::{ConvergeError, OperationOutcome, Probe, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, event, info_span};

/// Blocks the calling thread between probe evaluations.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Bounded "wait until the condition holds" driver.
///
/// Evaluates a probe up to `max_iterations` times, sleeping `interval`
/// between misses but never after the last one. An `Err` from the probe
/// aborts the wait at once; only an explicit miss is retried.
#[derive(Clone)]
pub struct ConvergencePoller {
    budget: RetryBudget,
    sleeper: Arc<dyn Sleeper>,
}

impl fmt::Debug for ConvergencePoller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvergencePoller")
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

impl ConvergencePoller {
    pub fn new(budget: RetryBudget) -> Result<Self> {
        Self::with_sleeper(budget, Arc::new(ThreadSleeper))
    }

    /// Fails with [`ConvergeError::InvalidBudget`] unless the budget allows at
    /// least one evaluation.
    pub fn with_sleeper(budget: RetryBudget, sleeper: Arc<dyn Sleeper>) -> Result<Self> {
        budget.validate().map_err(ConvergeError::InvalidBudget)?;
        Ok(Self { budget, sleeper })
    }

    /// Same budget, different way of waiting.
    pub fn sleeping_with(self, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            budget: self.budget,
            sleeper,
        }
    }

    pub fn budget(&self) -> &RetryBudget {
        &self.budget
    }

    /// Polls `probe` until it is satisfied or the budget runs out.
    ///
    /// `tag` names the operation in logs and in the timeout diagnostic.
    pub fn wait_until<D, F>(&self, tag: &str, mut probe: F) -> Result<OperationOutcome<D>>
    where
        D: fmt::Debug,
        F: FnMut() -> Result<Probe<D>>,
    {
        let max_iterations = self.budget.iterations();
        let interval = self.budget.pause();
        let span = info_span!(
            "converge.wait",
            tag = %tag,
            max_iterations = max_iterations,
            interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX)
        );
        let _enter = span.enter();

        let mut attempt = 0;
        loop {
            attempt += 1;
            let observed = match probe()? {
                Probe::Satisfied => {
                    event!(Level::INFO, attempts = attempt, "converged");
                    return Ok(OperationOutcome::Converged { attempts: attempt });
                }
                Probe::Unsatisfied(observed) => observed,
            };

            if attempt >= max_iterations {
                event!(
                    Level::WARN,
                    attempts = attempt,
                    last_observed = ?observed,
                    "retry budget exhausted"
                );
                return Ok(OperationOutcome::TimedOut {
                    tag: tag.to_string(),
                    attempts: attempt,
                    last_observed: observed,
                });
            }

            event!(Level::DEBUG, attempt = attempt, observed = ?observed, "not converged yet");
            self.sleeper.sleep(interval);
        }
    }

    /// [`wait_until`](Self::wait_until) for plain boolean conditions.
    ///
    /// The timeout diagnostic is the last value, i.e. `false`.
    pub fn wait_until_true<F>(
        &self,
        tag: &str,
        mut condition: F,
    ) -> Result<OperationOutcome<bool>>
    where
        F: FnMut() -> Result<bool>,
    {
        self.wait_until(tag, || {
            Ok(if condition()? {
                Probe::Satisfied
            } else {
                Probe::Unsatisfied(false)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ConvergeError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSleeper {
        naps: Mutex<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.naps.lock().unwrap().push(duration);
        }
    }

    fn poller(iterations: u32) -> (ConvergencePoller, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::default());
        let budget = RetryBudget::new(iterations, Duration::from_millis(100)).unwrap();
        let poller = ConvergencePoller::with_sleeper(budget, sleeper.clone()).unwrap();
        (poller, sleeper)
    }

    #[test]
    fn converges_on_kth_call_after_k_minus_one_sleeps() {
        let (poller, sleeper) = poller(10);
        let mut calls = 0;

        let outcome = poller
            .wait_until_true("kth", || {
                calls += 1;
                Ok(calls == 4)
            })
            .unwrap();

        assert_eq!(outcome, OperationOutcome::Converged { attempts: 4 });
        assert_eq!(calls, 4);
        let naps = sleeper.naps.lock().unwrap();
        assert_eq!(naps.len(), 3);
        assert_eq!(naps.iter().sum::<Duration>(), Duration::from_millis(300));
    }

    #[test]
    fn first_call_success_never_sleeps() {
        let (poller, sleeper) = poller(3);
        let outcome = poller.wait_until_true("now", || Ok(true)).unwrap();
        assert_eq!(outcome.attempts(), 1);
        assert!(sleeper.naps.lock().unwrap().is_empty());
    }

    #[test]
    fn timeout_keeps_last_observation() {
        let (poller, sleeper) = poller(5);
        let mut seen = 0;

        let outcome = poller
            .wait_until("count", || {
                seen += 1;
                Ok(Probe::Unsatisfied(seen))
            })
            .unwrap();

        assert_eq!(
            outcome,
            OperationOutcome::TimedOut {
                tag: "count".to_string(),
                attempts: 5,
                last_observed: 5,
            }
        );
        assert_eq!(sleeper.naps.lock().unwrap().len(), 4);
    }

    #[test]
    fn probe_error_aborts_immediately() {
        let (poller, sleeper) = poller(5);
        let mut calls = 0;

        let result = poller.wait_until_true("rpc", || {
            calls += 1;
            if calls == 2 {
                Err(ConvergeError::Rpc("boom".to_string()))
            } else {
                Ok(false)
            }
        });

        assert!(matches!(result, Err(ConvergeError::Rpc(_))));
        assert_eq!(calls, 2);
        assert_eq!(sleeper.naps.lock().unwrap().len(), 1);
    }

    #[test]
    fn single_iteration_budget_never_sleeps() {
        let (poller, sleeper) = poller(1);
        let outcome = poller.wait_until_true("once", || Ok(false)).unwrap();
        assert_eq!(outcome.attempts(), 1);
        assert_eq!(outcome.last_observed(), Some(&false));
        assert!(sleeper.naps.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_budget_is_rejected_before_any_evaluation() {
        let sleeper: Arc<dyn Sleeper> = Arc::new(RecordingSleeper::default());
        let budget = RetryBudget::default().max_iterations(0);

        assert!(matches!(
            ConvergencePoller::new(budget),
            Err(ConvergeError::InvalidBudget(_))
        ));
        assert!(matches!(
            ConvergencePoller::with_sleeper(budget, sleeper),
            Err(ConvergeError::InvalidBudget(_))
        ));
    }

    #[test]
    fn sleeping_with_keeps_the_budget() {
        let (poller, _) = poller(7);
        let replacement = Arc::new(RecordingSleeper::default());
        let poller = poller.sleeping_with(replacement.clone());

        assert_eq!(poller.budget().iterations(), 7);
        let outcome = poller.wait_until_true("swap", || Ok(false)).unwrap();
        assert_eq!(outcome.attempts(), 7);
        assert_eq!(replacement.naps.lock().unwrap().len(), 6);
    }
}
