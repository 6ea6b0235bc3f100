use cluster_converge::{
    ClusterContext, ConvergeError, ConvergencePoller, InMemoryCluster, OperationOutcome,
    RetryBudget,
};
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

#[test]
fn budget_loads_from_json_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{"max_iterations": 40, "interval_ms": 250}}"#).unwrap();

    let budget = RetryBudget::from_json_file(file.path()).unwrap();

    assert_eq!(budget.iterations(), 40);
    assert_eq!(budget.pause(), Duration::from_millis(250));
    assert_eq!(budget.total_wait(), Duration::from_secs(10));
}

#[test]
fn missing_or_invalid_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("budget.json");
    assert!(matches!(
        RetryBudget::from_json_file(&missing),
        Err(ConvergeError::Config(_))
    ));

    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{"max_iterations": 0, "interval_ms": 5}}"#).unwrap();
    assert!(matches!(
        RetryBudget::from_json_file(file.path()),
        Err(ConvergeError::Config(_))
    ));
}

#[test]
fn context_rejects_empty_budget() {
    let cluster = Arc::new(InMemoryCluster::default());
    let budget = RetryBudget::default().max_iterations(0);

    assert!(matches!(
        ClusterContext::new(cluster, budget),
        Err(ConvergeError::InvalidBudget(_))
    ));
}

#[test]
fn poller_refuses_budget_with_no_attempts() {
    let budget = RetryBudget::default().max_iterations(0);

    assert!(matches!(
        ConvergencePoller::new(budget),
        Err(ConvergeError::InvalidBudget(_))
    ));
}

#[test]
fn thread_sleeper_waits_between_attempts() {
    let budget = RetryBudget::new(10, Duration::from_millis(20)).unwrap();
    let poller = ConvergencePoller::new(budget).unwrap();
    let mut calls = 0;

    let started = Instant::now();
    let outcome = poller
        .wait_until_true("wall_clock", || {
            calls += 1;
            Ok(calls == 3)
        })
        .unwrap();

    assert_eq!(outcome, OperationOutcome::Converged { attempts: 3 });
    assert!(started.elapsed() >= Duration::from_millis(40));
}
