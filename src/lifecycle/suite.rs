//! Test suite runner.
//!
//! # Responsibilities
//! - Run a list of [`TestCase`]s concurrently or one after another
//! - Keep results in input order regardless of completion order
//! - Aggregate pass/fail and optionally reject on any failure
//!
//! # Design Decisions
//! - Every probe runs in its own task, so a panicking probe is a runner
//!   fault rather than a test failure
//! - A failing test never stops the run; every test always executes

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::task::{JoinError, JoinHandle};

use crate::error::ServerError;
use crate::lifecycle::probe::{TestCase, TestResult};
use crate::observability::metrics;

/// How [`run_tests`] executes a suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TestsRunConfig {
    /// Fail the run when any test fails.
    pub reject_on_error: bool,
    /// Start every probe at once instead of one after another.
    pub run_parallel: bool,
}

impl Default for TestsRunConfig {
    fn default() -> Self {
        Self {
            reject_on_error: true,
            run_parallel: true,
        }
    }
}

/// Collected results of one suite run.
#[derive(Debug, Clone, Default)]
pub struct SuiteOutcome {
    results: Vec<TestResult>,
}

impl SuiteOutcome {
    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<TestResult> {
        self.results
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }

    /// True when every test passed. An empty suite counts as passing.
    pub fn tests_ok(&self) -> bool {
        self.passed() == self.results.len()
    }

    /// Apply the `reject_on_error` rule to this outcome.
    pub fn into_checked(self, reject_on_error: bool) -> Result<Vec<TestResult>, ServerError> {
        if reject_on_error && !self.tests_ok() {
            return Err(ServerError::TestsFailed);
        }
        Ok(self.results)
    }
}

/// Run every test in `tests` according to `config`.
///
/// Fails only on a runner fault; test failures are reported in the outcome.
pub async fn run_tests(
    tests: &[TestCase],
    config: TestsRunConfig,
) -> Result<SuiteOutcome, ServerError> {
    if tests.is_empty() {
        return Ok(SuiteOutcome::default());
    }

    tracing::info!(
        count = tests.len(),
        parallel = config.run_parallel,
        "Running server tests"
    );

    let results = if config.run_parallel {
        let handles: Vec<_> = tests.iter().cloned().map(spawn_probe).collect();
        join_all(handles)
            .await
            .into_iter()
            .enumerate()
            .map(|(index, joined)| joined.map_err(|e| runner_fault(index, e)))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        let mut results = Vec::with_capacity(tests.len());
        for (index, test) in tests.iter().cloned().enumerate() {
            let result = spawn_probe(test)
                .await
                .map_err(|e| runner_fault(index, e))?;
            results.push(result);
        }
        results
    };

    for result in &results {
        metrics::record_test_result(result.is_ok());
    }

    let outcome = SuiteOutcome { results };
    tracing::info!(
        passed = outcome.passed(),
        failed = outcome.failed(),
        "Server tests finished"
    );
    Ok(outcome)
}

fn spawn_probe(test: TestCase) -> JoinHandle<TestResult> {
    tokio::spawn(async move { test.execute().await })
}

fn runner_fault(index: usize, err: JoinError) -> ServerError {
    tracing::error!(index, error = %err, "Server test did not complete");
    ServerError::TestRunner(format!("test #{index} did not complete: {err}"))
}
