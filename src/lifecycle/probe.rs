//! Server self-test probes.
//!
//! # Responsibilities
//! - Wrap a single async probe with its success and failure messages
//! - Turn any probe failure into a [`TestResult`] instead of an error
//! - Log the outcome of every run
//!
//! # Design Decisions
//! - An optional opaque context is handed to the probe as a parameter
//! - The probe's resolved value is ignored; only success or failure counts

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::BoxError;

/// Opaque value a probe can be bound to. Passed through unchanged.
pub type ProbeContext = Arc<dyn Any + Send + Sync>;

type ProbeOutcome = Result<(), BoxError>;

#[derive(Clone)]
enum Probe {
    Plain(Arc<dyn Fn() -> BoxFuture<'static, ProbeOutcome> + Send + Sync>),
    Bound {
        context: ProbeContext,
        f: Arc<dyn Fn(ProbeContext) -> BoxFuture<'static, ProbeOutcome> + Send + Sync>,
    },
}

/// Result of a single [`TestCase::execute`] run.
///
/// Exactly one of `error` and `result` is set.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// The probe's failure, if it failed.
    pub error: Option<Arc<dyn Error + Send + Sync>>,
    /// The case's failure message when `error` is set, empty otherwise.
    pub error_message: String,
    /// The case's success message when the probe succeeded.
    pub result: Option<String>,
}

impl TestResult {
    fn passed(message: &str) -> Self {
        Self {
            error: None,
            error_message: String::new(),
            result: Some(message.to_string()),
        }
    }

    fn failed(message: &str, error: BoxError) -> Self {
        Self {
            error: Some(Arc::from(error)),
            error_message: message.to_string(),
            result: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// A named self-test run by the orchestrator before or after listening.
#[derive(Clone)]
pub struct TestCase {
    on_error_message: String,
    on_success_message: String,
    probe: Probe,
}

impl TestCase {
    /// Create a test from a probe that takes no arguments.
    pub fn new<F, Fut, T, E>(
        on_error_message: impl Into<String>,
        on_success_message: impl Into<String>,
        probe: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: 'static,
        E: Into<BoxError> + 'static,
    {
        let f = move || -> BoxFuture<'static, ProbeOutcome> {
            let fut = probe();
            Box::pin(async move { fut.await.map(|_| ()).map_err(Into::into) })
        };

        Self {
            on_error_message: on_error_message.into(),
            on_success_message: on_success_message.into(),
            probe: Probe::Plain(Arc::new(f)),
        }
    }

    /// Create a test whose probe receives `context` on every run.
    pub fn with_context<F, Fut, T, E>(
        on_error_message: impl Into<String>,
        on_success_message: impl Into<String>,
        context: ProbeContext,
        probe: F,
    ) -> Self
    where
        F: Fn(ProbeContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: 'static,
        E: Into<BoxError> + 'static,
    {
        let f = move |ctx: ProbeContext| -> BoxFuture<'static, ProbeOutcome> {
            let fut = probe(ctx);
            Box::pin(async move { fut.await.map(|_| ()).map_err(Into::into) })
        };

        Self {
            on_error_message: on_error_message.into(),
            on_success_message: on_success_message.into(),
            probe: Probe::Bound {
                context,
                f: Arc::new(f),
            },
        }
    }

    pub fn on_error_message(&self) -> &str {
        &self.on_error_message
    }

    pub fn on_success_message(&self) -> &str {
        &self.on_success_message
    }

    /// The bound context, if any.
    pub fn context(&self) -> Option<&ProbeContext> {
        match &self.probe {
            Probe::Plain(_) => None,
            Probe::Bound { context, .. } => Some(context),
        }
    }

    /// Run the probe. Never fails: probe errors are folded into the result.
    pub async fn execute(&self) -> TestResult {
        let outcome = match &self.probe {
            Probe::Plain(f) => f().await,
            Probe::Bound { context, f } => f(Arc::clone(context)).await,
        };

        match outcome {
            Ok(()) => {
                tracing::info!(result = %self.on_success_message, "Server test passed");
                TestResult::passed(&self.on_success_message)
            }
            Err(err) => {
                tracing::error!(
                    message = %self.on_error_message,
                    error = %err,
                    "Server test failed"
                );
                TestResult::failed(&self.on_error_message, err)
            }
        }
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("on_error_message", &self.on_error_message)
            .field("on_success_message", &self.on_success_message)
            .field("has_context", &self.context().is_some())
            .finish()
    }
}
