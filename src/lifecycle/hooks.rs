//! Sequential hook execution.
//!
//! # Responsibilities
//! - Run caller-supplied async hooks strictly in list order
//! - Stop at the first failure and return it untouched
//! - Collect resolved values in call order
//!
//! # Design Decisions
//! - No concurrency: each hook is awaited before the next one starts
//! - An empty list resolves to an empty result list, never an error
//! - The optional shared argument is cloned into every call

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::error::BoxError;

/// Outcome of a single hook invocation.
pub type HookResult = Result<Value, BoxError>;

type HookFn<A> = dyn Fn(A) -> BoxFuture<'static, HookResult> + Send + Sync;

/// An async function invoked at a fixed lifecycle point.
///
/// `A` is the argument handed to every call: `()` for beforeConfig and
/// beforeInit hooks, a [`ServerContext`](super::ServerContext) for
/// afterListen hooks.
pub struct Hook<A = ()> {
    f: Arc<HookFn<A>>,
}

impl<A: 'static> Hook<A> {
    /// Wrap an async function taking the shared argument.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        Self {
            f: Arc::new(move |arg: A| -> BoxFuture<'static, HookResult> { Box::pin(f(arg)) }),
        }
    }

    /// Start the hook.
    pub fn call(&self, arg: A) -> BoxFuture<'static, HookResult> {
        (self.f)(arg)
    }
}

impl Hook<()> {
    /// Wrap an async function that takes no argument.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        Self::new(move |()| f())
    }
}

impl<A> Clone for Hook<A> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<A> fmt::Debug for Hook<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook").finish_non_exhaustive()
    }
}

/// Run `hooks` one after another, passing `arg` to each.
///
/// Returns every resolved value in order, or the first failure as-is.
pub async fn run_all<A: Clone + 'static>(
    hooks: &[Hook<A>],
    arg: A,
) -> Result<Vec<Value>, BoxError> {
    let mut results = Vec::with_capacity(hooks.len());

    for (index, hook) in hooks.iter().enumerate() {
        match hook.call(arg.clone()).await {
            Ok(value) => results.push(value),
            Err(err) => {
                tracing::debug!(
                    index,
                    total = hooks.len(),
                    error = %err,
                    "Hook failed, remaining hooks skipped"
                );
                return Err(err);
            }
        }
    }

    Ok(results)
}
