//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! config():  beforeConfig hooks → preConfigRan → mount middleware → emit
//! listen():  [config()] → beforeInit hooks → emit → [test()] → bind → emit
//!            → afterListen hooks
//! test():    run probes (parallel or sequential) → testsOK → emit → [reject]
//! close():   close handle → stopped → emit
//! ```
//!
//! # Design Decisions
//! - Hooks run strictly in order; the first failure stops the phase
//! - Probe failures become results, never errors; runner faults stay errors
//! - Status is emitted after each phase's state change, never before
//! - The host HTTP server is a collaborator behind [`HostServer`](crate::host::HostServer)

pub mod hooks;
pub mod probe;
pub mod server;
pub mod status;
pub mod suite;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use hooks::{run_all, Hook, HookResult};
pub use probe::{ProbeContext, TestCase, TestResult};
pub use server::{LifecycleServer, ListenOutcome, ServerBuilder, ServerContext};
pub use status::{ServerStatus, StatusBroadcaster, SubscriptionId};
pub use suite::{run_tests, SuiteOutcome, TestsRunConfig};

use crate::host::Handler;

/// A discrete step of the lifecycle, used for status, errors and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    BeforeConfig,
    Config,
    BeforeInit,
    Test,
    Listen,
    AfterListen,
    Close,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::BeforeConfig => "before_config",
            Phase::Config => "config",
            Phase::BeforeInit => "before_init",
            Phase::Test => "test",
            Phase::Listen => "listen",
            Phase::AfterListen => "after_listen",
            Phase::Close => "close",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A setting that accepts nothing, a single item, or a list.
///
/// Normalized once into an ordered `Vec` when the server is built.
#[derive(Debug, Clone)]
pub enum OneOrMany<T> {
    None,
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::None => Vec::new(),
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::None
    }
}

impl<T> IntoIterator for OneOrMany<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().into_iter()
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(items: Vec<T>) -> Self {
        OneOrMany::Many(items)
    }
}

impl<T, const N: usize> From<[T; N]> for OneOrMany<T> {
    fn from(items: [T; N]) -> Self {
        OneOrMany::Many(Vec::from(items))
    }
}

impl<T> From<Option<T>> for OneOrMany<T> {
    fn from(item: Option<T>) -> Self {
        match item {
            Some(item) => OneOrMany::One(item),
            None => OneOrMany::None,
        }
    }
}

impl<A> From<Hook<A>> for OneOrMany<Hook<A>> {
    fn from(hook: Hook<A>) -> Self {
        OneOrMany::One(hook)
    }
}

impl From<TestCase> for OneOrMany<TestCase> {
    fn from(test: TestCase) -> Self {
        OneOrMany::One(test)
    }
}

impl From<Handler> for OneOrMany<Handler> {
    fn from(handler: Handler) -> Self {
        OneOrMany::One(handler)
    }
}
