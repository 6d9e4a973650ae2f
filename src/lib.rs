//! Phased server lifecycle orchestration.
//!
//! Sequences configuration, pre-initialization hooks, self-tests and
//! listen/close phases around a host HTTP server, broadcasting a status
//! snapshot after every phase.

pub mod config;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use error::{BoxError, ServerError};
pub use host::{AxumHost, Handler, HostServer};
pub use lifecycle::{
    Hook, LifecycleServer, ServerBuilder, ServerContext, ServerStatus, TestCase, TestResult,
    TestsRunConfig,
};
