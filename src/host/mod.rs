//! Host HTTP server subsystem.
//!
//! # Data Flow
//! ```text
//! LifecycleServer::config()
//!     → HostServer::mount(handler)   (once per middleware, in order)
//! LifecycleServer::listen()
//!     → HostServer::bind(port)       → Handle (serving in background)
//! LifecycleServer::close()
//!     → HostServer::close(&mut handle) → graceful shutdown, port released
//! ```
//!
//! # Design Decisions
//! - The orchestrator only sees the [`HostServer`] trait; routing, body
//!   handling and sockets stay inside the host
//! - Handlers are cloneable so a pipeline can be mounted again after a
//!   repeated `config()`
//! - Layers wrap every route, whatever order routes and layers were mounted in

pub mod axum_host;
pub mod handler;
pub mod middleware;

use std::future::Future;
use std::net::SocketAddr;

use crate::error::BoxError;

pub use axum_host::{AxumHandle, AxumHost};
pub use handler::{Handler, MountError};
pub use middleware::{default_middleware, status_routes};

/// The HTTP server the orchestrator drives.
pub trait HostServer: Send {
    /// Proof of an active listener, dropped once [`HostServer::close`] succeeds.
    type Handle: Send;

    /// Add a handler to the processing pipeline, in call order.
    fn mount(&mut self, handler: Handler) -> Result<(), MountError>;

    /// Start accepting connections on `port`. Resolves once listening.
    fn bind(&mut self, port: u16) -> impl Future<Output = Result<Self::Handle, BoxError>> + Send;

    /// Stop accepting connections and release the port.
    ///
    /// The handle stays with the caller, so a failed close can be retried
    /// with the same handle. Closing an already stopped handle succeeds.
    fn close<'a>(
        &'a mut self,
        handle: &'a mut Self::Handle,
    ) -> impl Future<Output = Result<(), BoxError>> + Send + 'a;

    /// Address a handle is listening on, when the host knows it.
    fn local_addr(&self, handle: &Self::Handle) -> Option<SocketAddr>;
}
