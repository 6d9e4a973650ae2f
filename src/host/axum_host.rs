//! Axum implementation of the host server.
//!
//! # Responsibilities
//! - Collect mounted routes and layers into one Axum router
//! - Bind a TCP listener and serve the router in a background task
//! - Shut the server down gracefully on close
//!
//! # Design Decisions
//! - Handlers are keyed by name: mounting a name again replaces the earlier
//!   handler in place, so a repeated mount pass leaves the same pipeline
//! - Routes are composed at mount time so conflicts surface from `mount`
//! - Layers are applied at bind time, first mounted outermost, so they
//!   wrap every route and run in mount order
//! - Router panics during mount are turned into [`MountError::Rejected`]

use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::BoxError;
use crate::host::handler::{Handler, HandlerKind, MountError};
use crate::host::HostServer;

/// A live Axum listener.
#[derive(Debug)]
pub struct AxumHandle {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl AxumHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// True once the serving task has been joined.
    pub fn is_stopped(&self) -> bool {
        self.task.is_none()
    }
}

/// Host server backed by Axum and a Tokio TCP listener.
pub struct AxumHost {
    bind_host: String,
    handlers: Vec<Handler>,
    routes: Router,
}

impl AxumHost {
    /// Create a host that binds on `bind_host` (e.g. "0.0.0.0").
    pub fn new(bind_host: impl Into<String>) -> Self {
        Self {
            bind_host: bind_host.into(),
            handlers: Vec::new(),
            routes: Router::new(),
        }
    }

    /// Names of mounted handlers, in mount order.
    pub fn mounted(&self) -> Vec<&str> {
        self.handlers.iter().map(Handler::name).collect()
    }

    /// The full application: routes wrapped by every mounted layer.
    pub fn app(&self) -> Router {
        self.handlers
            .iter()
            .rev()
            .fold(self.routes.clone(), |router, handler| match handler.kind() {
                HandlerKind::Layer(layer) => layer(router),
                _ => router,
            })
    }

    async fn serve(addr: String, app: Router) -> Result<AxumHandle, BoxError> {
        let listener = TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;
        let (shutdown, rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                })
                .await
        });

        tracing::info!(address = %local_addr, "HTTP server listening");
        Ok(AxumHandle {
            local_addr,
            shutdown: Some(shutdown),
            task: Some(task),
        })
    }

    async fn shutdown(handle: &mut AxumHandle) -> Result<(), BoxError> {
        // The serving task may already be gone; joining reports why.
        if let Some(shutdown) = handle.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = handle.task.take() {
            task.await??;
            tracing::info!(address = %handle.local_addr, "HTTP server stopped");
        }
        Ok(())
    }
}

impl HostServer for AxumHost {
    type Handle = AxumHandle;

    fn mount(&mut self, handler: Handler) -> Result<(), MountError> {
        handler.validate()?;
        let name = handler.name().to_string();

        let mut handlers = self.handlers.clone();
        let position = match handlers.iter().position(|h| h.name() == name) {
            Some(index) => {
                handlers[index] = handler;
                index
            }
            None => {
                handlers.push(handler);
                handlers.len() - 1
            }
        };

        self.routes = compose_routes(&handlers)?;
        self.handlers = handlers;

        tracing::debug!(handler = %name, position, "Handler mounted");
        Ok(())
    }

    fn bind(&mut self, port: u16) -> impl Future<Output = Result<AxumHandle, BoxError>> + Send {
        let addr = format!("{}:{}", self.bind_host, port);
        Self::serve(addr, self.app())
    }

    fn close<'a>(
        &'a mut self,
        handle: &'a mut AxumHandle,
    ) -> impl Future<Output = Result<(), BoxError>> + Send + 'a {
        Self::shutdown(handle)
    }

    fn local_addr(&self, handle: &AxumHandle) -> Option<SocketAddr> {
        Some(handle.local_addr)
    }
}

/// Merge and nest every route handler, in order, into a fresh router.
fn compose_routes(handlers: &[Handler]) -> Result<Router, MountError> {
    handlers
        .iter()
        .try_fold(Router::new(), |root, handler| match handler.kind() {
            HandlerKind::Routes(router) => {
                try_apply(handler.name(), root, |root| root.merge(router.clone()))
            }
            HandlerKind::Nest { path, router } => {
                try_apply(handler.name(), root, |root| root.nest(path, router.clone()))
            }
            HandlerKind::Layer(_) => Ok(root),
        })
}

/// Apply a router change, turning an Axum panic into a mount error.
fn try_apply<F>(name: &str, root: Router, apply: F) -> Result<Router, MountError>
where
    F: FnOnce(Router) -> Router,
{
    panic::catch_unwind(AssertUnwindSafe(move || apply(root))).map_err(|payload| {
        let reason = panic_message(payload.as_ref());
        tracing::warn!(handler = %name, reason = %reason, "Handler rejected by router");
        MountError::Rejected {
            name: name.to_string(),
            reason,
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "router refused the handler".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{HeaderName, HeaderValue, Request, StatusCode};
    use axum::routing::get;
    use tower::ServiceExt;
    use tower_http::set_header::SetResponseHeaderLayer;

    fn hello() -> Router {
        Router::new().route("/hello", get(|| async { "hello" }))
    }

    fn tag(value: &'static str) -> Handler {
        Handler::layer("tag", move |r| {
            r.layer(SetResponseHeaderLayer::overriding(
                HeaderName::from_static("x-tag"),
                HeaderValue::from_static(value),
            ))
        })
    }

    async fn get_status(host: &AxumHost, uri: &str) -> (StatusCode, Option<HeaderValue>) {
        let res = host
            .app()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        (res.status(), res.headers().get("x-tag").cloned())
    }

    #[tokio::test]
    async fn test_routes_and_layers_are_served() {
        let mut host = AxumHost::new("127.0.0.1");
        host.mount(tag("1")).unwrap();
        // Mounted after the layer, still wrapped by it.
        host.mount(Handler::routes("hello", hello())).unwrap();
        host.mount(Handler::nest("api", "/api", hello())).unwrap();

        let (status, header) = get_status(&host, "/api/hello").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(header.unwrap(), "1");
        assert_eq!(host.mounted(), ["tag", "hello", "api"]);
    }

    #[test]
    fn test_overlapping_routes_rejected() {
        let mut host = AxumHost::new("127.0.0.1");
        host.mount(Handler::routes("hello", hello())).unwrap();

        let err = host.mount(Handler::routes("hello-again", hello())).unwrap_err();
        assert!(matches!(err, MountError::Rejected { ref name, .. } if name == "hello-again"));
        assert_eq!(host.mounted(), ["hello"]);
    }

    #[tokio::test]
    async fn test_remount_by_name_replaces_in_place() {
        let mut host = AxumHost::new("127.0.0.1");
        for value in ["1", "2"] {
            host.mount(tag(value)).unwrap();
            host.mount(Handler::routes("hello", hello())).unwrap();
        }

        assert_eq!(host.mounted(), ["tag", "hello"]);
        let (status, header) = get_status(&host, "/hello").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(header.unwrap(), "2");
    }

    #[test]
    fn test_invalid_nest_path_rejected() {
        let mut host = AxumHost::new("127.0.0.1");
        let err = host.mount(Handler::nest("api", "api", hello())).unwrap_err();
        assert!(matches!(err, MountError::InvalidPath { .. }));
        assert!(host.mounted().is_empty());
    }

    #[tokio::test]
    async fn test_bind_and_close() {
        let mut host = AxumHost::new("127.0.0.1");
        host.mount(Handler::routes("hello", hello())).unwrap();

        let mut handle = host.bind(38311).await.unwrap();
        assert_eq!(host.local_addr(&handle).unwrap().port(), 38311);
        host.close(&mut handle).await.unwrap();
        assert!(handle.is_stopped());

        // Closing a stopped handle again is a no-op.
        host.close(&mut handle).await.unwrap();

        // Port is released after close.
        let mut handle = host.bind(38311).await.unwrap();
        host.close(&mut handle).await.unwrap();
    }
}
