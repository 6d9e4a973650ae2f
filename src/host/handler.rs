//! Mountable pipeline handlers.

use std::fmt;
use std::sync::Arc;

use axum::Router;
use thiserror::Error;

type LayerFn = Arc<dyn Fn(Router) -> Router + Send + Sync>;

/// Errors raised when a handler cannot be mounted.
#[derive(Debug, Error)]
pub enum MountError {
    /// A nest path that the router would refuse.
    #[error("handler `{name}` has invalid path `{path}`: nest paths must start with '/'")]
    InvalidPath { name: String, path: String },

    /// The router rejected the handler (overlapping routes and the like).
    #[error("handler `{name}` was rejected: {reason}")]
    Rejected { name: String, reason: String },
}

#[derive(Clone)]
pub(crate) enum HandlerKind {
    /// Routes merged at the root.
    Routes(Router),
    /// Routes nested under a path prefix.
    Nest { path: String, router: Router },
    /// Middleware wrapping every route.
    Layer(LayerFn),
}

/// A named unit of request-processing logic for the host pipeline.
#[derive(Clone)]
pub struct Handler {
    name: String,
    kind: HandlerKind,
}

impl Handler {
    /// Routes merged into the root router.
    pub fn routes(name: impl Into<String>, router: Router) -> Self {
        Self {
            name: name.into(),
            kind: HandlerKind::Routes(router),
        }
    }

    /// Routes mounted under `path`.
    pub fn nest(name: impl Into<String>, path: impl Into<String>, router: Router) -> Self {
        Self {
            name: name.into(),
            kind: HandlerKind::Nest {
                path: path.into(),
                router,
            },
        }
    }

    /// Middleware applied to the whole router, e.g. `|r| r.layer(TraceLayer::new_for_http())`.
    pub fn layer<F>(name: impl Into<String>, apply: F) -> Self
    where
        F: Fn(Router) -> Router + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: HandlerKind::Layer(Arc::new(apply)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_layer(&self) -> bool {
        matches!(self.kind, HandlerKind::Layer(_))
    }

    /// Checks that can be made without touching a router.
    pub(crate) fn validate(&self) -> Result<(), MountError> {
        if let HandlerKind::Nest { path, .. } = &self.kind {
            if !path.starts_with('/') {
                return Err(MountError::InvalidPath {
                    name: self.name.clone(),
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn kind(&self) -> &HandlerKind {
        &self.kind
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            HandlerKind::Routes(_) => "routes",
            HandlerKind::Nest { .. } => "nest",
            HandlerKind::Layer(_) => "layer",
        };
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}
