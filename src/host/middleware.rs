//! Stock middleware and routes for the Axum host.
//!
//! # Responsibilities
//! - Response compression, request tracing, request IDs, timeouts and body limits
//! - Tag responses with the serving instance's name
//! - Expose the latest status snapshot over HTTP
//!
//! # Design Decisions
//! - Each concern is its own named [`Handler`] so callers can pick and reorder
//! - Request IDs are UUID v4, propagated back on the response

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::routing::get;
use axum::{Json, Router};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::HttpConfig;
use crate::host::Handler;
use crate::lifecycle::{ServerStatus, StatusBroadcaster};

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Header naming the instance that served the response.
pub const X_SERVED_BY: &str = "x-served-by";

/// Generates a fresh UUID v4 for every request without an ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// The default pipeline: compression, tracing, request ID, timeout, body limit, served-by.
#[allow(deprecated)]
pub fn default_middleware(config: &HttpConfig, server_name: &str) -> Vec<Handler> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let body_limit = config.max_body_bytes;
    let request_id = HeaderName::from_static(X_REQUEST_ID);

    let mut handlers = vec![
        Handler::layer("compression", |r| r.layer(CompressionLayer::new())),
        Handler::layer("trace", |r| r.layer(TraceLayer::new_for_http())),
        Handler::layer("request-id", move |r| {
            r.layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(request_id.clone(), UuidRequestId))
                    .layer(PropagateRequestIdLayer::new(request_id.clone())),
            )
        }),
        Handler::layer("timeout", move |r| r.layer(TimeoutLayer::new(timeout))),
        Handler::layer("body-limit", move |r| {
            r.layer(RequestBodyLimitLayer::new(body_limit))
        }),
    ];

    match HeaderValue::from_str(server_name) {
        Ok(value) => handlers.push(Handler::layer("served-by", move |r| {
            r.layer(SetResponseHeaderLayer::overriding(
                HeaderName::from_static(X_SERVED_BY),
                value.clone(),
            ))
        })),
        Err(_) => {
            tracing::warn!(
                server = %server_name,
                "Server name is not a valid header value, skipping served-by header"
            );
        }
    }

    handlers
}

/// `GET /status` returning the latest status snapshot as JSON.
pub fn status_routes(broadcaster: Arc<StatusBroadcaster>) -> Handler {
    let router = Router::new()
        .route("/status", get(status_handler))
        .with_state(broadcaster);
    Handler::routes("status", router)
}

async fn status_handler(State(broadcaster): State<Arc<StatusBroadcaster>>) -> Json<ServerStatus> {
    Json(broadcaster.latest().unwrap_or_default())
}
