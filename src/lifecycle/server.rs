//! The lifecycle orchestrator.
//!
//! # Responsibilities
//! - Own the settings snapshot, phase flags and the host server
//! - Sequence beforeConfig → mount → beforeInit → [tests] → bind → afterListen
//! - Emit a status snapshot after every phase transition
//!
//! # State Transitions
//! ```text
//! Created → Configured → Initialized → Listening → Closed
//!                                          ↑          │
//!                                          └──────────┘  (listen again)
//! testsOK is orthogonal: recomputed by every test() run.
//! ```
//!
//! # Design Decisions
//! - The missing-port check runs before any other side effect
//! - A failed afterListen hook fails `listen` but leaves the server bound
//! - A direct `config()` call always reruns beforeConfig hooks; `listen`
//!   only runs it when it has not run yet

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::config::AppConfig;
use crate::error::ServerError;
use crate::host::{Handler, HostServer, MountError};
use crate::lifecycle::hooks::{run_all, Hook};
use crate::lifecycle::probe::{TestCase, TestResult};
use crate::lifecycle::status::{ServerStatus, StatusBroadcaster, SubscriptionId};
use crate::lifecycle::suite::{run_tests, TestsRunConfig};
use crate::lifecycle::{OneOrMany, Phase};
use crate::observability::metrics;

/// View of the orchestrator handed to afterListen hooks.
#[derive(Debug, Clone)]
pub struct ServerContext {
    name: Arc<str>,
    port: u16,
    local_addr: Option<SocketAddr>,
    status: ServerStatus,
    broadcaster: Arc<StatusBroadcaster>,
}

impl ServerContext {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Port passed to the host's bind.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Status right after the listen transition.
    pub fn status(&self) -> ServerStatus {
        self.status
    }

    pub fn broadcaster(&self) -> &Arc<StatusBroadcaster> {
        &self.broadcaster
    }
}

/// What a successful `listen` produced.
#[derive(Debug, Clone)]
pub struct ListenOutcome {
    /// beforeInit results, if that phase ran during this call.
    pub init_results: Option<Vec<Value>>,
    /// Address the host reports for the new handle.
    pub local_addr: Option<SocketAddr>,
}

/// Collects settings, hooks, tests and middleware for a [`LifecycleServer`].
///
/// Every list setter accepts a single item or a list and appends in order.
pub struct ServerBuilder {
    name: String,
    port: Option<u16>,
    run_tests_before_listening: bool,
    tests_run_config: TestsRunConfig,
    middleware: Vec<Handler>,
    before_config: Vec<Hook>,
    before_init: Vec<Hook>,
    after_listen: Vec<Hook<ServerContext>>,
    tests: Vec<TestCase>,
    broadcaster: Arc<StatusBroadcaster>,
}

impl ServerBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            port: None,
            run_tests_before_listening: false,
            tests_run_config: TestsRunConfig::default(),
            middleware: Vec::new(),
            before_config: Vec::new(),
            before_init: Vec::new(),
            after_listen: Vec::new(),
            tests: Vec::new(),
            broadcaster: Arc::new(StatusBroadcaster::new()),
        }
    }

    /// Start from the `[server]` and `[tests]` sections of a config file.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut builder = Self::new(config.server.name.clone())
            .run_tests_before_listening(config.server.run_tests_before_listening)
            .tests_run_config(config.tests);
        builder.port = config.server.port;
        builder
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn middleware(mut self, handlers: impl Into<OneOrMany<Handler>>) -> Self {
        self.middleware.extend(handlers.into());
        self
    }

    pub fn before_config(mut self, hooks: impl Into<OneOrMany<Hook>>) -> Self {
        self.before_config.extend(hooks.into());
        self
    }

    pub fn before_init(mut self, hooks: impl Into<OneOrMany<Hook>>) -> Self {
        self.before_init.extend(hooks.into());
        self
    }

    pub fn after_listen(mut self, hooks: impl Into<OneOrMany<Hook<ServerContext>>>) -> Self {
        self.after_listen.extend(hooks.into());
        self
    }

    pub fn tests(mut self, tests: impl Into<OneOrMany<TestCase>>) -> Self {
        self.tests.extend(tests.into());
        self
    }

    pub fn run_tests_before_listening(mut self, enabled: bool) -> Self {
        self.run_tests_before_listening = enabled;
        self
    }

    pub fn tests_run_config(mut self, config: TestsRunConfig) -> Self {
        self.tests_run_config = config;
        self
    }

    /// The broadcaster the built server will own, e.g. for a status route.
    pub fn broadcaster(&self) -> Arc<StatusBroadcaster> {
        Arc::clone(&self.broadcaster)
    }

    pub fn build<H: HostServer>(self, host: H) -> LifecycleServer<H> {
        let status = ServerStatus {
            tests_ok: self.tests.is_empty(),
            ..ServerStatus::default()
        };

        LifecycleServer {
            name: self.name,
            port: self.port.filter(|p| *p != 0),
            run_tests_before_listening: self.run_tests_before_listening,
            tests_run_config: self.tests_run_config,
            middleware: self.middleware,
            before_config: self.before_config,
            before_init: self.before_init,
            after_listen: self.after_listen,
            tests: self.tests,
            status,
            last_test_results: Vec::new(),
            host,
            handle: None,
            broadcaster: self.broadcaster,
        }
    }
}

/// Drives a host server through its configured lifecycle.
pub struct LifecycleServer<H: HostServer> {
    name: String,
    port: Option<u16>,
    run_tests_before_listening: bool,
    tests_run_config: TestsRunConfig,
    middleware: Vec<Handler>,
    before_config: Vec<Hook>,
    before_init: Vec<Hook>,
    after_listen: Vec<Hook<ServerContext>>,
    tests: Vec<TestCase>,
    status: ServerStatus,
    last_test_results: Vec<TestResult>,
    host: H,
    handle: Option<H::Handle>,
    broadcaster: Arc<StatusBroadcaster>,
}

impl<H: HostServer> LifecycleServer<H> {
    pub fn builder(name: impl Into<String>) -> ServerBuilder {
        ServerBuilder::new(name)
    }

    /// Run beforeConfig hooks, then mount the middleware in order.
    ///
    /// Returns the beforeConfig results (empty when there are none).
    pub async fn config(&mut self) -> Result<Vec<Value>, ServerError> {
        let results = if self.before_config.is_empty() {
            Vec::new()
        } else {
            run_phase(&self.name, Phase::BeforeConfig, &self.before_config, ()).await?
        };

        self.status.pre_config_ran = true;

        let mounted = mount_all(&mut self.host, &self.name, &self.middleware);
        tracing::debug!(
            server = %self.name,
            handlers = self.middleware.len(),
            "Middleware mounted"
        );

        self.emit(Phase::Config);
        mounted?;
        Ok(results)
    }

    /// Mount extra handlers onto the host, in order, outside of `config()`.
    ///
    /// Stops at the first handler the host refuses.
    pub fn mount(&mut self, handlers: impl Into<OneOrMany<Handler>>) -> Result<(), ServerError> {
        let handlers: OneOrMany<Handler> = handlers.into();
        mount_all(&mut self.host, &self.name, &handlers.into_vec())?;
        Ok(())
    }

    /// Run the server tests with `config`, or the configured defaults.
    pub async fn test(
        &mut self,
        config: Option<TestsRunConfig>,
    ) -> Result<Vec<TestResult>, ServerError> {
        let config = config.unwrap_or(self.tests_run_config);
        let outcome = run_tests(&self.tests, config).await?;

        self.status.tests_ok = outcome.tests_ok();
        self.last_test_results = outcome.results().to_vec();
        self.emit(Phase::Test);

        outcome.into_checked(config.reject_on_error)
    }

    /// Configure if needed, run beforeInit hooks and tests, then bind.
    ///
    /// `port` overrides the configured port for this call.
    pub async fn listen(&mut self, port: Option<u16>) -> Result<ListenOutcome, ServerError> {
        let port = port
            .filter(|p| *p != 0)
            .or(self.port)
            .ok_or(ServerError::MissingPort)?;

        if self.handle.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        if !self.status.pre_config_ran {
            self.config().await?;
        }

        let mut init_results = None;
        if !self.before_init.is_empty() && !self.status.pre_init_ran {
            let outcome = run_phase(&self.name, Phase::BeforeInit, &self.before_init, ()).await;
            let results = match outcome {
                Ok(results) => results,
                Err(e) => {
                    tracing::error!(
                        server = %self.name,
                        error = %e,
                        "There were errors during pre init of server"
                    );
                    return Err(e);
                }
            };
            self.status.pre_init_ran = true;
            self.emit(Phase::BeforeInit);
            init_results = Some(results);
        }

        if self.run_tests_before_listening {
            self.test(None).await?;
        }

        let handle = self
            .host
            .bind(port)
            .await
            .map_err(|source| ServerError::Bind { port, source })?;
        let local_addr = self.host.local_addr(&handle);
        tracing::info!(server = %self.name, port, "App listening on port {}", port);

        self.handle = Some(handle);
        self.status.running = true;
        self.status.stopped = false;
        metrics::set_running(&self.name, true);
        self.emit(Phase::Listen);

        if !self.after_listen.is_empty() {
            let context = ServerContext {
                name: Arc::from(self.name.as_str()),
                port,
                local_addr,
                status: self.status,
                broadcaster: Arc::clone(&self.broadcaster),
            };
            run_phase(&self.name, Phase::AfterListen, &self.after_listen, context).await?;
        }

        Ok(ListenOutcome {
            init_results,
            local_addr,
        })
    }

    /// Close the listening handle.
    ///
    /// On failure the handle is kept and the status is left untouched, so
    /// the call can be retried.
    pub async fn close(&mut self) -> Result<String, ServerError> {
        let handle = self.handle.as_mut().ok_or(ServerError::NotRunning)?;

        if let Err(source) = self.host.close(handle).await {
            tracing::error!(server = %self.name, error = %source, "Failed to close server");
            return Err(ServerError::Close { source });
        }

        self.handle = None;
        self.status.stopped = true;
        self.status.running = false;
        metrics::set_running(&self.name, false);
        self.emit(Phase::Close);

        tracing::info!(server = %self.name, "Server closed");
        Ok(format!("server {} was closed successfully", self.name))
    }

    /// Register a status callback.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ServerStatus) + Send + Sync + 'static,
    {
        self.broadcaster.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.broadcaster.unsubscribe(id)
    }

    pub fn broadcaster(&self) -> &Arc<StatusBroadcaster> {
        &self.broadcaster
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn is_running(&self) -> bool {
        self.status.running
    }

    /// Results of the most recent `test()` run, kept even when it was rejected.
    pub fn last_test_results(&self) -> &[TestResult] {
        &self.last_test_results
    }

    pub fn handle(&self) -> Option<&H::Handle> {
        self.handle.as_ref()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    fn emit(&mut self, phase: Phase) {
        self.status.last_phase = Some(phase);
        metrics::record_phase(phase);
        tracing::debug!(
            server = %self.name,
            phase = %phase,
            status = ?self.status,
            "Status changed"
        );
        self.broadcaster.emit(self.status);
    }
}

fn mount_all<H: HostServer>(
    host: &mut H,
    server: &str,
    handlers: &[Handler],
) -> Result<(), MountError> {
    for handler in handlers {
        if let Err(e) = host.mount(handler.clone()) {
            tracing::error!(
                server = %server,
                handler = %handler.name(),
                error = %e,
                "Failed to mount handler"
            );
            return Err(e);
        }
    }
    Ok(())
}

/// Run one phase's hooks, timing them and tagging failures with the phase.
async fn run_phase<A: Clone + 'static>(
    server: &str,
    phase: Phase,
    hooks: &[Hook<A>],
    arg: A,
) -> Result<Vec<Value>, ServerError> {
    tracing::debug!(server = %server, phase = %phase, hooks = hooks.len(), "Running hooks");
    let start = Instant::now();
    let outcome = run_all(hooks, arg).await;
    metrics::record_hook_duration(phase, start);
    outcome.map_err(|source| ServerError::Hook { phase, source })
}
