//! The status service: lifecycle, health and readiness
//!
//! A [`Service`] owns one instance identity, its local checks and its list
//! of dependencies. `start` runs the HTTP serving loop in the background
//! exactly once; when that loop exits for any reason the exit reason is
//! latched as the fatal state, and from then on every health and
//! readiness check fails with it.
//!
//! Readiness propagates: after the local readiness check passes, the
//! `/readiness` endpoint of every dependency is queried, forwarding the
//! chain of instance IDs the request has already visited with this
//! instance's ID appended. A chain that visits the same instance twice is
//! a dependency cycle and is answered with `508 Loop Detected`.

use http::StatusCode;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use crate::{
    check::Check,
    client::DependencyClient,
    config::Config,
    cycle,
    error::{Error, Result, ServeError},
    ids::InstanceId,
    lifecycle::{FatalState, Lifecycle, LifecycleCell},
    server,
    service_builder::ServiceBuilder,
    status::Status,
};

/// Status code reported when a readiness chain contains a cycle
pub const LOOP_DETECTED: StatusCode = StatusCode::LOOP_DETECTED;

/// A health/readiness status server instance
///
/// Cheap to clone; all clones share the same instance.
#[derive(Clone)]
pub struct Service {
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    id: InstanceId,
    health_check: Arc<dyn Check>,
    readiness_check: Arc<dyn Check>,
    http: reqwest::Client,
    lifecycle: LifecycleCell,
    // fires once the start sequence has finished, whatever its outcome
    launched: CancellationToken,
    // fires once the serving loop has exited
    stopped: CancellationToken,
    // asks the serving loop to shut down gracefully
    shutdown: CancellationToken,
}

impl Service {
    /// Create a new builder for Service
    pub fn builder() -> ServiceBuilder {
        ServiceBuilder::new()
    }

    pub(crate) fn from_parts(
        config: Config,
        health_check: Arc<dyn Check>,
        readiness_check: Arc<dyn Check>,
        http: reqwest::Client,
    ) -> Self {
        let id = config
            .service
            .uuid
            .map(InstanceId::from)
            .unwrap_or_default();

        tracing::debug!(
            service = %config.service.name,
            uuid = %id,
            url = %config.url(),
            dependencies = config.service.dependencies.len(),
            "Constructed status service"
        );

        Self {
            inner: Arc::new(Inner {
                config,
                id,
                health_check,
                readiness_check,
                http,
                lifecycle: LifecycleCell::default(),
                launched: CancellationToken::new(),
                stopped: CancellationToken::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// This instance's identity
    pub fn id(&self) -> InstanceId {
        self.inner.id
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Snapshot of the lifecycle (phase, start time, fatal state)
    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.lifecycle.snapshot()
    }

    /// The latched fatal state, if the service is not serving
    ///
    /// Before `start` this is the not-started sentinel.
    pub fn fatal(&self) -> Option<FatalState> {
        self.lifecycle().fatal
    }

    /// Address the serving loop bound, once it has
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lifecycle().local_addr
    }

    /// Token cancelled once the serving loop has exited
    pub fn stopped(&self) -> CancellationToken {
        self.inner.stopped.clone()
    }

    /// Ask the serving loop to shut down gracefully
    ///
    /// The loop exit is latched as [`ServeError::Stopped`].
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }

    pub(crate) fn mark_bound(&self, addr: SocketAddr) {
        self.inner.lifecycle.bound(addr);
    }

    /// URL this service can reach itself on
    ///
    /// Prefers the actually bound port, so port 0 configurations work.
    pub fn url(&self) -> String {
        let service = &self.inner.config.service;
        let host = if service.hostname.is_empty() {
            "localhost"
        } else {
            service.hostname.as_str()
        };
        let port = self.local_addr().map_or(service.port, |addr| addr.port());
        format!("http://{}:{}", host, port)
    }

    /// Start serving in the background
    ///
    /// Only the first call does anything. Concurrent callers wait for it to
    /// finish and then get [`Error::AlreadyStarted`], as does every later
    /// call. The first call waits up to `start_wait` for the serving loop to
    /// fail fast, then checks its own `/healthz` over HTTP.
    ///
    /// The start is claimed before the first await point and the sequence
    /// runs in its own task, so dropping the returned future does not
    /// abandon it or let another caller start a second serving loop.
    pub async fn start(&self) -> Result<()> {
        if self.inner.lifecycle.begin().is_none() {
            self.inner.launched.cancelled().await;
            return Err(Error::AlreadyStarted);
        }

        let service = self.clone();
        let launch = tokio::spawn(async move {
            let _launched = service.inner.launched.clone().drop_guard();
            service.launch().await
        });

        match launch.await {
            Ok(result) => result,
            Err(join) => Err(join_error(join).into()),
        }
    }

    async fn launch(&self) -> Result<()> {
        tracing::info!(
            service = %self.inner.config.service.name,
            uuid = %self.inner.id,
            addr = %self.inner.config.service.bind_addr(),
            "Starting status service"
        );

        tokio::spawn(self.clone().run(server::serve(self.clone())));

        tokio::select! {
            _ = self.inner.stopped.cancelled() => {}
            _ = tokio::time::sleep(self.inner.config.service.start_wait()) => {}
        }

        if let Some(fatal) = self.fatal() {
            return Err(fatal.error.into());
        }

        if let Err(err) = self.self_check().await {
            tracing::error!(error = %err, "Status service self check failed");
            return Err(err);
        }

        self.inner.lifecycle.running();
        Ok(())
    }

    async fn self_check(&self) -> Result<()> {
        DependencyClient::new([self.url()])
            .with_http_client(self.inner.http.clone())
            .timeout(self.inner.config.probe.timeout())
            .health()
            .await
            .into_result()?;
        Ok(())
    }

    // The serving loop. Runs `serving` in its own task so a panic is
    // captured as the fatal error instead of unwinding further.
    async fn run<F>(self, serving: F)
    where
        F: Future<Output = std::result::Result<(), ServeError>> + Send + 'static,
    {
        let error = match tokio::spawn(serving).await {
            Ok(Ok(())) => ServeError::Stopped,
            Ok(Err(err)) => err,
            Err(join) => join_error(join),
        };

        let fatal = self.inner.lifecycle.latch(error);
        if fatal.error == ServeError::Stopped {
            tracing::info!(runtime = ?fatal.runtime, "Status service stopped");
        } else {
            tracing::error!(error = %fatal.error, runtime = ?fatal.runtime, "Status service terminated");
        }

        self.inner.stopped.cancel();
    }

    /// Liveness of this instance
    ///
    /// A fatal state overrides the local health check.
    pub async fn health(&self) -> Status {
        let lifecycle = self.lifecycle();
        if let Some(fatal) = &lifecycle.fatal {
            return Status::new(&self.inner.id, lifecycle.started, Some(&fatal.error));
        }

        let result = self.inner.health_check.check().await;
        Status::new(&self.inner.id, lifecycle.started, result.err())
    }

    /// Readiness of this instance and, transitively, its dependencies
    ///
    /// `chain` lists the instance IDs already visited, oldest first.
    pub async fn readiness(&self, chain: &[String]) -> Status {
        let id = &self.inner.id;
        let lifecycle = self.lifecycle();
        let started = lifecycle.started;

        if let Some(fatal) = &lifecycle.fatal {
            return Status::new(id, started, Some(&fatal.error));
        }

        let mut chain = chain.to_vec();
        chain.push(id.to_string());

        if let Some(repeated) = cycle::find_repeat(&chain) {
            let joined = chain.join(",");
            tracing::warn!(uuid = %repeated, chain = %joined, "Cyclic dependency detected");
            let message = format!("cyclic dependency detected for UUID list: {}", joined);
            return Status::new(id, started, Some(message)).with_failure_code(LOOP_DETECTED);
        }

        if let Err(err) = self.inner.readiness_check.check().await {
            return Status::new(id, started, Some(err));
        }

        let dependencies = &self.inner.config.service.dependencies;
        if !dependencies.is_empty() {
            let report = DependencyClient::new(dependencies.iter().cloned())
                .with_http_client(self.inner.http.clone())
                .all(self.inner.config.probe.all)
                .timeout(self.inner.config.probe.timeout())
                .chain(chain)
                .readiness()
                .await;

            if let Some(err) = report.error {
                tracing::warn!(error = %err, "Dependency not ready");
                let status = Status::new(id, started, Some(&err));
                return if err.is_loop_detected() {
                    status.with_failure_code(LOOP_DETECTED)
                } else {
                    status
                };
            }
        }

        Status::ok(id, started)
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("id", &self.inner.id)
            .field("url", &self.inner.config.url())
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}

fn join_error(join: JoinError) -> ServeError {
    if join.is_panic() {
        ServeError::Panic(panic_message(join.into_panic()))
    } else {
        ServeError::Serve(join.to_string())
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
