//! # kube-status
//!
//! Kubernetes-style liveness and readiness endpoints for services that
//! depend on each other.
//!
//! ## Features
//!
//! - **Health and readiness**: `GET /healthz` and `GET /readiness` returning a JSON [`Status`](status::Status)
//! - **Dependency propagation**: readiness includes the readiness of every configured dependency
//! - **Cycle detection**: instance IDs travel with readiness requests; a repeat answers `508 Loop Detected`
//! - **Fatal latching**: once the serving loop exits, every check reports why
//! - **Graceful shutdown**: proper signal handling (SIGTERM, SIGINT)
//!
//! ## Example
//!
//! ```rust,no_run
//! use kube_status::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Load configuration
//!     let config = Config::load()?;
//!
//!     // Initialize tracing
//!     init_tracing(&config)?;
//!
//!     // Build the service with its local checks
//!     let service = Service::builder()
//!         .with_config(config)
//!         .health_fn(|| Ok(()))
//!         .readiness_fn(|| Ok(()))
//!         .build()?;
//!
//!     // Serve in the background
//!     service.start().await?;
//!
//!     tokio::select! {
//!         _ = shutdown_signal() => service.shutdown(),
//!         _ = service.stopped().cancelled_owned() => {}
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod check;
pub mod client;
pub mod config;
pub mod cycle;
pub mod error;
pub mod health;
pub mod ids;
pub mod lifecycle;
pub mod observability;
pub mod server;
pub mod service;
pub mod service_builder;
pub mod status;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::check::{Check, FnCheck};
    pub use crate::client::{DependencyClient, ProbeReport, HEALTH_PATH, READINESS_PATH};
    pub use crate::config::{Config, MiddlewareConfig, ProbeConfig, ServiceConfig};
    pub use crate::cycle::{detect_cycle, find_repeat};
    pub use crate::error::{CheckError, Error, ProbeError, Result, ServeError};
    pub use crate::ids::InstanceId;
    pub use crate::lifecycle::{FatalState, Lifecycle, Phase};
    pub use crate::observability::init_tracing;
    pub use crate::server::{router, shutdown_signal};
    pub use crate::service::{Service, LOOP_DETECTED};
    pub use crate::service_builder::ServiceBuilder;
    pub use crate::status::Status;

    pub use async_trait::async_trait;
}
