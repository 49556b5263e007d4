//! Builder for [`Service`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use kube_status::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut config = Config::load()?;
//!     config.service.dependencies = vec!["http://database-proxy:8080".to_string()];
//!
//!     let service = Service::builder()
//!         .with_config(config)
//!         .health_fn(|| Ok(()))
//!         .readiness_fn(|| Ok(()))
//!         .build()?;
//!
//!     service.start().await?;
//!     service.stopped().cancelled().await;
//!
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use crate::{
    check::{Check, FnCheck},
    config::Config,
    error::{CheckError, Error, Result},
    service::Service,
};

/// Builder with sensible defaults
///
/// Config defaults to `Config::default()` and the HTTP client to a fresh
/// `reqwest::Client`. Both checks are required; `build` fails without them.
#[derive(Default)]
pub struct ServiceBuilder {
    config: Option<Config>,
    health_check: Option<Arc<dyn Check>>,
    readiness_check: Option<Arc<dyn Check>>,
    http: Option<reqwest::Client>,
}

impl ServiceBuilder {
    /// Create a new service builder with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the service configuration (optional, defaults to Config::default())
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the local health check
    pub fn health_check(mut self, check: impl Check) -> Self {
        self.health_check = Some(Arc::new(check));
        self
    }

    /// Set the local health check from a closure
    pub fn health_fn<F>(self, f: F) -> Self
    where
        F: Fn() -> std::result::Result<(), CheckError> + Send + Sync + 'static,
    {
        self.health_check(FnCheck::new(f))
    }

    /// Set the local readiness check
    pub fn readiness_check(mut self, check: impl Check) -> Self {
        self.readiness_check = Some(Arc::new(check));
        self
    }

    /// Set the local readiness check from a closure
    pub fn readiness_fn<F>(self, f: F) -> Self
    where
        F: Fn() -> std::result::Result<(), CheckError> + Send + Sync + 'static,
    {
        self.readiness_check(FnCheck::new(f))
    }

    /// Share an HTTP client for dependency probes
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Validate and build the service
    pub fn build(self) -> Result<Service> {
        let health_check = self
            .health_check
            .ok_or_else(|| Error::Validation("missing health check".to_string()))?;
        let readiness_check = self
            .readiness_check
            .ok_or_else(|| Error::Validation("missing readiness check".to_string()))?;

        Ok(Service::from_parts(
            self.config.unwrap_or_default(),
            health_check,
            readiness_check,
            self.http.unwrap_or_default(),
        ))
    }
}
