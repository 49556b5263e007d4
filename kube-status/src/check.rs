//! Local health and readiness checks

use async_trait::async_trait;
use std::fmt;

use crate::error::CheckError;

/// A local health or readiness predicate
///
/// Return `Err` when the service is not healthy (or not ready); the
/// error text becomes the reported status message. Failures are reported,
/// never fatal.
#[async_trait]
pub trait Check: Send + Sync + 'static {
    /// Run the check
    async fn check(&self) -> Result<(), CheckError>;
}

/// Adapter turning a synchronous closure into a [`Check`]
pub struct FnCheck<F>(F);

impl<F> FnCheck<F>
where
    F: Fn() -> Result<(), CheckError> + Send + Sync + 'static,
{
    /// Wrap `f`
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> Check for FnCheck<F>
where
    F: Fn() -> Result<(), CheckError> + Send + Sync + 'static,
{
    async fn check(&self) -> Result<(), CheckError> {
        (self.0)()
    }
}

impl<F> fmt::Debug for FnCheck<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnCheck")
    }
}
