//! Lifecycle snapshot and latched fatal state
//!
//! The start time and the fatal record are read and written together, as
//! one compound value behind a single lock, so no caller can observe a
//! start time from one run paired with the fatal state of another.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ServeError;

/// Lifecycle phase of a service instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, `start` not yet called
    Unstarted,
    /// `start` is in progress
    Starting,
    /// `start` completed successfully and the loop is serving
    Running,
    /// The serving loop terminated; terminal
    Fatal,
}

/// Latched record of why the serving loop is not running
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalState {
    /// Terminating error
    pub error: ServeError,

    /// When the loop stopped (absent for the not-started sentinel)
    pub time: Option<DateTime<Utc>>,

    /// How long the loop ran
    pub runtime: Duration,
}

impl FatalState {
    /// The sentinel every service carries before `start`
    pub fn not_started() -> Self {
        Self {
            error: ServeError::NotStarted,
            time: None,
            runtime: Duration::ZERO,
        }
    }
}

/// Point-in-time view of a service's lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lifecycle {
    /// Current phase
    pub phase: Phase,

    /// When `start` was called
    pub started: Option<DateTime<Utc>>,

    /// Fatal record; `None` while starting or running
    pub fatal: Option<FatalState>,

    /// Address the serving loop actually bound
    pub local_addr: Option<SocketAddr>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            phase: Phase::Unstarted,
            started: None,
            fatal: Some(FatalState::not_started()),
            local_addr: None,
        }
    }
}

/// Shared lifecycle cell
///
/// Every accessor holds the lock only for the copy in or out; nothing
/// here ever awaits.
#[derive(Debug, Default)]
pub(crate) struct LifecycleCell {
    inner: Mutex<Lifecycle>,
}

impl LifecycleCell {
    pub(crate) fn snapshot(&self) -> Lifecycle {
        self.inner.lock().clone()
    }

    /// Unstarted -> Starting: record the start time and clear the sentinel
    ///
    /// Returns `None`, changing nothing, once any earlier call has claimed
    /// the start.
    pub(crate) fn begin(&self) -> Option<DateTime<Utc>> {
        let mut lifecycle = self.inner.lock();
        if lifecycle.phase != Phase::Unstarted {
            return None;
        }

        let now = Utc::now();
        lifecycle.phase = Phase::Starting;
        lifecycle.started = Some(now);
        lifecycle.fatal = None;
        Some(now)
    }

    pub(crate) fn bound(&self, addr: SocketAddr) {
        self.inner.lock().local_addr = Some(addr);
    }

    /// Starting -> Running, unless the loop already died
    pub(crate) fn running(&self) {
        let mut lifecycle = self.inner.lock();
        if lifecycle.phase == Phase::Starting {
            lifecycle.phase = Phase::Running;
        }
    }

    /// Latch the terminating error; only the first call has any effect
    pub(crate) fn latch(&self, error: ServeError) -> FatalState {
        let stopped = Utc::now();
        let mut lifecycle = self.inner.lock();
        if lifecycle.phase == Phase::Fatal {
            if let Some(fatal) = &lifecycle.fatal {
                return fatal.clone();
            }
        }

        let runtime = lifecycle
            .started
            .and_then(|started| (stopped - started).to_std().ok())
            .unwrap_or_default();
        let fatal = FatalState {
            error,
            time: Some(stopped),
            runtime,
        };
        lifecycle.phase = Phase::Fatal;
        lifecycle.fatal = Some(fatal.clone());
        fatal
    }
}
