//! # Server Status
//!
//! Health and readiness state read by the Kubernetes probes. The status is
//! only reachable through [`StatusLock`], which pairs the value with its
//! reader/writer lock: probes share the read side, the lifecycle takes the
//! write side for the duration of a field update and nothing longer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Snapshot of the server status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServerStatus {
    pub healthy: bool,
    pub ready: bool,
    /// Externally reachable URL, set once the socket is bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

/// Server status guarded by a reader/writer lock
#[derive(Debug, Clone, Default)]
pub struct StatusLock {
    inner: Arc<RwLock<ServerStatus>>,
}

impl StatusLock {
    /// Set health and readiness together
    pub fn set_status(&self, healthy: bool, ready: bool) {
        {
            let mut status = self.write();
            status.healthy = healthy;
            status.ready = ready;
        }
        debug!(healthy, ready, "server status set");
    }

    /// Record the bound URL and the start time
    pub fn bound(&self, url: String, started_at: DateTime<Utc>) {
        let mut status = self.write();
        status.url = Some(url);
        status.started_at = Some(started_at);
    }

    /// Copy of the current status
    pub fn status(&self) -> ServerStatus {
        self.read().clone()
    }

    pub fn url(&self) -> Option<String> {
        self.read().url.clone()
    }

    pub fn is_healthy(&self) -> bool {
        self.read().healthy
    }

    pub fn is_ready(&self) -> bool {
        self.read().ready
    }

    // A panic while holding the lock cannot leave the two flags half written,
    // so a poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, ServerStatus> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ServerStatus> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
