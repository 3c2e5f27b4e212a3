//! Channel-driven grant revocation.
//!
//! The identity provider emits a [`GrantRevoked`] event whenever a grant is
//! revoked. The [`RevocationListener`] runs a background task that receives
//! those events and runs [`GrantRevoker::revoke`] for each, one at a time.
//!
//! # Example
//!
//! ```ignore
//! use oidc_store::{GrantRevoked, RevocationListener};
//!
//! let listener = RevocationListener::spawn(factory.revocation());
//! listener.sender().send(GrantRevoked::new("G1")).await?;
//!
//! // Drain queued events and stop.
//! let stats = listener.shutdown().await;
//! ```
//!
//! # Abandonment
//!
//! Events still queued, or a revocation in flight, when the process exits
//! are lost. Nothing records how far a revocation got, so an interrupted
//! grant is only cleaned up if it is revoked again.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::revocation::GrantRevoker;

// =============================================================================
// Constants
// =============================================================================

/// Default event channel capacity.
pub const DEFAULT_CAPACITY: usize = 256;

// =============================================================================
// Types
// =============================================================================

/// Event raised when a grant is revoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantRevoked {
    /// The revoked grant.
    pub grant_id: String,
}

impl GrantRevoked {
    /// Creates an event for `grant_id`.
    #[must_use]
    pub fn new(grant_id: impl Into<String>) -> Self {
        Self {
            grant_id: grant_id.into(),
        }
    }
}

/// Counters collected by the listener task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    /// Events received.
    pub received: usize,
    /// Revocations that completed.
    pub revoked: usize,
    /// Revocations that failed.
    pub failed: usize,
}

// =============================================================================
// Revocation Listener
// =============================================================================

/// Background worker revoking grants as events arrive.
pub struct RevocationListener {
    sender: mpsc::Sender<GrantRevoked>,
    handle: JoinHandle<ListenerStats>,
}

impl RevocationListener {
    /// Spawns the worker with the default channel capacity.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(revoker: Arc<dyn GrantRevoker>) -> Self {
        Self::with_capacity(revoker, DEFAULT_CAPACITY)
    }

    /// Spawns the worker with a channel holding up to `capacity` events.
    #[must_use]
    pub fn with_capacity(revoker: Arc<dyn GrantRevoker>, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run(revoker, receiver));
        Self { sender, handle }
    }

    /// Returns a sender for revocation events.
    #[must_use]
    pub fn sender(&self) -> mpsc::Sender<GrantRevoked> {
        self.sender.clone()
    }

    /// Closes this listener's sender and waits for the worker to drain.
    ///
    /// The worker only stops once every cloned sender is dropped as well.
    pub async fn shutdown(self) -> ListenerStats {
        drop(self.sender);
        match self.handle.await {
            Ok(stats) => stats,
            Err(e) => {
                error!(error = %e, "Revocation listener task failed");
                ListenerStats::default()
            }
        }
    }
}

async fn run(
    revoker: Arc<dyn GrantRevoker>,
    mut receiver: mpsc::Receiver<GrantRevoked>,
) -> ListenerStats {
    info!("Revocation listener started");
    let mut stats = ListenerStats::default();

    while let Some(event) = receiver.recv().await {
        stats.received += 1;
        match revoker.revoke(&event.grant_id).await {
            Ok(report) => {
                stats.revoked += 1;
                debug!(grant_id = %event.grant_id, deleted = report.deleted, "Grant revoked");
            }
            Err(e) => {
                stats.failed += 1;
                error!(
                    grant_id = %event.grant_id,
                    error = %e,
                    category = %e.category(),
                    "Grant revocation failed"
                );
            }
        }
    }

    info!(
        received = stats.received,
        revoked = stats.revoked,
        failed = stats.failed,
        "Revocation listener stopped"
    );
    stats
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{StoreError, StoreResult};
    use crate::revocation::RevocationReport;

    #[derive(Default)]
    struct RecordingRevoker {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl GrantRevoker for RecordingRevoker {
        async fn revoke(&self, grant_id: &str) -> StoreResult<RevocationReport> {
            self.seen.lock().unwrap().push(grant_id.to_string());
            if grant_id == "broken" {
                return Err(StoreError::backend("unavailable"));
            }
            Ok(RevocationReport {
                grant_id: grant_id.to_string(),
                ..RevocationReport::default()
            })
        }
    }

    #[tokio::test]
    async fn test_listener_revokes_each_event() {
        let revoker = Arc::new(RecordingRevoker::default());
        let listener = RevocationListener::with_capacity(revoker.clone(), 4);

        let sender = listener.sender();
        for grant in ["G1", "broken", "G2"] {
            sender.send(GrantRevoked::new(grant)).await.unwrap();
        }
        drop(sender);

        let stats = listener.shutdown().await;
        assert_eq!(
            stats,
            ListenerStats {
                received: 3,
                revoked: 2,
                failed: 1
            }
        );
        assert_eq!(*revoker.seen.lock().unwrap(), vec!["G1", "broken", "G2"]);
    }
}
