//! Continuous location subscription with guaranteed teardown.

use crate::{location::LocationFix, traits::LocationProvider, Result};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Handle returned by `LocationProvider::watch_position`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

/// A live location subscription.
///
/// Updates arrive in order through [`LocationWatch::next`]. The provider watch
/// is cleared on [`LocationWatch::cancel`] or when the handle is dropped.
pub struct LocationWatch {
    id: WatchId,
    provider: Arc<dyn LocationProvider>,
    updates: UnboundedReceiver<Result<LocationFix>>,
    cancelled: bool,
}

impl LocationWatch {
    pub(crate) fn new(
        id: WatchId,
        provider: Arc<dyn LocationProvider>,
        updates: UnboundedReceiver<Result<LocationFix>>,
    ) -> Self {
        Self {
            id,
            provider,
            updates,
            cancelled: false,
        }
    }

    pub fn id(&self) -> WatchId {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Waits for the next update. `None` once cancelled or the provider hangs up.
    pub async fn next(&mut self) -> Option<Result<LocationFix>> {
        if self.cancelled {
            return None;
        }
        self.updates.recv().await
    }

    /// Returns an update if one is already queued
    pub fn try_next(&mut self) -> Option<Result<LocationFix>> {
        if self.cancelled {
            return None;
        }
        self.updates.try_recv().ok()
    }

    pub fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        self.updates.close();
        self.provider.clear_watch(self.id);
        log::debug!("Location watch {:?} cleared", self.id);
    }
}

impl Drop for LocationWatch {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for LocationWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationWatch")
            .field("id", &self.id)
            .field("cancelled", &self.cancelled)
            .finish()
    }
}
