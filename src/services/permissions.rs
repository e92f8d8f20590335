use std::sync::Arc;

use crate::db::models::PermissionState;
use crate::db::store::PermissionStore;
use crate::error::AppResult;

/// Push permission state machine: {default, granted, denied}.
///
/// Transitions happen only through [`report`], driven by an explicit request
/// on the consumer side; the poller never mutates permission state. The push
/// channel consults [`current`] and fails fast unless `granted`.
/// Re-requesting after `denied` is allowed, but the engine has no way to
/// override a platform-level denial; it records whatever is reported.
///
/// [`report`]: PermissionManager::report
/// [`current`]: PermissionManager::current
pub struct PermissionManager {
    store: Arc<dyn PermissionStore>,
}

impl PermissionManager {
    pub fn new(store: Arc<dyn PermissionStore>) -> Self {
        Self { store }
    }

    pub async fn current(&self, owner_id: &str) -> AppResult<PermissionState> {
        self.store.get(owner_id).await
    }

    /// Record the outcome of a permission request as reported by the
    /// consumer's platform.
    pub async fn report(
        &self,
        owner_id: &str,
        state: PermissionState,
    ) -> AppResult<PermissionState> {
        let previous = self.store.get(owner_id).await?;
        let stored = self.store.set(owner_id, state).await?;

        if previous != stored {
            tracing::info!(
                "Push permission for owner {} changed: {} -> {}",
                owner_id,
                previous.as_str(),
                stored.as_str()
            );
        }

        Ok(stored)
    }
}
