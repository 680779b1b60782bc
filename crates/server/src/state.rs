//! Application state shared across handlers.

use crate::policy::AccessPipeline;
use reelgate_core::Clock;
use reelgate_core::config::AppConfig;
use reelgate_signer::SignerResult;
use reelgate_storage::ObjectStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration, immutable after startup.
    pub config: Arc<AppConfig>,
    /// Object storage backend.
    pub storage: Arc<dyn ObjectStore>,
    /// Access checks applied to every object request.
    pub access: Arc<AccessPipeline>,
    /// Time source for expiry checks and health timestamps.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Configuration warnings are logged; none of them prevents startup.
    pub fn new(
        config: AppConfig,
        storage: Arc<dyn ObjectStore>,
        clock: Arc<dyn Clock>,
    ) -> SignerResult<Self> {
        for warning in config.validate() {
            tracing::warn!("Configuration warning: {}", warning);
        }

        let access = AccessPipeline::from_config(&config.access, clock.clone())?;
        tracing::info!(
            policies = ?access.policy_names(),
            backend = storage.backend_name(),
            "Access pipeline configured"
        );

        Ok(Self {
            config: Arc::new(config),
            storage,
            access: Arc::new(access),
            clock,
        })
    }
}
