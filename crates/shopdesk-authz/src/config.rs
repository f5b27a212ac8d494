//! Authorization configuration.

use std::time::Duration;

/// Message shown for every authentication or authorization denial unless
/// an operation supplies its own.
pub const DEFAULT_DENIAL_MESSAGE: &str = "You are not authorized to perform this action";

/// Configuration for the authorization services.
#[derive(Debug, Clone)]
pub struct AuthzConfig {
    /// How long the raw menu tree stays cached (default: 5 minutes).
    pub menu_cache_ttl: Duration,
    /// Upper bound on a menu fetch before degrading to an empty menu
    /// (default: 4 seconds).
    pub menu_fetch_timeout: Duration,
    /// Opaque message for denied requests.
    pub denial_message: String,
    /// Buffered invalidation events per subscriber before it lags.
    pub invalidation_capacity: usize,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            menu_cache_ttl: Duration::from_secs(300),
            menu_fetch_timeout: Duration::from_secs(4),
            denial_message: DEFAULT_DENIAL_MESSAGE.into(),
            invalidation_capacity: 64,
        }
    }
}
