//! Application state for dependency injection.

use std::sync::Arc;

use crate::revocation::RevocationStore;
use crate::service::AuthService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthService>,
    pub revocations: Arc<dyn RevocationStore>,
}

impl AppState {
    /// Create new app state.
    pub fn new(auth_service: Arc<dyn AuthService>, revocations: Arc<dyn RevocationStore>) -> Self {
        Self {
            auth_service,
            revocations,
        }
    }
}
