//! Shared application state for `vaultload-server`.

use vaultload_core::gateway::VaultGateway;

/// Shared application state passed to all HTTP handlers via `Arc`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Client for the secrets backend named in each request.
    pub gateway: VaultGateway,
}

impl AppState {
    #[must_use]
    pub fn new(gateway: VaultGateway) -> Self {
        Self { gateway }
    }
}
