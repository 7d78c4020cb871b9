//! Shared application state.

use std::sync::Arc;

use crate::{config::HubConfig, domain::Authenticator, hub::ServerHandle, usecase::LoginUseCase};

/// Shared application state
pub struct AppState {
    /// Address of the hub's server actor
    pub server: ServerHandle,
    /// Per-session settings
    pub hub_config: Arc<HubConfig>,
    /// Verifies bearer tokens on upgrade
    pub authenticator: Arc<dyn Authenticator>,
    pub login_usecase: Arc<LoginUseCase>,
}
