//! Gateway state
//!
//! Shared by every request handler.

use crate::hub::Hub;
use relay_common::AppConfig;
use relay_core::CredentialValidator;
use std::sync::Arc;

/// Gateway application state
#[derive(Clone)]
pub struct GatewayState {
    /// Delivery hub every upgraded connection is served through
    hub: Hub,
    /// Resolves bearer credentials before an upgrade is accepted
    credentials: Arc<dyn CredentialValidator>,
    config: Arc<AppConfig>,
}

impl GatewayState {
    pub fn new(hub: Hub, credentials: Arc<dyn CredentialValidator>, config: AppConfig) -> Self {
        Self {
            hub,
            credentials,
            config: Arc::new(config),
        }
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    pub fn credentials(&self) -> &dyn CredentialValidator {
        self.credentials.as_ref()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("hub", &self.hub)
            .field("config", &"AppConfig")
            .finish()
    }
}
