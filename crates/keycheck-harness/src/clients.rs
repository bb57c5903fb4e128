//! One authenticated client per credential role.

use keycheck_client::{HttpSecretClient, SecretApi};
use keycheck_config::{HarnessConfig, Role};
use std::collections::HashMap;
use std::sync::Arc;

use crate::HarnessError;

/// Clients keyed by role, plus the role used for teardown.
#[derive(Clone)]
pub struct ClientSet {
    clients: HashMap<Role, Arc<dyn SecretApi>>,
    cleanup_role: Role,
}

impl ClientSet {
    pub fn new(cleanup_role: Role) -> Self {
        Self {
            clients: HashMap::new(),
            cleanup_role,
        }
    }

    pub fn with_client(mut self, role: Role, client: Arc<dyn SecretApi>) -> Self {
        self.clients.insert(role, client);
        self
    }

    /// Build HTTP clients for every configured credential.
    ///
    /// Fails if the config does not validate, in particular when the
    /// cleanup role has no credential.
    pub fn from_config(config: &HarnessConfig) -> Result<Self, HarnessError> {
        config.validate()?;
        let mut set = Self::new(config.cleanup_role);
        for credential in &config.credentials {
            let client = HttpSecretClient::from_config(config, credential)?;
            set.clients.insert(credential.role, Arc::new(client));
        }
        Ok(set)
    }

    pub fn client(&self, role: Role) -> Result<Arc<dyn SecretApi>, HarnessError> {
        self.clients
            .get(&role)
            .cloned()
            .ok_or(HarnessError::MissingClient(role))
    }

    pub fn has(&self, role: Role) -> bool {
        self.clients.contains_key(&role)
    }

    pub fn cleanup_role(&self) -> Role {
        self.cleanup_role
    }

    /// Client holding the most-privileged credential, used for teardown deletes.
    pub fn cleanup_client(&self) -> Result<Arc<dyn SecretApi>, HarnessError> {
        self.client(self.cleanup_role)
    }
}
